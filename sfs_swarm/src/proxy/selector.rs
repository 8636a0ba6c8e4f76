//! Batch round-robin proxy assignment.

use super::{errors::ProxyError, route::ProxyRoute};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Consecutive connections sharing one endpoint before rotating
pub const DEFAULT_ROTATE_EVERY: usize = 100;

/// Maps connection sequence numbers onto proxy endpoints.
///
/// Endpoints rotate in contiguous batches of `rotate_every` indices and cycle
/// through the list. Route handles are cached per endpoint for the life of
/// the selector.
#[derive(Debug)]
pub struct ProxySelector {
    endpoints: Vec<String>,
    rotate_every: usize,
    counter: AtomicUsize,
    routes: Mutex<HashMap<String, Arc<ProxyRoute>>>,
}

impl ProxySelector {
    /// Build a selector, or `None` when there is nothing to proxy through.
    ///
    /// # Errors
    ///
    /// Returns an error if any endpoint cannot be routed, so a bad proxy list
    /// fails at startup rather than on the hundredth connection.
    pub fn new(endpoints: Vec<String>, rotate_every: usize) -> Result<Option<Self>, ProxyError> {
        if endpoints.is_empty() {
            return Ok(None);
        }
        for endpoint in &endpoints {
            ProxyRoute::parse(endpoint)?;
        }

        Ok(Some(Self {
            endpoints,
            rotate_every: if rotate_every > 0 {
                rotate_every
            } else {
                DEFAULT_ROTATE_EVERY
            },
            counter: AtomicUsize::new(0),
            routes: Mutex::new(HashMap::new()),
        }))
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn rotate_every(&self) -> usize {
        self.rotate_every
    }

    /// Endpoint assigned to the bot with zero-based sequence `index`
    pub fn proxy_for_index(&self, index: usize) -> &str {
        let slot = (index / self.rotate_every) % self.endpoints.len();
        &self.endpoints[slot]
    }

    /// Endpoint for the next connection; advances the connection counter.
    pub fn next_endpoint(&self) -> &str {
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        self.proxy_for_index(index)
    }

    /// Route handle for the next connection; advances the connection counter.
    pub fn next_route(&self) -> Result<Arc<ProxyRoute>, ProxyError> {
        let endpoint = self.next_endpoint().to_string();
        self.route_for(&endpoint)
    }

    /// Cached route for an endpoint, created on first use
    pub fn route_for(&self, endpoint: &str) -> Result<Arc<ProxyRoute>, ProxyError> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(route) = routes.get(endpoint) {
            return Ok(Arc::clone(route));
        }

        let route = Arc::new(ProxyRoute::parse(endpoint)?);
        routes.insert(endpoint.to_string(), Arc::clone(&route));
        log::debug!("Created proxy route for {}", endpoint);
        Ok(route)
    }

    /// Number of distinct routes created so far
    pub fn cached_routes(&self) -> usize {
        self.routes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
