//! Outbound proxy selection.
//!
//! - [`resolve`]: builds the endpoint list from config fields, a file, or the
//!   environment
//! - [`selector`]: deterministic batch rotation over that list
//! - [`route`]: parsed endpoint handles, cached by the selector

pub mod errors;
pub mod resolve;
pub mod route;
pub mod selector;

pub use errors::ProxyError;
pub use resolve::{ProxySources, resolve_proxy_list, resolve_rotate_every};
pub use route::{ProxyKind, ProxyRoute};
pub use selector::{DEFAULT_ROTATE_EVERY, ProxySelector};
