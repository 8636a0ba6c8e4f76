//! Proxy configuration error types.

use thiserror::Error;

/// Errors raised while turning endpoint strings into routes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    /// Scheme this build cannot tunnel through
    #[error("Unsupported proxy scheme '{scheme}' in {endpoint} (supported: http, socks4, socks5)")]
    UnsupportedScheme { endpoint: String, scheme: String },

    /// Endpoint string could not be parsed
    #[error("Invalid proxy endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}
