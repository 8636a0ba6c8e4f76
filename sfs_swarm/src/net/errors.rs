//! Network error types for packet encoding and connection setup.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol packets
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input ended before a complete value was read
    #[error("Unexpected end of packet: needed {needed} more bytes")]
    Truncated { needed: usize },

    /// Unknown or unsupported value type id
    #[error("Unsupported value type {0}")]
    UnsupportedType(u8),

    /// Top-level data was not an object
    #[error("Expected an object, found type {0}")]
    NotAnObject(u8),

    /// Header flags this client cannot handle
    #[error("Unsupported packet header 0x{0:02x}")]
    UnsupportedHeader(u8),

    /// Message size exceeded maximum allowed
    #[error("Message size {actual} exceeds maximum {max}")]
    MessageTooLarge { actual: usize, max: usize },

    /// A string or collection is too long for its length prefix
    #[error("Field too long for length prefix: {0}")]
    FieldTooLong(usize),

    /// String bytes were not valid UTF-8
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Objects and arrays nested deeper than the decoder allows
    #[error("Nesting deeper than {max} levels")]
    TooDeep { max: usize },

    /// Negative length prefix
    #[error("Invalid length prefix {0}")]
    InvalidLength(i32),

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),
}

/// Errors that can occur while opening a connection
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connection or stream I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Proxy rejected or mangled the CONNECT request
    #[error("Proxy {proxy} refused tunnel: {status}")]
    TunnelRefused { proxy: String, status: String },

    /// SOCKS handshake with the proxy failed
    #[error("SOCKS proxy {proxy} failed: {source}")]
    Socks {
        proxy: String,
        #[source]
        source: tokio_socks::Error,
    },

    /// Proxy response headers exceeded the allowed size
    #[error("Proxy {0} sent an oversized response")]
    TunnelResponseTooLarge(String),

    /// Proxy route could not be built
    #[error("Proxy error: {0}")]
    Proxy(#[from] crate::proxy::ProxyError),

    /// Target URL could not be split into host and port
    #[error("Invalid target URL: {0}")]
    InvalidUrl(String),

    /// WebSocket handshake failed
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
