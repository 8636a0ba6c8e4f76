//! SmartFox 2X networking: payload model, binary codec, transport and client.

pub mod client;
pub mod codec;
pub mod errors;
pub mod payload;
pub mod transport;

pub use client::{DEFAULT_WEBSOCKET_PATH, SfsClient};
pub use errors::{CodecError, TransportError};
pub use payload::{SfsArray, SfsObject, SfsValue};
pub use transport::Transport;
