//! The capability surface a bot needs from a protocol client.
//!
//! Bots only ever talk to [`ProtocolClient`]. The SmartFox WebSocket adapter
//! in [`crate::net::client`] is one implementation; tests use recording fakes.

use crate::net::payload::SfsObject;
use thiserror::Error;
use tokio::sync::mpsc;

/// Reference to a joined room, as reported by a join event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRef {
    pub id: i32,
    pub name: String,
}

/// A room from the client's room listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub name: String,
    pub user_count: i64,
}

impl RoomInfo {
    pub fn new(name: impl Into<String>, user_count: i64) -> Self {
        Self {
            name: name.into(),
            user_count,
        }
    }
}

/// Requests a bot sends to the server
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Login {
        username: String,
        password: String,
        params: SfsObject,
        zone: String,
    },
    Extension {
        command: String,
        params: SfsObject,
    },
    JoinRoom {
        name: String,
    },
    /// Leave a specific room, or the last joined room when `None`
    LeaveRoom {
        room: Option<RoomRef>,
    },
}

impl Request {
    pub fn extension(command: impl Into<String>, params: SfsObject) -> Self {
        Request::Extension {
            command: command.into(),
            params,
        }
    }
}

/// Events a protocol client reports back to its bot
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connection {
        success: bool,
        reason: Option<String>,
    },
    Login,
    LoginError {
        message: String,
    },
    RoomJoin {
        room: Option<RoomRef>,
    },
    RoomJoinError {
        message: String,
    },
    ConnectionLost {
        reason: String,
    },
    ExtensionResponse {
        command: String,
        params: SfsObject,
    },
}

/// Errors a protocol client can return synchronously
#[derive(Debug, Error)]
pub enum FacadeError {
    /// No live session to send on
    #[error("Not connected")]
    NotConnected,

    /// The request cannot be expressed on this client
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Minimal protocol client contract.
///
/// Events are delivered on the receiver returned by the constructor of the
/// implementation, in arrival order.
pub trait ProtocolClient: Send {
    /// Start connecting. The outcome arrives as [`ClientEvent::Connection`].
    fn connect(&mut self, host: &str, port: u16, use_ssl: bool);

    /// Queue a request. Fire-and-forget apart from local validation.
    fn send(&mut self, request: Request) -> Result<(), FacadeError>;

    /// Rooms known to the client session, if it keeps a listing.
    fn room_list(&self) -> Option<Vec<RoomInfo>>;

    /// Secondary listing source (e.g. a room manager view).
    fn room_manager_rooms(&self) -> Option<Vec<RoomInfo>> {
        None
    }
}

/// Receiver side of a client's event stream
pub type ClientEvents = mpsc::UnboundedReceiver<ClientEvent>;
