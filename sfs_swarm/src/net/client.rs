//! SmartFox 2X client over WebSocket.
//!
//! Implements [`ProtocolClient`] by running one session task per connection.
//! The task owns the socket; requests reach it over a channel and decoded
//! server messages leave it as [`ClientEvent`]s.

use super::{
    codec::{decode_packet, encode_packet},
    payload::{SfsArray, SfsObject, SfsValue},
    transport::Transport,
};
use crate::facade::{
    ClientEvent, ClientEvents, FacadeError, ProtocolClient, Request, RoomInfo, RoomRef,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Default WebSocket endpoint path on a SmartFox server
pub const DEFAULT_WEBSOCKET_PATH: &str = "/websocket";

/// API version announced in the handshake
const API_VERSION: &str = "1.8.5";

/// Client type announced in the handshake
const CLIENT_TYPE: &str = "Rust";

/// Controller ids
mod controller {
    pub const SYSTEM: u8 = 0;
    pub const EXTENSION: u8 = 1;
}

/// Action ids used by this client
mod action {
    pub const HANDSHAKE: i16 = 0;
    pub const LOGIN: i16 = 1;
    pub const JOIN_ROOM: i16 = 4;
    pub const CALL_EXTENSION: i16 = 13;
    pub const LEAVE_ROOM: i16 = 14;
    pub const USER_COUNT_CHANGE: i16 = 1001;
    pub const CLIENT_DISCONNECTION: i16 = 1005;
}

/// Rooms the session has learned about, plus the last joined room
#[derive(Debug, Default)]
struct RoomRegistry {
    rooms: Vec<(i32, RoomInfo)>,
    last_joined: Option<RoomRef>,
}

impl RoomRegistry {
    fn upsert(&mut self, id: i32, info: RoomInfo) {
        match self.rooms.iter_mut().find(|(rid, _)| *rid == id) {
            Some((_, slot)) => *slot = info,
            None => self.rooms.push((id, info)),
        }
    }

    fn set_user_count(&mut self, id: i32, count: i64) {
        if let Some((_, info)) = self.rooms.iter_mut().find(|(rid, _)| *rid == id) {
            info.user_count = count;
        }
    }

    fn listing(&self) -> Vec<RoomInfo> {
        self.rooms.iter().map(|(_, info)| info.clone()).collect()
    }
}

/// SmartFox 2X protocol client bound to one bot
pub struct SfsClient {
    transport: Transport,
    websocket_path: String,
    events: mpsc::UnboundedSender<ClientEvent>,
    outbound: Option<mpsc::UnboundedSender<SfsObject>>,
    rooms: Arc<Mutex<RoomRegistry>>,
}

impl SfsClient {
    /// Create a client and the receiver its events arrive on.
    pub fn new(transport: Transport) -> (Self, ClientEvents) {
        let (events, receiver) = mpsc::unbounded_channel();
        let client = Self {
            transport,
            websocket_path: DEFAULT_WEBSOCKET_PATH.to_string(),
            events,
            outbound: None,
            rooms: Arc::new(Mutex::new(RoomRegistry::default())),
        };
        (client, receiver)
    }

    pub fn with_websocket_path(mut self, path: impl Into<String>) -> Self {
        self.websocket_path = path.into();
        self
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, RoomRegistry> {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProtocolClient for SfsClient {
    fn connect(&mut self, host: &str, port: u16, use_ssl: bool) {
        let scheme = if use_ssl { "wss" } else { "ws" };
        let path = if self.websocket_path.starts_with('/') {
            self.websocket_path.clone()
        } else {
            format!("/{}", self.websocket_path)
        };
        let url = format!("{scheme}://{host}:{port}{path}");

        let (outbound, requests) = mpsc::unbounded_channel();
        self.outbound = Some(outbound);

        let session = Session {
            events: self.events.clone(),
            rooms: Arc::clone(&self.rooms),
            connected: false,
        };
        tokio::spawn(session.run(self.transport.clone(), url, requests));
    }

    fn send(&mut self, request: Request) -> Result<(), FacadeError> {
        let message = {
            let registry = self.registry();
            encode_request(&request, registry.last_joined.as_ref())?
        };
        self.outbound
            .as_ref()
            .ok_or(FacadeError::NotConnected)?
            .send(message)
            .map_err(|_| FacadeError::NotConnected)
    }

    fn room_list(&self) -> Option<Vec<RoomInfo>> {
        Some(self.registry().listing())
    }
}

/// Wrap parameters in the `{c, a, p}` envelope every message uses
fn envelope(controller: u8, action: i16, params: SfsObject) -> SfsObject {
    let mut message = SfsObject::new();
    message
        .put_byte("c", controller as i8)
        .put_short("a", action)
        .put_object("p", params);
    message
}

/// Translate a request into its wire message.
///
/// `current_room` scopes extension calls and parameterless leaves.
pub fn encode_request(
    request: &Request,
    current_room: Option<&RoomRef>,
) -> Result<SfsObject, FacadeError> {
    let message = match request {
        Request::Login {
            username,
            password,
            params,
            zone,
        } => {
            let mut p = SfsObject::new();
            p.put_utf("zn", zone.as_str())
                .put_utf("un", username.as_str())
                .put_utf("pw", password.as_str())
                .put_object("p", params.clone());
            envelope(controller::SYSTEM, action::LOGIN, p)
        }
        Request::JoinRoom { name } => {
            if name.is_empty() {
                return Err(FacadeError::InvalidRequest("empty room name".to_string()));
            }
            let mut p = SfsObject::new();
            p.put_utf("n", name.as_str()).put_bool("sp", false);
            envelope(controller::SYSTEM, action::JOIN_ROOM, p)
        }
        Request::LeaveRoom { room } => {
            let id = room
                .as_ref()
                .or(current_room)
                .map(|r| r.id)
                .ok_or_else(|| FacadeError::InvalidRequest("no room to leave".to_string()))?;
            let mut p = SfsObject::new();
            p.put_int("r", id);
            envelope(controller::SYSTEM, action::LEAVE_ROOM, p)
        }
        Request::Extension { command, params } => {
            let mut p = SfsObject::new();
            p.put_utf("c", command.as_str())
                .put_int("r", current_room.map_or(-1, |r| r.id))
                .put_object("p", params.clone());
            envelope(controller::EXTENSION, action::CALL_EXTENSION, p)
        }
    };
    Ok(message)
}

/// Parse the positional room array the server sends
/// (`[id, name, group, isGame, isHidden, isPwd, userCount, ...]`).
fn parse_room(array: &SfsArray) -> Option<(RoomRef, RoomInfo)> {
    let id = i32::try_from(array.get(0)?.as_i64()?).ok()?;
    let name = array.get_utf(1)?.to_string();
    let user_count = array.get(6).and_then(|v| v.as_i64()).unwrap_or(0);
    Some((
        RoomRef {
            id,
            name: name.clone(),
        },
        RoomInfo { name, user_count },
    ))
}

fn error_message(params: &SfsObject) -> Option<String> {
    let code = params.get("ec")?.as_i64()?;
    let detail = params
        .get_array("ep")
        .map(|ep| {
            ep.iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .or_else(|| match params.get("ep") {
            Some(SfsValue::UtfArray(items)) => Some(items.join(", ")),
            _ => None,
        })
        .unwrap_or_default();
    Some(format!("error code {code}: {detail}"))
}

/// What the session loop should do after a server message
enum Step {
    Continue,
    Emit(ClientEvent),
    Close(String),
}

struct Session {
    events: mpsc::UnboundedSender<ClientEvent>,
    rooms: Arc<Mutex<RoomRegistry>>,
    connected: bool,
}

impl Session {
    async fn run(
        mut self,
        transport: Transport,
        url: String,
        mut requests: mpsc::UnboundedReceiver<SfsObject>,
    ) {
        let ws = match transport.open(&url).await {
            Ok(ws) => ws,
            Err(e) => {
                self.finish(format!("connect to {url} failed: {e}"));
                return;
            }
        };
        let (mut write, mut read) = ws.split();

        let mut hello = SfsObject::new();
        hello
            .put_utf("api", API_VERSION)
            .put_utf("cl", CLIENT_TYPE)
            .put_bool("bin", true);
        let handshake = envelope(controller::SYSTEM, action::HANDSHAKE, hello);

        let reason = match encode_packet(&handshake) {
            Ok(bytes) => match write.send(Message::Binary(bytes.into())).await {
                Ok(()) => None,
                Err(e) => Some(format!("handshake send failed: {e}")),
            },
            Err(e) => Some(format!("handshake encode failed: {e}")),
        };
        if let Some(reason) = reason {
            self.finish(reason);
            return;
        }

        let reason = loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Binary(data))) => match decode_packet(&data) {
                        Ok(packet) => match self.handle_packet(&packet) {
                            Step::Continue => {}
                            Step::Emit(event) => {
                                if self.events.send(event).is_err() {
                                    let _ = write.close().await;
                                    break "client dropped".to_string();
                                }
                            }
                            Step::Close(reason) => break reason,
                        },
                        Err(e) => log::debug!("Dropping undecodable packet: {}", e),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map_or_else(
                            || "closed by server".to_string(),
                            |f| format!("closed by server: {}", f.reason),
                        );
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break e.to_string(),
                    None => break "stream ended".to_string(),
                },
                request = requests.recv() => match request {
                    Some(message) => {
                        let bytes = match encode_packet(&message) {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                log::warn!("Failed to encode request: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = write.send(Message::Binary(bytes.into())).await {
                            break e.to_string();
                        }
                    }
                    None => {
                        let _ = write.close().await;
                        break "client dropped".to_string();
                    }
                },
            }
        };

        self.finish(reason);
    }

    /// Report the end of the session as the right event for its phase
    fn finish(&self, reason: String) {
        let event = if self.connected {
            ClientEvent::ConnectionLost { reason }
        } else {
            ClientEvent::Connection {
                success: false,
                reason: Some(reason),
            }
        };
        let _ = self.events.send(event);
    }

    fn handle_packet(&mut self, packet: &SfsObject) -> Step {
        let (Some(controller_id), Some(action_id)) = (packet.get_byte("c"), packet.get_short("a"))
        else {
            return Step::Continue;
        };
        let empty = SfsObject::new();
        let params = packet.get_object("p").unwrap_or(&empty);

        match (controller_id as u8, action_id) {
            (controller::SYSTEM, action::HANDSHAKE) => {
                if let Some(message) = error_message(params) {
                    return Step::Close(format!("handshake rejected, {message}"));
                }
                self.connected = true;
                Step::Emit(ClientEvent::Connection {
                    success: true,
                    reason: None,
                })
            }
            (controller::SYSTEM, action::LOGIN) => {
                if let Some(message) = error_message(params) {
                    return Step::Emit(ClientEvent::LoginError { message });
                }
                if let Some(list) = params.get_array("rl") {
                    let mut registry = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
                    registry.rooms.clear();
                    for (room, info) in list.iter().filter_map(|v| match v {
                        SfsValue::Array(a) => parse_room(a),
                        _ => None,
                    }) {
                        registry.upsert(room.id, info);
                    }
                }
                Step::Emit(ClientEvent::Login)
            }
            (controller::SYSTEM, action::JOIN_ROOM) => {
                if let Some(message) = error_message(params) {
                    return Step::Emit(ClientEvent::RoomJoinError { message });
                }
                let room = params.get_array("r").and_then(parse_room).map(|(room, info)| {
                    let mut registry = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
                    registry.upsert(room.id, info);
                    registry.last_joined = Some(room.clone());
                    room
                });
                Step::Emit(ClientEvent::RoomJoin { room })
            }
            (controller::SYSTEM, action::USER_COUNT_CHANGE) => {
                let id = params
                    .get("r")
                    .and_then(|v| v.as_i64())
                    .and_then(|id| i32::try_from(id).ok());
                let count = params.get("uc").and_then(|v| v.as_i64());
                if let (Some(id), Some(count)) = (id, count) {
                    let mut registry = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
                    registry.set_user_count(id, count);
                }
                Step::Continue
            }
            (controller::SYSTEM, action::CLIENT_DISCONNECTION) => {
                let code = params.get("dr").and_then(|v| v.as_i64()).unwrap_or(-1);
                Step::Close(format!("disconnected by server (reason {code})"))
            }
            (controller::EXTENSION, action::CALL_EXTENSION) => match params.get_utf("c") {
                Some(command) => Step::Emit(ClientEvent::ExtensionResponse {
                    command: command.to_string(),
                    params: params.get_object("p").cloned().unwrap_or_default(),
                }),
                None => Step::Continue,
            },
            _ => Step::Continue,
        }
    }
}
