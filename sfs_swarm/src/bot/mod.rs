//! Bot actors and the pieces they are built from.

pub mod actor;
pub mod catalog;
pub mod commands;
pub mod rooms;
pub mod state;
pub mod timers;

pub use actor::BotActor;
pub use catalog::{ClothCatalog, ClothProduct};
pub use rooms::{known_rooms, resolve_room_name};
pub use state::BotState;
pub use timers::{TimerAction, TimerFired, TimerId, TimerKind, TimerSet};
