//! Bot lifecycle states.

use std::fmt;

/// Where a bot is in its connect → login → join → act lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// Waiting for the connection result; a failed connection stays here
    Connecting,
    Connected,
    LoggingIn,
    /// Logged in, waiting for `init` or the join delay, or parked after a
    /// failed join
    LoggedIn,
    /// Logged in with zone-only behavior; does nothing further
    ZoneOnly,
    Joining,
    Joined,
    /// In a room, moving and (optionally) changing clothes
    Active,
    /// Connection lost; terminal
    Disconnected,
}

impl BotState {
    pub fn is_terminal(self) -> bool {
        self == BotState::Disconnected
    }
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BotState::Connecting => "connecting",
            BotState::Connected => "connected",
            BotState::LoggingIn => "logging in",
            BotState::LoggedIn => "logged in",
            BotState::ZoneOnly => "zone only",
            BotState::Joining => "joining",
            BotState::Joined => "joined",
            BotState::Active => "active",
            BotState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}
