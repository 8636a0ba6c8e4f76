//! Swarm configuration management.
//!
//! Loads the JSON run document, validates it, and derives the immutable
//! per-bot configuration handed to each actor.

use crate::{net::DEFAULT_WEBSOCKET_PATH, proxy::ProxySources};
use serde::Deserialize;
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "bots.json";

/// Fixed delay before the first clothing change and between a purchase and
/// the matching clothes change
pub const CLOTH_APPLY_DELAY: Duration = Duration::from_millis(300);

/// Run document, deserialized from camelCase JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmConfig {
    /// Game server host
    #[serde(default)]
    pub host: String,
    /// Game server WebSocket port
    #[serde(default)]
    pub port: u16,
    /// Zone every bot logs into
    #[serde(default)]
    pub zone: String,
    /// Connect with `wss`
    #[serde(rename = "useSSL", default)]
    pub use_ssl: bool,
    /// WebSocket endpoint path on the server
    #[serde(default = "default_websocket_path")]
    pub websocket_path: String,

    /// Number of bots to spawn
    #[serde(default = "default_bot_count")]
    pub bot_count: usize,
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default)]
    pub password: String,
    /// Append a per-run id and the bot index to each name
    #[serde(default)]
    pub randomize_names: bool,
    #[serde(default)]
    pub name_suffix: Option<String>,
    /// Pause between bot creations
    #[serde(default)]
    pub stagger_ms: u64,

    /// Room to join after login; bots stay in the zone when absent
    #[serde(default)]
    pub join_room: Option<String>,
    /// Log in, leave any joined room, do nothing else
    #[serde(default)]
    pub zone_only: bool,
    /// Send the `init` extension handshake before joining
    #[serde(default = "default_true")]
    pub send_init: bool,
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    #[serde(default = "default_join_delay_ms")]
    pub join_delay_ms: u64,

    #[serde(default = "default_move_interval_ms")]
    pub move_interval_ms: u64,
    #[serde(default = "default_grid")]
    pub grid_width: i64,
    #[serde(default = "default_grid")]
    pub grid_height: i64,

    #[serde(default)]
    pub enable_random_clothes: bool,
    #[serde(default)]
    pub cloth_shop_ids: Vec<i32>,
    #[serde(default)]
    pub cloth_request_delay_ms: u64,
    /// Period of repeated clothing changes; 0 disables repetition
    #[serde(default)]
    pub cloth_change_interval_ms: u64,

    /// Accepted for compatibility with older run documents; unused
    #[serde(default)]
    pub api_file: Option<String>,

    /// Array of endpoints, or one string separated by newlines/commas
    #[serde(default)]
    pub proxy_list: Option<Value>,
    #[serde(default)]
    pub proxy_list_file: Option<String>,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    /// Number or numeric string; anything non-positive means the default
    #[serde(default)]
    pub proxy_rotate_every: Option<Value>,
}

fn default_websocket_path() -> String {
    DEFAULT_WEBSOCKET_PATH.to_string()
}

fn default_bot_count() -> usize {
    1
}

fn default_name_prefix() -> String {
    "bot".to_string()
}

fn default_true() -> bool {
    true
}

fn default_init_timeout_ms() -> u64 {
    800
}

fn default_join_delay_ms() -> u64 {
    250
}

fn default_move_interval_ms() -> u64 {
    1000
}

fn default_grid() -> i64 {
    10
}

impl SwarmConfig {
    /// Read and validate the run document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        Ok(config)
    }

    /// Parse and validate a run document held in memory.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "host".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "port".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.zone.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "zone".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Proxy fields in the shape the resolver consumes
    pub fn proxy_sources(&self) -> ProxySources<'_> {
        ProxySources {
            list: self.proxy_list.as_ref(),
            list_file: self.proxy_list_file.as_deref(),
            url: self.proxy_url.as_deref(),
            proxy: self.proxy.as_deref(),
        }
    }

    /// Immutable settings for one bot.
    ///
    /// # Arguments
    ///
    /// * `username` - Login name for the bot
    /// * `proxy` - Endpoint assigned to the bot's sequence index, if any
    pub fn bot_config(&self, username: String, proxy: Option<String>) -> BotConfig {
        BotConfig {
            host: self.host.clone(),
            port: self.port,
            use_ssl: self.use_ssl,
            zone: self.zone.clone(),
            username,
            password: self.password.clone(),
            join_room: self
                .join_room
                .clone()
                .filter(|room| !room.trim().is_empty()),
            zone_only: self.zone_only,
            send_init: self.send_init,
            init_timeout: Duration::from_millis(self.init_timeout_ms),
            join_delay: Duration::from_millis(self.join_delay_ms),
            move_interval: Duration::from_millis(self.move_interval_ms.max(1)),
            grid_width: clamp_grid(self.grid_width),
            grid_height: clamp_grid(self.grid_height),
            enable_random_clothes: self.enable_random_clothes,
            cloth_shop_ids: self.cloth_shop_ids.clone(),
            cloth_request_delay: Duration::from_millis(self.cloth_request_delay_ms),
            cloth_change_interval: Duration::from_millis(self.cloth_change_interval_ms),
            proxy,
        }
    }
}

/// Grid sizes below one collapse to a single cell
fn clamp_grid(value: i64) -> i32 {
    value.clamp(1, i64::from(i32::MAX)) as i32
}

/// Immutable per-bot configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub zone: String,
    pub username: String,
    pub password: String,
    pub join_room: Option<String>,
    pub zone_only: bool,
    pub send_init: bool,
    pub init_timeout: Duration,
    pub join_delay: Duration,
    pub move_interval: Duration,
    pub grid_width: i32,
    pub grid_height: i32,
    pub enable_random_clothes: bool,
    pub cloth_shop_ids: Vec<i32>,
    pub cloth_request_delay: Duration,
    /// Zero disables repeated clothing changes
    pub cloth_change_interval: Duration,
    /// Proxy endpoint assigned at creation, informational
    pub proxy: Option<String>,
}

impl BotConfig {
    /// Settings for a bot against `host:port` with every optional behavior
    /// at its default.
    pub fn new(host: impl Into<String>, port: u16, zone: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            use_ssl: false,
            zone: zone.into(),
            username: username.into(),
            password: String::new(),
            join_room: None,
            zone_only: false,
            send_init: true,
            init_timeout: Duration::from_millis(default_init_timeout_ms()),
            join_delay: Duration::from_millis(default_join_delay_ms()),
            move_interval: Duration::from_millis(default_move_interval_ms()),
            grid_width: clamp_grid(default_grid()),
            grid_height: clamp_grid(default_grid()),
            enable_random_clothes: false,
            cloth_shop_ids: Vec::new(),
            cloth_request_delay: Duration::ZERO,
            cloth_change_interval: Duration::ZERO,
            proxy: None,
        }
    }

    /// Whether the shop catalog should be requested after joining
    pub fn wants_catalog(&self) -> bool {
        !self.zone_only && self.enable_random_clothes && !self.cloth_shop_ids.is_empty()
    }
}

/// Directory relative proxy list files are resolved against
pub fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: String, reason: String },
}
