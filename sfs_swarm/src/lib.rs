//! # SFS Swarm
//!
//! Simulated SmartFox 2X clients for generating synthetic server load.
//!
//! Each bot is an actor that connects, logs into a zone, optionally performs
//! an `init` handshake, joins a room, then keeps sending movement and
//! clothing extension commands on timers.
//!
//! ## Core Modules
//!
//! - [`bot`]: Bot actor state machine, timers, shop catalog, room resolution
//! - [`orchestrator`]: Usernames, proxy slots and staggered bot spawning
//! - [`proxy`]: Proxy list resolution and batch rotation
//! - [`facade`]: The protocol client contract bots are written against
//! - [`net`]: SmartFox 2X payloads, binary codec, transport and client
//! - [`config`]: Run document loading and validation
//!
//! ## Example
//!
//! ```
//! use sfs_swarm::proxy::ProxySelector;
//!
//! let endpoints = vec!["http://a:3128".to_string(), "http://b:3128".to_string()];
//! let selector = ProxySelector::new(endpoints, 2).unwrap().unwrap();
//! assert_eq!(selector.proxy_for_index(2), "http://b:3128");
//! ```

pub mod bot;
pub mod config;
pub mod facade;
pub mod net;
pub mod orchestrator;
pub mod proxy;

pub use bot::{BotActor, BotState};
pub use config::{BotConfig, ConfigError, SwarmConfig};
pub use facade::{ClientEvent, FacadeError, ProtocolClient, Request, RoomInfo, RoomRef};
pub use orchestrator::{ClientFactory, Orchestrator, SfsClientFactory};
pub use proxy::{ProxyError, ProxySelector};
