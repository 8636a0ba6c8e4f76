//! Bot spawning: names, proxy slots, per-bot configs and staggered starts.

use crate::{
    bot::BotActor,
    config::{BotConfig, SwarmConfig},
    facade::{ClientEvents, ProtocolClient},
    net::{SfsClient, Transport},
    proxy::ProxySelector,
};
use std::sync::Arc;
use tokio::{task::JoinHandle, time::Duration};

/// Digits of the unix-millisecond clock kept in a run id
const RUN_ID_DIGITS: usize = 6;

/// Builds the protocol client for each bot
pub trait ClientFactory {
    type Client: ProtocolClient + 'static;

    fn create(&self, config: &BotConfig) -> (Self::Client, ClientEvents);
}

/// Factory for SmartFox WebSocket clients sharing one transport
#[derive(Debug, Clone)]
pub struct SfsClientFactory {
    transport: Transport,
    websocket_path: String,
}

impl SfsClientFactory {
    pub fn new(transport: Transport, websocket_path: impl Into<String>) -> Self {
        Self {
            transport,
            websocket_path: websocket_path.into(),
        }
    }
}

impl ClientFactory for SfsClientFactory {
    type Client = SfsClient;

    fn create(&self, _config: &BotConfig) -> (SfsClient, ClientEvents) {
        let (client, events) = SfsClient::new(self.transport.clone());
        (
            client.with_websocket_path(self.websocket_path.as_str()),
            events,
        )
    }
}

/// Run id derived from the current time: the last six digits of the
/// unix-millisecond timestamp.
pub fn run_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().to_string();
    let start = millis.len().saturating_sub(RUN_ID_DIGITS);
    millis[start..].to_string()
}

/// Username for the bot with one-based `index`.
///
/// # Arguments
///
/// * `prefix` - Name prefix
/// * `index` - One-based bot index, zero-padded to two digits
/// * `run_id` - Appended with the index when names are randomized
/// * `suffix` - Appended last when non-empty
pub fn bot_username(prefix: &str, index: usize, run_id: Option<&str>, suffix: Option<&str>) -> String {
    let mut name = format!("{prefix}{index:02}");
    if let Some(run_id) = run_id {
        name.push_str(&format!("_{run_id}_{index}"));
    }
    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        name.push_str(suffix);
    }
    name
}

/// Usernames for every bot in the run, in spawn order
pub fn bot_usernames(config: &SwarmConfig, run_id: &str) -> Vec<String> {
    let run_id = config.randomize_names.then_some(run_id);
    (1..=config.bot_count)
        .map(|i| bot_username(&config.name_prefix, i, run_id, config.name_suffix.as_deref()))
        .collect()
}

/// Spawns the configured bots one after another
pub struct Orchestrator<F> {
    config: SwarmConfig,
    selector: Option<Arc<ProxySelector>>,
    factory: F,
}

impl<F: ClientFactory> Orchestrator<F> {
    pub fn new(config: SwarmConfig, selector: Option<Arc<ProxySelector>>, factory: F) -> Self {
        Self {
            config,
            selector,
            factory,
        }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Create, connect and spawn every bot, pausing `staggerMs` after each.
    ///
    /// Returns the actor task handles in spawn order.
    pub async fn spawn_all(&self) -> Vec<JoinHandle<()>> {
        let run_id = run_id();
        let stagger = Duration::from_millis(self.config.stagger_ms);
        let names = bot_usernames(&self.config, &run_id);
        log::info!(
            "Spawning {} bots against {}:{} (zone {})",
            names.len(),
            self.config.host,
            self.config.port,
            self.config.zone
        );

        let mut handles = Vec::with_capacity(names.len());
        for (index, username) in names.into_iter().enumerate() {
            let proxy = self
                .selector
                .as_ref()
                .map(|selector| selector.proxy_for_index(index).to_string());
            let bot_config = self.config.bot_config(username, proxy);

            let (client, events) = self.factory.create(&bot_config);
            let mut actor = BotActor::new(bot_config, client, events);
            actor.connect();
            handles.push(tokio::spawn(actor.run()));

            tokio::time::sleep(stagger).await;
        }

        log::info!("All {} bots spawned", handles.len());
        handles
    }
}
