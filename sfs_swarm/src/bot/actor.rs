//! Bot actor implementation with event and timer handling.

use super::{
    catalog::ClothCatalog,
    commands,
    rooms::{known_rooms, resolve_room_name},
    state::BotState,
    timers::{TimerAction, TimerFired, TimerId, TimerSet},
};
use crate::{
    config::{BotConfig, CLOTH_APPLY_DELAY},
    facade::{ClientEvent, ClientEvents, ProtocolClient, Request, RoomRef},
    net::payload::SfsObject,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::sync::mpsc;

/// One simulated client.
///
/// The actor owns its protocol client and reacts to two inboxes: events
/// reported by the client and deliveries from its own timers. All state is
/// private to the actor task.
pub struct BotActor<C> {
    /// Immutable settings
    config: BotConfig,

    /// Protocol client handle
    client: C,

    /// Client event inbox
    events: ClientEvents,

    /// Every armed timer
    timers: TimerSet,

    /// Timer delivery inbox
    timer_inbox: mpsc::UnboundedReceiver<TimerFired>,

    rng: StdRng,

    state: BotState,

    /// `init` reply seen since the last login
    init_received: bool,

    /// Join continuation already ran since the last login
    join_started: bool,

    shop_requests_sent: bool,

    clothes_schedule_started: bool,

    init_timer: Option<TimerId>,

    move_timer: Option<TimerId>,

    /// Repeating clothing change timer
    cloth_timer: Option<TimerId>,

    catalog: ClothCatalog,
}

impl<C: ProtocolClient> BotActor<C> {
    /// Create a new bot actor
    ///
    /// # Arguments
    ///
    /// * `config` - Bot settings
    /// * `client` - Protocol client the bot drives
    /// * `events` - Receiver the client reports events on
    pub fn new(config: BotConfig, client: C, events: ClientEvents) -> Self {
        let (timers, timer_inbox) = TimerSet::new();
        Self {
            config,
            client,
            events,
            timers,
            timer_inbox,
            rng: StdRng::from_rng(&mut rand::rng()),
            state: BotState::Connecting,
            init_received: false,
            join_started: false,
            shop_requests_sent: false,
            clothes_schedule_started: false,
            init_timer: None,
            move_timer: None,
            cloth_timer: None,
            catalog: ClothCatalog::new(),
        }
    }

    /// Replace the random source, for reproducible runs
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn catalog(&self) -> &ClothCatalog {
        &self.catalog
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Start connecting to the configured server
    pub fn connect(&mut self) {
        match &self.config.proxy {
            Some(proxy) => log::info!(
                "Connecting {} to {}:{} via {}",
                self.config.username,
                self.config.host,
                self.config.port,
                proxy
            ),
            None => log::info!(
                "Connecting {} to {}:{}",
                self.config.username,
                self.config.host,
                self.config.port
            ),
        }
        self.state = BotState::Connecting;
        self.client
            .connect(&self.config.host, self.config.port, self.config.use_ssl);
    }

    /// Run the actor until its connection is lost
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        log::debug!("Bot {} event stream closed", self.config.username);
                        break;
                    }
                },
                Some(fired) = self.timer_inbox.recv() => self.handle_timer(fired),
            }

            if self.state.is_terminal() {
                break;
            }
        }

        log::debug!("Bot {} stopped ({})", self.config.username, self.state);
    }

    /// Apply one client event
    pub fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connection { success: true, .. } => self.on_connected(),
            ClientEvent::Connection {
                success: false,
                reason,
            } => {
                log::warn!(
                    "Connection failed: {}: {}",
                    self.config.username,
                    reason.unwrap_or_default()
                );
            }
            ClientEvent::Login => self.on_login(),
            ClientEvent::LoginError { message } => {
                log::warn!("Login error: {}: {}", self.config.username, message);
            }
            ClientEvent::RoomJoin { room } => self.on_room_join(room),
            ClientEvent::RoomJoinError { message } => {
                log::warn!("Join error: {}: {}", self.config.username, message);
                if self.state == BotState::Joining {
                    self.state = BotState::LoggedIn;
                }
            }
            ClientEvent::ConnectionLost { reason } => self.on_connection_lost(&reason),
            ClientEvent::ExtensionResponse { command, params } => {
                self.on_extension_response(&command, &params)
            }
        }
    }

    /// Apply one timer delivery
    pub fn handle_timer(&mut self, fired: TimerFired) {
        let Some(action) = self.timers.fired(fired) else {
            return;
        };

        match action {
            TimerAction::InitTimeout => {
                self.init_timer = None;
                self.join_after_init();
            }
            TimerAction::JoinRoom => self.join_room_now(),
            TimerAction::Move => self.send_walk(),
            TimerAction::RequestShops => {
                let requests: Vec<Request> = self
                    .config
                    .cloth_shop_ids
                    .iter()
                    .map(|&shop_id| commands::shop_product_list(shop_id))
                    .collect();
                for request in requests {
                    self.send(request);
                }
            }
            TimerAction::ApplyClothes => self.apply_random_clothes_once(),
            TimerAction::ChangeClothes { clip, color } => {
                self.send(commands::change_clothes(&clip, color));
            }
        }
    }

    fn on_connected(&mut self) {
        log::info!("Connected: {}", self.config.username);
        self.state = BotState::Connected;
        if self.send(commands::login(&self.config)) {
            self.state = BotState::LoggingIn;
        }
    }

    fn on_login(&mut self) {
        log::info!("Login ok: {}", self.config.username);
        self.init_received = false;
        self.join_started = false;

        if self.config.zone_only {
            self.state = BotState::ZoneOnly;
            return;
        }
        self.state = BotState::LoggedIn;

        if self.config.send_init {
            self.send(commands::init());
            if let Some(previous) = self.init_timer.take() {
                self.timers.cancel(previous);
            }
            self.init_timer = Some(
                self.timers
                    .once(self.config.init_timeout, TimerAction::InitTimeout),
            );
        } else {
            self.join_after_init();
        }
    }

    fn on_extension_response(&mut self, command: &str, params: &SfsObject) {
        if command == commands::INIT {
            self.init_received = true;
            if let Some(timer) = self.init_timer.take() {
                self.timers.cancel(timer);
            }
            self.join_after_init();
        } else if commands::is_shop_listing(command) {
            let added = self.catalog.collect(params);
            log::debug!(
                "{}: {} clothing entries added ({} total)",
                self.config.username,
                added,
                self.catalog.len()
            );
            self.maybe_start_clothes_schedule();
        }
    }

    /// Continue to the room once `init` arrived or timed out; first call wins
    fn join_after_init(&mut self) {
        if self.join_started {
            return;
        }
        self.join_started = true;

        if self.config.zone_only || self.config.join_room.is_none() {
            return;
        }
        log::debug!(
            "{}: continuing to room ({})",
            self.config.username,
            if self.init_received {
                "init received"
            } else {
                "without init"
            }
        );
        self.timers
            .once(self.config.join_delay, TimerAction::JoinRoom);
    }

    fn join_room_now(&mut self) {
        let Some(base) = self.config.join_room.as_deref() else {
            return;
        };
        let target = resolve_room_name(base, &known_rooms(&self.client));
        log::debug!("{}: joining {}", self.config.username, target);
        if self.send(Request::JoinRoom { name: target }) {
            self.state = BotState::Joining;
        }
    }

    fn on_room_join(&mut self, room: Option<RoomRef>) {
        log::info!(
            "Joined room: {} {}",
            self.config.username,
            room.as_ref().map_or("", |r| r.name.as_str())
        );

        if self.config.zone_only {
            if self.client.send(Request::LeaveRoom { room }).is_err() {
                let _ = self.client.send(Request::LeaveRoom { room: None });
            }
            return;
        }

        self.state = BotState::Joined;
        self.send(commands::room_join_complete());
        self.start_moving();
        self.request_shop_lists_if_needed();
        self.state = BotState::Active;
    }

    fn on_connection_lost(&mut self, reason: &str) {
        log::warn!("Connection lost: {}: {}", self.config.username, reason);
        let cancelled = self.timers.cancel_all();
        self.init_timer = None;
        self.move_timer = None;
        self.cloth_timer = None;
        self.state = BotState::Disconnected;
        log::debug!("{}: cancelled {} timers", self.config.username, cancelled);
    }

    fn start_moving(&mut self) {
        if self.config.zone_only || self.move_timer.is_some() {
            return;
        }
        self.move_timer = Some(
            self.timers
                .repeat(self.config.move_interval, TimerAction::Move),
        );
    }

    fn send_walk(&mut self) {
        let x = self.rng.random_range(0..self.config.grid_width.max(1));
        let y = self.rng.random_range(0..self.config.grid_height.max(1));
        self.send(commands::walk(x, y));
    }

    fn request_shop_lists_if_needed(&mut self) {
        if !self.config.wants_catalog() || self.shop_requests_sent {
            return;
        }
        self.shop_requests_sent = true;
        self.timers
            .once(self.config.cloth_request_delay, TimerAction::RequestShops);
    }

    fn maybe_start_clothes_schedule(&mut self) {
        if !self.config.enable_random_clothes
            || self.clothes_schedule_started
            || self.catalog.is_empty()
        {
            return;
        }
        self.clothes_schedule_started = true;

        self.timers.once(CLOTH_APPLY_DELAY, TimerAction::ApplyClothes);
        if !self.config.cloth_change_interval.is_zero() {
            self.cloth_timer = Some(
                self.timers
                    .repeat(self.config.cloth_change_interval, TimerAction::ApplyClothes),
            );
        }
    }

    fn apply_random_clothes_once(&mut self) {
        let Some(product) = self.catalog.pick(&mut self.rng).cloned() else {
            return;
        };
        let color = product.pick_color(&mut self.rng);

        self.send(commands::purchase(product.shop_id, product.product_id, color));
        self.timers.once(
            CLOTH_APPLY_DELAY,
            TimerAction::ChangeClothes {
                clip: product.clip,
                color,
            },
        );
    }

    /// Send a request, reporting whether the client accepted it
    fn send(&mut self, request: Request) -> bool {
        match self.client.send(request) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("{}: request not sent: {}", self.config.username, e);
                false
            }
        }
    }
}
