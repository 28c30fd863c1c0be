//! The high-level bot client: lifecycle, game actions and events.
//!
//! A [`Client`] is a cheap-to-clone handle over shared inner state. One
//! background pump per connection lifetime turns [`ConnectionEvent`]s
//! into store merges and [`ClientEvent`]s; a 30 Hz tick task expires chat
//! lines and emits [`ClientEvent::Tick`] while connected.
//!
//! Lifecycle calls (`start`, `stop`, `restart`) return a `Result`; every
//! game action returns `bool` and is silently `false` while the game is
//! not connected. Internal restarts (death, disconnect) are spawned onto
//! a fresh task so the pump never tears itself down mid-handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use gatsling_protocol::{Armor, Color, InputId, ServerEvent, Skill, Weapon};
use gatsling_transport::{TextSocket, WsStream};

use crate::{
    ClientError, Connection, ConnectionEvent, ConnectionEvents, Player,
    PlayerStore,
};

/// Cadence of the housekeeping tick while connected.
pub const TICK_INTERVAL: Duration = Duration::from_millis(33);

/// Synthetic aim coordinates sent when only the angle matters.
const AIM_ANCHOR: (i64, i64) = (5000, 5000);

/// Lead factor for predictive aiming: the target is advanced by its
/// velocity scaled by distance, approximating projectile travel time.
const LEAD_PER_DISTANCE: f64 = 0.001;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything a bot needs to know before it connects.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub server: String,
    /// Loadout sent with the join request.
    pub weapon: Weapon,
    pub armor: Armor,
    pub color: Color,
    /// Skills to buy as levels are reached: reaching level N buys the
    /// entry at index N - 1.
    pub skills: Vec<Skill>,
    /// Join the match as soon as the server acknowledges us.
    pub auto_join: bool,
    /// Tear down and reconnect when the socket drops.
    pub restart_on_disconnect: bool,
    /// Tear down and reconnect after our player dies.
    pub restart_on_death: bool,
}

impl ClientConfig {
    /// A config with default loadout and policies for the given server.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            weapon: Weapon::default(),
            armor: Armor::default(),
            color: Color::default(),
            skills: Vec::new(),
            auto_join: true,
            restart_on_disconnect: false,
            restart_on_death: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Events and movement
// ---------------------------------------------------------------------------

/// Events a client emits to its owner.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The server acknowledged this connection.
    Connected,
    /// The connection is gone.
    Disconnected,
    /// A remote player entered view.
    AddPlayer(Player),
    /// Our own player was set up (spawn or respawn).
    AddLocalPlayer(Player),
    /// A player left view. Carries the last known record.
    RemovePlayer(Player),
    /// Our player died.
    Died { killer: String },
    /// 30 Hz heartbeat, emitted only while connected.
    Tick,
}

/// Receiving half of a client's event stream.
pub type ClientEvents = mpsc::UnboundedReceiver<ClientEvent>;

/// Eight-way movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compass {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Compass {
    /// Desired state of the four movement keys for this heading.
    /// Every key is listed so a direction change releases the old keys.
    pub fn key_states(self) -> [(InputId, bool); 4] {
        let (up, right, down, left) = match self {
            Compass::North => (true, false, false, false),
            Compass::NorthEast => (true, true, false, false),
            Compass::East => (false, true, false, false),
            Compass::SouthEast => (false, true, true, false),
            Compass::South => (false, false, true, false),
            Compass::SouthWest => (false, false, true, true),
            Compass::West => (false, false, false, true),
            Compass::NorthWest => (true, false, false, true),
        };
        [
            (InputId::Up, up),
            (InputId::Right, right),
            (InputId::Down, down),
            (InputId::Left, left),
        ]
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct Active {
    connection: Connection,
    pump: JoinHandle<()>,
    tick: JoinHandle<()>,
}

struct ClientInner {
    config: ClientConfig,
    store: Mutex<PlayerStore>,
    latency: Mutex<Option<u64>>,
    /// Highest level already spent on an auto-upgrade.
    upgraded_to: Mutex<i64>,
    events: mpsc::UnboundedSender<ClientEvent>,
    active: Mutex<Option<Active>>,
}

/// Handle to one bot. Clones share all state.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Builds a client without connecting. Call [`Client::start`] when
    /// ready, or use [`Client::connect`] to do both at once.
    pub fn new(config: ClientConfig) -> (Self, ClientEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Self {
            inner: Arc::new(ClientInner {
                config,
                store: Mutex::new(PlayerStore::new()),
                latency: Mutex::new(None),
                upgraded_to: Mutex::new(0),
                events: tx,
                active: Mutex::new(None),
            }),
        };
        (client, rx)
    }

    /// Builds and starts a client in one call.
    pub async fn connect(
        config: ClientConfig,
    ) -> Result<(Self, ClientEvents), ClientError> {
        let (client, events) = Self::new(config);
        client.start().await?;
        Ok((client, events))
    }

    /// Adopts an already-open websocket instead of dialing.
    ///
    /// Joining and automatic restarts are forced off: the caller owns
    /// both ends of this socket's lifecycle.
    pub fn with_socket(
        mut config: ClientConfig,
        ws: WsStream,
    ) -> (Self, ClientEvents) {
        config.auto_join = false;
        config.restart_on_disconnect = false;
        config.restart_on_death = false;

        let (client, events) = Self::new(config);
        let (socket, socket_events) = TextSocket::adopt(ws);
        let (connection, conn_events) =
            Connection::attach(socket, socket_events);
        let active = client.activate(connection, conn_events);
        // Nothing else can hold this lock yet.
        if let Ok(mut slot) = client.inner.active.try_lock() {
            *slot = Some(active);
        }
        (client, events)
    }

    // --- Lifecycle --------------------------------------------------------

    /// Dials the server and brings up the pump and tick tasks.
    pub async fn start(&self) -> Result<(), ClientError> {
        let mut slot = self.inner.active.lock().await;
        if slot.is_some() {
            return Err(ClientError::AlreadyStarted);
        }

        let (connection, conn_events) =
            Connection::open(&self.inner.config.server).await?;

        // Fresh connection, fresh world.
        *self.inner.store.lock().await = PlayerStore::new();
        *self.inner.latency.lock().await = None;
        *self.inner.upgraded_to.lock().await = 0;

        *slot = Some(self.activate(connection, conn_events));
        tracing::info!(server = %self.inner.config.server, "client started");
        Ok(())
    }

    /// Tears everything down: tick, pump, connection timers, socket.
    pub async fn stop(&self) -> Result<(), ClientError> {
        let Some(active) = self.inner.active.lock().await.take() else {
            return Err(ClientError::NotStarted);
        };
        active.tick.abort();
        active.pump.abort();
        active.connection.stop().await;
        tracing::info!("client stopped");
        Ok(())
    }

    /// Full stop followed by a fresh start.
    pub async fn restart(&self) -> Result<(), ClientError> {
        self.stop().await?;
        self.start().await
    }

    fn activate(
        &self,
        connection: Connection,
        conn_events: ConnectionEvents,
    ) -> Active {
        let pump = tokio::spawn(pump(self.clone(), conn_events));
        let tick =
            tokio::spawn(tick_loop(self.clone(), connection.clone()));
        Active {
            connection,
            pump,
            tick,
        }
    }

    async fn connection(&self) -> Option<Connection> {
        self.inner
            .active
            .lock()
            .await
            .as_ref()
            .map(|a| a.connection.clone())
    }

    // --- Read-only state --------------------------------------------------

    /// Whether the server has acknowledged the current connection.
    pub async fn connected(&self) -> bool {
        match self.connection().await {
            Some(conn) => conn.is_connected(),
            None => false,
        }
    }

    /// Latest keepalive round-trip, in milliseconds.
    pub async fn current_latency(&self) -> Option<u64> {
        *self.inner.latency.lock().await
    }

    pub async fn local_player_id(&self) -> Option<i64> {
        self.inner.store.lock().await.local_id()
    }

    pub async fn local_player(&self) -> Option<Player> {
        self.inner.store.lock().await.local_player().cloned()
    }

    /// Snapshot of every player in view.
    pub async fn players(&self) -> Vec<Player> {
        self.inner.store.lock().await.players().cloned().collect()
    }

    /// Snapshot of the nearest living enemy, excluding the given ids
    /// (a swarm passes its siblings here) and invincible players.
    pub async fn closest_enemy(&self, exclude: &[i64]) -> Option<Player> {
        self.inner
            .store
            .lock()
            .await
            .closest_enemy_where(|p| {
                p.is_alive()
                    && !p.invincible
                    && !exclude.contains(&p.id)
            })
            .cloned()
    }

    // --- Game actions (false while not connected) -------------------------

    /// Sends the loadout selection, which doubles as the join request.
    pub async fn join(&self) -> bool {
        let Some(conn) = self.connection().await else {
            return false;
        };
        let c = &self.inner.config;
        conn.send_selection(c.weapon, c.armor, c.color).await
    }

    /// Heads in a fixed direction. All four movement keys are re-asserted
    /// so switching direction releases the stale ones.
    pub async fn move_dir(&self, heading: Compass) -> bool {
        let Some(conn) = self.connection().await else {
            return false;
        };
        let mut ok = true;
        for (input, down) in heading.key_states() {
            ok &= conn.send_key(input, down).await;
        }
        ok
    }

    /// Releases all four movement keys.
    pub async fn stop_moving(&self) -> bool {
        let Some(conn) = self.connection().await else {
            return false;
        };
        let mut ok = true;
        for input in
            [InputId::Up, InputId::Right, InputId::Down, InputId::Left]
        {
            ok &= conn.send_key(input, false).await;
        }
        ok
    }

    /// Steers toward a point: sign of the delta on each axis picks one
    /// of the eight headings. Standing on the point releases the keys.
    pub async fn move_to(&self, x: i64, y: i64) -> bool {
        let Some(local) = self.local_player().await else {
            return false;
        };
        let dx = x - local.x;
        let dy = y - local.y;
        let heading = match (dx.signum(), dy.signum()) {
            (0, -1) => Compass::North,
            (1, -1) => Compass::NorthEast,
            (1, 0) => Compass::East,
            (1, 1) => Compass::SouthEast,
            (0, 1) => Compass::South,
            (-1, 1) => Compass::SouthWest,
            (-1, 0) => Compass::West,
            (-1, -1) => Compass::NorthWest,
            _ => return self.stop_moving().await,
        };
        self.move_dir(heading).await
    }

    /// Faces a fixed angle, in degrees. The coordinates sent alongside
    /// are synthetic; the angle is what the server uses.
    pub async fn set_angle(&self, degrees: f64) -> bool {
        let Some(conn) = self.connection().await else {
            return false;
        };
        let (x, y) = AIM_ANCHOR;
        conn.send_aim(x, y, Some(degrees.floor() as i64)).await
    }

    /// Faces a target player. With `predict` the aim leads the target:
    /// its position is advanced along its velocity in proportion to the
    /// current distance.
    pub async fn look_at(&self, target: &Player, predict: bool) -> bool {
        let Some(local) = self.local_player().await else {
            return false;
        };
        let Some(conn) = self.connection().await else {
            return false;
        };
        let mut tx = target.x as f64;
        let mut ty = target.y as f64;
        if predict {
            let dist =
                (target.distance_sq(local.x, local.y) as f64).sqrt();
            tx += target.speed_x as f64 * dist * LEAD_PER_DISTANCE;
            ty += target.speed_y as f64 * dist * LEAD_PER_DISTANCE;
        }
        // Bearing from us to the target, in the wire's convention: the
        // atan2 runs target-to-self and the half-turn offset flips it
        // back, landing in 0..=360.
        let angle = ((local.y as f64 - ty)
            .atan2(local.x as f64 - tx)
            .to_degrees()
            + 180.0)
            .floor() as i64;
        let (x, y) = AIM_ANCHOR;
        conn.send_aim(x, y, Some(angle)).await
    }

    /// One trigger pull (auto-released).
    pub async fn shoot(&self) -> bool {
        match self.connection().await {
            Some(conn) => conn.press_key(InputId::Fire).await,
            None => false,
        }
    }

    /// Holds the trigger until [`Client::stop_shoot`].
    pub async fn start_shoot(&self) -> bool {
        match self.connection().await {
            Some(conn) => conn.send_key(InputId::Fire, true).await,
            None => false,
        }
    }

    pub async fn stop_shoot(&self) -> bool {
        match self.connection().await {
            Some(conn) => conn.send_key(InputId::Fire, false).await,
            None => false,
        }
    }

    /// Faces the target (with lead) and pulls the trigger. Two separate
    /// commands; the server may interleave other traffic between them,
    /// and the trigger is pulled even when the aim was refused.
    pub async fn shoot_at(&self, target: &Player) -> bool {
        let aimed = self.look_at(target, true).await;
        let fired = self.shoot().await;
        aimed && fired
    }

    pub async fn reload(&self) -> bool {
        match self.connection().await {
            Some(conn) => conn.press_key(InputId::Reload).await,
            None => false,
        }
    }

    pub async fn use_skill(&self) -> bool {
        match self.connection().await {
            Some(conn) => conn.press_key(InputId::Skill).await,
            None => false,
        }
    }

    pub async fn chat(&self, message: &str) -> bool {
        match self.connection().await {
            Some(conn) => conn.send_chat(message).await,
            None => false,
        }
    }

    // --- Internal ---------------------------------------------------------

    fn emit(&self, event: ClientEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Restarts from a background task so the pump that noticed the
    /// trigger is never the task being aborted.
    fn spawn_restart(&self, cause: &'static str) {
        let client = self.clone();
        tokio::spawn(async move {
            tracing::info!(cause, "restarting client");
            if let Err(e) = client.restart().await {
                tracing::warn!(error = %e, "restart failed");
            }
        });
    }

    async fn handle_frame(&self, frame: ServerEvent) {
        // Snapshot the record a removal is about to drop.
        let removed = match &frame {
            ServerEvent::RemovePlayer { id } => {
                self.inner.store.lock().await.player(*id).cloned()
            }
            _ => None,
        };

        {
            let mut store = self.inner.store.lock().await;
            store.apply(&frame);
        }

        match frame {
            ServerEvent::SetupLocalPlayer(update) => {
                if let Some(id) = update.id {
                    if let Some(player) =
                        self.inner.store.lock().await.player(id).cloned()
                    {
                        self.emit(ClientEvent::AddLocalPlayer(player));
                    }
                }
            }
            ServerEvent::SetupPlayer(update) => {
                if let Some(id) = update.id {
                    if let Some(player) =
                        self.inner.store.lock().await.player(id).cloned()
                    {
                        self.emit(ClientEvent::AddPlayer(player));
                    }
                }
            }
            ServerEvent::RemovePlayer { .. } => {
                if let Some(player) = removed {
                    self.emit(ClientEvent::RemovePlayer(player));
                }
            }
            ServerEvent::Died { killer } => {
                tracing::info!(%killer, "local player died");
                self.emit(ClientEvent::Died { killer });
                if self.inner.config.restart_on_death {
                    self.spawn_restart("death");
                }
            }
            ServerEvent::LevelUp { level } => {
                self.auto_upgrade(level).await;
            }
            ServerEvent::ServerFull => {
                tracing::warn!("server is full");
            }
            _ => {}
        }
    }

    /// Spends the level-up on the configured skill for this level, at
    /// most once per level reached.
    async fn auto_upgrade(&self, level: i64) {
        let mut upgraded_to = self.inner.upgraded_to.lock().await;
        if level <= *upgraded_to {
            return;
        }
        // Reaching level N buys the skill configured at index N - 1.
        let Some(&skill) = usize::try_from(level - 1)
            .ok()
            .and_then(|i| self.inner.config.skills.get(i))
        else {
            return;
        };
        *upgraded_to = level;
        drop(upgraded_to);

        if let Some(conn) = self.connection().await {
            if conn.send_upgrade(skill, level).await {
                tracing::debug!(level, ?skill, "auto-upgrade");
            }
        }
    }
}

/// Turns connection events into store merges and client events.
async fn pump(client: Client, mut conn_events: ConnectionEvents) {
    while let Some(event) = conn_events.recv().await {
        match event {
            ConnectionEvent::Connected => {
                client.emit(ClientEvent::Connected);
                if client.inner.config.auto_join && !client.join().await {
                    tracing::warn!("auto-join failed");
                }
            }
            ConnectionEvent::Disconnected => {
                client.emit(ClientEvent::Disconnected);
                if client.inner.config.restart_on_disconnect {
                    client.spawn_restart("disconnect");
                } else {
                    // Release the lifecycle slot so a later start() is
                    // not refused as AlreadyStarted. Torn down from a
                    // separate task; a pump never aborts itself.
                    let client = client.clone();
                    tokio::spawn(async move {
                        if let Err(e) = client.stop().await {
                            tracing::debug!(error = %e, "post-disconnect teardown");
                        }
                    });
                }
                break;
            }
            ConnectionEvent::LatencySample(ms) => {
                *client.inner.latency.lock().await = Some(ms);
            }
            ConnectionEvent::Server(frame) => {
                client.handle_frame(frame).await;
            }
            ConnectionEvent::TransportError(reason) => {
                tracing::warn!(%reason, "transport error");
            }
        }
    }
}

/// Housekeeping heartbeat: expires chat lines and emits `Tick` while the
/// game is connected.
async fn tick_loop(client: Client, connection: Connection) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(
        tokio::time::MissedTickBehavior::Delay,
    );
    loop {
        ticker.tick().await;
        client.inner.store.lock().await.expire_chat(Instant::now());
        if connection.is_connected() {
            client.emit(ClientEvent::Tick);
        }
    }
}
