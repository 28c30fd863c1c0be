//! The swarm controller: many bots, one owner.
//!
//! A [`Swarm`] is caller-owned; nothing here is process-global, so two
//! swarms in one process stay independent. Each bot gets an event-drain
//! task plus three decision loops (attack, ability, chat). Decision
//! loops only ever read snapshots and issue guarded actions, so a bot
//! whose connection died degrades to no-ops until its own restart policy
//! brings it back.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use gatsling_client::{
    Client, ClientConfig, ClientEvent, ClientEvents,
};
use gatsling_protocol::{Armor, Color, Skill, Weapon};

use crate::{GatslingError, ServerDirectory};

/// How a swarm is sized, armed and scheduled.
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Number of bots.
    pub size: usize,
    /// Only servers running this mode are used.
    pub game_type: String,
    /// Where idle bots head when no enemy is in view.
    pub rally_point: (i64, i64),
    /// Loadout shared by every bot.
    pub weapon: Weapon,
    pub armor: Armor,
    pub color: Color,
    pub skills: Vec<Skill>,
    /// Lines bots pick from at random; empty disables chatter.
    pub chat_lines: Vec<String>,
    pub attack_interval: Duration,
    pub ability_interval: Duration,
    pub chat_interval: Duration,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            size: 30,
            game_type: "ffa".to_owned(),
            rally_point: (35000, 35000),
            weapon: Weapon::default(),
            armor: Armor::default(),
            color: Color::default(),
            skills: Vec::new(),
            chat_lines: Vec::new(),
            attack_interval: Duration::from_millis(200),
            ability_interval: Duration::from_millis(1000),
            chat_interval: Duration::from_millis(2000),
        }
    }
}

struct Running {
    clients: Arc<Vec<Client>>,
    tasks: Vec<JoinHandle<()>>,
}

/// A fleet of bots sharing one configuration.
pub struct Swarm {
    config: SwarmConfig,
    running: Mutex<Option<Running>>,
}

impl Swarm {
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    /// Whether the swarm currently has bots and decision tasks up.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Number of bots in the running swarm.
    pub async fn client_count(&self) -> usize {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|r| r.clients.len())
            .unwrap_or(0)
    }

    /// Brings the swarm up against servers from the directory.
    ///
    /// Idempotent: returns `Ok(false)` when already running. Bots are
    /// spread round-robin over every server matching the configured game
    /// type. A bot that fails to connect is kept; its restart policy
    /// retries on its own and the rest of the swarm is unaffected.
    pub async fn start(
        &self,
        directory: &impl ServerDirectory,
    ) -> Result<bool, GatslingError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(false);
        }

        let servers: Vec<_> = directory
            .servers()
            .await
            .into_iter()
            .filter(|s| s.game_type == self.config.game_type)
            .collect();
        if servers.is_empty() {
            return Err(GatslingError::NoServer(
                self.config.game_type.clone(),
            ));
        }

        let mut clients = Vec::with_capacity(self.config.size);
        let mut receivers = Vec::with_capacity(self.config.size);
        for i in 0..self.config.size {
            let server = &servers[i % servers.len()];
            let (client, events) =
                Client::new(self.client_config(&server.address));
            if let Err(e) = client.start().await {
                tracing::warn!(
                    bot = i,
                    server = %server.address,
                    error = %e,
                    "bot failed to connect"
                );
            }
            clients.push(client);
            receivers.push(events);
        }

        let clients = Arc::new(clients);
        let mut tasks = Vec::new();
        for (i, events) in receivers.into_iter().enumerate() {
            let client = clients[i].clone();
            tasks.push(tokio::spawn(drain_events(i, events)));
            tasks.push(tokio::spawn(attack_loop(
                client.clone(),
                Arc::clone(&clients),
                self.config.clone(),
            )));
            tasks.push(tokio::spawn(ability_loop(
                client.clone(),
                self.config.ability_interval,
            )));
            if !self.config.chat_lines.is_empty() {
                tasks.push(tokio::spawn(chat_loop(
                    client,
                    self.config.chat_lines.clone(),
                    self.config.chat_interval,
                )));
            }
        }

        tracing::info!(
            bots = clients.len(),
            servers = servers.len(),
            game_type = %self.config.game_type,
            "swarm started"
        );
        *running = Some(Running { clients, tasks });
        Ok(true)
    }

    /// Takes the swarm down: every decision task is cancelled, then every
    /// bot is stopped. Returns `false` when nothing was running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.running.lock().await.take() else {
            return false;
        };
        for task in running.tasks {
            task.abort();
        }
        for (i, client) in running.clients.iter().enumerate() {
            if let Err(e) = client.stop().await {
                // Bots that never connected report NotStarted; that is
                // the expected shape of an isolated failure.
                tracing::debug!(bot = i, error = %e, "bot stop");
            }
        }
        tracing::info!("swarm stopped");
        true
    }

    fn client_config(&self, address: &str) -> ClientConfig {
        let mut config = ClientConfig::new(address);
        config.weapon = self.config.weapon;
        config.armor = self.config.armor;
        config.color = self.config.color;
        config.skills = self.config.skills.clone();
        config.auto_join = true;
        config.restart_on_disconnect = true;
        config.restart_on_death = true;
        config
    }
}

/// Keeps a bot's event channel drained and surfaces the notable ones.
async fn drain_events(bot: usize, mut events: ClientEvents) {
    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::Connected => {
                tracing::info!(bot, "bot connected");
            }
            ClientEvent::Disconnected => {
                tracing::info!(bot, "bot disconnected");
            }
            ClientEvent::Died { killer } => {
                tracing::info!(bot, %killer, "bot died");
            }
            _ => {}
        }
    }
}

/// Every sibling's in-game id, so bots never target their own swarm.
async fn sibling_ids(clients: &[Client]) -> Vec<i64> {
    let mut ids = Vec::with_capacity(clients.len());
    for client in clients {
        if let Some(id) = client.local_player_id().await {
            ids.push(id);
        }
    }
    ids
}

/// Hunts the nearest non-swarm enemy, or rallies when there is none.
async fn attack_loop(
    client: Client,
    siblings: Arc<Vec<Client>>,
    config: SwarmConfig,
) {
    let mut ticker = tokio::time::interval(config.attack_interval);
    ticker.set_missed_tick_behavior(
        tokio::time::MissedTickBehavior::Delay,
    );
    loop {
        ticker.tick().await;
        if !client.connected().await {
            continue;
        }
        let exclude = sibling_ids(&siblings).await;
        match client.closest_enemy(&exclude).await {
            Some(target) => {
                client.move_to(target.x, target.y).await;
                client.shoot_at(&target).await;
            }
            None => {
                let (x, y) = config.rally_point;
                client.move_to(x, y).await;
            }
        }
    }
}

/// Fires the equipped skill on a fixed cadence.
async fn ability_loop(client: Client, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(
        tokio::time::MissedTickBehavior::Delay,
    );
    loop {
        ticker.tick().await;
        if client.connected().await {
            client.use_skill().await;
        }
    }
}

/// Says a random configured line on a fixed cadence.
async fn chat_loop(client: Client, lines: Vec<String>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(
        tokio::time::MissedTickBehavior::Delay,
    );
    loop {
        ticker.tick().await;
        if !client.connected().await {
            continue;
        }
        let line = {
            let mut rng = rand::rng();
            lines[rng.random_range(0..lines.len())].clone()
        };
        client.chat(&line).await;
    }
}

// =========================================================================
// Tests
// =========================================================================
