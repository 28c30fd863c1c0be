//! The entity store: merges sparse server frames into player records.
//!
//! # Concurrency note
//!
//! `PlayerStore` is NOT thread-safe by itself. It is owned by the client's
//! event pump and shared behind a mutex at a higher level; keeping it a
//! plain `HashMap` avoids hidden locking here.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use gatsling_protocol::{
    guest_name, LeaderboardEntry, PlayerUpdate, ServerEvent, NAME_SENTINEL,
};

use crate::Player;

/// How long a chat line stays attached to a player.
pub const CHAT_TTL: Duration = Duration::from_secs(5);

/// Side effects of applying one frame, beyond the field merges themselves.
///
/// These carry information the raw frame does not: a death is an *edge*
/// (hp crossing to zero, visible only against the previous record), and a
/// move or chat line names which stored player changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A tracked player's hp crossed from positive to zero or below.
    Died { id: i64 },
    /// A tracked player's position changed.
    Moved { id: i64 },
    /// A tracked player said something.
    Chat { id: i64, message: String },
}

/// All players currently in view, plus local-only counters.
#[derive(Debug, Default)]
pub struct PlayerStore {
    players: HashMap<i64, Player>,
    local_id: Option<i64>,
    /// Local score and kill counters from the resource frame.
    pub score: i64,
    pub kills: i64,
    /// Map side length, if the server announced one.
    pub map_size: Option<i64>,
    /// Total players on the server per the latest leaderboard frame.
    pub player_count: i64,
    /// Latest leaderboard, raw as received.
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one decoded frame. Frames that do not touch player state
    /// fall through untouched.
    pub fn apply(&mut self, event: &ServerEvent) -> Vec<StoreEvent> {
        let mut out = Vec::new();
        match event {
            ServerEvent::SetupLocalPlayer(update) => {
                if let Some(id) = update.id {
                    self.local_id = Some(id);
                    self.upsert(id, update, &mut out);
                }
            }
            ServerEvent::SetupPlayer(update) => {
                if let Some(id) = update.id {
                    self.upsert(id, update, &mut out);
                }
            }
            ServerEvent::UpdatePlayer(update) => {
                // Deltas for players we never saw a setup frame for are
                // dropped; there is nothing meaningful to merge into.
                if let Some(id) = update.id {
                    if let Some(player) = self.players.get_mut(&id) {
                        merge(player, update, &mut out);
                    } else {
                        tracing::debug!(id, "delta for unknown player");
                    }
                }
            }
            ServerEvent::RemovePlayer { id } => {
                self.players.remove(id);
            }
            ServerEvent::UpdateLocalResources(update) => {
                if let Some(score) = update.score {
                    self.score = score;
                }
                if let Some(kills) = update.kills {
                    self.kills = kills;
                }
                if let Some(player) = self.local_player_mut() {
                    if let Some(bullets) = update.bullets {
                        player.bullets = bullets;
                    }
                    if let Some(max_bullets) = update.max_bullets {
                        player.max_bullets = max_bullets;
                    }
                }
            }
            ServerEvent::MapSize(size) => {
                self.map_size = Some(*size);
            }
            ServerEvent::LevelUp { level } => {
                if let Some(player) = self.local_player_mut() {
                    player.level = *level;
                }
            }
            ServerEvent::Leaderboard {
                player_count,
                entries,
            } => {
                self.player_count = *player_count;
                self.leaderboard = entries.clone();
            }
            _ => {}
        }
        out
    }

    /// Drops every chat line whose display window has passed.
    pub fn expire_chat(&mut self, now: Instant) {
        for player in self.players.values_mut() {
            if let Some(deadline) = player.chat_deadline {
                if now >= deadline {
                    player.chat_message = None;
                    player.chat_deadline = None;
                }
            }
        }
    }

    fn upsert(
        &mut self,
        id: i64,
        update: &PlayerUpdate,
        out: &mut Vec<StoreEvent>,
    ) {
        let player =
            self.players.entry(id).or_insert_with(|| Player::new(id));
        merge(player, update, out);
    }

    // --- Queries ----------------------------------------------------------

    pub fn local_id(&self) -> Option<i64> {
        self.local_id
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.get(&self.local_id?)
    }

    pub fn local_player_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(&self.local_id?)
    }

    pub fn player(&self, id: i64) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players that are fair targets: not us, and not on our team
    /// (team 0 is free-for-all, so a shared zero team is still hostile).
    /// Dead players are included; callers that only want the living pass
    /// that through [`PlayerStore::enemies_where`].
    pub fn enemies(&self) -> impl Iterator<Item = &Player> {
        let local_id = self.local_id;
        let local_team =
            self.local_player().map(|p| p.team).unwrap_or_default();
        self.players.values().filter(move |p| {
            Some(p.id) != local_id
                && (p.team == 0 || p.team != local_team)
        })
    }

    /// [`PlayerStore::enemies`] narrowed by a caller predicate.
    pub fn enemies_where<'a, F>(
        &'a self,
        predicate: F,
    ) -> impl Iterator<Item = &'a Player>
    where
        F: Fn(&Player) -> bool + 'a,
    {
        self.enemies().filter(move |p| predicate(p))
    }

    /// The nearest enemy to the local player.
    ///
    /// On an exact distance tie the enemy scanned later wins; scan order
    /// follows the map's iteration order and is not otherwise specified.
    pub fn closest_enemy(&self) -> Option<&Player> {
        self.closest_enemy_where(|_| true)
    }

    /// Nearest enemy passing the predicate.
    pub fn closest_enemy_where<'a, F>(
        &'a self,
        predicate: F,
    ) -> Option<&'a Player>
    where
        F: Fn(&Player) -> bool + 'a,
    {
        let local = self.local_player()?;
        let (x, y) = (local.x, local.y);
        let mut best: Option<(&Player, i64)> = None;
        for enemy in self.enemies_where(predicate) {
            let d = enemy.distance_sq(x, y);
            match best {
                Some((_, best_d)) if d > best_d => {}
                _ => best = Some((enemy, d)),
            }
        }
        best.map(|(p, _)| p)
    }
}

/// Applies every present field of a sparse update to a player record,
/// reporting hp death edges, movement and chat as store events.
fn merge(player: &mut Player, u: &PlayerUpdate, out: &mut Vec<StoreEvent>) {
    // The death edge must be judged against the pre-merge record.
    if let Some(hp) = u.hp {
        if hp <= 0 && player.hp > 0 {
            out.push(StoreEvent::Died { id: player.id });
        }
    }
    let moved = matches!(u.x, Some(x) if x != player.x)
        || matches!(u.y, Some(y) if y != player.y);

    macro_rules! set {
        ($field:ident) => {
            if let Some(v) = u.$field {
                player.$field = v;
            }
        };
    }
    macro_rules! set_flag {
        ($field:ident) => {
            if let Some(v) = u.$field {
                player.$field = v != 0;
            }
        };
    }

    set!(x);
    set!(y);
    set!(speed_x);
    set!(speed_y);
    set!(angle);
    set!(radius);
    set!(hp);
    set!(hp_max);
    set!(weapon);
    set!(armor);
    set!(armor_amount);
    set!(color);
    set!(bullets);
    set!(max_bullets);
    set!(team);
    set!(cam_width);
    set!(cam_height);
    set!(map_width);
    set!(map_height);
    set_flag!(invincible);
    set_flag!(is_leader);
    set_flag!(is_premium);
    set_flag!(shooting);
    set_flag!(reloading);
    set_flag!(being_hit);
    set_flag!(ghillie);
    set_flag!(dashing);
    set_flag!(chat_box_open);

    if let Some(name) = &u.name {
        player.name = resolve_name(player.id, name);
    }
    if let Some(message) = &u.chat_message {
        player.chat_message = Some(message.clone());
        player.chat_deadline = Some(Instant::now() + CHAT_TTL);
        out.push(StoreEvent::Chat {
            id: player.id,
            message: message.clone(),
        });
    }

    if moved {
        out.push(StoreEvent::Moved { id: player.id });
    }
}

/// A name starting with the placeholder sentinel is replaced with the
/// deterministic guest name for this player id.
fn resolve_name(id: i64, raw: &str) -> String {
    if raw.starts_with(NAME_SENTINEL) {
        guest_name(id).to_owned()
    } else {
        raw.to_owned()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gatsling_protocol::FALLBACK_NAME;

    // --- Helpers ----------------------------------------------------------

    fn setup_local(id: i64, x: i64, y: i64) -> ServerEvent {
        ServerEvent::SetupLocalPlayer(PlayerUpdate {
            id: Some(id),
            x: Some(x),
            y: Some(y),
            hp: Some(100),
            name: Some("local".to_owned()),
            ..PlayerUpdate::default()
        })
    }

    fn setup_remote(id: i64, x: i64, y: i64) -> ServerEvent {
        ServerEvent::SetupPlayer(PlayerUpdate {
            id: Some(id),
            x: Some(x),
            y: Some(y),
            hp: Some(100),
            ..PlayerUpdate::default()
        })
    }

    fn delta(update: PlayerUpdate) -> ServerEvent {
        ServerEvent::UpdatePlayer(update)
    }

    // =====================================================================
    // apply() — setup and merge
    // =====================================================================

    #[test]
    fn test_apply_local_setup_records_local_id() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(7, 10, 20));

        assert_eq!(store.local_id(), Some(7));
        let local = store.local_player().expect("local player stored");
        assert_eq!((local.x, local.y), (10, 20));
        assert_eq!(local.name, "local");
    }

    #[test]
    fn test_apply_sparse_delta_preserves_unsent_fields() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 5, 5));

        // A delta carrying only bullets must not clobber position or hp.
        store.apply(&delta(PlayerUpdate {
            id: Some(3),
            bullets: Some(12),
            ..PlayerUpdate::default()
        }));

        let p = store.player(3).expect("player kept");
        assert_eq!(p.bullets, 12);
        assert_eq!((p.x, p.y), (5, 5));
        assert_eq!(p.hp, 100);
    }

    #[test]
    fn test_apply_delta_for_unknown_player_is_dropped() {
        let mut store = PlayerStore::new();
        let events = store.apply(&delta(PlayerUpdate {
            id: Some(42),
            x: Some(1),
            ..PlayerUpdate::default()
        }));

        assert!(events.is_empty());
        assert!(store.player(42).is_none());
    }

    #[test]
    fn test_apply_remove_forgets_player() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));
        store.apply(&ServerEvent::RemovePlayer { id: 3 });

        assert!(store.player(3).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_apply_flag_fields_decode_as_booleans() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));
        store.apply(&delta(PlayerUpdate {
            id: Some(3),
            shooting: Some(1),
            invincible: Some(0),
            ..PlayerUpdate::default()
        }));

        let p = store.player(3).unwrap();
        assert!(p.shooting);
        assert!(!p.invincible);
    }

    // =====================================================================
    // Name resolution
    // =====================================================================

    #[test]
    fn test_sentinel_name_resolves_to_guest_table() {
        let mut store = PlayerStore::new();
        store.apply(&ServerEvent::SetupPlayer(PlayerUpdate {
            id: Some(4),
            name: Some("#".to_owned()),
            ..PlayerUpdate::default()
        }));

        assert_eq!(store.player(4).unwrap().name, "Guest Bear");
    }

    #[test]
    fn test_sentinel_name_out_of_table_uses_fallback() {
        let mut store = PlayerStore::new();
        store.apply(&ServerEvent::SetupPlayer(PlayerUpdate {
            id: Some(500),
            name: Some("#".to_owned()),
            ..PlayerUpdate::default()
        }));

        assert_eq!(store.player(500).unwrap().name, FALLBACK_NAME);
    }

    #[test]
    fn test_plain_name_is_kept_verbatim() {
        let mut store = PlayerStore::new();
        store.apply(&ServerEvent::SetupPlayer(PlayerUpdate {
            id: Some(4),
            name: Some("slayer".to_owned()),
            ..PlayerUpdate::default()
        }));

        assert_eq!(store.player(4).unwrap().name, "slayer");
    }

    // =====================================================================
    // Death edges
    // =====================================================================

    #[test]
    fn test_hp_crossing_zero_emits_died_once() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));

        let events = store.apply(&delta(PlayerUpdate {
            id: Some(3),
            hp: Some(0),
            ..PlayerUpdate::default()
        }));
        assert!(events.contains(&StoreEvent::Died { id: 3 }));

        // Already dead; a second zero-hp frame is not another edge.
        let events = store.apply(&delta(PlayerUpdate {
            id: Some(3),
            hp: Some(0),
            ..PlayerUpdate::default()
        }));
        assert!(!events.contains(&StoreEvent::Died { id: 3 }));
    }

    #[test]
    fn test_absent_hp_is_not_a_death() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));

        let events = store.apply(&delta(PlayerUpdate {
            id: Some(3),
            x: Some(9),
            ..PlayerUpdate::default()
        }));

        assert!(!events.contains(&StoreEvent::Died { id: 3 }));
        assert!(store.player(3).unwrap().is_alive());
    }

    // =====================================================================
    // Movement and chat events
    // =====================================================================

    #[test]
    fn test_position_change_emits_moved() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));

        let events = store.apply(&delta(PlayerUpdate {
            id: Some(3),
            x: Some(50),
            ..PlayerUpdate::default()
        }));
        assert!(events.contains(&StoreEvent::Moved { id: 3 }));

        // Same coordinates again: no movement.
        let events = store.apply(&delta(PlayerUpdate {
            id: Some(3),
            x: Some(50),
            y: Some(0),
            ..PlayerUpdate::default()
        }));
        assert!(!events.contains(&StoreEvent::Moved { id: 3 }));
    }

    #[test]
    fn test_chat_message_sets_deadline_and_emits() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));

        let events = store.apply(&delta(PlayerUpdate {
            id: Some(3),
            chat_message: Some("hi there".to_owned()),
            ..PlayerUpdate::default()
        }));

        assert!(events.contains(&StoreEvent::Chat {
            id: 3,
            message: "hi there".to_owned()
        }));
        let p = store.player(3).unwrap();
        assert_eq!(p.chat_message.as_deref(), Some("hi there"));
        assert!(p.chat_deadline.is_some());
    }

    #[test]
    fn test_expire_chat_clears_only_past_deadlines() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));
        store.apply(&delta(PlayerUpdate {
            id: Some(3),
            chat_message: Some("fading".to_owned()),
            ..PlayerUpdate::default()
        }));

        // Before the deadline the line stays.
        store.expire_chat(Instant::now());
        assert!(store.player(3).unwrap().chat_message.is_some());

        // At/after the deadline it is physically cleared.
        store.expire_chat(Instant::now() + CHAT_TTL);
        let p = store.player(3).unwrap();
        assert!(p.chat_message.is_none());
        assert!(p.chat_deadline.is_none());
    }

    #[test]
    fn test_newer_chat_line_refreshes_deadline() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(3, 0, 0));
        store.apply(&delta(PlayerUpdate {
            id: Some(3),
            chat_message: Some("first".to_owned()),
            ..PlayerUpdate::default()
        }));
        let first = store.player(3).unwrap().chat_deadline;

        store.apply(&delta(PlayerUpdate {
            id: Some(3),
            chat_message: Some("second".to_owned()),
            ..PlayerUpdate::default()
        }));
        let second = store.player(3).unwrap().chat_deadline;

        assert_eq!(
            store.player(3).unwrap().chat_message.as_deref(),
            Some("second")
        );
        assert!(second >= first);
    }

    // =====================================================================
    // Resources, map size, leaderboard
    // =====================================================================

    #[test]
    fn test_resources_update_local_counters() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));

        store.apply(&ServerEvent::UpdateLocalResources(
            gatsling_protocol::ResourceUpdate {
                bullets: Some(7),
                score: Some(1200),
                kills: Some(3),
                ..Default::default()
            },
        ));

        assert_eq!(store.score, 1200);
        assert_eq!(store.kills, 3);
        assert_eq!(store.local_player().unwrap().bullets, 7);
    }

    #[test]
    fn test_leaderboard_replaces_previous_snapshot() {
        let mut store = PlayerStore::new();
        store.apply(&ServerEvent::Leaderboard {
            player_count: 9,
            entries: vec![LeaderboardEntry {
                id: "1".into(),
                ..Default::default()
            }],
        });
        store.apply(&ServerEvent::Leaderboard {
            player_count: 4,
            entries: vec![],
        });

        assert_eq!(store.player_count, 4);
        assert!(store.leaderboard.is_empty());
    }

    // =====================================================================
    // Targeting
    // =====================================================================

    #[test]
    fn test_enemies_excludes_self_but_not_the_dead() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));
        store.apply(&setup_remote(2, 10, 0));
        store.apply(&setup_remote(3, 20, 0));
        store.apply(&delta(PlayerUpdate {
            id: Some(3),
            hp: Some(0),
            ..PlayerUpdate::default()
        }));

        // Aliveness is not an exclusion here; a caller that wants only
        // living targets narrows with a predicate.
        let mut ids: Vec<i64> = store.enemies().map(|p| p.id).collect();
        ids.sort();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_closest_enemy_considers_dead_players() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));
        store.apply(&setup_remote(2, 5, 0));
        store.apply(&setup_remote(3, 100, 0));
        store.apply(&delta(PlayerUpdate {
            id: Some(2),
            hp: Some(0),
            ..PlayerUpdate::default()
        }));

        assert_eq!(store.closest_enemy().map(|p| p.id), Some(2));
        // The living filter is the caller's to apply.
        let id = store
            .closest_enemy_where(|p| p.is_alive())
            .map(|p| p.id);
        assert_eq!(id, Some(3));
    }

    #[test]
    fn test_enemies_excludes_same_nonzero_team() {
        let mut store = PlayerStore::new();
        store.apply(&ServerEvent::SetupLocalPlayer(PlayerUpdate {
            id: Some(1),
            hp: Some(100),
            team: Some(2),
            ..PlayerUpdate::default()
        }));
        store.apply(&ServerEvent::SetupPlayer(PlayerUpdate {
            id: Some(2),
            hp: Some(100),
            team: Some(2),
            ..PlayerUpdate::default()
        }));
        store.apply(&ServerEvent::SetupPlayer(PlayerUpdate {
            id: Some(3),
            hp: Some(100),
            team: Some(1),
            ..PlayerUpdate::default()
        }));

        let ids: Vec<i64> = store.enemies().map(|p| p.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_enemies_in_free_for_all_shared_zero_team_is_hostile() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));
        store.apply(&setup_remote(2, 10, 0));

        assert_eq!(store.enemies().count(), 1);
    }

    #[test]
    fn test_closest_enemy_picks_minimum_distance() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));
        store.apply(&setup_remote(2, 100, 0));
        store.apply(&setup_remote(3, 10, 0));
        store.apply(&setup_remote(4, 50, 0));

        assert_eq!(store.closest_enemy().map(|p| p.id), Some(3));
    }

    #[test]
    fn test_closest_enemy_where_applies_predicate() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));
        store.apply(&setup_remote(2, 10, 0));
        store.apply(&setup_remote(3, 20, 0));

        let id = store
            .closest_enemy_where(|p| p.id != 2)
            .map(|p| p.id);
        assert_eq!(id, Some(3), "predicate must exclude the nearest");
    }

    #[test]
    fn test_level_up_sets_local_level() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));
        store.apply(&ServerEvent::LevelUp { level: 3 });

        assert_eq!(store.local_player().unwrap().level, 3);
    }

    #[test]
    fn test_closest_enemy_none_without_local_player() {
        let mut store = PlayerStore::new();
        store.apply(&setup_remote(2, 10, 0));

        assert!(store.closest_enemy().is_none());
    }

    #[test]
    fn test_closest_enemy_tie_still_yields_some_candidate() {
        let mut store = PlayerStore::new();
        store.apply(&setup_local(1, 0, 0));
        store.apply(&setup_remote(2, 10, 0));
        store.apply(&setup_remote(3, -10, 0));

        // Equidistant; which one wins is unspecified, but one must win.
        let id = store.closest_enemy().map(|p| p.id);
        assert!(id == Some(2) || id == Some(3));
    }
}
