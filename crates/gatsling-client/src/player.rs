//! The in-memory record of one player, local or remote.

use std::time::Instant;

/// Everything the server has told us about a single player.
///
/// Built incrementally from sparse frames. Fields the server has not yet
/// sent keep their defaults, and a later sparse update only overwrites
/// the fields it actually carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Player {
    pub id: i64,
    /// Display name with the guest placeholder already resolved.
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub speed_x: i64,
    pub speed_y: i64,
    /// Facing, in degrees.
    pub angle: i64,
    pub radius: i64,
    pub hp: i64,
    pub hp_max: i64,
    pub weapon: i64,
    pub armor: i64,
    pub armor_amount: i64,
    pub color: i64,
    pub bullets: i64,
    pub max_bullets: i64,
    /// Local player only: current level from the level-up frame.
    pub level: i64,
    pub invincible: bool,
    pub is_leader: bool,
    pub is_premium: bool,
    pub team: i64,
    pub shooting: bool,
    pub reloading: bool,
    pub being_hit: bool,
    pub ghillie: bool,
    pub dashing: bool,
    pub chat_box_open: bool,
    /// Last chat line, until it expires.
    pub chat_message: Option<String>,
    /// When the current chat line stops being displayed.
    pub chat_deadline: Option<Instant>,
    /// Local player only: viewport and map dimensions from the setup frame.
    pub cam_width: i64,
    pub cam_height: i64,
    pub map_width: i64,
    pub map_height: i64,
}

impl Player {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// A player with zero or negative hp is dead. A freshly-seen player
    /// whose hp frame has not arrived yet also reads as dead.
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Squared distance to a point, in map units.
    pub fn distance_sq(&self, x: i64, y: i64) -> i64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}
