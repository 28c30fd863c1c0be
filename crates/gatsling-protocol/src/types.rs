//! Core wire types: commands, decoded events, and the game's fixed
//! enumerations.
//!
//! Inbound frames are *sparse*: any positional field may be absent, and
//! absent never means zero. The decoded structs therefore carry `Option`
//! for every field, and the merge layer only applies what is present.

// ---------------------------------------------------------------------------
// Fixed game enumerations
// ---------------------------------------------------------------------------

/// Input identifiers used by the `k` key command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputId {
    /// Move left.
    Left = 0,
    /// Move right.
    Right = 1,
    /// Move up.
    Up = 2,
    /// Move down.
    Down = 3,
    /// Reload the current weapon.
    Reload = 4,
    /// Trigger the equipped skill.
    Skill = 5,
    /// Fire.
    Fire = 6,
}

impl InputId {
    /// The wire code for this input.
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Primary weapons selectable at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weapon {
    #[default]
    Pistol = 0,
    Smg = 1,
    Shotgun = 2,
    Assault = 3,
    Sniper = 4,
    Lmg = 5,
}

/// Armor tiers selectable at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Armor {
    #[default]
    None = 0,
    Light = 1,
    Medium = 2,
    Heavy = 3,
}

/// Player colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Red = 0,
    Orange = 1,
    Yellow = 2,
    Green = 3,
    Blue = 4,
    Purple = 5,
}

/// Upgradable skills, one pickable per level reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skill {
    Bipod = 0,
    Optics = 1,
    Thermal = 2,
    ArmorPiercing = 3,
    Extended = 4,
    Grip = 5,
    Silencer = 6,
    Lightweight = 7,
    LongRange = 8,
    ThickSkin = 9,
    Shield = 10,
    FirstAid = 11,
    Grenade = 12,
    Knife = 13,
    Engineer = 14,
    Ghillie = 15,
    Dash = 16,
    GasGrenade = 17,
    LandMine = 18,
    FragGrenade = 19,
}

// ---------------------------------------------------------------------------
// Outbound commands
// ---------------------------------------------------------------------------

/// An outbound command, encoded as `"<tag>,<arg1>,<arg2>,…"`.
///
/// Numeric arguments are rendered base-10. Text arguments have every
/// literal `,` replaced with `~` — a lossy substitution the server
/// imposes; the original text is not recoverable on the far side.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `k` — press (`down = true`) or release a key.
    Key { input: InputId, down: bool },
    /// `m` — aim at a point, with an explicit angle in degrees.
    /// The angle is authoritative; the coordinates may be synthetic.
    Aim { x: i64, y: i64, angle: i64 },
    /// `c` — chat message.
    Chat { message: String },
    /// `s` — loadout selection; doubles as the join request.
    Selection {
        weapon: Weapon,
        armor: Armor,
        color: Color,
    },
    /// `u` — spend a level-up on a skill.
    Upgrade { skill: Skill, level: i64 },
    /// `.` — keepalive probe.
    Keepalive,
    /// `q` — handshake continuation. The credential pair is a placeholder
    /// an integrator may replace with a solved anti-automation challenge.
    Handshake { token: String, time: String },
}

// ---------------------------------------------------------------------------
// Decoded inbound frames
// ---------------------------------------------------------------------------

/// Sparse per-player state carried by the `a`, `b`, `c` and `d` frames.
///
/// Only fields present on the wire are `Some`; everything else must be
/// left untouched by whoever merges this into a player record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerUpdate {
    pub id: Option<i64>,
    pub weapon: Option<i64>,
    pub color: Option<i64>,
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub speed_x: Option<i64>,
    pub speed_y: Option<i64>,
    pub radius: Option<i64>,
    pub angle: Option<i64>,
    pub armor: Option<i64>,
    pub armor_amount: Option<i64>,
    pub bullets: Option<i64>,
    pub max_bullets: Option<i64>,
    pub hp: Option<i64>,
    pub hp_max: Option<i64>,
    pub cam_width: Option<i64>,
    pub cam_height: Option<i64>,
    pub map_width: Option<i64>,
    pub map_height: Option<i64>,
    pub name: Option<String>,
    pub invincible: Option<i64>,
    pub is_leader: Option<i64>,
    pub is_premium: Option<i64>,
    pub team: Option<i64>,
    pub shooting: Option<i64>,
    pub reloading: Option<i64>,
    pub being_hit: Option<i64>,
    pub ghillie: Option<i64>,
    pub dashing: Option<i64>,
    pub chat_box_open: Option<i64>,
    pub chat_message: Option<String>,
}

/// Sparse local-player resource counters carried by the `f` frame.
/// The frame has no id — it always refers to the local player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceUpdate {
    pub bullets: Option<i64>,
    pub score: Option<i64>,
    pub kills: Option<i64>,
    pub recharge_timer: Option<i64>,
    pub max_bullets: Option<i64>,
    pub camera: Option<i64>,
    pub thermal: Option<i64>,
    pub explosives_left: Option<i64>,
}

/// One leaderboard row from the `v` frame.
///
/// The sub-record is `.`-delimited on the wire. The fields are kept as
/// raw strings: unlike every other frame type the server never promised
/// these positions are numeric, and the original client stored them
/// verbatim. Flagged rather than silently normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub id: String,
    pub is_member: String,
    pub score: String,
    pub kills: String,
    pub team: String,
}

/// End-of-life match statistics from the `sta` frame (all sparse).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchStatistics {
    pub score: Option<i64>,
    pub kills: Option<i64>,
    pub time: Option<i64>,
    pub shots_fired: Option<i64>,
    pub shots_hit: Option<i64>,
    pub damage_dealt: Option<i64>,
    pub damage_received: Option<i64>,
    pub distance_covered: Option<i64>,
    pub shooter_name: Option<String>,
    pub shooter_is_premium: Option<i64>,
    pub shooter_weapon: Option<i64>,
    pub shooter_armor: Option<i64>,
    pub shooter_color: Option<i64>,
    pub shooter_kills: Option<i64>,
    pub shooter_score: Option<i64>,
    pub shooter_hp: Option<i64>,
    pub shooter_armor_amount: Option<i64>,
    pub shooter_level1_powerup: Option<i64>,
    pub shooter_level2_powerup: Option<i64>,
    pub shooter_level3_powerup: Option<i64>,
}

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// `+` — the server's greeting; triggers the handshake continuation.
    Welcome,
    /// `.` — reply to our keepalive probe.
    KeepaliveReply,
    /// `gameType` — which mode this server runs.
    GameType(String),
    /// `sz` — map side length.
    MapSize(i64),
    /// `full` — the server refused us; it is at capacity.
    ServerFull,
    /// `a` — initial state of *our* player.
    SetupLocalPlayer(PlayerUpdate),
    /// `d` — initial state of a remote player.
    SetupPlayer(PlayerUpdate),
    /// `b` / `c` — position or status delta for any player.
    UpdatePlayer(PlayerUpdate),
    /// `f` — local resource counters.
    UpdateLocalResources(ResourceUpdate),
    /// `e` — a player left our view.
    RemovePlayer { id: i64 },
    /// `p` — the local player reached a new level.
    LevelUp { level: i64 },
    /// `v` — player count plus the current leaderboard.
    Leaderboard {
        player_count: i64,
        entries: Vec<LeaderboardEntry>,
    },
    /// `r` sub-type 1 — we killed someone.
    Killed { victim: String },
    /// `r` sub-type 2 — we died.
    Died { killer: String },
    /// `r` sub-type 3 — we dealt damage.
    DealtDamage { amount: i64 },
    /// `sta` — end-of-life statistics screen.
    Statistics(MatchStatistics),
    /// `x` — server-reported error.
    ServerError { message: String },
    /// `highScores` — all-time high-score table. The payload is JSON and
    /// the only non-positional frame the server sends; it is passed
    /// through verbatim for consumers to parse.
    HighScores { json: String },
    /// Anything we have no schema for. Logged as a diagnostic only.
    Unknown { tag: String },
}
