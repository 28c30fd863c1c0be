//! Encoding and decoding of the positional text wire format.
//!
//! Outbound commands are `"<tag>,<arg1>,<arg2>,…"`. Inbound payloads may
//! bundle several frames joined by `|`; each frame is comma-separated with
//! the tag first, and every later position maps to a field declared in
//! that tag's schema. An empty token means "field absent" — it is skipped,
//! never stored as an empty string or a zero.
//!
//! Field types are declared per position, not guessed from the token:
//! a schema-int position that fails to parse is a [`ProtocolError`].
//! Positions beyond a tag's schema are discarded.

use crate::{
    Command, LeaderboardEntry, MatchStatistics, PlayerUpdate, ProtocolError,
    ResourceUpdate, ServerEvent,
};

/// Joins bundled frames inside one transport payload.
pub const FRAME_DELIMITER: char = '|';

/// Separates the tag and positional values within a frame.
pub const ARG_SEPARATOR: char = ',';

/// Separates fields inside a leaderboard sub-record.
pub const SUB_SEPARATOR: char = '.';

/// Replacement for literal separators inside outbound text arguments.
pub const ARG_SUBSTITUTE: char = '~';

/// Prefix marking a placeholder name that must be resolved from the
/// guest-name table.
pub const NAME_SENTINEL: char = '#';

/// Inbound tags the protocol knows about but deliberately does not decode
/// (bullets, items, bombs, account plumbing). They are dropped without a
/// diagnostic; truly unknown tags surface as [`ServerEvent::Unknown`].
const IGNORED_TAGS: &[&str] = &[
    "g", "h", "i", "j", "k", "l", "m", "n", "o", "q", "s", "t", "w", "y",
    "z", "sq", "re", "reco",
];

/// Tag of the one frame whose payload is JSON rather than positional.
const HIGH_SCORES_TAG: &str = "highScores";

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

impl Command {
    /// Renders this command as one wire frame.
    pub fn encode(&self) -> String {
        match self {
            Command::Key { input, down } => {
                format!("k,{},{}", input.code(), i64::from(*down))
            }
            Command::Aim { x, y, angle } => format!("m,{x},{y},{angle}"),
            Command::Chat { message } => {
                format!("c,{}", escape_text(message))
            }
            Command::Selection {
                weapon,
                armor,
                color,
            } => {
                format!(
                    "s,{},{},{}",
                    *weapon as i64, *armor as i64, *color as i64
                )
            }
            Command::Upgrade { skill, level } => {
                format!("u,{},{level}", *skill as i64)
            }
            Command::Keepalive => ".".to_owned(),
            Command::Handshake { token, time } => {
                format!("q,{},{}", escape_text(token), escape_text(time))
            }
        }
    }
}

/// Replaces every literal argument separator in a text argument.
///
/// This is lossy by design: the wire format has no escaping, so `,`
/// becomes `~` and stays `~` on the far side.
pub fn escape_text(text: &str) -> String {
    text.replace(ARG_SEPARATOR, &ARG_SUBSTITUTE.to_string())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Splits one transport payload into frames and decodes each in arrival
/// order. Empty segments are dropped; frames the protocol deliberately
/// ignores produce nothing.
pub fn decode_payload(
    payload: &str,
) -> Vec<Result<ServerEvent, ProtocolError>> {
    payload
        .split(FRAME_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| decode_frame(segment).transpose())
        .collect()
}

/// Decodes a single frame. `Ok(None)` means a known-but-ignored tag.
pub fn decode_frame(
    frame: &str,
) -> Result<Option<ServerEvent>, ProtocolError> {
    let frame = frame.trim();
    // The high-score table is JSON, so its payload is full of commas
    // that must not be read as positional separators.
    if let Some(rest) = frame.strip_prefix(HIGH_SCORES_TAG) {
        if let Some(json) = rest.strip_prefix(ARG_SEPARATOR) {
            return Ok(Some(ServerEvent::HighScores {
                json: json.to_owned(),
            }));
        }
        if rest.is_empty() {
            return Ok(Some(ServerEvent::HighScores {
                json: String::new(),
            }));
        }
    }
    let mut parts = frame.split(ARG_SEPARATOR);
    let tag = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    let mut fields = FieldReader::new(tag, &args);

    let event = match tag {
        "+" => ServerEvent::Welcome,
        "." => ServerEvent::KeepaliveReply,
        "gameType" => {
            ServerEvent::GameType(fields.text().unwrap_or_default())
        }
        "sz" => ServerEvent::MapSize(fields.req_int("size")?),
        "full" => ServerEvent::ServerFull,
        "a" => ServerEvent::SetupLocalPlayer(decode_local_setup(&mut fields)?),
        "b" => ServerEvent::UpdatePlayer(decode_position(&mut fields)?),
        "c" => ServerEvent::UpdatePlayer(decode_status(&mut fields)?),
        "d" => ServerEvent::SetupPlayer(decode_remote_setup(&mut fields)?),
        "e" => ServerEvent::RemovePlayer {
            id: fields.req_int("id")?,
        },
        "f" => ServerEvent::UpdateLocalResources(decode_resources(&mut fields)?),
        "p" => ServerEvent::LevelUp {
            level: fields.req_int("level")?,
        },
        "v" => decode_leaderboard(&mut fields)?,
        "r" => decode_report(&mut fields)?,
        "sta" => ServerEvent::Statistics(decode_statistics(&mut fields)?),
        "x" => ServerEvent::ServerError {
            message: fields.text().unwrap_or_default(),
        },
        _ if IGNORED_TAGS.contains(&tag) => return Ok(None),
        _ => {
            tracing::debug!(tag, "unhandled frame tag");
            ServerEvent::Unknown {
                tag: tag.to_owned(),
            }
        }
    };

    Ok(Some(event))
}

/// Positional cursor over a frame's arguments.
///
/// Each call consumes one position. Absent or empty tokens yield `None`;
/// a non-empty token in an int position must parse as a base-10 `i64`.
struct FieldReader<'a> {
    tag: &'a str,
    args: &'a [&'a str],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(tag: &'a str, args: &'a [&'a str]) -> Self {
        Self { tag, args, pos: 0 }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let token = self.args.get(self.pos).copied();
        self.pos += 1;
        token
    }

    /// An optional integer field.
    fn int(
        &mut self,
        field: &'static str,
    ) -> Result<Option<i64>, ProtocolError> {
        match self.next_token() {
            None | Some("") => Ok(None),
            Some(token) => token.parse::<i64>().map(Some).map_err(|_| {
                ProtocolError::BadField {
                    tag: self.tag.to_owned(),
                    field,
                    value: token.to_owned(),
                }
            }),
        }
    }

    /// An integer field the tag cannot do without.
    fn req_int(&mut self, field: &'static str) -> Result<i64, ProtocolError> {
        self.int(field)?.ok_or_else(|| ProtocolError::InvalidFrame {
            tag: self.tag.to_owned(),
            reason: format!("missing required field '{field}'"),
        })
    }

    /// An optional text field.
    fn text(&mut self) -> Option<String> {
        match self.next_token() {
            None | Some("") => None,
            Some(token) => Some(token.to_owned()),
        }
    }

    /// Every remaining raw token (used by the leaderboard frame).
    fn rest(&mut self) -> &'a [&'a str] {
        let rest = &self.args[self.pos.min(self.args.len())..];
        self.pos = self.args.len();
        rest
    }
}

// --- Per-tag schemas -------------------------------------------------------

/// `a` — id,weapon,color,x,y,radius,angle,armorAmount,bullets,maxBullets,
/// armor,hp,camWidth,camHeight,hpMax,mapWidth,mapHeight,name,invincible,
/// isLeader,isPremium,team
fn decode_local_setup(
    f: &mut FieldReader<'_>,
) -> Result<PlayerUpdate, ProtocolError> {
    let mut u = PlayerUpdate::default();
    u.id = f.int("id")?;
    u.weapon = f.int("weapon")?;
    u.color = f.int("color")?;
    u.x = f.int("x")?;
    u.y = f.int("y")?;
    u.radius = f.int("radius")?;
    u.angle = f.int("angle")?;
    u.armor_amount = f.int("armorAmount")?;
    u.bullets = f.int("bullets")?;
    u.max_bullets = f.int("maxBullets")?;
    u.armor = f.int("armor")?;
    u.hp = f.int("hp")?;
    u.cam_width = f.int("camWidth")?;
    u.cam_height = f.int("camHeight")?;
    u.hp_max = f.int("hpMax")?;
    u.map_width = f.int("mapWidth")?;
    u.map_height = f.int("mapHeight")?;
    u.name = f.text();
    u.invincible = f.int("invincible")?;
    u.is_leader = f.int("isLeader")?;
    u.is_premium = f.int("isPremium")?;
    u.team = f.int("team")?;
    Ok(u)
}

/// `b` — id,x,y,speedX,speedY,angle
fn decode_position(
    f: &mut FieldReader<'_>,
) -> Result<PlayerUpdate, ProtocolError> {
    let mut u = PlayerUpdate::default();
    u.id = f.int("id")?;
    u.x = f.int("x")?;
    u.y = f.int("y")?;
    u.speed_x = f.int("speedX")?;
    u.speed_y = f.int("speedY")?;
    u.angle = f.int("angle")?;
    Ok(u)
}

/// `c` — id,bullets,shooting,reloading,hp,beingHit,armorAmount,radius,
/// ghillie,maxBullets,invincible,dashing,chatBoxOpen,color,chatMessage
fn decode_status(
    f: &mut FieldReader<'_>,
) -> Result<PlayerUpdate, ProtocolError> {
    let mut u = PlayerUpdate::default();
    u.id = f.int("id")?;
    u.bullets = f.int("bullets")?;
    u.shooting = f.int("shooting")?;
    u.reloading = f.int("reloading")?;
    u.hp = f.int("hp")?;
    u.being_hit = f.int("beingHit")?;
    u.armor_amount = f.int("armorAmount")?;
    u.radius = f.int("radius")?;
    u.ghillie = f.int("ghillie")?;
    u.max_bullets = f.int("maxBullets")?;
    u.invincible = f.int("invincible")?;
    u.dashing = f.int("dashing")?;
    u.chat_box_open = f.int("chatBoxOpen")?;
    u.color = f.int("color")?;
    u.chat_message = f.text();
    Ok(u)
}

/// `d` — id,weapon,color,x,y,radius,angle,armorAmount,hp,maxBullets,name,
/// ghillie,invincible,isLeader,isPremium,team
fn decode_remote_setup(
    f: &mut FieldReader<'_>,
) -> Result<PlayerUpdate, ProtocolError> {
    let mut u = PlayerUpdate::default();
    u.id = f.int("id")?;
    u.weapon = f.int("weapon")?;
    u.color = f.int("color")?;
    u.x = f.int("x")?;
    u.y = f.int("y")?;
    u.radius = f.int("radius")?;
    u.angle = f.int("angle")?;
    u.armor_amount = f.int("armorAmount")?;
    u.hp = f.int("hp")?;
    u.max_bullets = f.int("maxBullets")?;
    u.name = f.text();
    u.ghillie = f.int("ghillie")?;
    u.invincible = f.int("invincible")?;
    u.is_leader = f.int("isLeader")?;
    u.is_premium = f.int("isPremium")?;
    u.team = f.int("team")?;
    Ok(u)
}

/// `f` — bullets,score,kills,rechargeTimer,maxBullets,camera,thermal,
/// explosivesLeft
fn decode_resources(
    f: &mut FieldReader<'_>,
) -> Result<ResourceUpdate, ProtocolError> {
    let mut u = ResourceUpdate::default();
    u.bullets = f.int("bullets")?;
    u.score = f.int("score")?;
    u.kills = f.int("kills")?;
    u.recharge_timer = f.int("rechargeTimer")?;
    u.max_bullets = f.int("maxBullets")?;
    u.camera = f.int("camera")?;
    u.thermal = f.int("thermal")?;
    u.explosives_left = f.int("explosivesLeft")?;
    Ok(u)
}

/// `v` — playerCount, then `.`-delimited entries `id.isMember.score.kills.team`.
fn decode_leaderboard(
    f: &mut FieldReader<'_>,
) -> Result<ServerEvent, ProtocolError> {
    let player_count = f.req_int("playerCount")?;
    let entries = f
        .rest()
        .iter()
        .map(|raw| decode_leaderboard_entry(raw))
        .collect();
    Ok(ServerEvent::Leaderboard {
        player_count,
        entries,
    })
}

fn decode_leaderboard_entry(raw: &str) -> LeaderboardEntry {
    let mut parts = raw.split(SUB_SEPARATOR);
    let mut take = || parts.next().unwrap_or_default().to_owned();
    LeaderboardEntry {
        id: take(),
        is_member: take(),
        score: take(),
        kills: take(),
        team: take(),
    }
}

/// `r` — sub-type discriminant, then a payload shaped by that sub-type:
/// 1 = kill feed (victim name), 2 = our death (killer name),
/// 3 = damage dealt (amount).
fn decode_report(
    f: &mut FieldReader<'_>,
) -> Result<ServerEvent, ProtocolError> {
    let sub_type = f.req_int("type")?;
    match sub_type {
        1 => Ok(ServerEvent::Killed {
            victim: f.text().unwrap_or_default(),
        }),
        2 => Ok(ServerEvent::Died {
            killer: f.text().unwrap_or_default(),
        }),
        3 => Ok(ServerEvent::DealtDamage {
            amount: f.int("content")?.unwrap_or(0),
        }),
        other => Err(ProtocolError::InvalidFrame {
            tag: "r".to_owned(),
            reason: format!("unknown report sub-type {other}"),
        }),
    }
}

/// `sta` — score,kills,time,shotsFired,shotsHit,damageDealt,damageReceived,
/// distanceCovered, then the killer's loadout snapshot.
fn decode_statistics(
    f: &mut FieldReader<'_>,
) -> Result<MatchStatistics, ProtocolError> {
    let mut s = MatchStatistics::default();
    s.score = f.int("score")?;
    s.kills = f.int("kills")?;
    s.time = f.int("time")?;
    s.shots_fired = f.int("shotsFired")?;
    s.shots_hit = f.int("shotsHit")?;
    s.damage_dealt = f.int("damageDealt")?;
    s.damage_received = f.int("damageReceived")?;
    s.distance_covered = f.int("distanceCovered")?;
    s.shooter_name = f.text();
    s.shooter_is_premium = f.int("shooterIsPremium")?;
    s.shooter_weapon = f.int("shooterWeapon")?;
    s.shooter_armor = f.int("shooterArmor")?;
    s.shooter_color = f.int("shooterColor")?;
    s.shooter_kills = f.int("shooterKills")?;
    s.shooter_score = f.int("shooterScore")?;
    s.shooter_hp = f.int("shooterHp")?;
    s.shooter_armor_amount = f.int("shooterArmorAmount")?;
    s.shooter_level1_powerup = f.int("shooterLevel1Powerup")?;
    s.shooter_level2_powerup = f.int("shooterLevel2Powerup")?;
    s.shooter_level3_powerup = f.int("shooterLevel3Powerup")?;
    Ok(s)
}

// =========================================================================
// Tests
// =========================================================================
