//! The server's fixed guest-name table.
//!
//! Players who never picked a name are sent with a `#`-prefixed
//! placeholder; the real display name is derived from the player id
//! against this table, with a literal fallback for out-of-range ids.

/// Display name used when a player id falls outside the guest table.
pub const FALLBACK_NAME: &str = "Mystery Creature";

/// Guest display names, indexed by player id - 1 (ids start at 1).
const GUEST_NAMES: [&str; 81] = [
    "Guest Ant", "Guest Baboon", "Guest Bat", "Guest Bear", "Guest Bee",
    "Guest Beetle", "Guest Bison", "Guest Buffalo", "Guest Cat",
    "Guest Chicken", "Guest Cow", "Guest Crab", "Guest Crocodile",
    "Guest Dog", "Guest Eagle", "Guest Elephant", "Guest Emu",
    "Guest Fish", "Guest Fly", "Guest Fox", "Guest Frog", "Guest Giraffe",
    "Guest Goat", "Guest Gorilla", "Guest Horse", "Guest Kangaroo",
    "Guest Koala", "Guest Lion", "Guest Lizard", "Guest Llama",
    "Guest Lobster", "Guest Mongoose", "Guest Monkey", "Guest Moose",
    "Guest Octopus", "Guest Otter", "Guest Panther", "Guest Pelican",
    "Guest Penguin", "Guest Pig", "Guest Platypus", "Guest Porcupine",
    "Guest Rabbit", "Guest Raccoon", "Guest Rat", "Guest Reindeer",
    "Guest Rhino", "Guest Scorpion", "Guest Seal", "Guest Sheep",
    "Guest Skunk", "Guest Sloth", "Guest Snail", "Guest Snake",
    "Guest Spider", "Guest Squid", "Guest Squirrel", "Guest Tiger",
    "Guest Walrus", "Guest Weasel", "Guest Whale", "Guest Wolf",
    "Guest Wombat", "Guest Zebra", "Guest Armadillo", "Guest Beaver",
    "Guest Civet", "Guest Coyote", "Guest Deer", "Guest Dingo",
    "Guest Gazelle", "Guest Gecko", "Guest Goanna", "Guest Heron",
    "Guest Iguana", "Guest Jackal", "Guest Lemur", "Guest Shark",
    "Guest Stork", "Guest Vulture", "Guest Wolverine",
];

/// Deterministic guest name for a player id.
pub fn guest_name(id: i64) -> &'static str {
    if id >= 1 && (id as usize) <= GUEST_NAMES.len() {
        GUEST_NAMES[(id - 1) as usize]
    } else {
        FALLBACK_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_name_first_entry() {
        assert_eq!(guest_name(1), "Guest Ant");
    }

    #[test]
    fn test_guest_name_last_entry() {
        assert_eq!(guest_name(81), "Guest Wolverine");
    }

    #[test]
    fn test_guest_name_zero_falls_back() {
        assert_eq!(guest_name(0), FALLBACK_NAME);
    }

    #[test]
    fn test_guest_name_out_of_range_falls_back() {
        assert_eq!(guest_name(82), FALLBACK_NAME);
        assert_eq!(guest_name(-3), FALLBACK_NAME);
    }
}
