use serde::{Deserialize, Serialize};

/// Maximum number of players admitted to the tournament
pub const MAX_PLAYERS: usize = 48;

/// Registration ID assigned by the registry
pub type PlayerId = u64;

/// A registered tournament player, as stored in the backing file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Registration ID, assigned by the registry (starts at 1)
    pub id: PlayerId,

    /// Real-world name. Older files stored this under `name`, which is read
    /// through `migration::upgrade_record`.
    pub full_name: String,

    /// Displayed in-game handle
    pub in_game_name: String,

    /// Game account UID (9-12 digits), unique across the roster
    pub uid: String,

    /// Contact email, unique across the roster (case-insensitive)
    pub email: String,

    /// Contact phone number
    pub phone: String,

    /// RFC 3339 timestamp of the registration
    pub registered_at: String,

    /// Whether the player accepted the tournament rules
    pub agreement: bool,
}

impl Player {
    /// Build a stored record from a candidate, its assigned ID and timestamp
    pub fn from_candidate(id: PlayerId, registered_at: String, candidate: NewPlayer) -> Self {
        Self {
            id,
            full_name: candidate.full_name,
            in_game_name: candidate.in_game_name,
            uid: candidate.uid,
            email: candidate.email,
            phone: candidate.phone,
            registered_at,
            agreement: candidate.agreement,
        }
    }

    /// Lowercased email, the key used for duplicate detection
    pub fn email_key(&self) -> String {
        email_key(&self.email)
    }
}

/// A registration candidate: a player record without `id` and `registeredAt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub full_name: String,
    pub in_game_name: String,
    pub uid: String,
    pub email: String,
    pub phone: String,
    pub agreement: bool,
}

/// Aggregate tournament status reported to the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentStatus {
    pub registered_count: usize,
    pub max_players: usize,
    pub available_slots: usize,
    pub is_full: bool,
}

impl TournamentStatus {
    /// Derive the status from the current roster size and capacity
    pub fn new(registered_count: usize, max_players: usize) -> Self {
        Self {
            registered_count,
            max_players,
            available_slots: max_players.saturating_sub(registered_count),
            is_full: registered_count >= max_players,
        }
    }
}

/// Normalized form of an email address for uniqueness checks
pub fn email_key(email: &str) -> String {
    email.to_lowercase()
}
