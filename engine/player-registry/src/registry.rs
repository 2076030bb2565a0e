use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::migration::{migrate_records, upgrade_record, LegacyPlayerRecord, NormalizeReport};
use crate::store::JsonFileStore;
use crate::types::{email_key, NewPlayer, Player, PlayerId, TournamentStatus, MAX_PLAYERS};
use chrono::{SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Player Registry - admission control and durable storage for tournament sign-ups
///
/// The backing file is the source of truth: every operation reloads it before
/// acting, and the in-memory maps only live for the duration of one call.
/// All operations are serialized through a single lock, so the
/// reload-check-write sequence of [`PlayerRegistry::register`] cannot interleave
/// with another caller.
pub struct PlayerRegistry {
    store: JsonFileStore,
    state: Mutex<RegistryState>,
}

/// Roster snapshot plus lookup indexes
#[derive(Debug, Default)]
struct RegistryState {
    /// Records exactly as read from the backing file
    records: Vec<serde_json::Value>,

    /// Map from registration ID to player
    players_by_id: BTreeMap<PlayerId, Player>,

    /// Map from UID to registration ID
    ids_by_uid: HashMap<String, PlayerId>,

    /// Map from lowercased email to registration ID
    ids_by_email: HashMap<String, PlayerId>,

    /// Highest ID handed out by this process; survives reloads and normalization
    last_assigned_id: PlayerId,
}

impl RegistryState {
    /// Replace the roster with stored records and rebuild the indexes
    ///
    /// The current snapshot is kept if any record is unreadable or repeats an
    /// ID, UID or email of an earlier one.
    fn replace(&mut self, records: Vec<serde_json::Value>) -> std::result::Result<(), String> {
        let mut fresh =
            RegistryState { last_assigned_id: self.last_assigned_id, ..Default::default() };

        for (position, value) in records.iter().enumerate() {
            fresh.insert(upgrade_record(position, value.clone())?)?;
        }

        fresh.records = records;
        *self = fresh;
        Ok(())
    }

    fn insert(&mut self, player: Player) -> std::result::Result<(), String> {
        if self.players_by_id.contains_key(&player.id) {
            return Err(format!("id {} appears more than once", player.id));
        }
        if self.ids_by_uid.contains_key(&player.uid) {
            return Err(format!("uid {} appears more than once", player.uid));
        }
        if self.ids_by_email.contains_key(&player.email_key()) {
            return Err(format!("email {} appears more than once", player.email));
        }

        self.ids_by_uid.insert(player.uid.clone(), player.id);
        self.ids_by_email.insert(player.email_key(), player.id);
        self.players_by_id.insert(player.id, player);
        Ok(())
    }

    fn next_id(&self) -> PlayerId {
        let highest_stored = self.players_by_id.keys().next_back().copied().unwrap_or(0);
        highest_stored.max(self.last_assigned_id) + 1
    }

    fn len(&self) -> usize {
        self.players_by_id.len()
    }

    fn players(&self) -> Vec<Player> {
        self.players_by_id.values().cloned().collect()
    }

    fn lookup(&self, id: Option<&PlayerId>) -> Option<Player> {
        id.and_then(|id| self.players_by_id.get(id)).cloned()
    }
}

impl PlayerRegistry {
    /// Open the registry, creating the backing file if it does not exist
    ///
    /// Fails if the existing file cannot be parsed; a corrupted roster is
    /// never replaced with an empty one.
    pub async fn open(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let store = JsonFileStore::new(&config);
        store.initialize().await?;

        let registry = Self { store, state: Mutex::new(RegistryState::default()) };
        let count = registry.count().await?;

        info!("Player registry opened at {:?} with {} players", config.data_file, count);
        Ok(registry)
    }

    /// Open the registry without loading the roster
    ///
    /// For maintenance on a file that cannot be served, such as one with
    /// repeated IDs or records missing a UID; follow up with
    /// [`PlayerRegistry::normalize`]. Other operations keep failing until the
    /// file is repaired.
    pub async fn open_for_repair(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let store = JsonFileStore::new(&config);
        store.initialize().await?;

        warn!("Player registry opened for repair at {:?}", config.data_file);
        Ok(Self { store, state: Mutex::new(RegistryState::default()) })
    }

    /// Open the registry on a data file with default settings
    pub async fn open_file(data_file: impl AsRef<Path>) -> Result<Self> {
        Self::open(RegistryConfig::new(data_file.as_ref())).await
    }

    /// Path of the backing file
    pub fn data_file(&self) -> &Path {
        self.store.path()
    }

    /// Maximum number of players admitted
    pub fn capacity(&self) -> usize {
        MAX_PLAYERS
    }

    /// Register a new player
    ///
    /// Admission checks run in order (capacity, UID, email) and the first
    /// failing one is returned. On success the full roster is written to disk
    /// before the in-memory state is updated, so a failed write leaves
    /// neither side changed.
    pub async fn register(&self, candidate: NewPlayer) -> Result<Player> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await?;

        if state.len() >= MAX_PLAYERS {
            warn!("Rejected registration for UID {}: tournament is full", candidate.uid);
            return Err(RegistryError::CapacityExceeded { capacity: MAX_PLAYERS });
        }

        if state.ids_by_uid.contains_key(&candidate.uid) {
            warn!("Rejected registration: UID {} already registered", candidate.uid);
            return Err(RegistryError::DuplicateUid { uid: candidate.uid });
        }

        if state.ids_by_email.contains_key(&email_key(&candidate.email)) {
            warn!("Rejected registration: email {} already registered", candidate.email);
            return Err(RegistryError::DuplicateEmail { email: candidate.email });
        }

        let id = state.next_id();
        let player = Player::from_candidate(id, timestamp_now(), candidate);

        // Stored records are written back as read; only the new one is appended
        let mut records = state.records.clone();
        records.push(serde_json::to_value(&player)?);
        self.store.save(&records).await?;

        state.records = records;
        state.insert(player.clone()).map_err(|reason| self.corrupted(reason))?;
        state.last_assigned_id = id;

        info!(
            "Registered player {} ({}) with ID {} [{}/{}]",
            player.in_game_name,
            player.uid,
            id,
            state.len(),
            MAX_PLAYERS
        );
        Ok(player)
    }

    /// Get a player by registration ID
    pub async fn get_by_id(&self, id: PlayerId) -> Result<Option<Player>> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await?;
        Ok(state.lookup(Some(&id)))
    }

    /// Get a player by UID (exact match)
    pub async fn get_by_uid(&self, uid: &str) -> Result<Option<Player>> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await?;
        let id = state.ids_by_uid.get(uid);
        Ok(state.lookup(id))
    }

    /// Get a player by email (case-insensitive)
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Player>> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await?;
        let id = state.ids_by_email.get(&email_key(email));
        Ok(state.lookup(id))
    }

    /// Get all registered players, ordered by registration ID
    pub async fn list_all(&self) -> Result<Vec<Player>> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await?;
        Ok(state.players())
    }

    /// Number of registered players
    pub async fn count(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await?;
        Ok(state.len())
    }

    /// Registration count, capacity and free slots
    pub async fn status(&self) -> Result<TournamentStatus> {
        Ok(TournamentStatus::new(self.count().await?, self.capacity()))
    }

    /// Repair a legacy roster file in place
    ///
    /// Drops incomplete records, fills defaults and **renumbers every record
    /// from 1**. This is a one-time cleanup tool: running it after new
    /// registrations changes IDs players already hold. IDs handed out later by
    /// this process still continue above the highest one it ever assigned.
    pub async fn normalize(&self) -> Result<NormalizeReport> {
        let mut state = self.state.lock().await;

        let raw: Vec<LegacyPlayerRecord> = self.store.load().await?;
        let total = raw.len();
        let (players, report) = migrate_records(raw, &timestamp_now());

        let records =
            players.iter().map(serde_json::to_value).collect::<serde_json::Result<Vec<_>>>()?;
        self.store.save(&records).await?;
        state.replace(records).map_err(|reason| self.corrupted(reason))?;

        if state.len() > MAX_PLAYERS {
            warn!("Normalized roster holds {} players, above capacity {}", state.len(), MAX_PLAYERS);
        }

        info!(
            "Normalized roster: kept {} of {} records, {} placeholder emails",
            report.kept, total, report.placeholder_emails
        );
        Ok(report)
    }

    /// Wait for in-flight operations and close the registry
    ///
    /// Every registration is written before it returns, so there is nothing
    /// left to flush here.
    pub async fn shutdown(&self) {
        let state = self.state.lock().await;
        info!("Player registry closed with {} players", state.len());
    }

    /// Replace the in-memory state with the contents of the backing file
    async fn reload(&self, state: &mut RegistryState) -> Result<()> {
        let loaded = self
            .store
            .load::<serde_json::Value>()
            .await
            .and_then(|records| state.replace(records).map_err(|reason| self.corrupted(reason)));

        match loaded {
            Ok(()) => {
                debug!("Reloaded {} players from {:?}", state.len(), self.store.path());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to reload roster, keeping last good snapshot: {}", e);
                Err(e)
            }
        }
    }
}

impl PlayerRegistry {
    fn corrupted(&self, reason: String) -> RegistryError {
        RegistryError::corrupted(self.store.path(), reason)
    }
}

/// Current time in the format stored in `registeredAt`
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn candidate(n: u32) -> NewPlayer {
        NewPlayer {
            full_name: format!("Player {n}"),
            in_game_name: format!("Sniper{n}"),
            uid: format!("{}", 100_000_000 + n),
            email: format!("player{n}@example.com"),
            phone: "+919876543210".to_string(),
            agreement: true,
        }
    }

    async fn open_registry(temp_dir: &TempDir) -> PlayerRegistry {
        PlayerRegistry::open_file(temp_dir.path().join("players.json")).await.unwrap()
    }

    #[tokio::test]
    async fn test_registry_creation() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;

        assert_eq!(registry.count().await.unwrap(), 0);
        assert_eq!(registry.capacity(), 48);
        assert!(registry.data_file().exists());
    }

    #[tokio::test]
    async fn test_duplicate_uid_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;

        let mut first = candidate(1);
        first.uid = "123456789".to_string();
        first.email = "a@x.com".to_string();
        let player = registry.register(first).await.unwrap();
        assert_eq!(player.id, 1);

        let mut second = candidate(2);
        second.uid = "123456789".to_string();
        let err = registry.register(second).await.unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateUid { ref uid } if uid == "123456789"));
        assert_eq!(registry.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;

        let mut first = candidate(1);
        first.email = "A@X.com".to_string();
        registry.register(first).await.unwrap();

        let mut second = candidate(2);
        second.email = "a@x.com".to_string();
        let err = registry.register(second).await.unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEmail { .. }));
    }

    #[tokio::test]
    async fn test_capacity_checked_before_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;

        for n in 0..48 {
            registry.register(candidate(n)).await.unwrap();
        }

        // Same UID as an existing player, but the roster is full
        let err = registry.register(candidate(0)).await.unwrap_err();
        assert!(matches!(err, RegistryError::CapacityExceeded { capacity: 48 }));
    }

    #[tokio::test]
    async fn test_lookups_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;

        let player = registry.register(candidate(7)).await.unwrap();

        assert_eq!(registry.get_by_id(player.id).await.unwrap(), Some(player.clone()));
        assert_eq!(registry.get_by_uid(&player.uid).await.unwrap(), Some(player.clone()));
        assert_eq!(
            registry.get_by_email("PLAYER7@EXAMPLE.COM").await.unwrap(),
            Some(player.clone())
        );
        assert_eq!(registry.get_by_id(99).await.unwrap(), None);
        assert_eq!(registry.get_by_uid("999999999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_registered_at_is_stamped() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;

        let player = registry.register(candidate(1)).await.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&player.registered_at).is_ok());
        assert!(player.agreement);
    }

    #[tokio::test]
    async fn test_out_of_band_edits_are_picked_up() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;
        registry.register(candidate(1)).await.unwrap();

        let mut players = registry.list_all().await.unwrap();
        let mut extra = players[0].clone();
        extra.id = 10;
        extra.uid = "555555555".to_string();
        extra.email = "manual@example.com".to_string();
        players.push(extra);
        std::fs::write(registry.data_file(), serde_json::to_string(&players).unwrap()).unwrap();

        assert_eq!(registry.count().await.unwrap(), 2);
        let next = registry.register(candidate(2)).await.unwrap();
        assert_eq!(next.id, 11);
    }

    #[tokio::test]
    async fn test_corrupted_file_fails_loudly() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;
        registry.register(candidate(1)).await.unwrap();

        std::fs::write(registry.data_file(), "{ not json").unwrap();

        assert!(matches!(registry.count().await, Err(RegistryError::Corrupted { .. })));
        assert!(matches!(
            registry.register(candidate(2)).await,
            Err(RegistryError::Corrupted { .. })
        ));
        assert_eq!(std::fs::read_to_string(registry.data_file()).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_open_refuses_corrupted_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("players.json");
        std::fs::write(&path, "[oops").unwrap();

        let result = PlayerRegistry::open_file(&path).await;
        assert!(matches!(result, Err(RegistryError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_normalize_keeps_id_high_water_mark() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;

        for n in 0..3 {
            registry.register(candidate(n)).await.unwrap();
        }

        // Drop the first two records out-of-band, then renumber
        let players = registry.list_all().await.unwrap();
        std::fs::write(registry.data_file(), serde_json::to_string(&players[2..]).unwrap())
            .unwrap();
        let report = registry.normalize().await.unwrap();
        assert_eq!(report.kept, 1);
        assert_eq!(registry.get_by_id(1).await.unwrap().unwrap().uid, players[2].uid);

        let next = registry.register(candidate(9)).await.unwrap();
        assert_eq!(next.id, 4);
    }

    #[tokio::test]
    async fn test_repeated_id_in_file_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;
        let contents = r#"[
            { "id": 1, "fullName": "First", "inGameName": "One", "uid": "111111111",
              "email": "one@example.com", "phone": "9876543210",
              "registeredAt": "2025-01-01T00:00:00.000Z", "agreement": true },
            { "id": 1, "fullName": "Second", "inGameName": "Two", "uid": "222222222",
              "email": "two@example.com", "phone": "9876543211",
              "registeredAt": "2025-01-02T00:00:00.000Z", "agreement": true }
        ]"#;
        std::fs::write(registry.data_file(), contents).unwrap();

        assert!(matches!(registry.count().await, Err(RegistryError::Corrupted { .. })));
        assert!(matches!(
            registry.get_by_uid("111111111").await,
            Err(RegistryError::Corrupted { .. })
        ));
        assert!(matches!(
            registry.register(candidate(3)).await,
            Err(RegistryError::Corrupted { .. })
        ));

        // Both players are still on disk
        assert_eq!(std::fs::read_to_string(registry.data_file()).unwrap(), contents);
    }

    #[tokio::test]
    async fn test_repeated_uid_or_email_in_file_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;
        let first = registry.register(candidate(1)).await.unwrap();

        let mut same_uid = first.clone();
        same_uid.id = 2;
        same_uid.email = "other@example.com".to_string();
        std::fs::write(
            registry.data_file(),
            serde_json::to_string(&[first.clone(), same_uid]).unwrap(),
        )
        .unwrap();
        assert!(matches!(registry.count().await, Err(RegistryError::Corrupted { .. })));

        let mut same_email = first.clone();
        same_email.id = 2;
        same_email.uid = "999999999".to_string();
        same_email.email = first.email.to_uppercase();
        std::fs::write(registry.data_file(), serde_json::to_string(&[first, same_email]).unwrap())
            .unwrap();
        assert!(matches!(registry.count().await, Err(RegistryError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_roster_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;
        registry.register(candidate(1)).await.unwrap();
        let before = std::fs::read_to_string(registry.data_file()).unwrap();

        // A directory where the temp file goes makes the write fail
        let temp_path = temp_dir.path().join("players.json.tmp");
        std::fs::create_dir(&temp_path).unwrap();

        let err = registry.register(candidate(2)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));
        assert_eq!(registry.count().await.unwrap(), 1);
        assert_eq!(registry.get_by_uid(&candidate(2).uid).await.unwrap(), None);
        assert_eq!(std::fs::read_to_string(registry.data_file()).unwrap(), before);

        std::fs::remove_dir(&temp_path).unwrap();
        let player = registry.register(candidate(2)).await.unwrap();
        assert_eq!(player.id, 2);
    }

    #[tokio::test]
    async fn test_legacy_records_are_served_without_rewrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("players.json");
        std::fs::write(
            &path,
            r#"[
                { "id": 1, "name": "Founder", "inGameName": "Alpha", "uid": "111111111",
                  "phone": "9876543210", "registeredAt": "2025-01-01T09:00:00.000Z",
                  "agreement": true },
                { "id": 4, "fullName": "Current", "name": "Old", "inGameName": "Delta",
                  "uid": "444444444", "email": "four@example.com", "phone": "9876543211",
                  "registeredAt": "2025-01-02T09:00:00.000Z", "agreement": true }
            ]"#,
        )
        .unwrap();

        let registry = PlayerRegistry::open_file(&path).await.unwrap();
        assert_eq!(registry.count().await.unwrap(), 2);

        let founder = registry.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(founder.full_name, "Founder");
        assert_eq!(founder.email, "player-111111111@placeholder.invalid");
        assert_eq!(registry.get_by_id(4).await.unwrap().unwrap().full_name, "Current");

        // Registering appends without rewriting the legacy records
        let player = registry.register(candidate(5)).await.unwrap();
        assert_eq!(player.id, 5);

        let stored: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0]["name"], "Founder");
        assert!(stored[0].get("email").is_none());
        assert_eq!(stored[1]["name"], "Old");
        assert_eq!(stored[2]["uid"], player.uid);
    }

    #[tokio::test]
    async fn test_status() {
        let temp_dir = TempDir::new().unwrap();
        let registry = open_registry(&temp_dir).await;
        registry.register(candidate(1)).await.unwrap();

        let status = registry.status().await.unwrap();
        assert_eq!(status, TournamentStatus::new(1, 48));
        assert_eq!(status.available_slots, 47);
    }
}
