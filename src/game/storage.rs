use std::path::{Path, PathBuf};

use log::{debug, info};
use sled::transaction::ConflictableTransactionError;
use sled::{IVec, Transactional};

use crate::game::catalog::starter_characters;
use crate::game::errors::GameError;
use crate::game::inventory::{Inventory, InventoryEntry};
use crate::game::types::{
    CharacterRecord, SessionId, SessionRecord, CHARACTER_SCHEMA_VERSION,
    INVENTORY_SCHEMA_VERSION, SESSION_SCHEMA_VERSION,
};

const TREE_SESSIONS: &str = "sessions";
const TREE_INVENTORY: &str = "inventory";
const TREE_CHARACTERS: &str = "characters";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct GameStoreBuilder {
    path: PathBuf,
    seed_characters: bool,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_characters: true,
        }
    }

    /// Opt out of seeding the starter characters (useful for targeted tests).
    pub fn without_character_seed(mut self) -> Self {
        self.seed_characters = false;
        self
    }

    pub fn open(self) -> Result<GameStore, GameError> {
        GameStore::open_with_options(self.path, self.seed_characters)
    }
}

/// Sled-backed persistence for sessions, inventories and the character roster.
///
/// Each session is one row keyed by its id; its inventory is a second row under the same id.
/// [`GameStore::commit`] writes every row touched by a single game operation in one transaction.
pub struct GameStore {
    db: sled::Db,
    sessions: sled::Tree,
    inventory: sled::Tree,
    characters: sled::Tree,
}

impl GameStore {
    /// Open (or create) the store rooted at `path`, seeding the character roster when empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, seed: bool) -> Result<Self, GameError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let sessions = db.open_tree(TREE_SESSIONS)?;
        let inventory = db.open_tree(TREE_INVENTORY)?;
        let characters = db.open_tree(TREE_CHARACTERS)?;
        let store = Self {
            db,
            sessions,
            inventory,
            characters,
        };

        if seed {
            let inserted = store.seed_characters_if_needed()?;
            if inserted > 0 {
                info!("Seeded {} starter characters", inserted);
            }
        }

        Ok(store)
    }

    fn session_key(id: &SessionId) -> Vec<u8> {
        format!("sessions:{}", id).into_bytes()
    }

    fn inventory_key(owner: &SessionId) -> Vec<u8> {
        format!("inventory:{}", owner).into_bytes()
    }

    fn character_key(id: u32) -> Vec<u8> {
        // Zero padded so prefix scans come back in id order.
        format!("characters:{:06}", id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn check_schema(entity: &'static str, expected: u8, found: u8) -> Result<(), GameError> {
        if expected != found {
            return Err(GameError::SchemaMismatch {
                entity,
                expected,
                found,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Create a session with default state and the starter inventory, both written together.
    pub fn create_session(&self, character_id: Option<u32>) -> Result<SessionRecord, GameError> {
        if let Some(cid) = character_id {
            self.get_character(cid)?;
        }
        let mut session = SessionRecord::new(SessionId::generate());
        session.character_id = character_id;
        let inventory = Inventory::starter_kit();
        self.commit(&session, &inventory, None)?;
        Ok(session)
    }

    /// Fetch a session by id.
    pub fn get_session(&self, id: &SessionId) -> Result<SessionRecord, GameError> {
        let Some(bytes) = self.sessions.get(Self::session_key(id))? else {
            return Err(GameError::NotFound(format!("session: {}", id)));
        };
        let mut record: SessionRecord = Self::deserialize(bytes)?;
        Self::check_schema("session", SESSION_SCHEMA_VERSION, record.schema_version)?;
        record.normalize();
        Ok(record)
    }

    /// Insert or update a session row. Last writer wins.
    pub fn put_session(&self, mut session: SessionRecord) -> Result<(), GameError> {
        session.schema_version = SESSION_SCHEMA_VERSION;
        let bytes = Self::serialize(&session)?;
        self.sessions.insert(Self::session_key(&session.id), bytes)?;
        self.sessions.flush()?;
        Ok(())
    }

    pub fn session_exists(&self, id: &SessionId) -> Result<bool, GameError> {
        Ok(self.sessions.contains_key(Self::session_key(id))?)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.scan_prefix(b"sessions:").count()
    }

    /// Persist a session, its inventory and optionally a levelled-up character atomically.
    pub fn commit(
        &self,
        session: &SessionRecord,
        inventory: &Inventory,
        character: Option<&CharacterRecord>,
    ) -> Result<(), GameError> {
        let mut session = session.clone();
        session.schema_version = SESSION_SCHEMA_VERSION;
        let mut inventory = inventory.clone();
        inventory.schema_version = INVENTORY_SCHEMA_VERSION;

        let session_key = Self::session_key(&session.id);
        let session_bytes = Self::serialize(&session)?;
        let inventory_key = Self::inventory_key(&session.id);
        let inventory_bytes = Self::serialize(&inventory)?;
        let character_row = match character {
            Some(c) => {
                let mut c = c.clone();
                c.schema_version = CHARACTER_SCHEMA_VERSION;
                Some((Self::character_key(c.id), Self::serialize(&c)?))
            }
            None => None,
        };

        (&self.sessions, &self.inventory, &self.characters).transaction(
            |(sessions, inventories, characters)| {
                sessions.insert(session_key.as_slice(), session_bytes.as_slice())?;
                inventories.insert(inventory_key.as_slice(), inventory_bytes.as_slice())?;
                if let Some((key, bytes)) = &character_row {
                    characters.insert(key.as_slice(), bytes.as_slice())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            },
        )?;
        self.db.flush()?;
        debug!("committed session {}", session.id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inventory ledger
    // ------------------------------------------------------------------

    /// Inventory for `owner`. A missing row reads as empty.
    pub fn get_inventory(&self, owner: &SessionId) -> Result<Inventory, GameError> {
        let Some(bytes) = self.inventory.get(Self::inventory_key(owner))? else {
            return Ok(Inventory::default());
        };
        let inventory: Inventory = Self::deserialize(bytes)?;
        Self::check_schema(
            "inventory",
            INVENTORY_SCHEMA_VERSION,
            inventory.schema_version,
        )?;
        Ok(inventory)
    }

    pub fn put_inventory(&self, owner: &SessionId, mut inventory: Inventory) -> Result<(), GameError> {
        inventory.schema_version = INVENTORY_SCHEMA_VERSION;
        let bytes = Self::serialize(&inventory)?;
        self.inventory.insert(Self::inventory_key(owner), bytes)?;
        self.inventory.flush()?;
        Ok(())
    }

    /// Add `quantity` of an item to the owner's ledger. Returns the new quantity.
    pub fn grant_item(&self, owner: &SessionId, item_id: &str, quantity: u32) -> Result<u32, GameError> {
        let mut inventory = self.get_inventory(owner)?;
        let total = inventory.grant(item_id, quantity);
        self.put_inventory(owner, inventory)?;
        Ok(total)
    }

    /// Remove `quantity` of an item. `Ok(false)` (and no write) when the owner holds too few.
    pub fn consume_item(&self, owner: &SessionId, item_id: &str, quantity: u32) -> Result<bool, GameError> {
        let mut inventory = self.get_inventory(owner)?;
        if !inventory.consume(item_id, quantity) {
            return Ok(false);
        }
        self.put_inventory(owner, inventory)?;
        Ok(true)
    }

    pub fn list_inventory(&self, owner: &SessionId) -> Result<Vec<InventoryEntry>, GameError> {
        Ok(self.get_inventory(owner)?.entries().to_vec())
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    pub fn put_character(&self, mut character: CharacterRecord) -> Result<(), GameError> {
        character.schema_version = CHARACTER_SCHEMA_VERSION;
        let bytes = Self::serialize(&character)?;
        self.characters.insert(Self::character_key(character.id), bytes)?;
        self.characters.flush()?;
        Ok(())
    }

    pub fn get_character(&self, id: u32) -> Result<CharacterRecord, GameError> {
        let Some(bytes) = self.characters.get(Self::character_key(id))? else {
            return Err(GameError::NotFound(format!("character {}", id)));
        };
        let record: CharacterRecord = Self::deserialize(bytes)?;
        Self::check_schema("character", CHARACTER_SCHEMA_VERSION, record.schema_version)?;
        Ok(record)
    }

    /// All characters in id order.
    pub fn list_characters(&self) -> Result<Vec<CharacterRecord>, GameError> {
        self.characters
            .scan_prefix(b"characters:")
            .map(|entry| -> Result<CharacterRecord, GameError> {
                let (_key, value) = entry?;
                let record: CharacterRecord = Self::deserialize(value)?;
                Self::check_schema("character", CHARACTER_SCHEMA_VERSION, record.schema_version)?;
                Ok(record)
            })
            .collect()
    }

    pub fn seed_characters_if_needed(&self) -> Result<usize, GameError> {
        if self.characters.scan_prefix(b"characters:").next().is_some() {
            return Ok(0);
        }
        let mut inserted = 0usize;
        for character in starter_characters() {
            self.put_character(character)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn ping(&self) -> Result<u64, GameError> {
        Ok(self.db.size_on_disk()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::HEALING_POTION_ID;
    use crate::game::types::Position;
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_session() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let mut session = store.create_session(Some(2)).expect("create");
        session.player_hp = 42;
        session.position = Position::new(3, 1);
        store.put_session(session.clone()).expect("put");
        let fetched = store.get_session(&session.id).expect("get");
        assert_eq!(fetched.player_hp, 42);
        assert_eq!(fetched.position, Position::new(3, 1));
        assert_eq!(fetched.character_id, Some(2));
        assert_eq!(fetched.schema_version, SESSION_SCHEMA_VERSION);
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let err = store.get_session(&SessionId::generate()).unwrap_err();
        assert!(matches!(err, GameError::NotFound(_)));
        assert!(matches!(
            store.create_session(Some(99)),
            Err(GameError::NotFound(_))
        ));
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn new_sessions_get_the_starter_kit() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let session = store.create_session(None).expect("create");
        let items = store.list_inventory(&session.id).expect("inventory");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_id, HEALING_POTION_ID);
        assert_eq!(items[0].quantity, 1);
    }

    #[test]
    fn ledger_grant_and_consume() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let session = store.create_session(None).expect("create");
        assert_eq!(store.grant_item(&session.id, "short_sword", 2).unwrap(), 2);
        assert!(!store.consume_item(&session.id, "short_sword", 3).unwrap());
        assert!(store.consume_item(&session.id, "short_sword", 2).unwrap());
        assert!(!store.consume_item(&session.id, "short_sword", 1).unwrap());
        let owner = SessionId::generate();
        assert!(store.list_inventory(&owner).unwrap().is_empty());
    }

    #[test]
    fn seeding_characters_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = GameStoreBuilder::new(dir.path()).open().expect("store");
            let roster = store.list_characters().expect("list");
            assert_eq!(roster.len(), starter_characters().len());
            let ids: Vec<u32> = roster.iter().map(|c| c.id).collect();
            let mut sorted = ids.clone();
            sorted.sort();
            assert_eq!(ids, sorted);
        }

        let store = GameStoreBuilder::new(dir.path())
            .without_character_seed()
            .open()
            .expect("reopen store");
        assert_eq!(store.seed_characters_if_needed().expect("seed"), 0);
        assert_eq!(store.get_character(1).expect("arthas").name, "Arthas");
    }

    #[test]
    fn commit_writes_character_with_session() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let session = store.create_session(Some(1)).expect("create");
        let mut hero = store.get_character(1).expect("character");
        hero.level = 2;
        let mut inventory = store.get_inventory(&session.id).expect("inventory");
        inventory.grant(HEALING_POTION_ID, 2);
        store
            .commit(&session, &inventory, Some(&hero))
            .expect("commit");
        assert_eq!(store.get_character(1).unwrap().level, 2);
        assert_eq!(
            store
                .get_inventory(&session.id)
                .unwrap()
                .quantity(HEALING_POTION_ID),
            3
        );
        assert!(store.ping().is_ok());
    }

    #[test]
    fn stale_character_schema_fails_listing() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let mut stale = store.get_character(2).expect("character");
        stale.schema_version = CHARACTER_SCHEMA_VERSION + 1;
        store
            .characters
            .insert(GameStore::character_key(2), bincode::serialize(&stale).unwrap())
            .unwrap();
        assert!(matches!(
            store.list_characters(),
            Err(GameError::SchemaMismatch { entity: "character", .. })
        ));
    }

    #[tokio::test]
    async fn unreadable_session_rows_fail_the_turn_without_writes() {
        use crate::config::GameConfig;
        use crate::game::dice::ScriptedDice;
        use crate::game::errors::ErrorKind;
        use crate::game::service::{GameService, Reply};
        use axum::http::StatusCode;

        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");

        let mut future = store.create_session(None).expect("create");
        future.schema_version = SESSION_SCHEMA_VERSION + 1;
        future.start_encounter();
        store
            .sessions
            .insert(GameStore::session_key(&future.id), bincode::serialize(&future).unwrap())
            .unwrap();

        let garbled = store.create_session(None).expect("create");
        store
            .sessions
            .insert(GameStore::session_key(&garbled.id), &b"\xff\x00not a record"[..])
            .unwrap();

        let inventory_rows = |store: &GameStore| {
            [&future.id, &garbled.id].map(|id| store.inventory.get(GameStore::inventory_key(id)).unwrap())
        };
        let before = inventory_rows(&store);

        let svc = GameService::with_dice(
            store,
            GameConfig::default(),
            Box::new(ScriptedDice::new([20, 15], [false, true])),
        )
        .expect("service");

        for id in [&future.id, &garbled.id] {
            for action in ["attack", "heal"] {
                let result = svc.resolve_turn(id.as_str(), action).await;
                assert_eq!(
                    result.as_ref().map_err(GameError::kind).err(),
                    Some(ErrorKind::Persistence)
                );
                let resp = crate::web::respond(Reply::from(result));
                assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
        let err = svc.resolve_turn(future.id.as_str(), "attack").await.unwrap_err();
        assert!(matches!(err, GameError::SchemaMismatch { entity: "session", .. }));

        assert_eq!(inventory_rows(svc.store()), before);
        assert!(svc.store().inventory.get(GameStore::inventory_key(&future.id)).unwrap().is_some());
    }
}
