//! Public game operations: load state, run an engine, commit, report.
//!
//! Every mutating operation takes the session's lock before loading and holds it until the
//! commit, so two requests for the same session can no longer interleave their read-modify-write
//! cycles. `game.serialize_session_turns = false` restores the old last-writer-wins behavior.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;

use super::catalog;
use super::combat;
use super::dice::Dice;
use super::errors::{ErrorKind, GameError};
use super::exploration;
use super::inventory::InventoryLine;
use super::storage::GameStore;
use super::types::{
    Action, BattleOutcome, CharacterRecord, Direction, ExplorationEvent, MoveResult, SessionId,
    SessionView, TurnResult,
};
use crate::config::GameConfig;
use crate::logutil::escape_log;
use crate::metrics;

/// Uniform reply envelope: `{"success": true, ..fields}` or `{"success": false, "error", "kind"}`.
#[derive(Debug, Serialize)]
pub struct Reply<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Storage failure: the HTTP shell answers 500 instead of 200.
    #[serde(skip)]
    pub fatal: bool,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            fatal: false,
        }
    }

    pub fn failure(err: &GameError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.public_message()),
            kind: Some(err.kind()),
            fatal: err.is_fatal(),
        }
    }

    /// Malformed request (missing fields) rejected before reaching the game.
    pub fn invalid_request(reason: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(reason.to_string()),
            kind: Some(ErrorKind::InvalidAction),
            fatal: false,
        }
    }
}

impl<T> From<Result<T, GameError>> for Reply<T> {
    fn from(result: Result<T, GameError>) -> Self {
        match result {
            Ok(data) => Reply::ok(data),
            Err(err) => Reply::failure(&err),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InventoryReport {
    pub session_id: SessionId,
    pub items: Vec<InventoryLine>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CharacterList {
    pub characters: Vec<CharacterRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GrantReport {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    pub db: &'static str,
    pub sessions: usize,
    pub metrics: metrics::Snapshot,
}

/// One async mutex per session id. Entries nobody holds or waits on are pruned on the next acquire.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct GameService {
    store: GameStore,
    rules: GameConfig,
    dice: Mutex<Box<dyn Dice + Send>>,
    locks: SessionLocks,
}

impl GameService {
    /// Service with a `StdRng`, seeded from `rules.rng_seed` when set.
    pub fn new(store: GameStore, rules: GameConfig) -> anyhow::Result<Self> {
        let rng = match rules.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_dice(store, rules, Box::new(rng))
    }

    /// Rules are validated here as well as on config load; the engines rely on them.
    pub fn with_dice(
        store: GameStore,
        rules: GameConfig,
        dice: Box<dyn Dice + Send>,
    ) -> anyhow::Result<Self> {
        rules.validate()?;
        Ok(Self {
            store,
            rules,
            dice: Mutex::new(dice),
            locks: SessionLocks::default(),
        })
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn rules(&self) -> &GameConfig {
        &self.rules
    }

    /// Number of per-session locks currently tracked (held, awaited or not yet pruned).
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    async fn lock_session(&self, id: &SessionId) -> Option<OwnedMutexGuard<()>> {
        if self.rules.serialize_session_turns {
            Some(self.locks.acquire(id).await)
        } else {
            None
        }
    }

    fn roll_with<T>(&self, f: impl FnOnce(&mut dyn Dice) -> T) -> T {
        let mut dice = self.dice.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **dice)
    }

    fn observe<T>(op: &str, result: Result<T, GameError>) -> Result<T, GameError> {
        if let Err(err) = &result {
            if err.is_fatal() {
                metrics::inc_persistence_failures();
                error!("{} failed: {}", op, err);
            } else {
                debug!("{} rejected: {}", op, err);
            }
        }
        result
    }

    pub async fn create_session(&self, character_id: Option<u32>) -> Result<SessionView, GameError> {
        let result = self.store.create_session(character_id).map(|session| {
            metrics::inc_sessions_created();
            info!("Session created: {}", session.id);
            session.view()
        });
        Self::observe("create_session", result)
    }

    pub async fn session(&self, id: &str) -> Result<SessionView, GameError> {
        let result = SessionId::parse(id)
            .and_then(|id| self.store.get_session(&id))
            .map(|s| s.view());
        Self::observe("session", result)
    }

    pub async fn inventory(&self, id: &str) -> Result<InventoryReport, GameError> {
        let result = SessionId::parse(id).and_then(|id| {
            self.store.get_session(&id)?;
            let items = self.store.get_inventory(&id)?.lines();
            Ok(InventoryReport {
                session_id: id,
                items,
            })
        });
        Self::observe("inventory", result)
    }

    pub async fn list_characters(&self) -> Result<CharacterList, GameError> {
        let result = self
            .store
            .list_characters()
            .map(|characters| CharacterList { characters });
        Self::observe("list_characters", result)
    }

    /// Link a character to a session. A session picks its character once.
    pub async fn select_character(&self, id: &str, character_id: u32) -> Result<SessionView, GameError> {
        let id = SessionId::parse(id)?;
        let _guard = self.lock_session(&id).await;
        let result = (|| -> Result<_, GameError> {
            let mut session = self.store.get_session(&id)?;
            if let Some(existing) = session.character_id {
                return Err(GameError::InvalidAction(format!(
                    "character {} already selected",
                    existing
                )));
            }
            let character = self.store.get_character(character_id)?;
            session.character_id = Some(character.id);
            session.touch();
            self.store.put_session(session.clone())?;
            info!("Session {} plays as {}", session.id, character.name);
            Ok(session.view())
        })();
        Self::observe("select_character", result)
    }

    /// Ledger grant for a session (loot batches, admin tooling, tests).
    pub async fn grant_item(&self, id: &str, item_id: &str, quantity: u32) -> Result<GrantReport, GameError> {
        let id = SessionId::parse(id)?;
        if catalog::item(item_id).is_none() {
            return Err(GameError::NotFound(format!("item {}", item_id)));
        }
        let _guard = self.lock_session(&id).await;
        let result = self.store.get_session(&id).and_then(|_| {
            let quantity = self.store.grant_item(&id, item_id, quantity)?;
            Ok(GrantReport {
                item_id: item_id.to_string(),
                quantity,
            })
        });
        Self::observe("grant_item", result)
    }

    pub async fn move_session(&self, id: &str, direction: &str) -> Result<MoveResult, GameError> {
        let direction: Direction = match direction.parse() {
            Ok(d) => d,
            Err(err) => {
                warn!("rejected direction \"{}\"", escape_log(direction));
                return Err(err);
            }
        };
        let id = SessionId::parse(id)?;
        let _guard = self.lock_session(&id).await;
        let result = (|| -> Result<_, GameError> {
            let mut session = self.store.get_session(&id)?;
            let mut inventory = self.store.get_inventory(&id)?;
            let outcome = self.roll_with(|dice| {
                exploration::explore(&mut session, &mut inventory, direction, &self.rules, dice)
            })?;
            session.touch();
            self.store.commit(&session, &inventory, None)?;
            metrics::inc_moves(outcome.event == ExplorationEvent::Encounter);
            Ok(outcome)
        })();
        Self::observe("move", result)
    }

    pub async fn resolve_turn(&self, id: &str, action: &str) -> Result<TurnResult, GameError> {
        let action: Action = match action.parse() {
            Ok(a) => a,
            Err(err) => {
                warn!("rejected action \"{}\"", escape_log(action));
                return Err(err);
            }
        };
        let id = SessionId::parse(id)?;
        let _guard = self.lock_session(&id).await;
        let result = (|| -> Result<_, GameError> {
            let mut session = self.store.get_session(&id)?;
            let mut inventory = self.store.get_inventory(&id)?;
            let mut character = match session.character_id {
                Some(cid) => Some(self.store.get_character(cid)?),
                None => None,
            };
            let report = self.roll_with(|dice| {
                combat::resolve_turn(
                    &mut session,
                    &mut inventory,
                    character.as_mut(),
                    action,
                    &self.rules,
                    dice,
                )
            })?;
            session.touch();
            let changed = if report.character_changed {
                character.as_ref()
            } else {
                None
            };
            self.store.commit(&session, &inventory, changed)?;

            metrics::inc_turns();
            match report.result.outcome {
                Some(BattleOutcome::Victory { .. }) => metrics::inc_victories(),
                Some(BattleOutcome::Defeat) => metrics::inc_defeats(),
                None => {}
            }
            debug!(
                "session {} {:?}: hp={} monster={:?}",
                session.id, action, report.result.player_hp, report.result.monster_hp
            );
            Ok(report.result)
        })();
        Self::observe("resolve_turn", result)
    }

    pub async fn health(&self) -> HealthReport {
        let db_ok = match self.store.ping() {
            Ok(_) => true,
            Err(err) => {
                error!("health check: store unavailable: {}", err);
                false
            }
        };
        HealthReport {
            ok: db_ok,
            db: if db_ok { "up" } else { "down" },
            sessions: if db_ok { self.store.session_count() } else { 0 },
            metrics: metrics::snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::ScriptedDice;
    use crate::game::storage::GameStoreBuilder;
    use tempfile::TempDir;

    fn service(dice: ScriptedDice) -> (GameService, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        (
            GameService::with_dice(store, GameConfig::default(), Box::new(dice)).expect("service"),
            dir,
        )
    }

    #[test]
    fn reply_flattens_data_and_tags_failures() {
        let ok: Reply<GrantReport> = Reply::ok(GrantReport {
            item_id: "potion_heal".into(),
            quantity: 2,
        });
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["quantity"], 2);
        assert!(json.get("error").is_none());

        let err: Reply<GrantReport> = Err(GameError::NoActiveCombat).into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "no_active_combat");
        assert!(json.get("fatal").is_none());
        assert!(!err.fatal);
    }

    #[test]
    fn invalid_rules_are_rejected_at_construction() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let rules = GameConfig {
            encounter_percent: u32::MAX,
            loot_percent: 2,
            ..GameConfig::default()
        };
        assert!(GameService::with_dice(store, rules, Box::new(ScriptedDice::default())).is_err());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_touching_state() {
        let (svc, _dir) = service(ScriptedDice::default());
        let view = svc.create_session(None).await.unwrap();
        let id = view.session_id.to_string();
        assert!(matches!(
            svc.resolve_turn(&id, "dance").await,
            Err(GameError::InvalidAction(_))
        ));
        assert!(matches!(
            svc.move_session(&id, "sideways").await,
            Err(GameError::InvalidAction(_))
        ));
        assert!(matches!(
            svc.resolve_turn("not-a-session", "attack").await,
            Err(GameError::NotFound(_))
        ));
        assert_eq!(svc.session(&id).await.unwrap(), view);
    }

    #[tokio::test]
    async fn character_is_selected_once() {
        let (svc, _dir) = service(ScriptedDice::default());
        let id = svc.create_session(None).await.unwrap().session_id.to_string();
        let view = svc.select_character(&id, 3).await.unwrap();
        assert_eq!(view.character_id, Some(3));
        assert!(matches!(
            svc.select_character(&id, 1).await,
            Err(GameError::InvalidAction(_))
        ));
        assert!(matches!(
            svc.create_session(Some(404)).await,
            Err(GameError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let (svc, _dir) = service(ScriptedDice::default());
        let a = svc.create_session(None).await.unwrap().session_id.to_string();
        let b = svc.create_session(None).await.unwrap().session_id.to_string();
        svc.resolve_turn(&a, "heal").await.unwrap();
        svc.resolve_turn(&b, "heal").await.unwrap();
        // The second acquire prunes the first session's idle entry.
        assert_eq!(svc.tracked_locks(), 1);
    }
}
