//! Game core: session records, the inventory ledger, exploration and combat engines,
//! the dice they roll, and the sled store that keeps it all.
//! The engines are plain functions over borrowed state; [`GameService`] loads, locks and
//! commits around them.

pub mod catalog;
pub mod combat;
pub mod dice;
pub mod errors;
pub mod exploration;
pub mod inventory;
pub mod service;
pub mod storage;
pub mod types;

pub use catalog::{item, item_name, starter_characters, HEALING_POTION_ID};
pub use combat::{level_up, resolve_turn, TurnReport};
pub use dice::{Dice, ScriptedDice};
pub use errors::{ErrorKind, GameError};
pub use exploration::explore;
pub use inventory::{Inventory, InventoryEntry, InventoryLine};
pub use service::{
    CharacterList, GameService, GrantReport, HealthReport, InventoryReport, Reply,
};
pub use storage::{GameStore, GameStoreBuilder};
pub use types::*;
