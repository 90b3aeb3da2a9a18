use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::GameError;

pub const SESSION_SCHEMA_VERSION: u8 = 1;
pub const INVENTORY_SCHEMA_VERSION: u8 = 1;
pub const CHARACTER_SCHEMA_VERSION: u8 = 1;

/// Upper bound for both player and monster hit points.
pub const MAX_HP: u8 = 100;
/// Largest coordinate on either axis of the 5x5 exploration grid.
pub const GRID_MAX: u8 = 4;

/// Opaque session token (UUID v4 in its hyphenated form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied id. Anything that is not a UUID cannot name a session.
    pub fn parse(raw: &str) -> Result<Self, GameError> {
        let trimmed = raw.trim();
        match Uuid::parse_str(trimmed) {
            Ok(uuid) => Ok(Self(uuid.hyphenated().to_string())),
            Err(_) => Err(GameError::NotFound(format!("session: {}", trimmed))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: u8, y: u8) -> Self {
        Self {
            x: x.min(GRID_MAX),
            y: y.min(GRID_MAX),
        }
    }

    /// One step in `direction`, clamped to the grid. Walking into a wall leaves the position as is.
    pub fn step(self, direction: Direction) -> Position {
        match direction {
            Direction::Up => Position::new(self.x, self.y.saturating_sub(1)),
            Direction::Down => Position::new(self.x, self.y.saturating_add(1)),
            Direction::Left => Position::new(self.x.saturating_sub(1), self.y),
            Direction::Right => Position::new(self.x.saturating_add(1), self.y),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for Direction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "north" | "n" | "cima" => Ok(Direction::Up),
            "down" | "south" | "s" | "baixo" => Ok(Direction::Down),
            "left" | "west" | "w" | "esquerda" => Ok(Direction::Left),
            "right" | "east" | "e" | "direita" => Ok(Direction::Right),
            other => Err(GameError::InvalidAction(format!("unknown direction '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Attack,
    Block,
    Heal,
}

impl FromStr for Action {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attack" | "atacar" => Ok(Action::Attack),
            "block" | "bloquear" | "defend" => Ok(Action::Block),
            "heal" | "curar" => Ok(Action::Heal),
            other => Err(GameError::InvalidAction(format!("unknown action '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombatState {
    NotInCombat,
    InCombat,
}

/// Durable per-session row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub player_hp: u8,
    pub monster_hp: u8,
    pub position: Position,
    pub in_combat: bool,
    pub character_id: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub last_action_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl SessionRecord {
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            player_hp: MAX_HP,
            monster_hp: 0,
            position: Position::ORIGIN,
            in_combat: false,
            character_id: None,
            created_at: now,
            last_action_at: now,
            schema_version: SESSION_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_action_at = Utc::now();
    }

    pub fn combat_state(&self) -> CombatState {
        if self.in_combat {
            CombatState::InCombat
        } else {
            CombatState::NotInCombat
        }
    }

    /// Monster HP as clients see it: absent whenever no battle is running.
    pub fn visible_monster_hp(&self) -> Option<u8> {
        self.in_combat.then_some(self.monster_hp)
    }

    /// Pull a record read from storage back inside the documented bounds.
    pub fn normalize(&mut self) {
        self.player_hp = self.player_hp.min(MAX_HP);
        self.monster_hp = self.monster_hp.min(MAX_HP);
        self.position = Position::new(self.position.x, self.position.y);
        // A fight against a dead monster is already over.
        if !self.in_combat || self.monster_hp == 0 {
            self.end_combat();
        }
    }

    pub fn start_encounter(&mut self) {
        self.in_combat = true;
        self.monster_hp = MAX_HP;
    }

    pub fn end_combat(&mut self) {
        self.in_combat = false;
        self.monster_hp = 0;
    }

    /// Back to the spawn point with full health. The character link survives.
    pub fn reset_after_defeat(&mut self) {
        self.player_hp = MAX_HP;
        self.position = Position::ORIGIN;
        self.end_combat();
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            player_hp: self.player_hp,
            monster_hp: self.visible_monster_hp(),
            position: self.position,
            in_combat: self.in_combat,
            character_id: self.character_id,
            last_action_at: self.last_action_at,
        }
    }
}

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionView {
    pub session_id: SessionId,
    pub player_hp: u8,
    pub monster_hp: Option<u8>,
    pub position: Position,
    pub in_combat: bool,
    pub character_id: Option<u32>,
    pub last_action_at: DateTime<Utc>,
}

/// Playable character template, seeded into the store and levelled up on victories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterRecord {
    pub id: u32,
    pub name: String,
    pub class: String,
    pub attack: u32,
    pub defense: u32,
    pub base_hp: u8,
    pub level: u8,
    pub schema_version: u8,
}

impl CharacterRecord {
    pub fn new(id: u32, name: &str, class: &str, attack: u32, defense: u32, base_hp: u8) -> Self {
        Self {
            id,
            name: name.to_string(),
            class: class.to_string(),
            attack,
            defense,
            base_hp: base_hp.min(MAX_HP),
            level: 1,
            schema_version: CHARACTER_SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Potion,
    Weapon,
    Armor,
}

impl ItemKind {
    /// Weapons and armor wear out in battle; potions do not.
    pub fn is_gear(self) -> bool {
        matches!(self, ItemKind::Weapon | ItemKind::Armor)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Item {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplorationEvent {
    Encounter,
    Loot {
        item_id: String,
        item_name: String,
        quantity: u32,
    },
    Nothing,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MoveResult {
    pub direction: Direction,
    pub position: Position,
    /// False when the step ran into the edge of the map.
    pub moved: bool,
    pub event: ExplorationEvent,
    pub description: String,
    pub player_hp: u8,
    pub monster_hp: Option<u8>,
    pub in_combat: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory {
        reward_potions: u32,
        character_level: Option<u8>,
    },
    Defeat,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TurnResult {
    pub action: Action,
    pub player_message: String,
    pub monster_message: String,
    pub player_hp: u8,
    pub monster_hp: Option<u8>,
    pub in_combat: bool,
    pub outcome: Option<BattleOutcome>,
    pub broken_item: Option<String>,
}
