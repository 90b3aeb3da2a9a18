//! # Configuration Management Module
//!
//! Loads the TOML configuration for the game server. Every section has defaults, so a missing
//! file section falls back to the values produced by [`Config::default`].
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - HTTP bind address, port and optional static directory
//! - [`StorageConfig`] - Data directory and sled database path
//! - [`GameConfig`] - Exploration odds, combat odds, loot table and RNG seed
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 10000
//!
//! [storage]
//! data_dir = "./data"
//!
//! [game]
//! encounter_percent = 35
//! loot_percent = 25
//! monster_attack_percent = 65
//! gear_break_percent = 5
//! serialize_session_turns = true
//! ```
//!
//! ## Environment Integration
//!
//! `PORT` and `DATA_DIR` override the file values, and CLI flags override both:
//! CLI args > Environment > Config file > Defaults

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::game::catalog;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Directory with the browser client. Served for any path the API does not claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 10000,
            static_dir: Some("public".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the sled database path; defaults to `<data_dir>/game`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            db_path: None,
        }
    }
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("game"),
        }
    }
}

/// Odds and content for exploration and combat. Percentages are whole numbers in 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Chance that a step spawns a monster.
    #[serde(default = "default_encounter_percent")]
    pub encounter_percent: u32,
    /// Chance that a step finds loot (checked in the window after the encounter chance).
    #[serde(default = "default_loot_percent")]
    pub loot_percent: u32,
    /// Chance that the monster attacks instead of blocking.
    #[serde(default = "default_monster_attack_percent")]
    pub monster_attack_percent: u32,
    /// Chance per attack/block that a piece of gear breaks.
    #[serde(default = "default_gear_break_percent")]
    pub gear_break_percent: u32,
    /// Item ids picked uniformly on a loot roll; repeat an id to weight it.
    #[serde(default = "catalog::default_loot_table")]
    pub loot_table: Vec<String>,
    /// Descriptions shown when a step finds nothing.
    #[serde(default = "catalog::default_flavor_texts")]
    pub flavor_texts: Vec<String>,
    /// Fixed seed for reproducible runs. Random when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    /// Serialize mutations per session id. Disabling restores the legacy last-writer-wins race.
    #[serde(default = "default_serialize_session_turns")]
    pub serialize_session_turns: bool,
}

fn default_encounter_percent() -> u32 {
    35
}

fn default_loot_percent() -> u32 {
    25
}

fn default_monster_attack_percent() -> u32 {
    65
}

fn default_gear_break_percent() -> u32 {
    5
}

fn default_serialize_session_turns() -> bool {
    true
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            encounter_percent: default_encounter_percent(),
            loot_percent: default_loot_percent(),
            monster_attack_percent: default_monster_attack_percent(),
            gear_break_percent: default_gear_break_percent(),
            loot_table: catalog::default_loot_table(),
            flavor_texts: catalog::default_flavor_texts(),
            rng_seed: None,
            serialize_session_turns: default_serialize_session_turns(),
        }
    }
}

impl GameConfig {
    /// Exploration must keep all three outcomes reachable, and loot must exist in the catalog.
    pub fn validate(&self) -> Result<()> {
        let percents = [
            ("encounter_percent", self.encounter_percent),
            ("loot_percent", self.loot_percent),
            ("monster_attack_percent", self.monster_attack_percent),
            ("gear_break_percent", self.gear_break_percent),
        ];
        if let Some((name, value)) = percents.iter().find(|(_, v)| *v > 100) {
            bail!("game.{} must be within 0..=100 (got {})", name, value);
        }
        if self.encounter_percent == 0 || self.loot_percent == 0 {
            bail!("game.encounter_percent and game.loot_percent must be greater than zero");
        }
        let searched = self.encounter_percent + self.loot_percent;
        if searched >= 100 {
            bail!(
                "game.encounter_percent + game.loot_percent must leave room for empty steps (got {})",
                searched
            );
        }
        if self.loot_table.is_empty() {
            bail!("game.loot_table must list at least one item");
        }
        if let Some(unknown) = self.loot_table.iter().find(|id| catalog::item(id).is_none()) {
            bail!("game.loot_table references unknown item '{}'", unknown);
        }
        if self.flavor_texts.is_empty() {
            bail!("game.flavor_texts must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file, apply environment overrides and validate.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.apply_env_overrides();
        config.game.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a config file.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.game.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(dir) = std::env::var("DATA_DIR") {
            if !dir.trim().is_empty() {
                self.storage.data_dir = dir;
            }
        }
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_game_config_is_valid() {
        let cfg = GameConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.encounter_percent, 35);
        assert_eq!(cfg.loot_percent, 25);
        assert!(cfg.serialize_session_turns);
    }

    #[test]
    fn rejects_missing_outcome_branches() {
        let mut cfg = GameConfig {
            loot_percent: 0,
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.loot_percent = 65;
        assert!(cfg.validate().is_err(), "nothing-branch would be empty");
        cfg.loot_percent = 25;
        cfg.loot_table = vec!["excalibur".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_percentages_are_errors() {
        let cfg = GameConfig {
            encounter_percent: u32::MAX,
            loot_percent: 2,
            ..GameConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("encounter_percent"));

        let cfg = GameConfig {
            gear_break_percent: 101,
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());

        let parsed: Config = toml::from_str("[game]\nloot_percent = 4294967295\n").expect("parse");
        assert!(parsed.game.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1"
            port = 8080

            [game]
            encounter_percent = 50
            rng_seed = 7
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.game.encounter_percent, 50);
        assert_eq!(cfg.game.loot_percent, 25);
        assert_eq!(cfg.game.rng_seed, Some(7));
        assert_eq!(cfg.storage.resolved_db_path(), PathBuf::from("./data").join("game"));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).expect("serialize");
        let back: Config = toml::from_str(&text).expect("parse");
        assert_eq!(back.server.port, 10000);
        assert_eq!(back.game.loot_table, catalog::default_loot_table());
    }
}
