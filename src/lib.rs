//! # rpgsgbd - Backend for a Browser Turn-Based RPG
//!
//! rpgsgbd keeps the state of a small browser combat game: a player walks a 5×5 grid, stumbles
//! into monsters or loot, and fights turn by turn with attack, block and heal.
//!
//! ## Features
//!
//! - **Session Store**: Sled-backed session rows with schema versions and atomic multi-row commits.
//! - **Inventory Ledger**: Per-session item quantities with grant/consume that never go negative.
//! - **Exploration Engine**: Grid movement with configurable encounter and loot odds.
//! - **Combat Resolver**: Attack, block and heal turns with gear wear, rewards and level-ups.
//! - **Injectable Dice**: Every random draw goes through the [`game::Dice`] trait; seed it or script it.
//! - **HTTP Shell**: axum routes with the legacy Portuguese aliases still mounted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rpgsgbd::config::Config;
//! use rpgsgbd::game::{GameService, GameStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = GameStore::open(config.storage.resolved_db_path())?;
//!     let service = Arc::new(GameService::new(store, config.game.clone())?);
//!     rpgsgbd::web::serve(service, &config.server).await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - Records, engines, dice, storage and the service facade
//! - [`web`] - axum router and server loop
//! - [`config`] - Configuration management and validation
//! - [`metrics`] - Process-wide counters reported by `/health`
//! - [`logutil`] - Escaping for client strings in log lines
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP Shell    │ ← Request parsing, status codes
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Game Service   │ ← Per-session locking, load/commit
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Engines + Store │ ← Exploration, combat, sled rows
//! └─────────────────┘
//! ```

pub mod config;
pub mod game;
pub mod logutil;
pub mod metrics;
pub mod web;
