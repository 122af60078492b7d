//! # Finance bot application
//!
//! Wires `dialogue`, `storage` and `finbot-telegram`. Loads config from env, seeds and lists the
//! catalog, and runs the bot with an idle-session sweeper.

pub mod cli;
pub mod components;
pub mod config;
pub mod runner;
pub mod seed;

pub use cli::{load_config, Cli, Commands};
pub use components::{
    build_bot_components, build_engine, build_clock, build_renderer, open_catalog, open_ledger,
    BotComponents,
};
pub use config::{BaseConfig, BotConfig, DialogueExtensions};
pub use runner::{run_bot, spawn_idle_sweeper, sweep_idle, SWEEP_INTERVAL};
pub use seed::{render_catalog, CatalogSeed, GroupSeed, SeedSummary};
