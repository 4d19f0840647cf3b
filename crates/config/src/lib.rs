//! Configuration for the botforge service.
//!
//! Layering, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. Config file (`botforge.{toml,yaml,yml,json}`, project-local then
//!    `~/.config/botforge/`), with `${VAR}` substitution
//! 3. Environment variables: `TELEGRAM_API_ID`, `TELEGRAM_API_HASH`,
//!    `HOST`, `PORT`, `LARAVEL_SECRET_KEY`, `SESSION_PATH`

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, load_config},
    schema::BotforgeConfig,
};
