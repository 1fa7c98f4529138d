//! Configuration loading and schema.
//!
//! Config files: `magpie.toml`, `magpie.yaml`, or `magpie.json`,
//! searched in `./` then `~/.config/magpie/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file text.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{BotConfig, DedupConfig, DispatchConfig, LoggingConfig, MagpieConfig},
};
