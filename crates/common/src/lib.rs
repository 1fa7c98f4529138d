//! Shared types, error definitions, and the plugin contract used across all magpie crates.

pub mod error;
pub mod module;
pub mod types;

pub use {
    error::{Error, FromMessage, MagpieError, Result},
    module::{BotModule, ResponseSink},
    types::{BotId, MessageContext, ModuleConfig, ModuleResponse},
};
