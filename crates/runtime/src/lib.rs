//! Process-scoped wiring: one [`BotContext`] per process, constructed at
//! startup, torn down at shutdown. Nothing in here is ambient; components
//! receive the context explicitly.

pub mod context;
pub mod telemetry;

pub use {
    context::{BotContext, ModuleManifest},
    telemetry::init_telemetry,
};
