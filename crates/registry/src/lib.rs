//! Module registry: owns loaded plugins, their lifecycle state, and
//! evaluation order.

pub mod error;
pub mod registry;

pub use {
    error::{Error, Result},
    registry::{LoadedModule, ModuleInfo, ModuleRegistry, ModuleState},
};
