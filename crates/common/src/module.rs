//! The plugin contract: every loadable module implements [`BotModule`].
//!
//! Modules are registered explicitly (a factory call per module, no
//! reflection-based discovery). The registry owns lifecycle state; the
//! dispatcher drives `can_handle`/`handle`. Failures anywhere in this
//! contract are isolated: a broken module never takes down dispatch.

use {anyhow::Result, async_trait::async_trait};

use crate::types::{MessageContext, ModuleConfig, ModuleResponse};

/// Evaluation priority used when neither the module nor its config says
/// otherwise. Lower runs first.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Trait implemented by every plugin module.
#[async_trait]
pub trait BotModule: Send + Sync {
    /// Unique module name. The registry rejects duplicates.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Evaluation order. Lower values are asked first. A `priority` key in
    /// the module's config overrides this.
    fn default_priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Called once before the module is inserted into the registry. An error
    /// here keeps the module out entirely.
    async fn on_load(&mut self, _config: &ModuleConfig) -> Result<()> {
        Ok(())
    }

    async fn on_unload(&self) -> Result<()> {
        Ok(())
    }

    async fn on_enable(&self) -> Result<()> {
        Ok(())
    }

    async fn on_disable(&self) -> Result<()> {
        Ok(())
    }

    /// Whether this module wants the message. Must be side-effect-free apart
    /// from logging; an `Err` is treated as `false`.
    async fn can_handle(&self, text: &str, ctx: &MessageContext) -> Result<bool>;

    /// Process the message. May perform I/O. `Ok(None)` means "handled,
    /// nothing to say"; an `Err` is treated as no response.
    async fn handle(&self, text: &str, ctx: &MessageContext) -> Result<Option<ModuleResponse>>;
}

/// Output collaborator. The core decides whether and what to send; the sink
/// owns transport framing and delivery.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn deliver(&self, ctx: &MessageContext, response: ModuleResponse) -> Result<()>;
}
