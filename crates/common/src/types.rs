//! Value objects crossing the module boundary.
//!
//! These are produced by the transport collaborator, consumed read-only by
//! modules, and handed back to the output collaborator. Field sets are the
//! contract; collaborators populate and consume them verbatim.

use std::{collections::HashMap, fmt};

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

// ── BotId ───────────────────────────────────────────────────────────────────

/// Numeric account identity of one bot process.
///
/// Several redundant processes may share the same identity pool; arbitration
/// compares these values against the configured priority list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct BotId(pub u64);

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BotId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ── MessageContext ──────────────────────────────────────────────────────────

/// Immutable per-message context handed to every module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContext {
    /// Origin group, `None` for direct messages.
    pub group_id: Option<i64>,
    pub sender_id: u64,
    pub message_id: Option<i64>,
    /// Which of our identities received this message.
    pub self_id: BotId,
    /// Text as delivered by the transport, inline markup included.
    pub raw_text: String,
    /// Plain-text view with transport markup stripped. Filled by the
    /// dispatcher before any module sees the context.
    pub text: String,
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl MessageContext {
    /// Context for a direct (non-group) message.
    pub fn direct(self_id: BotId, sender_id: u64, raw_text: impl Into<String>) -> Self {
        Self {
            group_id: None,
            sender_id,
            message_id: None,
            self_id,
            raw_text: raw_text.into(),
            text: String::new(),
            extra: HashMap::new(),
        }
    }

    /// Context for a group message.
    pub fn group(
        self_id: BotId,
        group_id: i64,
        sender_id: u64,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::direct(self_id, sender_id, raw_text)
        }
    }
}

// ── ModuleResponse ──────────────────────────────────────────────────────────

fn default_recall_delay() -> u64 {
    30
}

/// What a module wants sent back, if anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleResponse {
    pub content: String,
    /// Ask the output collaborator to recall the message after
    /// `recall_delay_secs`.
    #[serde(default)]
    pub auto_recall: bool,
    #[serde(default = "default_recall_delay")]
    pub recall_delay_secs: u64,
    /// Message to quote in the reply, if any.
    pub quoted_msg_id: Option<i64>,
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl ModuleResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            auto_recall: false,
            recall_delay_secs: default_recall_delay(),
            quoted_msg_id: None,
            extra: HashMap::new(),
        }
    }

    /// Mark the response for auto-recall after `delay_secs`.
    #[must_use]
    pub fn with_recall(mut self, delay_secs: u64) -> Self {
        self.auto_recall = true;
        self.recall_delay_secs = delay_secs;
        self
    }

    #[must_use]
    pub fn quoting(mut self, message_id: i64) -> Self {
        self.quoted_msg_id = Some(message_id);
        self
    }
}

// ── ModuleConfig ────────────────────────────────────────────────────────────

fn default_enabled() -> bool {
    true
}

/// Per-module configuration table, passed to `on_load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the module's default evaluation priority when set.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Opaque module-owned settings; the core never interprets these.
    #[serde(default)]
    pub settings: Value,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
            settings: Value::Null,
        }
    }
}
