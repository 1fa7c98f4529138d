//! Typed configuration schema with serde defaults throughout: an empty file
//! (or none at all) yields a fully usable config.

use std::collections::HashMap;

use {
    magpie_common::{BotId, ModuleConfig},
    serde::{Deserialize, Serialize},
};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MagpieConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-module tables, keyed by module name.
    #[serde(default)]
    pub modules: HashMap<String, ModuleConfig>,
}

impl MagpieConfig {
    /// Config for `module`, or the default table when the file has none.
    pub fn module_config(&self, module: &str) -> ModuleConfig {
        self.modules.get(module).cloned().unwrap_or_default()
    }
}

/// Identity pool shared by the redundant instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Identities this process may connect as.
    #[serde(default)]
    pub identities: Vec<BotId>,
    /// Responder order for single-responder triggers, most preferred first.
    /// Shared verbatim by every instance so they all pick the same winner.
    #[serde(default)]
    pub priority: Vec<BotId>,
}

fn default_check_timeout() -> u64 {
    5
}

fn default_handle_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,
    #[serde(default = "default_handle_timeout")]
    pub handle_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            check_timeout_secs: default_check_timeout(),
            handle_timeout_secs: default_handle_timeout(),
        }
    }
}

fn default_text_ttl() -> u64 {
    300
}

fn default_image_ttl() -> u64 {
    40
}

fn default_sweep_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_text_ttl")]
    pub text_ttl_secs: u64,
    #[serde(default = "default_image_ttl")]
    pub image_ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            text_ttl_secs: default_text_ttl(),
            image_ttl_secs: default_image_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
