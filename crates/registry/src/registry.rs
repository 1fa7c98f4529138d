//! Registry core: load/unload/enable/disable and ordered snapshots.

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};

use {
    magpie_common::{BotModule, ModuleConfig},
    tracing::{info, warn},
};

use crate::error::{Error, Result};

// ── Lifecycle state ─────────────────────────────────────────────────────────

/// Where a module sits in its lifecycle.
///
/// `Loaded` means registered but never activated (loaded with
/// `enabled = false` in its config). `Disabled` means explicitly deactivated
/// after having been enabled. Both are skipped by the dispatcher. `Unloaded`
/// is only ever observed in the info record returned by [`ModuleRegistry::unload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Loaded,
    Enabled,
    Disabled,
    Unloaded,
}

struct ModuleEntry {
    module: Arc<dyn BotModule>,
    name: String,
    version: String,
    description: String,
    priority: i32,
    state: ModuleState,
    /// Insertion sequence; breaks priority ties deterministically.
    seq: u64,
}

/// One enabled module as seen by a dispatch pass.
#[derive(Clone)]
pub struct LoadedModule {
    pub name: String,
    pub priority: i32,
    pub module: Arc<dyn BotModule>,
}

/// Administrative view of a registered module.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub priority: i32,
    pub state: ModuleState,
}

// ── ModuleRegistry ──────────────────────────────────────────────────────────

/// Owns the set of loaded plugins. Mutations are administrative and
/// infrequent; dispatch passes read consistent point-in-time snapshots.
///
/// Lock discipline: the entry list lives under a `std` RwLock that is never
/// held across an await. Lifecycle hooks run with the lock released.
pub struct ModuleRegistry {
    entries: RwLock<Vec<ModuleEntry>>,
    next_seq: AtomicU64,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Load one module: invoke its `on_load` hook, then register it.
    ///
    /// A duplicate name fails with [`Error::Conflict`] and leaves the
    /// existing module untouched. A failing hook keeps the module out of the
    /// registry entirely.
    pub async fn load(&self, mut module: Box<dyn BotModule>, config: &ModuleConfig) -> Result<()> {
        let name = module.name().to_string();
        if self.contains(&name) {
            return Err(Error::conflict(name));
        }

        module
            .on_load(config)
            .await
            .map_err(|e| Error::load(name.clone(), e))?;

        let priority = config.priority.unwrap_or_else(|| module.default_priority());
        let state = if config.enabled {
            ModuleState::Enabled
        } else {
            ModuleState::Loaded
        };
        let version = module.version().to_string();
        let description = module.description().to_string();

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // Re-check: another load may have won the name while on_load ran.
        if entries.iter().any(|e| e.name == name) {
            return Err(Error::conflict(name));
        }
        entries.push(ModuleEntry {
            module: Arc::from(module),
            name: name.clone(),
            version: version.clone(),
            description,
            priority,
            state,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        });
        drop(entries);

        info!(module = %name, version = %version, priority, "module loaded");
        Ok(())
    }

    /// Load a batch of modules with fault isolation: a failing module is
    /// logged and skipped, the rest continue loading. Returns how many made
    /// it in.
    pub async fn load_many(
        &self,
        batch: impl IntoIterator<Item = (Box<dyn BotModule>, ModuleConfig)>,
    ) -> usize {
        let mut loaded = 0;
        for (module, config) in batch {
            let name = module.name().to_string();
            match self.load(module, &config).await {
                Ok(()) => loaded += 1,
                Err(e) => warn!(module = %name, error = %e, "module failed to load, skipping"),
            }
        }
        loaded
    }

    /// Remove a module and invoke its `on_unload` hook. A failing hook is
    /// logged; the module is gone either way.
    pub async fn unload(&self, name: &str) -> Result<ModuleInfo> {
        let entry = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let idx = entries
                .iter()
                .position(|e| e.name == name)
                .ok_or_else(|| Error::not_found(name))?;
            entries.remove(idx)
        };

        if let Err(e) = entry.module.on_unload().await {
            warn!(module = %name, error = %e, "on_unload hook failed");
        }
        info!(module = %name, "module unloaded");

        Ok(ModuleInfo {
            name: entry.name,
            version: entry.version,
            description: entry.description,
            priority: entry.priority,
            state: ModuleState::Unloaded,
        })
    }

    /// Enable a module. Idempotent: enabling an already-enabled module is a
    /// no-op and its hook does not run again.
    pub async fn enable(&self, name: &str) -> Result<()> {
        let Some(module) = self.transition(name, ModuleState::Enabled)? else {
            return Ok(());
        };
        if let Err(e) = module.on_enable().await {
            warn!(module = %name, error = %e, "on_enable hook failed");
        }
        info!(module = %name, "module enabled");
        Ok(())
    }

    /// Disable a module. It stays registered but dispatch skips it.
    pub async fn disable(&self, name: &str) -> Result<()> {
        let Some(module) = self.transition(name, ModuleState::Disabled)? else {
            return Ok(());
        };
        if let Err(e) = module.on_disable().await {
            warn!(module = %name, error = %e, "on_disable hook failed");
        }
        info!(module = %name, "module disabled");
        Ok(())
    }

    /// Flip a module's state under the lock. Returns the module handle when
    /// an actual transition happened (the caller then runs the hook outside
    /// the lock), `None` when already in the target state.
    fn transition(&self, name: &str, target: ModuleState) -> Result<Option<Arc<dyn BotModule>>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::not_found(name))?;
        if entry.state == target {
            return Ok(None);
        }
        entry.state = target;
        Ok(Some(Arc::clone(&entry.module)))
    }

    /// Enabled modules sorted ascending by priority, ties broken by load
    /// order. A consistent point-in-time copy: later registry mutations do
    /// not affect a snapshot already taken.
    pub fn ordered_snapshot(&self) -> Vec<LoadedModule> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut snapshot: Vec<(i32, u64, LoadedModule)> = entries
            .iter()
            .filter(|e| e.state == ModuleState::Enabled)
            .map(|e| {
                (e.priority, e.seq, LoadedModule {
                    name: e.name.clone(),
                    priority: e.priority,
                    module: Arc::clone(&e.module),
                })
            })
            .collect();
        snapshot.sort_by_key(|(priority, seq, _)| (*priority, *seq));
        snapshot.into_iter().map(|(_, _, m)| m).collect()
    }

    /// Administrative listing of every registered module, in load order.
    pub fn module_infos(&self) -> Vec<ModuleInfo> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|e| ModuleInfo {
                name: e.name.clone(),
                version: e.version.clone(),
                description: e.description.clone(),
                priority: e.priority,
                state: e.state,
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().any(|e| e.name == name)
    }

    /// Unload everything, for shutdown. Hook failures are logged and do not
    /// stop the teardown.
    pub async fn unload_all(&self) {
        let drained: Vec<ModuleEntry> = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.drain(..).collect()
        };
        for entry in drained {
            if let Err(e) = entry.module.on_unload().await {
                warn!(module = %entry.name, error = %e, "on_unload hook failed");
            }
        }
        info!("all modules unloaded");
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        anyhow::bail,
        async_trait::async_trait,
        magpie_common::{MessageContext, ModuleResponse},
    };

    use super::*;

    struct TestModule {
        module_name: String,
        priority: i32,
        fail_load: bool,
    }

    impl TestModule {
        fn new(name: &str, priority: i32) -> Self {
            Self {
                module_name: name.into(),
                priority,
                fail_load: false,
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                fail_load: true,
                ..Self::new(name, 50)
            }
        }
    }

    #[async_trait]
    impl BotModule for TestModule {
        fn name(&self) -> &str {
            &self.module_name
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn default_priority(&self) -> i32 {
            self.priority
        }

        async fn on_load(&mut self, _config: &ModuleConfig) -> anyhow::Result<()> {
            if self.fail_load {
                bail!("init blew up");
            }
            Ok(())
        }

        async fn can_handle(&self, _text: &str, _ctx: &MessageContext) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn handle(
            &self,
            _text: &str,
            _ctx: &MessageContext,
        ) -> anyhow::Result<Option<ModuleResponse>> {
            Ok(None)
        }
    }

    fn boxed(module: TestModule) -> Box<dyn BotModule> {
        Box::new(module)
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_and_keeps_original() {
        let registry = ModuleRegistry::new();
        registry
            .load(boxed(TestModule::new("echo", 10)), &ModuleConfig::default())
            .await
            .unwrap();

        let err = registry
            .load(boxed(TestModule::new("echo", 99)), &ModuleConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        let infos = registry.module_infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].priority, 10);
    }

    #[tokio::test]
    async fn failed_on_load_keeps_module_out() {
        let registry = ModuleRegistry::new();
        let err = registry
            .load(boxed(TestModule::failing("broken")), &ModuleConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        assert!(!registry.contains("broken"));
    }

    #[tokio::test]
    async fn load_many_isolates_failures() {
        let registry = ModuleRegistry::new();
        let loaded = registry
            .load_many(vec![
                (boxed(TestModule::new("a", 1)), ModuleConfig::default()),
                (boxed(TestModule::failing("bad")), ModuleConfig::default()),
                (boxed(TestModule::new("b", 2)), ModuleConfig::default()),
            ])
            .await;
        assert_eq!(loaded, 2);
        assert!(registry.contains("a"));
        assert!(registry.contains("b"));
        assert!(!registry.contains("bad"));
    }

    #[tokio::test]
    async fn snapshot_sorts_by_priority_then_insertion() {
        let registry = ModuleRegistry::new();
        registry
            .load(boxed(TestModule::new("late-high", 5)), &ModuleConfig::default())
            .await
            .unwrap();
        registry
            .load(boxed(TestModule::new("tie-first", 10)), &ModuleConfig::default())
            .await
            .unwrap();
        registry
            .load(boxed(TestModule::new("tie-second", 10)), &ModuleConfig::default())
            .await
            .unwrap();
        registry
            .load(boxed(TestModule::new("top", 1)), &ModuleConfig::default())
            .await
            .unwrap();

        let names: Vec<_> = registry
            .ordered_snapshot()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["top", "late-high", "tie-first", "tie-second"]);
    }

    #[tokio::test]
    async fn config_priority_overrides_default() {
        let registry = ModuleRegistry::new();
        let config = ModuleConfig {
            priority: Some(3),
            ..ModuleConfig::default()
        };
        registry
            .load(boxed(TestModule::new("pinned", 80)), &config)
            .await
            .unwrap();
        assert_eq!(registry.ordered_snapshot()[0].priority, 3);
    }

    #[tokio::test]
    async fn disabled_modules_skip_snapshot_but_stay_registered() {
        let registry = ModuleRegistry::new();
        registry
            .load(boxed(TestModule::new("echo", 10)), &ModuleConfig::default())
            .await
            .unwrap();

        registry.disable("echo").await.unwrap();
        assert!(registry.ordered_snapshot().is_empty());
        assert!(registry.contains("echo"));
        assert_eq!(registry.module_infos()[0].state, ModuleState::Disabled);

        registry.enable("echo").await.unwrap();
        assert_eq!(registry.ordered_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn enable_is_idempotent() {
        let registry = ModuleRegistry::new();
        registry
            .load(boxed(TestModule::new("echo", 10)), &ModuleConfig::default())
            .await
            .unwrap();
        registry.enable("echo").await.unwrap();
        registry.enable("echo").await.unwrap();
        assert_eq!(registry.module_infos()[0].state, ModuleState::Enabled);
    }

    #[tokio::test]
    async fn load_disabled_starts_inactive() {
        let registry = ModuleRegistry::new();
        let config = ModuleConfig {
            enabled: false,
            ..ModuleConfig::default()
        };
        registry
            .load(boxed(TestModule::new("sleeper", 10)), &config)
            .await
            .unwrap();
        assert!(registry.ordered_snapshot().is_empty());
        assert_eq!(registry.module_infos()[0].state, ModuleState::Loaded);
    }

    #[tokio::test]
    async fn unload_unknown_is_not_found() {
        let registry = ModuleRegistry::new();
        let err = registry.unload("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn unload_removes_and_reports_state() {
        let registry = ModuleRegistry::new();
        registry
            .load(boxed(TestModule::new("echo", 10)), &ModuleConfig::default())
            .await
            .unwrap();
        let info = registry.unload("echo").await.unwrap();
        assert_eq!(info.state, ModuleState::Unloaded);
        assert!(!registry.contains("echo"));
    }

    #[tokio::test]
    async fn snapshot_is_point_in_time() {
        let registry = ModuleRegistry::new();
        registry
            .load(boxed(TestModule::new("echo", 10)), &ModuleConfig::default())
            .await
            .unwrap();
        let snapshot = registry.ordered_snapshot();
        registry.unload("echo").await.unwrap();
        // The earlier snapshot still holds its handle.
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "echo");
    }
}
