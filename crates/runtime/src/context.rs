//! The process-scoped context object.

use std::{sync::Arc, time::Duration};

use {
    magpie_arbiter::{BotTracker, Liveness, PriorityArbiter, Visibility},
    magpie_common::{BotModule, Error, Result},
    magpie_config::MagpieConfig,
    magpie_dedup::{DedupEngine, DedupRetention, MemoryDedupStore},
    magpie_dispatch::{DispatchTimeouts, EventDispatcher, MarkupStripper},
    magpie_registry::ModuleRegistry,
    tokio::task::JoinHandle,
    tracing::info,
};

/// Factory producing one module instance.
pub type ModuleFactory = Box<dyn Fn() -> Box<dyn BotModule> + Send + Sync>;

/// Explicit registration list: one factory call per module. No reflection,
/// no directory scanning. What is listed here is what can load.
#[derive(Default)]
pub struct ModuleManifest {
    factories: Vec<ModuleFactory>,
}

impl ModuleManifest {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(
        mut self,
        factory: impl Fn() -> Box<dyn BotModule> + Send + Sync + 'static,
    ) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Everything one bot process owns, wired together once at startup.
///
/// Shared state across concurrent tasks is limited to the tracker's liveness
/// view and the dedup store; module-local state stays inside each module.
pub struct BotContext {
    pub config: MagpieConfig,
    pub registry: Arc<ModuleRegistry>,
    pub dispatcher: EventDispatcher,
    pub arbiter: Arc<PriorityArbiter>,
    pub tracker: Arc<BotTracker>,
    pub dedup: Arc<DedupEngine>,
    sweeper: JoinHandle<()>,
}

impl BotContext {
    /// Construct the full runtime and load the manifest's modules.
    ///
    /// Module failures are isolated (logged, skipped); a context with zero
    /// loaded modules is still a working context. Only construction of the
    /// core itself can fail, and that failure is fatal to startup.
    pub async fn start(config: MagpieConfig, manifest: ModuleManifest) -> Result<Arc<Self>> {
        // A zero interval would panic the sweeper's ticker; zero timeouts
        // would abandon every plugin invocation immediately.
        if config.dedup.sweep_interval_secs == 0 {
            return Err(Error::message("dedup.sweep_interval_secs must be at least 1"));
        }
        if config.dispatch.check_timeout_secs == 0 || config.dispatch.handle_timeout_secs == 0 {
            return Err(Error::message("dispatch timeouts must be non-zero"));
        }

        let tracker = Arc::new(BotTracker::new());
        let liveness: Arc<dyn Liveness> = tracker.clone();
        let visibility: Arc<dyn Visibility> = tracker.clone();
        let arbiter = Arc::new(
            PriorityArbiter::new(config.bot.priority.clone(), liveness)
                .with_visibility(visibility),
        );

        let registry = Arc::new(ModuleRegistry::new());
        let total = manifest.len();
        let batch = manifest.factories.iter().map(|factory| {
            let module = factory();
            let module_config = config.module_config(module.name());
            (module, module_config)
        });
        let loaded = registry.load_many(batch.collect::<Vec<_>>()).await;
        info!(loaded, total, "modules loaded");

        let dispatcher = EventDispatcher::new(
            Arc::clone(&registry),
            Arc::new(MarkupStripper::new()),
        )
        .with_timeouts(DispatchTimeouts {
            check: Duration::from_secs(config.dispatch.check_timeout_secs),
            handle: Duration::from_secs(config.dispatch.handle_timeout_secs),
        });

        let dedup = Arc::new(DedupEngine::new(
            Arc::new(MemoryDedupStore::new()),
            DedupRetention {
                text_ttl: Duration::from_secs(config.dedup.text_ttl_secs),
                image_ttl: Duration::from_secs(config.dedup.image_ttl_secs),
            },
        ));
        let sweeper = dedup.spawn_sweeper(Duration::from_secs(config.dedup.sweep_interval_secs));

        Ok(Arc::new(Self {
            config,
            registry,
            dispatcher,
            arbiter,
            tracker,
            dedup,
            sweeper,
        }))
    }

    /// Tear down: stop background work, unload every module.
    pub async fn shutdown(&self) {
        self.sweeper.abort();
        self.registry.unload_all().await;
        info!("runtime stopped");
    }
}
