//! First-match, fault-isolated dispatch over the module chain.

use std::{sync::Arc, time::Duration};

use {
    magpie_common::{MessageContext, ModuleResponse, ResponseSink},
    magpie_registry::ModuleRegistry,
    tokio::time::timeout,
    tracing::{debug, warn},
};

use crate::normalize::TextNormalizer;

/// Upper bounds on plugin invocations. A module that blows past its bound
/// is abandoned, not waited on.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTimeouts {
    pub check: Duration,
    pub handle: Duration,
}

impl Default for DispatchTimeouts {
    fn default() -> Self {
        Self {
            check: Duration::from_secs(5),
            handle: Duration::from_secs(30),
        }
    }
}

/// Routes incoming messages through the registry's module chain.
///
/// Dispatch passes for independent messages may run concurrently; within one
/// message the chain is strictly sequential. No plugin failure, whether an
/// error or a timeout in `can_handle` or `handle`, ever reaches the caller.
pub struct EventDispatcher {
    registry: Arc<ModuleRegistry>,
    normalizer: Arc<dyn TextNormalizer>,
    timeouts: DispatchTimeouts,
}

impl EventDispatcher {
    pub fn new(registry: Arc<ModuleRegistry>, normalizer: Arc<dyn TextNormalizer>) -> Self {
        Self {
            registry,
            normalizer,
            timeouts: DispatchTimeouts::default(),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: DispatchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Route one message. Returns the selected module's response, or `None`
    /// when no module accepts or the selected module produced nothing.
    pub async fn dispatch(&self, mut ctx: MessageContext) -> Option<ModuleResponse> {
        ctx.text = self.normalizer.normalize(&ctx.raw_text);

        for candidate in self.registry.ordered_snapshot() {
            let accepts = match timeout(
                self.timeouts.check,
                candidate.module.can_handle(&ctx.text, &ctx),
            )
            .await
            {
                Ok(Ok(accepts)) => accepts,
                Ok(Err(e)) => {
                    warn!(module = %candidate.name, error = %e, "can_handle failed, skipping module");
                    false
                },
                Err(_) => {
                    warn!(module = %candidate.name, "can_handle timed out, skipping module");
                    false
                },
            };
            if !accepts {
                continue;
            }

            // First match is exclusive: this module gets the message and
            // nothing after it runs, whatever the outcome.
            debug!(module = %candidate.name, "module selected");
            return match timeout(
                self.timeouts.handle,
                candidate.module.handle(&ctx.text, &ctx),
            )
            .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(module = %candidate.name, error = %e, "handle failed, dropping response");
                    None
                },
                Err(_) => {
                    warn!(module = %candidate.name, "handle timed out, dropping response");
                    None
                },
            };
        }

        debug!("no module accepted the message");
        None
    }

    /// Route one message and hand any response to the output collaborator.
    /// Sink failures are logged, never propagated.
    pub async fn dispatch_and_forward(&self, ctx: MessageContext, sink: &dyn ResponseSink) {
        let forward_ctx = ctx.clone();
        if let Some(response) = self.dispatch(ctx).await
            && let Err(e) = sink.deliver(&forward_ctx, response).await
        {
            warn!(error = %e, "response delivery failed");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use {
        anyhow::bail,
        async_trait::async_trait,
        magpie_common::{BotId, BotModule, ModuleConfig},
    };

    use {super::*, crate::normalize::MarkupStripper};

    #[derive(Clone, Copy, PartialEq)]
    enum Behavior {
        Accept,
        Reject,
        CheckFails,
        CheckHangs,
        HandleFails,
        HandleHangs,
        AcceptSilently,
    }

    struct ScriptedModule {
        module_name: String,
        priority: i32,
        behavior: Behavior,
        handled: Arc<AtomicUsize>,
        seen_text: Arc<Mutex<Option<String>>>,
    }

    impl ScriptedModule {
        fn new(name: &str, priority: i32, behavior: Behavior) -> Self {
            Self {
                module_name: name.into(),
                priority,
                behavior,
                handled: Arc::new(AtomicUsize::new(0)),
                seen_text: Arc::new(Mutex::new(None)),
            }
        }
    }

    #[async_trait]
    impl BotModule for ScriptedModule {
        fn name(&self) -> &str {
            &self.module_name
        }

        fn version(&self) -> &str {
            "0.0.0"
        }

        fn default_priority(&self) -> i32 {
            self.priority
        }

        async fn can_handle(&self, text: &str, _ctx: &MessageContext) -> anyhow::Result<bool> {
            *self.seen_text.lock().unwrap() = Some(text.to_string());
            match self.behavior {
                Behavior::Reject => Ok(false),
                Behavior::CheckFails => bail!("capability check exploded"),
                Behavior::CheckHangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(true)
                },
                _ => Ok(true),
            }
        }

        async fn handle(
            &self,
            _text: &str,
            _ctx: &MessageContext,
        ) -> anyhow::Result<Option<ModuleResponse>> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::HandleFails => bail!("handler exploded"),
                Behavior::HandleHangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                },
                Behavior::AcceptSilently => Ok(None),
                _ => Ok(Some(ModuleResponse::text(format!(
                    "reply from {}",
                    self.module_name
                )))),
            }
        }
    }

    struct Harness {
        registry: Arc<ModuleRegistry>,
        handled: Vec<(String, Arc<AtomicUsize>)>,
        seen: Vec<(String, Arc<Mutex<Option<String>>>)>,
    }

    impl Harness {
        async fn with_modules(specs: &[(&str, i32, Behavior)]) -> Self {
            let registry = Arc::new(ModuleRegistry::new());
            let mut handled = Vec::new();
            let mut seen = Vec::new();
            for (name, priority, behavior) in specs {
                let module = ScriptedModule::new(name, *priority, *behavior);
                handled.push((name.to_string(), Arc::clone(&module.handled)));
                seen.push((name.to_string(), Arc::clone(&module.seen_text)));
                registry
                    .load(Box::new(module), &ModuleConfig::default())
                    .await
                    .unwrap();
            }
            Self {
                registry,
                handled,
                seen,
            }
        }

        fn dispatcher(&self) -> EventDispatcher {
            EventDispatcher::new(Arc::clone(&self.registry), Arc::new(MarkupStripper::new()))
                .with_timeouts(DispatchTimeouts {
                    check: Duration::from_millis(100),
                    handle: Duration::from_millis(100),
                })
        }

        fn handle_count(&self, name: &str) -> usize {
            self.handled
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, c)| c.load(Ordering::SeqCst))
                .unwrap()
        }

        fn text_seen_by(&self, name: &str) -> Option<String> {
            self.seen
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, t)| t.lock().unwrap().clone())
        }
    }

    fn message(text: &str) -> MessageContext {
        MessageContext::group(BotId(1), 9000, 42, text)
    }

    #[tokio::test]
    async fn lowest_priority_match_wins() {
        let harness = Harness::with_modules(&[
            ("second", 20, Behavior::Accept),
            ("first", 10, Behavior::Accept),
        ])
        .await;

        let response = harness.dispatcher().dispatch(message("hi")).await.unwrap();
        assert_eq!(response.content, "reply from first");
    }

    #[tokio::test]
    async fn selection_is_exclusive() {
        let harness = Harness::with_modules(&[
            ("first", 10, Behavior::Accept),
            ("second", 20, Behavior::Accept),
        ])
        .await;

        harness.dispatcher().dispatch(message("hi")).await;
        assert_eq!(harness.handle_count("first"), 1);
        assert_eq!(harness.handle_count("second"), 0);
    }

    #[tokio::test]
    async fn failing_check_skips_to_next_module() {
        let harness = Harness::with_modules(&[
            ("broken", 10, Behavior::CheckFails),
            ("fallback", 20, Behavior::Accept),
        ])
        .await;

        let response = harness.dispatcher().dispatch(message("hi")).await.unwrap();
        assert_eq!(response.content, "reply from fallback");
        assert_eq!(harness.handle_count("broken"), 0);
    }

    #[tokio::test]
    async fn hanging_check_skips_to_next_module() {
        let harness = Harness::with_modules(&[
            ("stuck", 10, Behavior::CheckHangs),
            ("fallback", 20, Behavior::Accept),
        ])
        .await;

        let response = harness.dispatcher().dispatch(message("hi")).await.unwrap();
        assert_eq!(response.content, "reply from fallback");
    }

    #[tokio::test]
    async fn failing_handle_means_no_response() {
        let harness = Harness::with_modules(&[
            ("doomed", 10, Behavior::HandleFails),
            ("shadowed", 20, Behavior::Accept),
        ])
        .await;

        // The failure does not fall through to the next module.
        assert!(harness.dispatcher().dispatch(message("hi")).await.is_none());
        assert_eq!(harness.handle_count("shadowed"), 0);
    }

    #[tokio::test]
    async fn hanging_handle_is_abandoned() {
        let harness = Harness::with_modules(&[("sleeper", 10, Behavior::HandleHangs)]).await;
        assert!(harness.dispatcher().dispatch(message("hi")).await.is_none());
    }

    #[tokio::test]
    async fn silent_module_is_a_valid_outcome() {
        let harness = Harness::with_modules(&[("quiet", 10, Behavior::AcceptSilently)]).await;
        assert!(harness.dispatcher().dispatch(message("hi")).await.is_none());
        assert_eq!(harness.handle_count("quiet"), 1);
    }

    #[tokio::test]
    async fn no_acceptor_is_silent() {
        let harness = Harness::with_modules(&[("picky", 10, Behavior::Reject)]).await;
        assert!(harness.dispatcher().dispatch(message("hi")).await.is_none());
    }

    #[tokio::test]
    async fn disabled_module_is_skipped() {
        let harness = Harness::with_modules(&[
            ("off", 10, Behavior::Accept),
            ("on", 20, Behavior::Accept),
        ])
        .await;
        harness.registry.disable("off").await.unwrap();

        let response = harness.dispatcher().dispatch(message("hi")).await.unwrap();
        assert_eq!(response.content, "reply from on");
    }

    #[tokio::test]
    async fn modules_see_normalized_text() {
        let harness = Harness::with_modules(&[("echo", 10, Behavior::Accept)]).await;
        harness
            .dispatcher()
            .dispatch(message("[image:deal.png] 50% off"))
            .await;
        assert_eq!(harness.text_seen_by("echo").unwrap(), "50% off");
    }

    struct FailingSink;

    #[async_trait]
    impl ResponseSink for FailingSink {
        async fn deliver(
            &self,
            _ctx: &MessageContext,
            _response: ModuleResponse,
        ) -> anyhow::Result<()> {
            bail!("transport gone")
        }
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let harness = Harness::with_modules(&[("echo", 10, Behavior::Accept)]).await;
        // Must not panic or propagate.
        harness
            .dispatcher()
            .dispatch_and_forward(message("hi"), &FailingSink)
            .await;
        assert_eq!(harness.handle_count("echo"), 1);
    }
}
