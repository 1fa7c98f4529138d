//! The dedup decision engine: atomic check-and-mark plus TTL sweeping.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior},
    tracing::{debug, info, warn},
};

use crate::{
    fingerprint::{Fingerprint, Tier},
    item::NewsItem,
    store::DedupStore,
};

/// Classification of one ingested item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    New,
    Duplicate,
}

/// Per-tier retention windows. An expired fingerprint no longer suppresses
/// anything: the same content becomes forwardable again once the window
/// elapses. Storage bound traded for eventual re-admission.
#[derive(Debug, Clone, Copy)]
pub struct DedupRetention {
    pub text_ttl: Duration,
    pub image_ttl: Duration,
}

impl Default for DedupRetention {
    fn default() -> Self {
        Self {
            // Paraphrased re-posts of the same deal trickle in for minutes;
            // identical product images repeat within seconds.
            text_ttl: Duration::from_secs(300),
            image_ttl: Duration::from_secs(40),
        }
    }
}

impl DedupRetention {
    fn ttl_ms(&self, tier: Tier) -> u64 {
        let ttl = match tier {
            Tier::Text => self.text_ttl,
            Tier::Image => self.image_ttl,
        };
        ttl.as_millis() as u64
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Classifies ingested items as new or duplicate against two fingerprint
/// sets, and owns their retention.
///
/// `check_and_mark` is a single atomic critical section: concurrent
/// ingestion sources racing on near-duplicate items serialize here, so
/// exactly one of them sees `New`.
pub struct DedupEngine {
    store: Arc<dyn DedupStore>,
    retention: DedupRetention,
    gate: Mutex<()>,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn DedupStore>, retention: DedupRetention) -> Self {
        Self {
            store,
            retention,
            gate: Mutex::new(()),
        }
    }

    /// Classify `item` and, when new, record its fingerprints.
    ///
    /// Never fails: an unreadable store is logged and classified `New`.
    /// Risking a duplicate forward beats silently dropping a real item.
    pub async fn check_and_mark(&self, item: &NewsItem) -> Verdict {
        self.check_and_mark_at(item, now_ms()).await
    }

    async fn check_and_mark_at(&self, item: &NewsItem, now_ms: u64) -> Verdict {
        let fp_text = item.text_fingerprint();
        let fp_image = item.image_fingerprint();

        let _guard = self.gate.lock().await;

        if self.live(Tier::Text, &fp_text, now_ms).await {
            debug!(fingerprint = ?fp_text, "duplicate prefix text");
            return Verdict::Duplicate;
        }
        if let Some(fp) = &fp_image
            && self.live(Tier::Image, fp, now_ms).await
        {
            debug!(fingerprint = ?fp, "duplicate image");
            return Verdict::Duplicate;
        }

        if let Err(e) = self.store.insert(Tier::Text, fp_text, now_ms).await {
            warn!(error = %e, "failed to record text fingerprint");
        }
        if let Some(fp) = fp_image
            && let Err(e) = self.store.insert(Tier::Image, fp, now_ms).await
        {
            warn!(error = %e, "failed to record image fingerprint");
        }
        Verdict::New
    }

    /// Whether a fingerprint is present and inside its retention window.
    /// Store read errors fail open to "absent".
    async fn live(&self, tier: Tier, fp: &Fingerprint, now_ms: u64) -> bool {
        match self.store.first_seen(tier, fp).await {
            Ok(Some(seen_at)) => now_ms.saturating_sub(seen_at) <= self.retention.ttl_ms(tier),
            Ok(None) => false,
            Err(e) => {
                warn!(%tier, error = %e, "dedup store unreadable, treating item as new");
                false
            },
        }
    }

    /// Evict every fingerprint past its tier's retention window.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(now_ms()).await
    }

    async fn sweep_at(&self, now_ms: u64) -> usize {
        let mut evicted = 0;
        for tier in [Tier::Text, Tier::Image] {
            let cutoff = now_ms.saturating_sub(self.retention.ttl_ms(tier));
            match self.store.evict_older_than(tier, cutoff).await {
                Ok(count) => evicted += count,
                Err(e) => warn!(%tier, error = %e, "eviction sweep failed"),
            }
        }
        evicted
    }

    /// Spawn the background sweep loop. The handle is held by the runtime
    /// and aborted at shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        info!(interval_secs = interval.as_secs(), "dedup sweeper started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = engine.sweep().await;
                if evicted > 0 {
                    debug!(evicted, "dedup records expired");
                }
            }
        })
    }
}
