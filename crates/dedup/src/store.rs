//! Persistence trait for fingerprint records.

use async_trait::async_trait;

use crate::{
    Result,
    fingerprint::{Fingerprint, Tier},
};

/// Fingerprint record backend. One record per (tier, fingerprint), mapped to
/// its first-seen timestamp in unix milliseconds.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// First-seen timestamp for a fingerprint, `None` when absent.
    async fn first_seen(&self, tier: Tier, fp: &Fingerprint) -> Result<Option<u64>>;

    /// Record (or refresh) a fingerprint.
    async fn insert(&self, tier: Tier, fp: Fingerprint, seen_at_ms: u64) -> Result<()>;

    /// Drop every record in `tier` seen before `cutoff_ms`. Returns how many
    /// were evicted.
    async fn evict_older_than(&self, tier: Tier, cutoff_ms: u64) -> Result<usize>;
}
