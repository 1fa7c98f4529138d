//! In-memory fingerprint store.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    Result,
    fingerprint::{Fingerprint, Tier},
    store::DedupStore,
};

/// Store backed by two `HashMap`s, one per tier. The default backend: the
/// retention windows are short enough that fingerprints never need to
/// survive a restart.
#[derive(Default)]
pub struct MemoryDedupStore {
    text: Mutex<HashMap<Fingerprint, u64>>,
    image: Mutex<HashMap<Fingerprint, u64>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tier(&self, tier: Tier) -> &Mutex<HashMap<Fingerprint, u64>> {
        match tier {
            Tier::Text => &self.text,
            Tier::Image => &self.image,
        }
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn first_seen(&self, tier: Tier, fp: &Fingerprint) -> Result<Option<u64>> {
        let records = self.tier(tier).lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(fp).copied())
    }

    async fn insert(&self, tier: Tier, fp: Fingerprint, seen_at_ms: u64) -> Result<()> {
        let mut records = self.tier(tier).lock().unwrap_or_else(|e| e.into_inner());
        records.insert(fp, seen_at_ms);
        Ok(())
    }

    async fn evict_older_than(&self, tier: Tier, cutoff_ms: u64) -> Result<usize> {
        let mut records = self.tier(tier).lock().unwrap_or_else(|e| e.into_inner());
        let before = records.len();
        records.retain(|_, seen_at| *seen_at >= cutoff_ms);
        Ok(before - records.len())
    }
}
