//! Two-tier content deduplication for the news-ingestion pipeline.
//!
//! Ingested items are fingerprinted on their prefix text (tier 1) and, when
//! present, their image identifier (tier 2). A hit on either tier suppresses
//! re-forwarding. Records expire after a per-tier retention window, after
//! which the same content is deliberately eligible again.

pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod item;
pub mod store;
pub mod store_memory;

pub use {
    engine::{DedupEngine, DedupRetention, Verdict},
    error::{Error, Result},
    fingerprint::{Fingerprint, Tier},
    item::NewsItem,
    store::DedupStore,
    store_memory::MemoryDedupStore,
};
