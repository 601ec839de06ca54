//! trackr Storage - Shared Mutable State
//!
//! Holds the only state that outlives a single request: the TTL-bounded
//! metadata cache with its read-through collection client, and the
//! persisted per-identity usage map.

pub mod cache;
pub mod usage;

pub use cache::{
    CacheConfig, CacheEntry, CacheStats, CachedCollection, CachedCollectionClient, MetadataCache,
    Snapshot, MAX_TTL,
};
pub use usage::{JsonFileStore, PersistenceError, UsageState, UsageStore, UsageTracker};
