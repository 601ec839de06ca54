//! Metadata cache layer.
//!
//! [`MetadataCache`] stores complete per-project collection snapshots with a
//! TTL. [`CachedCollectionClient`] decorates a remote client: on a miss it
//! sweeps the whole collection, commits it, and serves slices from the
//! snapshot afterwards.
//!
//! # Example
//!
//! ```ignore
//! let cache = Arc::new(MetadataCache::new());
//! let client = CachedCollectionClient::new(rest, Arc::clone(&cache), CacheConfig::default());
//!
//! // First call sweeps every page; later calls within the TTL do not touch the remote.
//! let page = client.list_members(&project, 0, 20).await?;
//!
//! // Operator maintenance
//! client.drop_project(&project).await;
//! ```

pub mod collection;
pub mod config;
pub mod metadata;

pub use collection::CachedCollectionClient;
pub use config::CacheConfig;
pub use metadata::{
    CacheEntry, CacheStats, CachedCollection, MetadataCache, Snapshot, MAX_TTL,
};
