//! TTL-keyed store of per-project collection snapshots.
//!
//! Entries are immutable once written and always represent a complete
//! collection. Expiry is lazy: a stale entry reads as a miss and is
//! overwritten by the next store or removed by [`MetadataCache::purge_expired`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use trackr_core::{CollectionKind, Member, ProjectField, ProjectId};

/// A cached collection plus its expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Complete collection snapshot, one variant per [`CollectionKind`].
#[derive(Debug, Clone)]
pub enum Snapshot {
    Members(Arc<[Member]>),
    CustomFields(Arc<[ProjectField]>),
}

/// Element types that can be cached as a whole-collection snapshot.
pub trait CachedCollection: Sized + Send + Sync + 'static {
    fn kind() -> CollectionKind;
    fn wrap(items: Arc<[Self]>) -> Snapshot;
    fn unwrap(snapshot: &Snapshot) -> Option<Arc<[Self]>>;
}

impl CachedCollection for Member {
    fn kind() -> CollectionKind {
        CollectionKind::Members
    }

    fn wrap(items: Arc<[Self]>) -> Snapshot {
        Snapshot::Members(items)
    }

    fn unwrap(snapshot: &Snapshot) -> Option<Arc<[Self]>> {
        match snapshot {
            Snapshot::Members(items) => Some(Arc::clone(items)),
            Snapshot::CustomFields(_) => None,
        }
    }
}

impl CachedCollection for ProjectField {
    fn kind() -> CollectionKind {
        CollectionKind::CustomFields
    }

    fn wrap(items: Arc<[Self]>) -> Snapshot {
        Snapshot::CustomFields(items)
    }

    fn unwrap(snapshot: &Snapshot) -> Option<Arc<[Self]>> {
        match snapshot {
            Snapshot::CustomFields(items) => Some(Arc::clone(items)),
            Snapshot::Members(_) => None,
        }
    }
}

/// Cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    /// Entries currently held, fresh or not.
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    project: ProjectId,
    kind: CollectionKind,
}

/// Longest lifetime of a cache entry.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Shared metadata cache.
///
/// Readers proceed concurrently; a writer holds the lock only for the map
/// mutation itself. No size bound: a project's collections are bounded by
/// its real membership and field definitions.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry<Snapshot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh snapshot for `project`, or `None` on a miss or an expired entry.
    pub async fn get<T: CachedCollection>(&self, project: &ProjectId) -> Option<Arc<[T]>> {
        let key = CacheKey {
            project: project.clone(),
            kind: T::kind(),
        };
        let entries = self.entries.read().await;
        let found = entries
            .get(&key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .and_then(|entry| T::unwrap(&entry.value));

        match found {
            Some(items) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    project = %project,
                    kind = %T::kind(),
                    items = items.len(),
                    "Metadata cache hit"
                );
                Some(items)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(project = %project, kind = %T::kind(), "Metadata cache miss");
                None
            }
        }
    }

    /// Store a complete snapshot, replacing whatever was there.
    ///
    /// A TTL past [`MAX_TTL`] is clamped to it.
    pub async fn set<T: CachedCollection>(
        &self,
        project: &ProjectId,
        items: Arc<[T]>,
        ttl: Duration,
    ) {
        let key = CacheKey {
            project: project.clone(),
            kind: T::kind(),
        };
        let count = items.len();
        let entry = CacheEntry {
            value: T::wrap(items),
            expires_at: expiry(Instant::now(), ttl),
        };
        self.entries.write().await.insert(key, entry);
        self.stores.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            project = %project,
            kind = %T::kind(),
            items = count,
            ttl_secs = ttl.min(MAX_TTL).as_secs(),
            "Metadata cache store"
        );
    }

    /// Remove every collection cached for `project`. Returns entries removed.
    pub async fn drop_project(&self, project: &ProjectId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| &key.project != project);
        let removed = before - entries.len();
        tracing::debug!(project = %project, removed, "Metadata cache drop");
        removed
    }

    /// Remove everything. Returns entries removed.
    pub async fn drop_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        tracing::debug!(removed, "Metadata cache drop all");
        removed
    }

    /// Eagerly remove expired entries. Returns entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        let removed = before - entries.len();
        tracing::debug!(removed, "Metadata cache purge");
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            entries: self.entries.read().await.len(),
        }
    }
}

fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl).unwrap_or_else(|| now + MAX_TTL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackr_test_utils::fixtures;

    const TTL: Duration = Duration::from_secs(60);

    fn members() -> Arc<[Member]> {
        fixtures::demo_members().into()
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_returns_snapshot_before_ttl() {
        let cache = MetadataCache::new();
        let project = fixtures::demo_project();
        cache.set(&project, members(), TTL).await;

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        let cached = cache.get::<Member>(&project).await.unwrap();
        assert_eq!(cached.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reads_as_miss() {
        let cache = MetadataCache::new();
        let project = fixtures::demo_project();
        cache.set(&project, members(), TTL).await;

        tokio::time::advance(TTL).await;
        assert!(cache.get::<Member>(&project).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let cache = MetadataCache::new();
        let project = fixtures::demo_project();
        cache.set(&project, members(), TTL).await;

        assert!(cache.get::<Member>(&project).await.is_some());
        assert!(cache.get::<ProjectField>(&project).await.is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_whole_snapshot() {
        let cache = MetadataCache::new();
        let project = fixtures::demo_project();
        cache.set(&project, members(), TTL).await;
        cache
            .set::<Member>(&project, vec![Member::new("solo", "Solo")].into(), TTL)
            .await;

        let cached = cache.get::<Member>(&project).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].login, "solo");
    }

    #[tokio::test]
    async fn test_drop_project_only_touches_that_project() {
        let cache = MetadataCache::new();
        let demo = fixtures::demo_project();
        let other = ProjectId::new("OPS");
        cache.set(&demo, members(), TTL).await;
        cache
            .set::<ProjectField>(&demo, fixtures::demo_fields().into(), TTL)
            .await;
        cache.set(&other, members(), TTL).await;

        assert_eq!(cache.drop_project(&demo).await, 2);
        assert!(cache.get::<Member>(&demo).await.is_none());
        assert!(cache.get::<ProjectField>(&demo).await.is_none());
        assert!(cache.get::<Member>(&other).await.is_some());
    }

    #[tokio::test]
    async fn test_drop_all() {
        let cache = MetadataCache::new();
        cache.set(&ProjectId::new("A"), members(), TTL).await;
        cache.set(&ProjectId::new("B"), members(), TTL).await;

        assert_eq!(cache.drop_all().await, 2);
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_fresh_entries() {
        let cache = MetadataCache::new();
        cache.set(&ProjectId::new("OLD"), members(), Duration::from_secs(1)).await;
        cache.set(&ProjectId::new("NEW"), members(), TTL).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.get::<Member>(&ProjectId::new("NEW")).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_clamped() {
        let cache = MetadataCache::new();
        let project = fixtures::demo_project();
        cache.set(&project, members(), Duration::from_secs(i64::MAX as u64)).await;
        cache
            .set::<ProjectField>(&project, fixtures::demo_fields().into(), Duration::MAX)
            .await;

        tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;
        assert!(cache.get::<Member>(&project).await.is_some());
        assert!(cache.get::<ProjectField>(&project).await.is_some());
        assert_eq!(cache.purge_expired().await, 0);
    }
}
