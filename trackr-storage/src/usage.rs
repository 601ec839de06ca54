//! Per-identity usage state: the last project each caller worked in.
//!
//! The map is persisted as JSON. Persistence is best-effort: a failed load
//! starts from an empty map and a failed save is logged, never surfaced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use trackr_core::{IdentityKey, ProjectId};

/// Identity key to last-used project.
pub type UsageState = BTreeMap<IdentityKey, ProjectId>;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable backing for [`UsageTracker`].
pub trait UsageStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<UsageState>, PersistenceError>;
    fn save(&self, state: &UsageState) -> Result<(), PersistenceError>;
}

/// Pretty-printed JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UsageStore for JsonFileStore {
    fn load(&self) -> Result<Option<UsageState>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let state = serde_json::from_str::<UsageState>(&contents)?;
        Ok(Some(state))
    }

    fn save(&self, state: &UsageState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// Remembers the last project per caller identity.
///
/// Updates serialize on one lock, and the store is written while that lock
/// is held, so the file always reflects a state the map passed through.
pub struct UsageTracker {
    store: Box<dyn UsageStore>,
    state: RwLock<UsageState>,
}

impl UsageTracker {
    /// Tracker backed by a JSON file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_store(Box::new(JsonFileStore::new(path)))
    }

    pub fn with_store(store: Box<dyn UsageStore>) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => {
                tracing::debug!(identities = state.len(), "Loaded usage state");
                state
            }
            Ok(None) => UsageState::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Usage state unreadable; starting empty");
                UsageState::new()
            }
        };
        Self {
            store,
            state: RwLock::new(state),
        }
    }

    /// Record that `identity` just worked in `project`.
    pub fn track(&self, identity: &IdentityKey, project: &ProjectId) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.get(identity) == Some(project) {
            return;
        }
        state.insert(identity.clone(), project.clone());
        tracing::debug!(project = %project, "Tracked last project");

        if let Err(e) = self.store.save(&state) {
            tracing::warn!(error = %e, "Failed to persist usage state");
        }
    }

    pub fn last_project(&self, identity: &IdentityKey) -> Option<ProjectId> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.get(identity).cloned()
    }

    /// Number of identities tracked.
    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("identities", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingStore {
        saves: Arc<AtomicUsize>,
    }

    impl UsageStore for CountingStore {
        fn load(&self) -> Result<Option<UsageState>, PersistenceError> {
            Ok(None)
        }

        fn save(&self, _state: &UsageState) -> Result<(), PersistenceError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenStore;

    impl UsageStore for BrokenStore {
        fn load(&self) -> Result<Option<UsageState>, PersistenceError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        fn save(&self, _state: &UsageState) -> Result<(), PersistenceError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    fn alice() -> IdentityKey {
        IdentityKey::from_credential("perm:alice-token")
    }

    #[test]
    fn test_repeated_track_writes_once() {
        let saves = Arc::new(AtomicUsize::new(0));
        let tracker = UsageTracker::with_store(Box::new(CountingStore {
            saves: Arc::clone(&saves),
        }));

        tracker.track(&alice(), &ProjectId::new("DEMO"));
        tracker.track(&alice(), &ProjectId::new("DEMO"));
        assert_eq!(saves.load(Ordering::SeqCst), 1);

        tracker.track(&alice(), &ProjectId::new("OPS"));
        assert_eq!(saves.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.last_project(&alice()), Some(ProjectId::new("OPS")));
    }

    #[test]
    fn test_unknown_identity_has_no_project() {
        let tracker = UsageTracker::with_store(Box::<CountingStore>::default());
        assert_eq!(tracker.last_project(&alice()), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("usage.json");

        let bob = IdentityKey::from_credential("perm:bob-token");
        {
            let tracker = UsageTracker::open(&path);
            tracker.track(&alice(), &ProjectId::new("DEMO"));
            tracker.track(&bob, &ProjectId::new("OPS"));
        }

        let reopened = UsageTracker::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.last_project(&alice()), Some(ProjectId::new("DEMO")));
        assert_eq!(reopened.last_project(&bob), Some(ProjectId::new("OPS")));
    }

    #[test]
    fn test_file_holds_hashes_not_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        UsageTracker::open(&path).track(&alice(), &ProjectId::new("DEMO"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("alice-token"));
        assert!(contents.contains(alice().as_str()));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "{ not json").unwrap();

        let tracker = UsageTracker::open(&path);
        assert!(tracker.is_empty());

        tracker.track(&alice(), &ProjectId::new("DEMO"));
        assert_eq!(UsageTracker::open(&path).len(), 1);
    }

    #[test]
    fn test_failing_store_never_panics() {
        let tracker = UsageTracker::with_store(Box::new(BrokenStore));
        tracker.track(&alice(), &ProjectId::new("DEMO"));
        assert_eq!(tracker.last_project(&alice()), Some(ProjectId::new("DEMO")));
    }
}
