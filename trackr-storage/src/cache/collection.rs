//! Read-through client for cacheable collections.
//!
//! Cacheable reads are project membership and project field metadata.
//! Everything else goes straight to the wrapped client. The fetch-all sweep
//! runs outside the cache lock and commits only after every page succeeded,
//! so a cache entry never holds a partial collection. Concurrent misses may
//! each sweep; sweeps are idempotent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use trackr_core::{
    AllowedValue, AllowedValueDirectory, CommandApplier, FieldError, FieldFetcher, IssueId,
    Member, MemberDirectory, MemberFetcher, ProjectField, ProjectId, TrackrResult, TransportError,
    UserLookup,
};

use super::config::CacheConfig;
use super::metadata::MetadataCache;

/// Decorates a remote client with the shared [`MetadataCache`].
pub struct CachedCollectionClient<C> {
    /// The underlying remote client.
    inner: C,
    /// Shared cache, owned by the composition root.
    cache: Arc<MetadataCache>,
    config: CacheConfig,
}

impl<C> CachedCollectionClient<C> {
    pub fn new(inner: C, cache: Arc<MetadataCache>, config: CacheConfig) -> Self {
        Self {
            inner,
            cache,
            config,
        }
    }

    /// Get a reference to the underlying client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Operator maintenance: forget everything cached for one project.
    pub async fn drop_project(&self, project: &ProjectId) -> usize {
        let removed = self.cache.drop_project(project).await;
        tracing::info!(project = %project, removed, "Dropped project metadata cache");
        removed
    }

    /// Operator maintenance: forget everything.
    pub async fn drop_all(&self) -> usize {
        let removed = self.cache.drop_all().await;
        tracing::info!(removed, "Dropped all metadata cache entries");
        removed
    }

    async fn with_deadline<T, F>(&self, operation: &str, fetch: F) -> Result<T, TransportError>
    where
        F: std::future::Future<Output = Result<T, TransportError>>,
    {
        match self.config.sweep_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| TransportError::Timeout {
                    operation: operation.to_string(),
                    elapsed_ms: duration_ms(limit),
                })?,
            None => fetch.await,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl<C: MemberFetcher> CachedCollectionClient<C> {
    /// One page of a project's team, served from the complete snapshot.
    ///
    /// Paging past the end yields an empty page.
    pub async fn list_members(
        &self,
        project: &ProjectId,
        skip: usize,
        top: usize,
    ) -> TrackrResult<Vec<Member>> {
        let snapshot = self.members(project).await?;
        Ok(snapshot.iter().skip(skip).take(top).cloned().collect())
    }

    /// Complete team snapshot, sweeping the remote on a miss.
    pub async fn members(&self, project: &ProjectId) -> TrackrResult<Arc<[Member]>> {
        if let Some(snapshot) = self.cache.get::<Member>(project).await {
            return Ok(snapshot);
        }

        let collected = self
            .with_deadline("list_members", self.sweep_members(project))
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    project = %project,
                    error = %e,
                    "Member sweep aborted; nothing cached"
                );
            })?;

        let snapshot: Arc<[Member]> = collected.into();
        self.cache
            .set(project, Arc::clone(&snapshot), self.config.ttl)
            .await;
        Ok(snapshot)
    }

    async fn sweep_members(&self, project: &ProjectId) -> Result<Vec<Member>, TransportError> {
        let page_size = self.config.sweep_page_size.max(1);
        let mut collected = Vec::new();

        for page in 0..self.config.max_sweep_pages {
            let batch = self
                .inner
                .fetch_members(project, collected.len(), page_size)
                .await?;
            let received = batch.len();
            collected.extend(batch);
            tracing::debug!(
                project = %project,
                page,
                received,
                total = collected.len(),
                "Fetched member page"
            );

            if received < page_size {
                tracing::info!(
                    project = %project,
                    items = collected.len(),
                    pages = page + 1,
                    "Member sweep complete"
                );
                return Ok(collected);
            }
        }

        Err(TransportError::SweepLimitExceeded {
            operation: "list_members".to_string(),
            pages: self.config.max_sweep_pages,
        })
    }
}

impl<C: FieldFetcher> CachedCollectionClient<C> {
    /// Every custom field of a project, fetched in one call on a miss.
    pub async fn project_fields(&self, project: &ProjectId) -> TrackrResult<Arc<[ProjectField]>> {
        if let Some(snapshot) = self.cache.get::<ProjectField>(project).await {
            return Ok(snapshot);
        }

        let fields = self
            .with_deadline("list_project_fields", self.inner.fetch_project_fields(project))
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    project = %project,
                    error = %e,
                    "Field fetch failed; nothing cached"
                );
            })?;
        tracing::info!(project = %project, fields = fields.len(), "Fetched project fields");

        let snapshot: Arc<[ProjectField]> = fields.into();
        self.cache
            .set(project, Arc::clone(&snapshot), self.config.ttl)
            .await;
        Ok(snapshot)
    }

    /// Allowed values of a bundle-backed field. Field names match
    /// case-insensitively.
    pub async fn list_allowed_values(
        &self,
        project: &ProjectId,
        field: &str,
    ) -> TrackrResult<Vec<AllowedValue>> {
        let fields = self.project_fields(project).await?;
        let wanted = field.trim();
        let found = fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FieldError::UnknownField {
                project: project.to_string(),
                field: wanted.to_string(),
            })?;

        let values = found
            .kind
            .allowed_values()
            .ok_or_else(|| FieldError::NotEnumerable {
                project: project.to_string(),
                field: found.name.clone(),
                kind: found.kind.to_string(),
            })?;
        Ok(values.to_vec())
    }
}

#[async_trait]
impl<C: MemberFetcher> MemberDirectory for CachedCollectionClient<C> {
    async fn all_members(&self, project: &ProjectId) -> TrackrResult<Arc<[Member]>> {
        self.members(project).await
    }
}

#[async_trait]
impl<C: FieldFetcher> AllowedValueDirectory for CachedCollectionClient<C> {
    async fn allowed_values(
        &self,
        project: &ProjectId,
        field: &str,
    ) -> TrackrResult<Vec<AllowedValue>> {
        self.list_allowed_values(project, field).await
    }
}

#[async_trait]
impl<C: UserLookup> UserLookup for CachedCollectionClient<C> {
    async fn get_user(&self, login: &str) -> Result<Option<Member>, TransportError> {
        self.inner.get_user(login).await
    }
}

#[async_trait]
impl<C: CommandApplier> CommandApplier for CachedCollectionClient<C> {
    async fn apply_command(&self, issue: &IssueId, command: &str) -> Result<(), TransportError> {
        self.inner.apply_command(issue, command).await
    }
}
