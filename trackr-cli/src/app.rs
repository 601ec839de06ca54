//! Composition root.
//!
//! One cache, one cached client and one usage tracker per process. Every
//! command and tool call goes through the same [`App`].

use std::sync::Arc;

use trackr_client::RestClient;
use trackr_core::{
    CommandApplier, FieldFetcher, IdentityKey, IssueId, MemberFetcher, ProjectId, TrackrResult,
    UserLookup,
};
use trackr_resolve::{CommandRewriter, EntityResolver, FieldRule, Resolution};
use trackr_storage::{CacheConfig, CachedCollectionClient, MetadataCache, UsageTracker};

use crate::config::TrackrConfig;
use crate::error::{CliError, CliResult};

/// Everything the remote client must provide.
pub trait Remote: MemberFetcher + FieldFetcher + UserLookup + CommandApplier + 'static {}

impl<T> Remote for T where
    T: MemberFetcher + FieldFetcher + UserLookup + CommandApplier + 'static
{
}

type Directory<C> = Arc<CachedCollectionClient<C>>;

/// A command that was sent to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCommand {
    pub issue: IssueId,
    pub project: ProjectId,
    pub command: String,
}

pub struct App<C> {
    client: Directory<C>,
    rewriter: CommandRewriter<Directory<C>>,
    usage: UsageTracker,
    /// Identity of the configured token, used when a caller brings none.
    default_identity: Option<IdentityKey>,
}

impl App<RestClient> {
    pub fn from_config(config: &TrackrConfig) -> CliResult<Self> {
        let rest = RestClient::new(&config.client_config())?;
        let usage = UsageTracker::open(config.usage_path.clone());
        let app = App::new(rest, config.cache_config(), usage, config.field_rules())
            .with_default_identity(config.token.as_deref().map(IdentityKey::from_credential));
        tracing::info!(base_url = %config.base_url, "trackr initialized");
        Ok(app)
    }
}

impl<C: Remote> App<C> {
    pub fn new(
        remote: C,
        cache_config: CacheConfig,
        usage: UsageTracker,
        extra_rules: Vec<FieldRule>,
    ) -> Self {
        let client = Arc::new(CachedCollectionClient::new(
            remote,
            Arc::new(MetadataCache::new()),
            cache_config,
        ));
        let rewriter = CommandRewriter::new(EntityResolver::new(Arc::clone(&client)))
            .with_fields(extra_rules);
        Self {
            client,
            rewriter,
            usage,
            default_identity: None,
        }
    }

    pub fn with_default_identity(mut self, identity: Option<IdentityKey>) -> Self {
        self.default_identity = identity;
        self
    }

    pub fn client(&self) -> &CachedCollectionClient<C> {
        &self.client
    }

    pub fn rewriter(&self) -> &CommandRewriter<Directory<C>> {
        &self.rewriter
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Caller identity: the given credential's hash, else the default.
    pub fn identity(&self, credential: Option<&str>) -> Option<IdentityKey> {
        credential
            .filter(|c| !c.is_empty())
            .map(IdentityKey::from_credential)
            .or_else(|| self.default_identity.clone())
    }

    fn track(&self, identity: Option<&IdentityKey>, project: &ProjectId) {
        if let Some(identity) = identity {
            self.usage.track(identity, project);
        }
    }

    pub async fn resolve_member(
        &self,
        identity: Option<&IdentityKey>,
        project: &ProjectId,
        query: &str,
    ) -> TrackrResult<Resolution> {
        let resolution = self
            .rewriter
            .resolver()
            .resolve_member(project, query)
            .await?;
        self.track(identity, project);
        Ok(resolution)
    }

    pub async fn resolve_value(
        &self,
        identity: Option<&IdentityKey>,
        project: &ProjectId,
        field: &str,
        query: &str,
    ) -> TrackrResult<Resolution> {
        let resolution = self
            .rewriter
            .resolver()
            .resolve_enum_value(project, field, query)
            .await?;
        self.track(identity, project);
        Ok(resolution)
    }

    pub async fn rewrite(
        &self,
        identity: Option<&IdentityKey>,
        project: &ProjectId,
        command: &str,
    ) -> TrackrResult<String> {
        let rewritten = self.rewriter.rewrite(project, command).await?;
        self.track(identity, project);
        Ok(rewritten)
    }

    /// Rewrite `command` when it names known fields, then apply it.
    ///
    /// The project is `project` when given, else the issue id prefix, else
    /// the caller's last project.
    pub async fn apply(
        &self,
        identity: Option<&IdentityKey>,
        issue: &IssueId,
        command: &str,
        project: Option<ProjectId>,
    ) -> CliResult<AppliedCommand> {
        let project = project
            .or_else(|| issue.project_prefix())
            .or_else(|| identity.and_then(|id| self.usage.last_project(id)))
            .ok_or_else(|| CliError::NoProject {
                issue: issue.to_string(),
            })?;

        let command = if self.rewriter.is_rewritable(command) {
            self.rewriter.rewrite(&project, command).await?
        } else {
            command.to_string()
        };

        self.client
            .apply_command(issue, &command)
            .await
            .map_err(trackr_core::TrackrError::from)?;
        self.track(identity, &project);
        Ok(AppliedCommand {
            issue: issue.clone(),
            project,
            command,
        })
    }

    pub fn last_project(&self, identity: Option<&IdentityKey>) -> Option<ProjectId> {
        identity.and_then(|id| self.usage.last_project(id))
    }

    /// Drop one project's cached metadata, or everything.
    pub async fn drop_cache(&self, project: Option<&ProjectId>) -> usize {
        match project {
            Some(project) => self.client.drop_project(project).await,
            None => self.client.drop_all().await,
        }
    }
}
