//! Narrow capability traits.
//!
//! The remote side (`*Fetcher`, [`UserLookup`], [`CommandApplier`]) is what
//! a transport client must provide. The consumer side (`*Directory`) is what
//! resolution logic depends on; the cache layer sits between the two.

use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{AllowedValue, Member, ProjectField};
use crate::error::{TrackrResult, TransportError};
use crate::identity::{IssueId, ProjectId};

/// One page of a project's team.
#[async_trait]
pub trait MemberFetcher: Send + Sync {
    async fn fetch_members(
        &self,
        project: &ProjectId,
        skip: usize,
        top: usize,
    ) -> Result<Vec<Member>, TransportError>;
}

/// Every custom field attached to a project, with bundle values. Not paged.
#[async_trait]
pub trait FieldFetcher: Send + Sync {
    async fn fetch_project_fields(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<ProjectField>, TransportError>;
}

/// Single-user lookup by login.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_user(&self, login: &str) -> Result<Option<Member>, TransportError>;
}

/// Applies a command string to an issue.
#[async_trait]
pub trait CommandApplier: Send + Sync {
    async fn apply_command(&self, issue: &IssueId, command: &str) -> Result<(), TransportError>;
}

/// Complete member list for a project.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn all_members(&self, project: &ProjectId) -> TrackrResult<Arc<[Member]>>;
}

/// Allowed values of one enum-like field in a project.
#[async_trait]
pub trait AllowedValueDirectory: Send + Sync {
    async fn allowed_values(
        &self,
        project: &ProjectId,
        field: &str,
    ) -> TrackrResult<Vec<AllowedValue>>;
}

#[async_trait]
impl<T: MemberFetcher + ?Sized> MemberFetcher for Arc<T> {
    async fn fetch_members(
        &self,
        project: &ProjectId,
        skip: usize,
        top: usize,
    ) -> Result<Vec<Member>, TransportError> {
        (**self).fetch_members(project, skip, top).await
    }
}

#[async_trait]
impl<T: FieldFetcher + ?Sized> FieldFetcher for Arc<T> {
    async fn fetch_project_fields(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<ProjectField>, TransportError> {
        (**self).fetch_project_fields(project).await
    }
}

#[async_trait]
impl<T: UserLookup + ?Sized> UserLookup for Arc<T> {
    async fn get_user(&self, login: &str) -> Result<Option<Member>, TransportError> {
        (**self).get_user(login).await
    }
}

#[async_trait]
impl<T: CommandApplier + ?Sized> CommandApplier for Arc<T> {
    async fn apply_command(&self, issue: &IssueId, command: &str) -> Result<(), TransportError> {
        (**self).apply_command(issue, command).await
    }
}

#[async_trait]
impl<T: MemberDirectory + ?Sized> MemberDirectory for Arc<T> {
    async fn all_members(&self, project: &ProjectId) -> TrackrResult<Arc<[Member]>> {
        (**self).all_members(project).await
    }
}

#[async_trait]
impl<T: AllowedValueDirectory + ?Sized> AllowedValueDirectory for Arc<T> {
    async fn allowed_values(
        &self,
        project: &ProjectId,
        field: &str,
    ) -> TrackrResult<Vec<AllowedValue>> {
        (**self).allowed_values(project, field).await
    }
}
