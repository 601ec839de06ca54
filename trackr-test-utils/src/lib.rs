//! trackr Test Utilities
//!
//! Centralized test infrastructure for the trackr workspace:
//! - A mock remote tracker with call counting and failure injection
//! - Proptest generators for members and allowed values
//! - Fixtures for the `DEMO` project used throughout the test suites

pub use trackr_core::{
    AllowedValue, FieldKind, IssueId, Member, ProjectField, ProjectId, SimpleKind, TrackrError,
    TrackrResult, TransportError,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use trackr_core::{CommandApplier, FieldFetcher, MemberFetcher, UserLookup};

// ============================================================================
// MOCK REMOTE
// ============================================================================

/// In-memory stand-in for the remote tracker.
///
/// Implements every remote capability trait. Page requests are served from
/// the configured member lists, honoring `skip`/`top` exactly as the real
/// endpoint does.
#[derive(Debug, Default)]
pub struct MockTracker {
    members: Mutex<HashMap<ProjectId, Vec<Member>>>,
    fields: Mutex<HashMap<ProjectId, Vec<ProjectField>>>,
    applied: Mutex<Vec<(IssueId, String)>>,
    member_calls: AtomicUsize,
    field_calls: AtomicUsize,
    user_calls: AtomicUsize,
    /// 1-based `fetch_members` call number that fails; 0 disables.
    fail_member_call: AtomicUsize,
    fail_fields: AtomicBool,
    endless_pages: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock preloaded with the `DEMO` fixtures.
    pub fn demo() -> Self {
        Self::new()
            .with_members(fixtures::demo_project(), fixtures::demo_members())
            .with_fields(fixtures::demo_project(), fixtures::demo_fields())
    }

    pub fn with_members(self, project: ProjectId, members: Vec<Member>) -> Self {
        self.set_members(project, members);
        self
    }

    pub fn with_fields(self, project: ProjectId, fields: Vec<ProjectField>) -> Self {
        lock(&self.fields).insert(project, fields);
        self
    }

    /// Replace a project's team, as if it changed remotely.
    pub fn set_members(&self, project: ProjectId, members: Vec<Member>) {
        lock(&self.members).insert(project, members);
    }

    /// Make the `call`-th `fetch_members` request (counting from 1) fail.
    pub fn fail_member_call(&self, call: usize) {
        self.fail_member_call.store(call, Ordering::SeqCst);
    }

    pub fn fail_field_fetches(&self, fail: bool) {
        self.fail_fields.store(fail, Ordering::SeqCst);
    }

    /// Misbehave by returning a full page for every request.
    pub fn serve_endless_pages(&self) {
        self.endless_pages.store(true, Ordering::SeqCst);
    }

    /// Delay every remote call, for deadline tests.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    pub fn member_calls(&self) -> usize {
        self.member_calls.load(Ordering::SeqCst)
    }

    pub fn field_calls(&self) -> usize {
        self.field_calls.load(Ordering::SeqCst)
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    pub fn applied_commands(&self) -> Vec<(IssueId, String)> {
        lock(&self.applied).clone()
    }

    async fn simulate_latency(&self) {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn injected_failure(operation: &str) -> TransportError {
    TransportError::Http {
        operation: operation.to_string(),
        status: 500,
        message: "injected failure".to_string(),
    }
}

#[async_trait]
impl MemberFetcher for MockTracker {
    async fn fetch_members(
        &self,
        project: &ProjectId,
        skip: usize,
        top: usize,
    ) -> Result<Vec<Member>, TransportError> {
        let call = self.member_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;

        if self.fail_member_call.load(Ordering::SeqCst) == call {
            return Err(injected_failure("list_members"));
        }
        if self.endless_pages.load(Ordering::SeqCst) {
            return Ok((skip..skip + top)
                .map(|n| Member::new(format!("user{}", n), format!("User {}", n)))
                .collect());
        }

        let members = lock(&self.members);
        let team = members.get(project).map(Vec::as_slice).unwrap_or_default();
        Ok(team.iter().skip(skip).take(top).cloned().collect())
    }
}

#[async_trait]
impl FieldFetcher for MockTracker {
    async fn fetch_project_fields(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<ProjectField>, TransportError> {
        self.field_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_fields.load(Ordering::SeqCst) {
            return Err(injected_failure("list_project_fields"));
        }
        Ok(lock(&self.fields).get(project).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl UserLookup for MockTracker {
    async fn get_user(&self, login: &str) -> Result<Option<Member>, TransportError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        let members = lock(&self.members);
        Ok(members
            .values()
            .flatten()
            .find(|m| m.login == login)
            .cloned())
    }
}

#[async_trait]
impl CommandApplier for MockTracker {
    async fn apply_command(&self, issue: &IssueId, command: &str) -> Result<(), TransportError> {
        lock(&self.applied).push((issue.clone(), command.to_string()));
        Ok(())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating resolvable candidates.

    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    /// A dotted lowercase login such as `ann.kim`.
    pub fn arb_login() -> impl Strategy<Value = String> {
        "[a-z]{2,8}\\.[a-z]{2,8}"
    }

    /// A two-word capitalized full name.
    pub fn arb_full_name() -> impl Strategy<Value = String> {
        ("[A-Z][a-z]{1,7}", "[A-Z][a-z]{1,9}")
            .prop_map(|(first, last)| format!("{} {}", first, last))
    }

    pub fn arb_member() -> impl Strategy<Value = Member> {
        (arb_login(), arb_full_name()).prop_map(|(login, name)| {
            let email = format!("{}@example.com", login);
            Member::new(login, name).with_email(email)
        })
    }

    /// Members with pairwise distinct logins.
    pub fn arb_team(max: usize) -> impl Strategy<Value = Vec<Member>> {
        prop::collection::vec(arb_member(), 1..=max).prop_map(|members| {
            let mut seen = HashSet::new();
            members
                .into_iter()
                .filter(|m| seen.insert(m.login.clone()))
                .collect()
        })
    }

    /// Allowed values with pairwise distinct, case-insensitively unique names.
    pub fn arb_allowed_values(max: usize) -> impl Strategy<Value = Vec<AllowedValue>> {
        prop::collection::vec("[A-Z][a-z]{2,9}( [A-Z][a-z]{2,9})?", 1..=max).prop_map(|names| {
            let mut seen = HashSet::new();
            names
                .into_iter()
                .filter(|n| seen.insert(n.to_lowercase()))
                .enumerate()
                .map(|(i, name)| AllowedValue::new(format!("100-{}", i), name))
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities for the `DEMO` project.

    use super::*;

    pub fn demo_project() -> ProjectId {
        ProjectId::new("DEMO")
    }

    pub fn demo_members() -> Vec<Member> {
        vec![
            Member::new("john.doe", "John Doe").with_email("john.doe@example.com"),
            Member::new("jane.doe", "Jane Doe").with_email("jane.doe@example.com"),
        ]
    }

    /// A larger team for pagination and sampling tests.
    pub fn numbered_members(count: usize) -> Vec<Member> {
        (0..count)
            .map(|n| Member::new(format!("member{:03}", n), format!("Member Number{:03}", n)))
            .collect()
    }

    pub fn state_values() -> Vec<AllowedValue> {
        vec![
            AllowedValue::new("67-0", "Open"),
            AllowedValue::new("67-1", "In Progress"),
            AllowedValue::new("67-2", "Fixed"),
        ]
    }

    pub fn type_values() -> Vec<AllowedValue> {
        vec![
            AllowedValue::new("68-0", "Bug"),
            AllowedValue::new("68-1", "Feature"),
            AllowedValue::new("68-2", "Task"),
        ]
    }

    pub fn priority_values() -> Vec<AllowedValue> {
        vec![
            AllowedValue::new("69-0", "Critical"),
            AllowedValue::new("69-1", "Major"),
            AllowedValue::new("69-2", "Normal"),
            AllowedValue::new("69-3", "Minor"),
        ]
    }

    pub fn demo_fields() -> Vec<ProjectField> {
        vec![
            ProjectField::new("State", FieldKind::State(state_values())),
            ProjectField::new("Type", FieldKind::Enum(type_values())),
            ProjectField::new("Priority", FieldKind::Enum(priority_values())),
            ProjectField::new("Assignee", FieldKind::User),
            ProjectField::new(
                "Subsystem",
                FieldKind::Owned(vec![
                    AllowedValue::new("70-0", "Backend"),
                    AllowedValue::new("70-1", "Frontend"),
                ]),
            ),
            ProjectField::new("Estimation", FieldKind::Simple(SimpleKind::Period)),
        ]
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for trackr error shapes.

    use super::*;
    use trackr_core::ResolveErrorKind;

    /// Assert that a result failed with a resolution error of `kind`, and
    /// return that error for further inspection.
    pub fn assert_resolve_error<T: std::fmt::Debug>(
        result: TrackrResult<T>,
        kind: ResolveErrorKind,
    ) -> trackr_core::ResolveError {
        match result {
            Err(TrackrError::Resolve(err)) => {
                assert_eq!(err.kind, kind, "unexpected resolve error: {}", err);
                err
            }
            other => panic!("expected {:?} resolve error, got {:?}", kind, other),
        }
    }
}
