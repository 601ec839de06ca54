//! Property and integration tests for entity resolution.

use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use trackr_core::{
    AllowedValue, AllowedValueDirectory, Member, MemberDirectory, ProjectId, ResolveErrorKind,
    TrackrError, TrackrResult, TransportError,
};
use trackr_resolve::{resolve, EntityResolver, ResolutionOutcome};
use trackr_storage::{CacheConfig, CachedCollectionClient, MetadataCache};
use trackr_test_utils::assertions::assert_resolve_error;
use trackr_test_utils::generators::{arb_allowed_values, arb_team};
use trackr_test_utils::{fixtures, MockTracker};

type DemoResolver = EntityResolver<CachedCollectionClient<Arc<MockTracker>>>;

fn demo_resolver() -> (Arc<MockTracker>, DemoResolver) {
    let mock = Arc::new(MockTracker::demo());
    let client = CachedCollectionClient::new(
        Arc::clone(&mock),
        Arc::new(MetadataCache::new()),
        CacheConfig::default(),
    );
    (mock, EntityResolver::new(client))
}

/// Directory whose every call fails at the transport level.
struct Unreachable;

fn unreachable(operation: &str) -> TrackrError {
    TransportError::Network {
        operation: operation.to_string(),
        reason: "connection refused".to_string(),
    }
    .into()
}

#[async_trait]
impl MemberDirectory for Unreachable {
    async fn all_members(&self, _project: &ProjectId) -> TrackrResult<Arc<[Member]>> {
        Err(unreachable("list_members"))
    }
}

#[async_trait]
impl AllowedValueDirectory for Unreachable {
    async fn allowed_values(
        &self,
        _project: &ProjectId,
        _field: &str,
    ) -> TrackrResult<Vec<AllowedValue>> {
        Err(unreachable("list_project_fields"))
    }
}

// ============================================================================
// RESOLVER AGAINST THE CACHED CLIENT
// ============================================================================

#[tokio::test]
async fn empty_query_fails_without_fetching() {
    let (mock, resolver) = demo_resolver();
    let project = fixtures::demo_project();

    assert_resolve_error(
        resolver.resolve_member(&project, "   ").await,
        ResolveErrorKind::EmptyQuery,
    );
    assert_resolve_error(
        resolver.resolve_enum_value(&project, "State", "").await,
        ResolveErrorKind::EmptyQuery,
    );
    assert_eq!(mock.member_calls(), 0);
    assert_eq!(mock.field_calls(), 0);
}

#[tokio::test]
async fn member_examples() {
    let (_, resolver) = demo_resolver();
    let project = fixtures::demo_project();

    let err = assert_resolve_error(
        resolver.resolve_member(&project, "doe").await,
        ResolveErrorKind::Ambiguous,
    );
    assert_eq!(err.candidates.len(), 2);

    let resolved = resolver.resolve_member(&project, "john.doe").await.unwrap();
    assert_eq!(resolved.value, "john.doe");
}

#[tokio::test]
async fn enum_examples() {
    let (mock, resolver) = demo_resolver();
    let project = fixtures::demo_project();

    let prog = resolver.resolve_enum_value(&project, "State", "prog").await.unwrap();
    assert_eq!(prog.value, "In Progress");
    let fix = resolver.resolve_enum_value(&project, "State", "fix").await.unwrap();
    assert_eq!(fix.value, "Fixed");

    let err = assert_resolve_error(
        resolver.resolve_enum_value(&project, "State", "xyz").await,
        ResolveErrorKind::NotFound,
    );
    assert_eq!(err.candidates, ["Open", "In Progress", "Fixed"]);
    assert!(err.to_string().contains("Candidates:"));

    // One field fetch serves every lookup above.
    assert_eq!(mock.field_calls(), 1);
}

#[tokio::test]
async fn non_enumerable_field_passes_query_through() {
    let (_, resolver) = demo_resolver();
    let project = fixtures::demo_project();

    let user_field = resolver.resolve_enum_value(&project, "Assignee", "whoever").await.unwrap();
    assert_eq!(user_field.value, "whoever");
    assert_eq!(user_field.tier, None);

    let missing = resolver.resolve_enum_value(&project, "Milestone", "Q3").await.unwrap();
    assert_eq!(missing.value, "Q3");
}

#[tokio::test]
async fn transport_failures_are_not_degraded() {
    let resolver = EntityResolver::new(Unreachable);
    let project = fixtures::demo_project();

    let err = resolver.resolve_enum_value(&project, "State", "fix").await.unwrap_err();
    assert!(matches!(err, TrackrError::Transport(TransportError::Network { .. })));

    let err = resolver.resolve_member(&project, "john").await.unwrap_err();
    assert_eq!(
        match err {
            TrackrError::Transport(e) => e.operation().to_string(),
            other => panic!("unexpected error: {:?}", other),
        },
        "list_members"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolutions_share_one_cache() {
    let (mock, resolver) = demo_resolver();
    let resolver = Arc::new(resolver);
    let project = fixtures::demo_project();

    // Warm the cache so the concurrent calls below are pure reads.
    resolver.resolve_member(&project, "john.doe").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let resolver = Arc::clone(&resolver);
        let project = project.clone();
        handles.push(tokio::spawn(async move {
            let query = if i % 2 == 0 { "john.doe" } else { "jane" };
            resolver.resolve_member(&project, query).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let resolved = handle.await.unwrap().unwrap();
        let expected = if i % 2 == 0 { "john.doe" } else { "jane.doe" };
        assert_eq!(resolved.value, expected);
    }
    assert_eq!(mock.member_calls(), 1);
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

fn labels(outcome: &ResolutionOutcome) -> Vec<String> {
    let mut labels = match outcome {
        ResolutionOutcome::Resolved { value, .. } => vec![value.clone()],
        ResolutionOutcome::Ambiguous(tied) => tied.iter().map(|(l, _)| l.clone()).collect(),
        ResolutionOutcome::NotFound(_) => Vec::new(),
    };
    labels.sort();
    labels
}

proptest! {
    #[test]
    fn prop_exact_login_always_resolves(
        team in arb_team(12),
        pick in any::<prop::sample::Index>(),
    ) {
        let member = pick.get(&team);
        let outcome = resolve(&team, &member.login);
        prop_assert_eq!(
            outcome,
            ResolutionOutcome::Resolved {
                value: member.login.clone(),
                tier: trackr_core::MatchTier::ExactCaseSensitive,
            }
        );
    }

    #[test]
    fn prop_exact_value_name_always_resolves(
        values in arb_allowed_values(10),
        pick in any::<prop::sample::Index>(),
    ) {
        let value = pick.get(&values);
        match resolve(&values, &value.name.to_uppercase()) {
            ResolutionOutcome::Resolved { value: resolved, .. } => {
                prop_assert_eq!(resolved, value.name.clone())
            }
            other => prop_assert!(false, "expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn prop_resolution_ignores_candidate_order(team in arb_team(10), query in "[a-z]{1,4}") {
        let forward = resolve(&team, &query);
        let reversed: Vec<Member> = team.iter().rev().cloned().collect();
        let backward = resolve(&reversed, &query);
        prop_assert_eq!(labels(&forward), labels(&backward));
    }

    #[test]
    fn prop_resolved_value_is_a_candidate(
        values in arb_allowed_values(10),
        query in "[a-z ]{1,6}",
    ) {
        if let ResolutionOutcome::Resolved { value, .. } = resolve(&values, &query) {
            prop_assert!(values.iter().any(|v| v.name == value));
        }
    }

    #[test]
    fn prop_not_found_sample_is_bounded(count in 0usize..40) {
        let team = fixtures::numbered_members(count);
        if let ResolutionOutcome::NotFound(sample) = resolve(&team, "no-such-person") {
            prop_assert!(sample.len() <= 6);
            prop_assert_eq!(sample.len() == 6, count > 5);
        } else {
            prop_assert!(false, "numbered members never match");
        }
    }
}
