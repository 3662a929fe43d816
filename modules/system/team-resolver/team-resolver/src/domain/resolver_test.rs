//! Resolution scenarios for `AccessResolver` against a scripted directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use access_security::{Principal, TeamSet, TeamSource};
use async_trait::async_trait;
use team_resolver_sdk::{
    AccessDenied, DirectoryDiagnostics, LookupError, LookupResult, TeamCache, TeamDirectoryClient,
};
use tracing_test::traced_test;

use super::{AccessResolver, DomainError, LegacyMembershipTable};
use crate::config::{FallbackConfig, FallbackPolicy, SelectionConfig};
use crate::infra::cache::LocalTeamCache;

/// Directory returning fixed answers and counting calls.
struct ScriptedDirectory {
    by_email: LookupResult<TeamSet>,
    caller: LookupResult<TeamSet>,
    email_calls: AtomicUsize,
    caller_calls: AtomicUsize,
}

impl ScriptedDirectory {
    fn new(by_email: LookupResult<TeamSet>, caller: LookupResult<TeamSet>) -> Arc<Self> {
        Arc::new(Self {
            by_email,
            caller,
            email_calls: AtomicUsize::new(0),
            caller_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TeamDirectoryClient for ScriptedDirectory {
    async fn lookup_by_identity(&self, _email: &str) -> LookupResult<TeamSet> {
        self.email_calls.fetch_add(1, Ordering::SeqCst);
        self.by_email.clone()
    }

    async fn lookup_current_caller(&self, _caller: &Principal) -> LookupResult<TeamSet> {
        self.caller_calls.fetch_add(1, Ordering::SeqCst);
        self.caller.clone()
    }

    fn diagnostics(&self) -> DirectoryDiagnostics {
        DirectoryDiagnostics::default()
    }
}

fn teams(slugs: &[&str]) -> TeamSet {
    slugs.iter().collect()
}

fn user(email: Option<&str>, groups: &[&str]) -> Principal {
    let mut builder = Principal::builder()
        .user_id("Z123456")
        .groups(groups.iter().copied());
    if let Some(email) = email {
        builder = builder.email(email);
    }
    builder.build().unwrap()
}

fn resolver_with(
    directory: Option<Arc<dyn TeamDirectoryClient>>,
    legacy: &[(&str, &str)],
    fallback: FallbackConfig,
    preferred: &[&str],
) -> AccessResolver {
    AccessResolver::new(
        Arc::new(LocalTeamCache::new()),
        directory,
        LegacyMembershipTable::new(legacy.iter().copied()),
        fallback,
        &SelectionConfig {
            preferred_teams: preferred.iter().map(|s| (*s).to_owned()).collect(),
        },
    )
}

fn resolver(directory: Option<Arc<dyn TeamDirectoryClient>>, legacy: &[(&str, &str)]) -> AccessResolver {
    resolver_with(directory, legacy, FallbackConfig::default(), &[])
}

fn connection_refused() -> LookupError {
    LookupError::Transport("connection refused".to_owned())
}

fn denial(result: Result<access_security::AuthorizationContext, DomainError>) -> AccessDenied {
    match result {
        Err(DomainError::Denied(reason)) => reason,
        other => panic!("expected a denial, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_principal_is_not_authenticated() {
    let resolver = resolver(None, &[("g1", "team-esyfo")]);

    assert_eq!(
        denial(resolver.resolve(None, None).await),
        AccessDenied::NotAuthenticated
    );
}

#[tokio::test]
async fn without_directory_only_legacy_mapping_is_used() {
    let resolver = resolver(None, &[("g1", "t")]);
    let principal = user(Some("u@x.no"), &["g1", "g2"]);

    let ctx = resolver.resolve(Some(&principal), None).await.unwrap();

    assert_eq!(ctx.authorized_teams(), &teams(&["t"]));
    assert_eq!(ctx.selected_team(), "t");
    assert_eq!(ctx.source(), TeamSource::Legacy);
}

#[tokio::test]
async fn legacy_scenario_selects_the_mapped_team() {
    let resolver = resolver(None, &[("g1", "team-esyfo")]);
    let principal = user(Some("u@x.no"), &["g1"]);

    let ctx = resolver.resolve(Some(&principal), None).await.unwrap();

    assert_eq!(ctx.selected_team(), "team-esyfo");
    assert_eq!(ctx.principal().user_id(), "Z123456");
}

#[tokio::test]
async fn directory_result_wins_and_requested_team_is_selected() {
    let directory = ScriptedDirectory::new(Ok(teams(&["flex", "team-esyfo"])), Ok(TeamSet::new()));
    let resolver = resolver(Some(directory.clone()), &[("g1", "legacy-team")]);
    let principal = user(Some("u@x.no"), &["g1"]);

    let ctx = resolver
        .resolve(Some(&principal), Some("flex"))
        .await
        .unwrap();

    assert_eq!(ctx.selected_team(), "flex");
    assert_eq!(ctx.authorized_teams(), &teams(&["flex", "team-esyfo"]));
    assert_eq!(ctx.source(), TeamSource::Directory);
    assert_eq!(directory.caller_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn requested_team_is_normalized() {
    let directory = ScriptedDirectory::new(Ok(teams(&["flex"])), Ok(TeamSet::new()));
    let resolver = resolver(Some(directory), &[]);
    let principal = user(Some("u@x.no"), &[]);

    let ctx = resolver
        .resolve(Some(&principal), Some("  FLEX "))
        .await
        .unwrap();

    assert_eq!(ctx.selected_team(), "flex");
}

#[tokio::test]
async fn unauthorized_requested_team_is_rejected() {
    let directory = ScriptedDirectory::new(Ok(teams(&["a", "b"])), Ok(TeamSet::new()));
    let resolver = resolver(Some(directory), &[]);
    let principal = user(Some("u@x.no"), &[]);

    assert_eq!(
        denial(resolver.resolve(Some(&principal), Some("c")).await),
        AccessDenied::TeamNotAuthorized {
            requested: "c".to_owned()
        }
    );
}

#[tokio::test]
async fn default_selection_is_stable() {
    let directory = ScriptedDirectory::new(Ok(teams(&["b", "a"])), Ok(TeamSet::new()));
    let resolver = resolver(Some(directory), &[]);
    let principal = user(Some("u@x.no"), &[]);

    let first = resolver.resolve(Some(&principal), None).await.unwrap();
    for _ in 0..5 {
        let again = resolver.resolve(Some(&principal), None).await.unwrap();
        assert_eq!(again.selected_team(), first.selected_team());
    }
    assert_eq!(first.selected_team(), "a");
}

#[tokio::test]
async fn preferred_team_becomes_the_default() {
    let directory = ScriptedDirectory::new(Ok(teams(&["a", "b", "c"])), Ok(TeamSet::new()));
    let resolver = resolver_with(
        Some(directory),
        &[],
        FallbackConfig::default(),
        &["z", "C", "b"],
    );
    let principal = user(Some("u@x.no"), &[]);

    let ctx = resolver.resolve(Some(&principal), None).await.unwrap();

    assert_eq!(ctx.selected_team(), "c");
}

#[tokio::test]
async fn lookup_failure_falls_back_to_legacy() {
    let directory = ScriptedDirectory::new(Err(connection_refused()), Ok(teams(&["ignored"])));
    let resolver = resolver(Some(directory.clone()), &[("g1", "t")]);
    let principal = user(Some("u@x.no"), &["g1"]);

    let ctx = resolver.resolve(Some(&principal), None).await.unwrap();

    assert_eq!(ctx.authorized_teams(), &teams(&["t"]));
    assert_eq!(ctx.source(), TeamSource::Legacy);
    assert_eq!(directory.caller_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lookup_failure_with_empty_legacy_is_no_team_access() {
    let directory = ScriptedDirectory::new(Err(connection_refused()), Ok(TeamSet::new()));
    let resolver = resolver(Some(directory), &[]);
    let principal = user(Some("u@x.no"), &["g1"]);

    assert_eq!(
        denial(resolver.resolve(Some(&principal), None).await),
        AccessDenied::NoTeamAccess
    );
}

#[tokio::test]
async fn empty_everywhere_is_no_team_access() {
    let directory = ScriptedDirectory::new(Ok(TeamSet::new()), Ok(TeamSet::new()));
    let resolver = resolver(Some(directory.clone()), &[]);
    let principal = user(Some("u@x.no"), &["g1"]);

    assert_eq!(
        denial(resolver.resolve(Some(&principal), None).await),
        AccessDenied::NoTeamAccess
    );
    assert_eq!(directory.email_calls.load(Ordering::SeqCst), 1);
    assert_eq!(directory.caller_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_email_result_consults_the_current_caller() {
    let directory = ScriptedDirectory::new(Ok(TeamSet::new()), Ok(teams(&["flex"])));
    let resolver = resolver(Some(directory), &[("g1", "legacy-team")]);
    let principal = user(Some("u@x.no"), &["g1"]);

    let ctx = resolver.resolve(Some(&principal), None).await.unwrap();

    assert_eq!(ctx.selected_team(), "flex");
    assert_eq!(ctx.source(), TeamSource::CurrentCaller);
}

#[tokio::test]
async fn missing_email_skips_the_email_lookup() {
    let directory = ScriptedDirectory::new(Ok(teams(&["never"])), Ok(teams(&["flex"])));
    let resolver = resolver(Some(directory.clone()), &[]);
    let principal = user(None, &[]);

    let ctx = resolver.resolve(Some(&principal), None).await.unwrap();

    assert_eq!(ctx.selected_team(), "flex");
    assert_eq!(directory.email_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn caller_lookup_failure_falls_back_to_legacy_even_when_failing_closed() {
    let directory = ScriptedDirectory::new(Ok(TeamSet::new()), Err(connection_refused()));
    let fallback = FallbackConfig {
        on_lookup_failure: FallbackPolicy::Deny,
        when_unconfigured: FallbackPolicy::Legacy,
    };
    let resolver = resolver_with(Some(directory), &[("g1", "t")], fallback, &[]);
    let principal = user(Some("u@x.no"), &["g1"]);

    let ctx = resolver.resolve(Some(&principal), None).await.unwrap();

    assert_eq!(ctx.selected_team(), "t");
    assert_eq!(ctx.source(), TeamSource::Legacy);
}

#[tokio::test]
async fn fail_closed_policy_denies_on_lookup_failure() {
    let directory = ScriptedDirectory::new(Err(connection_refused()), Ok(TeamSet::new()));
    let fallback = FallbackConfig {
        on_lookup_failure: FallbackPolicy::Deny,
        when_unconfigured: FallbackPolicy::Legacy,
    };
    let resolver = resolver_with(Some(directory), &[("g1", "t")], fallback, &[]);
    let principal = user(Some("u@x.no"), &["g1"]);

    let reason = denial(resolver.resolve(Some(&principal), None).await);

    assert!(matches!(reason, AccessDenied::DirectoryUnavailable(msg) if msg.contains("connection refused")));
}

#[tokio::test]
async fn deny_when_unconfigured_rejects_without_directory() {
    let fallback = FallbackConfig {
        on_lookup_failure: FallbackPolicy::Legacy,
        when_unconfigured: FallbackPolicy::Deny,
    };
    let resolver = resolver_with(None, &[("g1", "t")], fallback, &[]);
    let principal = user(Some("u@x.no"), &["g1"]);

    assert_eq!(
        denial(resolver.resolve(Some(&principal), None).await),
        AccessDenied::LookupNotConfigured
    );
}

#[tokio::test]
#[traced_test]
async fn live_failures_warn_and_replayed_failures_do_not() {
    let live = ScriptedDirectory::new(Err(connection_refused()), Ok(TeamSet::new()));
    let live_resolver = resolver(Some(live), &[("g1", "t")]);
    let principal = user(Some("u@x.no"), &["g1"]);
    live_resolver.resolve(Some(&principal), None).await.unwrap();

    assert!(logs_contain("WARN"));
    assert!(logs_contain("Team directory lookup failed"));
    assert!(!logs_contain("recent failure replayed"));

    let replayed = ScriptedDirectory::new(
        Err(LookupError::RecentFailure(Box::new(connection_refused()))),
        Ok(TeamSet::new()),
    );
    let replay_resolver = resolver(Some(replayed), &[("g1", "t")]);
    replay_resolver.resolve(Some(&principal), None).await.unwrap();

    assert!(logs_contain("recent failure replayed"));
}

#[tokio::test]
async fn cache_administration_is_exposed() {
    let cache = Arc::new(LocalTeamCache::new());
    cache
        .set("u@x.no", &teams(&["flex"]), Duration::from_secs(60))
        .await;
    let resolver = AccessResolver::new(
        cache.clone(),
        None,
        LegacyMembershipTable::default(),
        FallbackConfig::default(),
        &SelectionConfig::default(),
    );

    assert!(resolver.cache_healthy());
    assert!(!resolver.directory_configured());
    assert!(resolver.directory_diagnostics().is_none());

    resolver.clear_cache().await.unwrap();

    assert!(cache.is_empty());
}
