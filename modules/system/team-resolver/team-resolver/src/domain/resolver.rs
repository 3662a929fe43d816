//! Per-request team resolution and selection.

use std::sync::Arc;

use access_security::{AuthorizationContext, Principal, TeamSet, TeamSource, normalize_slug};
use team_resolver_sdk::{
    AccessDenied, CacheError, DirectoryDiagnostics, LookupError, TeamCache, TeamDirectoryClient,
};

use super::error::DomainError;
use super::legacy::LegacyMembershipTable;
use crate::config::{FallbackConfig, FallbackPolicy, SelectionConfig};

/// Resolves the caller's authorized teams and selects one for the request.
///
/// Source precedence: directory by email, then the directory's view of the
/// current caller, then the legacy group mapping. Lookup failures are
/// absorbed according to [`FallbackConfig`]; denials are terminal.
pub struct AccessResolver {
    cache: Arc<dyn TeamCache>,
    directory: Option<Arc<dyn TeamDirectoryClient>>,
    legacy: LegacyMembershipTable,
    fallback: FallbackConfig,
    preferred_teams: Vec<String>,
}

impl std::fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessResolver")
            .field("directory_configured", &self.directory.is_some())
            .field("legacy_groups", &self.legacy.len())
            .field("fallback", &self.fallback)
            .field("preferred_teams", &self.preferred_teams)
            .finish_non_exhaustive()
    }
}

impl AccessResolver {
    #[must_use]
    pub fn new(
        cache: Arc<dyn TeamCache>,
        directory: Option<Arc<dyn TeamDirectoryClient>>,
        legacy: LegacyMembershipTable,
        fallback: FallbackConfig,
        selection: &SelectionConfig,
    ) -> Self {
        let preferred_teams = selection
            .preferred_teams
            .iter()
            .filter_map(|slug| normalize_slug(slug))
            .collect();
        Self {
            cache,
            directory,
            legacy,
            fallback,
            preferred_teams,
        }
    }

    /// Resolve and select the team scope of one request.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Denied`] with the distinguishing reason, or
    /// [`DomainError::Internal`] if the context invariant cannot be upheld.
    #[tracing::instrument(skip_all, fields(user_id = principal.map(Principal::user_id)))]
    pub async fn resolve(
        &self,
        principal: Option<&Principal>,
        requested_team: Option<&str>,
    ) -> Result<AuthorizationContext, DomainError> {
        let Some(principal) = principal else {
            return Err(AccessDenied::NotAuthenticated.into());
        };

        let (teams, source) = self.known_teams(principal).await?;
        let selected = self.select(&teams, requested_team)?;

        tracing::debug!(
            source = source.as_str(),
            teams = %teams,
            selected = %selected,
            "Team access resolved"
        );
        Ok(AuthorizationContext::new(
            principal.clone(),
            teams,
            &selected,
            source,
        )?)
    }

    async fn known_teams(
        &self,
        principal: &Principal,
    ) -> Result<(TeamSet, TeamSource), AccessDenied> {
        let Some(directory) = &self.directory else {
            return match self.fallback.when_unconfigured {
                FallbackPolicy::Legacy => Ok(self.legacy_teams(principal)),
                FallbackPolicy::Deny => Err(AccessDenied::LookupNotConfigured),
            };
        };

        let by_email = match principal.email() {
            Some(email) => directory.lookup_by_identity(email).await,
            None => Ok(TeamSet::new()),
        };

        match by_email {
            Ok(teams) if !teams.is_empty() => Ok((teams, TeamSource::Directory)),
            Ok(_) => match directory.lookup_current_caller(principal).await {
                Ok(teams) if !teams.is_empty() => Ok((teams, TeamSource::CurrentCaller)),
                Ok(_) => Ok(self.legacy_teams(principal)),
                Err(e) => {
                    log_lookup_failure("current_caller", &e);
                    Ok(self.legacy_teams(principal))
                }
            },
            Err(e) => {
                log_lookup_failure("by_email", &e);
                match self.fallback.on_lookup_failure {
                    FallbackPolicy::Legacy => Ok(self.legacy_teams(principal)),
                    FallbackPolicy::Deny => Err(AccessDenied::DirectoryUnavailable(e.to_string())),
                }
            }
        }
    }

    fn legacy_teams(&self, principal: &Principal) -> (TeamSet, TeamSource) {
        (self.legacy.resolve(principal.groups()), TeamSource::Legacy)
    }

    /// Explicit request wins if authorized; otherwise the first preferred team
    /// the user has, otherwise the smallest slug.
    fn select(&self, teams: &TeamSet, requested: Option<&str>) -> Result<String, AccessDenied> {
        if teams.is_empty() {
            return Err(AccessDenied::NoTeamAccess);
        }
        match requested.and_then(normalize_slug) {
            Some(team) if teams.contains(&team) => Ok(team),
            Some(team) => Err(AccessDenied::TeamNotAuthorized { requested: team }),
            None => self
                .preferred_teams
                .iter()
                .map(String::as_str)
                .find(|slug| teams.contains(slug))
                .or_else(|| teams.first())
                .map(str::to_owned)
                .ok_or(AccessDenied::NoTeamAccess),
        }
    }

    #[must_use]
    pub fn cache_healthy(&self) -> bool {
        self.cache.is_healthy()
    }

    #[must_use]
    pub fn directory_configured(&self) -> bool {
        self.directory.is_some()
    }

    #[must_use]
    pub fn directory_diagnostics(&self) -> Option<DirectoryDiagnostics> {
        self.directory.as_ref().map(|d| d.diagnostics())
    }

    /// Purge all cached team sets.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the distributed store could not be purged.
    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear().await
    }
}

fn log_lookup_failure(operation: &'static str, error: &LookupError) {
    if error.is_cached() {
        tracing::debug!(
            operation,
            kind = error.kind(),
            error = %error,
            "Team directory lookup failed (recent failure replayed)"
        );
    } else {
        tracing::warn!(
            operation,
            kind = error.kind(),
            retryable = error.is_retryable(),
            error = %error,
            "Team directory lookup failed"
        );
    }
}
