use serde::Serialize;
use thiserror::Error;

use crate::principal::Principal;
use crate::team::{TeamSet, TeamSource, normalize_slug};

/// Rejected attempt to build an [`AuthorizationContext`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorizationContextError {
    #[error("selected team '{0}' is not in the authorized team set")]
    SelectedTeamNotAuthorized(String),
}

/// Result of team access resolution for a single request.
///
/// Built once by the access resolver and inserted into the request's
/// extensions; downstream handlers only read it. `selected_team` is always a
/// member of `authorized_teams`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationContext {
    principal: Principal,
    authorized_teams: TeamSet,
    selected_team: String,
    source: TeamSource,
}

impl AuthorizationContext {
    /// # Errors
    ///
    /// Returns [`AuthorizationContextError::SelectedTeamNotAuthorized`] when
    /// `selected_team` is not a member of `authorized_teams`.
    pub fn new(
        principal: Principal,
        authorized_teams: TeamSet,
        selected_team: &str,
        source: TeamSource,
    ) -> Result<Self, AuthorizationContextError> {
        match normalize_slug(selected_team) {
            Some(selected) if authorized_teams.contains(&selected) => Ok(Self {
                principal,
                authorized_teams,
                selected_team: selected,
                source,
            }),
            _ => Err(AuthorizationContextError::SelectedTeamNotAuthorized(
                selected_team.to_owned(),
            )),
        }
    }

    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    #[must_use]
    pub fn authorized_teams(&self) -> &TeamSet {
        &self.authorized_teams
    }

    /// The single team that scopes this request's analytics queries.
    #[must_use]
    pub fn selected_team(&self) -> &str {
        &self.selected_team
    }

    #[must_use]
    pub fn source(&self) -> TeamSource {
        self.source
    }
}
