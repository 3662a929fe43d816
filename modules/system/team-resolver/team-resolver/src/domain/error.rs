//! Domain errors for the team resolver.

use access_security::AuthorizationContextError;
use team_resolver_sdk::{AccessDenied, TeamResolverError};

/// Internal domain errors.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Denied(#[from] AccessDenied),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthorizationContextError> for DomainError {
    fn from(e: AuthorizationContextError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<DomainError> for TeamResolverError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Denied(reason) => Self::Denied(reason),
            DomainError::Internal(reason) => Self::Internal(reason),
        }
    }
}
