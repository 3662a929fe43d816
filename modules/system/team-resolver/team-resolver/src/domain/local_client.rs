//! Local (in-process) client for the team resolver.

use std::sync::Arc;

use access_security::{AuthorizationContext, Principal};
use async_trait::async_trait;
use team_resolver_sdk::{CacheError, TeamAccessClient, TeamAccessHealth, TeamResolverError};

use super::{AccessResolver, DomainError};

/// Local client wrapping the resolver.
#[derive(Debug, Clone)]
pub struct TeamAccessLocalClient {
    resolver: Arc<AccessResolver>,
}

impl TeamAccessLocalClient {
    #[must_use]
    pub fn new(resolver: Arc<AccessResolver>) -> Self {
        Self { resolver }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> TeamResolverError {
    match &e {
        DomainError::Denied(reason) => {
            tracing::info!(operation = op, code = reason.code(), "team access denied");
        }
        DomainError::Internal(_) => {
            tracing::error!(operation = op, error = %e, "team_resolver call failed");
        }
    }
    e.into()
}

#[async_trait]
impl TeamAccessClient for TeamAccessLocalClient {
    async fn resolve(
        &self,
        principal: Option<&Principal>,
        requested_team: Option<&str>,
    ) -> Result<AuthorizationContext, TeamResolverError> {
        self.resolver
            .resolve(principal, requested_team)
            .await
            .map_err(|e| log_and_convert("resolve", e))
    }

    async fn health(&self) -> TeamAccessHealth {
        TeamAccessHealth {
            cache_healthy: self.resolver.cache_healthy(),
            directory_configured: self.resolver.directory_configured(),
            directory: self.resolver.directory_diagnostics(),
        }
    }

    async fn clear_cache(&self) -> Result<(), CacheError> {
        self.resolver.clear_cache().await.inspect_err(|e| {
            tracing::warn!(error = %e, "team cache clear incomplete");
        })
    }
}
