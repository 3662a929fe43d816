//! Team resolver module bootstrap.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use secrecy::ExposeSecret;
use team_resolver_sdk::{TeamAccessClient, TeamCache, TeamDirectoryClient};
use tracing::info;

use crate::api::rest;
use crate::config::{CacheBackend, CacheConfig, DirectoryConfig, TeamResolverConfig, TtlPolicy};
use crate::domain::{AccessResolver, LegacyMembershipTable, TeamAccessLocalClient};
use crate::infra::cache::{LocalTeamCache, RedisTeamCache};
use crate::infra::directory::GraphQlTeamDirectory;

/// Team Resolver module.
///
/// Built once at process start. This module:
/// 1. Builds the team cache (in-process, or Redis with in-process fallback)
/// 2. Builds the directory client when a directory is configured
/// 3. Wires the access resolver with the legacy mapping and fallback policies
/// 4. Hands out the [`TeamAccessClient`], the request middleware and admin routes
#[derive(Clone)]
pub struct TeamResolverModule {
    client: Arc<TeamAccessLocalClient>,
}

impl std::fmt::Debug for TeamResolverModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamResolverModule")
            .field("client", &self.client)
            .finish()
    }
}

impl TeamResolverModule {
    pub const MODULE_NAME: &'static str = "team-resolver";

    /// Load configuration from an optional YAML file plus environment and
    /// build the module.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let cfg = TeamResolverConfig::load(path).context("failed to load team resolver config")?;
        Self::init(&cfg)
    }

    /// Build the module from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis backend is selected without a URL, or
    /// the Redis URL or directory settings are invalid.
    #[tracing::instrument(skip_all, fields(backend = ?cfg.cache.backend))]
    pub fn init(cfg: &TeamResolverConfig) -> anyhow::Result<Self> {
        info!(
            directory_configured = cfg.directory.is_some(),
            legacy_groups = cfg.legacy.groups.len(),
            "Initializing {} module",
            Self::MODULE_NAME
        );

        let ttl = cfg.cache.ttl_policy();
        let cache = build_cache(&cfg.cache)?;
        let directory = build_directory(cfg.directory.as_ref(), &cache, ttl)?;
        let legacy = LegacyMembershipTable::new(&cfg.legacy.groups);
        if directory.is_none() && legacy.is_empty() {
            tracing::warn!(
                "No team directory and no legacy group mapping configured; every request will be denied"
            );
        }

        let resolver = AccessResolver::new(cache, directory, legacy, cfg.fallback, &cfg.selection);
        let client = Arc::new(TeamAccessLocalClient::new(Arc::new(resolver)));

        info!("{} module initialized", Self::MODULE_NAME);
        Ok(Self { client })
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn TeamAccessClient> {
        self.client.clone()
    }

    /// Apply the team access middleware to `router`.
    #[must_use]
    pub fn scope<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        rest::with_team_access(router, self.client())
    }

    #[must_use]
    pub fn admin_router(&self) -> Router {
        rest::admin_router(self.client())
    }
}

fn build_cache(cfg: &CacheConfig) -> anyhow::Result<Arc<dyn TeamCache>> {
    match cfg.backend {
        CacheBackend::Local => {
            info!("Using in-process team cache");
            Ok(Arc::new(LocalTeamCache::new()))
        }
        CacheBackend::Redis => {
            let url = cfg
                .redis_url
                .as_ref()
                .context("cache.redis_url is required for the redis backend")?;
            let cache = RedisTeamCache::new(
                url.expose_secret(),
                &cfg.key_prefix,
                cfg.operation_timeout(),
            )
            .context("invalid cache.redis_url")?;
            info!(prefix = %cfg.key_prefix, "Using Redis team cache");
            Ok(Arc::new(cache))
        }
    }
}

fn build_directory(
    cfg: Option<&DirectoryConfig>,
    cache: &Arc<dyn TeamCache>,
    ttl: TtlPolicy,
) -> anyhow::Result<Option<Arc<dyn TeamDirectoryClient>>> {
    let Some(cfg) = cfg else {
        info!("No team directory configured; resolving from legacy mapping");
        return Ok(None);
    };
    let client = GraphQlTeamDirectory::new(cfg, Arc::clone(cache), ttl)
        .context("invalid directory configuration")?;
    info!(url = %cfg.url, "Team directory client configured");
    Ok(Some(Arc::new(client)))
}
