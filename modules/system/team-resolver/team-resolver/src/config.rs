//! Configuration for the team resolver.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use secrecy::SecretString;
use serde::Deserialize;

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `TEAM_RESOLVER__DIRECTORY__URL`.
pub const ENV_PREFIX: &str = "TEAM_RESOLVER__";

/// Configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeamResolverConfig {
    /// Team cache backend and TTL policy.
    pub cache: CacheConfig,

    /// Team-membership directory. Absent means "not configured".
    pub directory: Option<DirectoryConfig>,

    /// Static group-to-team mapping used as the fallback of last resort.
    pub legacy: LegacyConfig,

    /// Fail-open / fail-closed choices.
    pub fallback: FallbackConfig,

    /// Default team selection when the caller does not ask for one.
    pub selection: SelectionConfig,
}

impl TeamResolverConfig {
    /// Load from an optional YAML file, then `TEAM_RESOLVER__*` environment
    /// variables on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong
    /// shape.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

/// Which store backs the team cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process only.
    #[default]
    Local,
    /// Redis, degrading to in-process on connectivity failure.
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Redis connection URL; required for the `redis` backend.
    pub redis_url: Option<SecretString>,

    /// Key namespace in the shared store.
    pub key_prefix: String,

    /// Per-operation bound on Redis calls.
    pub operation_timeout_ms: u64,

    /// TTL for non-empty team sets.
    pub teams_ttl_secs: u64,

    /// TTL for empty team sets. Kept short so newly onboarded users are not
    /// stuck with "no teams".
    pub empty_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Local,
            redis_url: None,
            key_prefix: "teams".to_owned(),
            operation_timeout_ms: 250,
            teams_ttl_secs: 60 * 60,
            empty_ttl_secs: 5 * 60,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            teams: Duration::from_secs(self.teams_ttl_secs),
            empty: Duration::from_secs(self.empty_ttl_secs),
        }
    }

    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Differentiated TTLs for cached team sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub teams: Duration,
    pub empty: Duration,
}

impl TtlPolicy {
    /// TTL to apply to a set of `len` teams.
    #[must_use]
    pub fn for_len(&self, len: usize) -> Duration {
        if len == 0 { self.empty } else { self.teams }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        CacheConfig::default().ttl_policy()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryConfig {
    /// GraphQL endpoint of the team-membership directory.
    pub url: String,

    /// Service credential used when the caller's own token is not forwarded.
    pub service_token: Option<SecretString>,

    pub connect_timeout_ms: u64,

    /// Upper bound on a whole lookup, including retries inside the HTTP stack.
    pub request_timeout_ms: u64,

    /// How long a live failure is replayed for the same identity.
    /// `0` disables the memo.
    pub failure_memo_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_token: None,
            connect_timeout_ms: 1_000,
            request_timeout_ms: 3_000,
            failure_memo_secs: 30,
        }
    }
}

impl DirectoryConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn failure_memo(&self) -> Duration {
        Duration::from_secs(self.failure_memo_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacyConfig {
    /// External-directory group id -> team slug.
    pub groups: HashMap<String, String>,
}

/// What to do when the primary source cannot answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Resolve via the legacy group mapping (fail-open).
    #[default]
    Legacy,
    /// Deny the request (fail-closed).
    Deny,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    /// Applied when a configured directory lookup fails.
    pub on_lookup_failure: FallbackPolicy,
    /// Applied when no directory is configured at all.
    pub when_unconfigured: FallbackPolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Ordered preference list; the first entry the user belongs to becomes
    /// the default team. Otherwise the lexicographically smallest slug wins.
    pub preferred_teams: Vec<String>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_are_local_and_fail_open() {
        let cfg = TeamResolverConfig::default();

        assert_eq!(cfg.cache.backend, CacheBackend::Local);
        assert!(cfg.directory.is_none());
        assert_eq!(cfg.fallback.on_lookup_failure, FallbackPolicy::Legacy);
        assert_eq!(cfg.fallback.when_unconfigured, FallbackPolicy::Legacy);
        assert!(cfg.cache.empty_ttl_secs < cfg.cache.teams_ttl_secs);
    }

    #[test]
    fn ttl_policy_is_asymmetric() {
        let policy = TtlPolicy {
            teams: Duration::from_secs(3600),
            empty: Duration::from_secs(60),
        };

        assert_eq!(policy.for_len(0), Duration::from_secs(60));
        assert_eq!(policy.for_len(2), Duration::from_secs(3600));
    }

    #[test]
    fn loads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cache:
  backend: redis
  redis_url: "redis://cache:6379"
  empty_ttl_secs: 30
directory:
  url: "https://teams.example/graphql"
  service_token: "svc-token"
legacy:
  groups:
    g1: team-esyfo
fallback:
  when_unconfigured: deny
selection:
  preferred_teams: ["flex"]
"#
        )
        .unwrap();

        let cfg = temp_env::with_vars_unset(
            [
                "TEAM_RESOLVER__CACHE__BACKEND",
                "TEAM_RESOLVER__CACHE__TEAMS_TTL_SECS",
                "TEAM_RESOLVER__DIRECTORY__URL",
                "TEAM_RESOLVER__FALLBACK__ON_LOOKUP_FAILURE",
            ],
            || TeamResolverConfig::load(Some(file.path())),
        )
        .unwrap();

        assert_eq!(cfg.cache.backend, CacheBackend::Redis);
        assert_eq!(
            cfg.cache.redis_url.as_ref().map(ExposeSecret::expose_secret),
            Some("redis://cache:6379")
        );
        assert_eq!(cfg.cache.empty_ttl_secs, 30);
        assert_eq!(cfg.cache.teams_ttl_secs, 3600);
        let directory = cfg.directory.unwrap();
        assert_eq!(directory.url, "https://teams.example/graphql");
        assert_eq!(directory.request_timeout_ms, 3_000);
        assert_eq!(cfg.legacy.groups.get("g1").map(String::as_str), Some("team-esyfo"));
        assert_eq!(cfg.fallback.when_unconfigured, FallbackPolicy::Deny);
        assert_eq!(cfg.fallback.on_lookup_failure, FallbackPolicy::Legacy);
        assert_eq!(cfg.selection.preferred_teams, vec!["flex".to_owned()]);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache:\n  teams_ttl_secs: 100").unwrap();

        let cfg = temp_env::with_vars(
            [
                ("TEAM_RESOLVER__CACHE__TEAMS_TTL_SECS", Some("42")),
                ("TEAM_RESOLVER__FALLBACK__ON_LOOKUP_FAILURE", Some("deny")),
            ],
            || TeamResolverConfig::load(Some(file.path())),
        )
        .unwrap();

        assert_eq!(cfg.cache.teams_ttl_secs, 42);
        assert_eq!(cfg.fallback.on_lookup_failure, FallbackPolicy::Deny);
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache:\n  ttl: 5").unwrap();

        assert!(TeamResolverConfig::load(Some(file.path())).is_err());
    }
}
