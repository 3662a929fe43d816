use std::time::Duration;

use access_security::TeamSet;
use async_trait::async_trait;
use dashmap::DashMap;
use team_resolver_sdk::{CacheError, TeamCache};
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    teams: TeamSet,
    expires_at: Instant,
}

/// In-process team cache with absolute per-entry expiry.
///
/// Expired entries are indistinguishable from absent ones and are purged
/// lazily when read. Used on its own for single-instance deployments and as
/// the degraded-mode store behind [`super::RedisTeamCache`].
#[derive(Debug, Default)]
pub struct LocalTeamCache {
    entries: DashMap<String, Entry>,
}

impl LocalTeamCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous [`TeamCache::get`].
    #[must_use]
    pub fn get_now(&self, identity: &str) -> Option<TeamSet> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(identity)
            && now <= entry.expires_at
        {
            return Some(entry.teams.clone());
        }
        self.entries
            .remove_if(identity, |_, entry| now > entry.expires_at);
        None
    }

    /// Synchronous [`TeamCache::set`].
    pub fn set_now(&self, identity: &str, teams: &TeamSet, ttl: Duration) {
        let entry = Entry {
            teams: teams.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(identity.to_owned(), entry);
    }

    /// Synchronous [`TeamCache::clear`].
    pub fn clear_now(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TeamCache for LocalTeamCache {
    async fn get(&self, identity: &str) -> Option<TeamSet> {
        self.get_now(identity)
    }

    async fn set(&self, identity: &str, teams: &TeamSet, ttl: Duration) {
        self.set_now(identity, teams, ttl);
    }

    fn is_healthy(&self) -> bool {
        true
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.clear_now();
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn teams(slugs: &[&str]) -> TeamSet {
        slugs.iter().collect()
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_before_ttl_returns_the_set() {
        let cache = LocalTeamCache::new();
        cache
            .set("u@x.no", &teams(&["flex"]), Duration::from_secs(60))
            .await;

        tokio::time::advance(Duration::from_secs(59)).await;

        assert_eq!(cache.get("u@x.no").await, Some(teams(&["flex"])));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_set_is_a_cacheable_answer() {
        let cache = LocalTeamCache::new();
        cache.set("u@x.no", &TeamSet::new(), Duration::from_secs(5)).await;

        assert_eq!(cache.get("u@x.no").await, Some(TeamSet::new()));
        assert_eq!(cache.get("other@x.no").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_absent_until_set_again() {
        let cache = LocalTeamCache::new();
        cache
            .set("u@x.no", &teams(&["flex"]), Duration::from_secs(10))
            .await;

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("u@x.no").await, None);
        assert!(cache.is_empty(), "expired entry should be purged on read");

        cache
            .set("u@x.no", &teams(&["team-esyfo"]), Duration::from_secs(10))
            .await;
        assert_eq!(cache.get("u@x.no").await, Some(teams(&["team-esyfo"])));
    }

    #[tokio::test]
    async fn clear_purges_everything() {
        let cache = LocalTeamCache::new();
        cache.set("a", &teams(&["x"]), Duration::from_secs(60)).await;
        cache.set("b", &TeamSet::new(), Duration::from_secs(60)).await;

        cache.clear().await.unwrap();

        assert!(cache.is_empty());
        assert!(cache.is_healthy());
        assert_eq!(cache.get("a").await, None);
    }
}
