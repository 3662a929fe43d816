//! Cache trait for resolved team sets.

use std::time::Duration;

use access_security::TeamSet;
use async_trait::async_trait;

use crate::error::CacheError;

/// TTL-keyed store of resolved team sets, keyed by identity (usually email).
///
/// Implementations own their synchronization and are shared as
/// `Arc<dyn TeamCache>` across all requests. Backend failures never surface
/// from `get`/`set`: the cache degrades to an in-process store and reports
/// itself unhealthy instead.
#[async_trait]
pub trait TeamCache: Send + Sync {
    /// Cached team set for `identity`, or `None` if absent or expired.
    ///
    /// `Some(empty)` means "checked recently, found zero teams".
    async fn get(&self, identity: &str) -> Option<TeamSet>;

    /// Store `teams` for `identity` for `ttl`. Empty sets are stored too.
    async fn set(&self, identity: &str, teams: &TeamSet, ttl: Duration);

    /// Advisory health flag: `false` after a backend connectivity failure,
    /// `true` again after the next successful backend operation.
    fn is_healthy(&self) -> bool;

    /// Purge every entry from all backing stores.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if a distributed store could not
    /// be purged.
    async fn clear(&self) -> Result<(), CacheError>;
}
