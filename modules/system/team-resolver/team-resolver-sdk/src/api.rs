//! Public API trait for the team resolver.

use access_security::{AuthorizationContext, Principal};
use async_trait::async_trait;

use crate::error::{CacheError, TeamResolverError};
use crate::models::TeamAccessHealth;

/// Public API trait for request-scoped team access resolution.
///
/// Consumed by the team access middleware and by anything else that needs to
/// scope a request to exactly one team:
///
/// ```ignore
/// let ctx = team_access.resolve(Some(&principal), Some("flex")).await?;
/// assert_eq!(ctx.selected_team(), "flex");
/// ```
#[async_trait]
pub trait TeamAccessClient: Send + Sync {
    /// Resolve the caller's authorized teams and select one for this request.
    ///
    /// `requested_team` is the optional caller-supplied `team` parameter.
    ///
    /// # Errors
    ///
    /// - `Denied` with the distinguishing [`crate::AccessDenied`] reason
    /// - `Internal` for unexpected errors
    async fn resolve(
        &self,
        principal: Option<&Principal>,
        requested_team: Option<&str>,
    ) -> Result<AuthorizationContext, TeamResolverError>;

    /// Best-effort health snapshot of the cache and directory integration.
    async fn health(&self) -> TeamAccessHealth;

    /// Purge every cached team set (administrative operation).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the distributed store could not be purged.
    /// The in-process store is purged regardless.
    async fn clear_cache(&self) -> Result<(), CacheError>;
}
