//! Lookup trait for the external team-membership directory.

use access_security::{Principal, TeamSet};
use async_trait::async_trait;

use crate::error::LookupResult;
use crate::models::DirectoryDiagnostics;

/// Client for the team-membership directory.
///
/// Implementations are cache-aside: they consult the [`crate::TeamCache`]
/// first and populate it after a successful remote query. A successful
/// lookup that finds zero teams is `Ok(TeamSet::new())`, never an error.
#[async_trait]
pub trait TeamDirectoryClient: Send + Sync {
    /// Teams of the user identified by `email`.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::LookupError`] describing the failure kind
    /// (transport, status, remote application error, timeout, malformed
    /// payload, or a replayed recent failure).
    async fn lookup_by_identity(&self, email: &str) -> LookupResult<TeamSet>;

    /// Teams of "the caller", as the directory sees the credential in use.
    ///
    /// Used when the directory refuses arbitrary by-email lookups for the
    /// caller's credential scope. Non-user callers resolve to an empty set.
    ///
    /// # Errors
    ///
    /// Same failure kinds as [`TeamDirectoryClient::lookup_by_identity`].
    async fn lookup_current_caller(&self, caller: &Principal) -> LookupResult<TeamSet>;

    /// Read-only telemetry snapshot. Not required for correctness.
    fn diagnostics(&self) -> DirectoryDiagnostics;
}
