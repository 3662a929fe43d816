//! Error types for the team resolver module.

use std::time::Duration;

use thiserror::Error;

/// Outcome of a directory lookup: the team set, or why the call failed.
///
/// "Call succeeded but found nothing" is `Ok(TeamSet::new())`.
pub type LookupResult<T> = Result<T, LookupError>;

/// Failure of a directory lookup.
///
/// Variants are distinct for observability; the access resolver treats them
/// uniformly for fallback purposes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Network/connection failure before a response was received.
    #[error("directory transport failure: {0}")]
    Transport(String),

    /// The directory answered with a non-success HTTP status.
    #[error("directory responded with status {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Well-formed response envelope carrying application-level errors.
    #[error("directory returned errors: {}", .0.join("; "))]
    Remote(Vec<String>),

    /// The remote call did not complete within the configured bound.
    #[error("directory call timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    /// The response could not be decoded.
    #[error("malformed directory response: {0}")]
    Decode(String),

    /// A recent live failure for the same identity, replayed without calling
    /// the directory again.
    #[error("recent directory failure replayed: {0}")]
    RecentFailure(Box<LookupError>),
}

impl LookupError {
    /// Whether the next request has a reasonable chance of succeeding.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Remote(_) | Self::Decode(_) => false,
            Self::RecentFailure(inner) => inner.is_retryable(),
        }
    }

    /// `true` when this failure was replayed from the recent-failure memo
    /// rather than observed on a live call.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::RecentFailure(_))
    }

    /// Short machine-readable failure kind, for logs and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Remote(_) => "remote",
            Self::Timeout(_) => "timeout",
            Self::Decode(_) => "decode",
            Self::RecentFailure(inner) => inner.kind(),
        }
    }
}

/// Terminal denial of a request's team access, with the distinguishing reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    /// No verified identity reached the resolver.
    #[error("no authenticated principal")]
    NotAuthenticated,

    /// The resolved team set is empty.
    #[error("user has no team access")]
    NoTeamAccess,

    /// The explicitly requested team is outside the resolved set.
    #[error("team '{requested}' is not authorized for this user")]
    TeamNotAuthorized { requested: String },

    /// No directory integration is configured and the operator chose to deny.
    #[error("team lookup is not configured")]
    LookupNotConfigured,

    /// The directory lookup failed and the operator chose to fail closed.
    #[error("team directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl AccessDenied {
    /// Machine-readable reason code exposed to callers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not-authenticated",
            Self::NoTeamAccess => "no-team-access",
            Self::TeamNotAuthorized { .. } => "team-not-authorized",
            Self::LookupNotConfigured => "lookup-not-configured",
            Self::DirectoryUnavailable(_) => "directory-unavailable",
        }
    }
}

/// Cache backend failure surfaced by administrative operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The distributed store could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur when using the team resolver API.
#[derive(Debug, Error)]
pub enum TeamResolverError {
    /// Access was denied; the reason is meant for the caller.
    #[error(transparent)]
    Denied(#[from] AccessDenied),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
