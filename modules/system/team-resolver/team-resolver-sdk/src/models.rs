//! Domain models for the team resolver module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Best-effort telemetry of the directory client.
///
/// Counters are monotonic since process start. Read-only snapshot; values may
/// be slightly stale relative to each other under concurrent load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDiagnostics {
    /// Remote calls issued (cache misses that reached the directory).
    pub calls: u64,
    /// Remote calls that failed, by any failure kind.
    pub errors: u64,
    /// Lookups answered from the team cache.
    pub cache_hits: u64,
    /// Lookups that missed the team cache.
    pub cache_misses: u64,
    /// Failures replayed from the recent-failure memo without a remote call.
    pub replayed_failures: u64,
    /// Completion time of the last successful remote call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    /// Message of the last live failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Health snapshot of the team access subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAccessHealth {
    /// Team cache health flag (advisory).
    pub cache_healthy: bool,
    /// Whether a directory client is configured at all.
    pub directory_configured: bool,
    /// Directory telemetry, when a directory client is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryDiagnostics>,
}
