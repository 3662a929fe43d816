#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Team Resolver SDK
//!
//! This crate provides the public API for the `team_resolver` module:
//!
//! - [`TeamAccessClient`] - Public API trait for request-scoped team access resolution
//! - [`TeamDirectoryClient`] - Lookup trait for the external team-membership directory
//! - [`TeamCache`] - Injectable TTL cache of resolved team sets
//! - [`LookupError`], [`AccessDenied`], [`TeamResolverError`] - Error types
//! - [`DirectoryDiagnostics`], [`TeamAccessHealth`] - Read-only telemetry snapshots
//!
//! ## Usage
//!
//! ```ignore
//! use team_resolver_sdk::{AccessDenied, TeamAccessClient, TeamResolverError};
//!
//! let ctx = team_access
//!     .resolve(Some(&principal), requested_team.as_deref())
//!     .await?;
//!
//! let rows = stats_repo.aggregate(ctx.selected_team()).await?;
//! ```

pub mod api;
pub mod cache_api;
pub mod directory_api;
pub mod error;
pub mod models;

// Re-export main types at crate root
pub use api::TeamAccessClient;
pub use cache_api::TeamCache;
pub use directory_api::TeamDirectoryClient;
pub use error::{AccessDenied, CacheError, LookupError, LookupResult, TeamResolverError};
pub use models::{DirectoryDiagnostics, TeamAccessHealth};
