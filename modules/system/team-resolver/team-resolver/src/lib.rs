#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Team Resolver Module
//!
//! Resolves which teams an authenticated user may view analytics for and
//! scopes every request to exactly one of them.
//!
//! Sources, in order of authority:
//!
//! 1. the team-membership directory (GraphQL over HTTP), fronted by a TTL cache
//! 2. the directory's view of "the current caller"
//! 3. a static legacy group-to-team mapping
//!
//! [`TeamResolverModule`] wires everything from [`TeamResolverConfig`]; the
//! [`api::rest`] layer exposes the per-request middleware and admin routes.

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

pub use config::TeamResolverConfig;
pub use domain::{AccessResolver, LegacyMembershipTable, TeamAccessLocalClient};
pub use module::TeamResolverModule;
