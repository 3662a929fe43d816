#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Identity and team-scoping value types shared by the team access subsystem.
//!
//! - [`Principal`] - verified caller identity, produced upstream by token validation
//! - [`TeamSet`] - normalized, ordered set of team slugs
//! - [`AuthorizationContext`] - write-once result of team access resolution for one request

pub mod context;
pub mod principal;
pub mod team;

pub use context::{AuthorizationContext, AuthorizationContextError};
pub use principal::{Principal, PrincipalBuilder, PrincipalError};
pub use team::{TeamSet, TeamSource, normalize_slug};
