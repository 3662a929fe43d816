//! Domain layer for the team resolver.

pub mod error;
pub mod legacy;
pub mod local_client;
pub mod resolver;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod resolver_test;

pub use error::DomainError;
pub use legacy::LegacyMembershipTable;
pub use local_client::TeamAccessLocalClient;
pub use resolver::AccessResolver;
