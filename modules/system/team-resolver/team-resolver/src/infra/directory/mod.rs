//! Client for the GraphQL team-membership directory.

mod client;
mod telemetry;
mod wire;

pub use client::{DirectoryBuildError, GraphQlTeamDirectory};
