//! HTTP surface: per-request team access middleware and admin routes.

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use team_resolver_sdk::TeamAccessClient;

pub use error::{APPLICATION_PROBLEM_JSON, Problem};
pub use middleware::{TeamAccessState, team_access_middleware};
pub use routes::admin_router;

/// Scope every route of `router` to one authorized team.
///
/// Must sit inside the authentication layer so the `Principal` is already in
/// request extensions.
#[must_use]
pub fn with_team_access<S>(router: Router<S>, client: Arc<dyn TeamAccessClient>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(axum::middleware::from_fn_with_state(
        TeamAccessState::new(client),
        team_access_middleware,
    ))
}
