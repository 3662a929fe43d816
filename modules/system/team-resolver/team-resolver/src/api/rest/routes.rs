//! Administrative and diagnostic routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use team_resolver_sdk::{TeamAccessClient, TeamAccessHealth};

use super::error::cache_error_to_response;

pub const HEALTH_PATH: &str = "/internal/team-access/health";
pub const CACHE_PATH: &str = "/internal/team-access/cache";

#[derive(Clone)]
struct AdminState {
    client: Arc<dyn TeamAccessClient>,
}

/// `GET /internal/team-access/health` and `DELETE /internal/team-access/cache`.
///
/// Mount behind the operator authentication of the hosting service.
#[must_use]
pub fn admin_router(client: Arc<dyn TeamAccessClient>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(CACHE_PATH, delete(clear_cache))
        .with_state(AdminState { client })
}

async fn health(State(state): State<AdminState>) -> Json<TeamAccessHealth> {
    Json(state.client.health().await)
}

async fn clear_cache(State(state): State<AdminState>) -> Response {
    match state.client.clear_cache().await {
        Ok(()) => {
            tracing::info!("Team cache cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => cache_error_to_response(&e),
    }
}
