use std::sync::Arc;

use access_security::Principal;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use team_resolver_sdk::TeamAccessClient;

use super::error::{Problem, resolver_error_to_response};

/// Shared state of [`team_access_middleware`].
#[derive(Clone)]
pub struct TeamAccessState {
    pub client: Arc<dyn TeamAccessClient>,
}

impl TeamAccessState {
    #[must_use]
    pub fn new(client: Arc<dyn TeamAccessClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TeamQuery {
    team: Option<String>,
}

/// Team access middleware.
///
/// Runs after authentication. For each request:
/// 1. Skips CORS preflight requests
/// 2. Takes the verified [`Principal`] from request extensions (absent means unauthenticated)
/// 3. Reads the optional `team` query parameter
/// 4. Resolves team access and inserts the `AuthorizationContext` into request extensions,
///    or answers with a problem response carrying the denial reason
pub async fn team_access_middleware(
    State(state): State<TeamAccessState>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_preflight_request(req.method(), req.headers()) {
        return next.run(req).await;
    }

    let requested = match requested_team(req.uri().query()) {
        Ok(team) => team,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting malformed query string");
            return Problem::new(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                "Malformed 'team' query parameter",
            )
            .into_response();
        }
    };
    let principal = req.extensions().get::<Principal>().cloned();

    match state
        .client
        .resolve(principal.as_ref(), requested.as_deref())
        .await
    {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(err) => resolver_error_to_response(&err),
    }
}

fn requested_team(query: Option<&str>) -> Result<Option<String>, serde_urlencoded::de::Error> {
    let Some(query) = query else {
        return Ok(None);
    };
    let parsed: TeamQuery = serde_urlencoded::from_str(query)?;
    Ok(parsed.team.filter(|t| !t.trim().is_empty()))
}

fn is_preflight_request(method: &Method, headers: &axum::http::HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(header::ORIGIN)
        && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}
