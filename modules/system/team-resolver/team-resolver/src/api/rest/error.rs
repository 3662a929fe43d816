//! RFC-9457 problem responses for team access denials.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use team_resolver_sdk::{AccessDenied, CacheError, TeamResolverError};

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Problem Details document with a machine-readable `code` extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Problem {
    #[must_use]
    pub fn new(status: StatusCode, title: &str, detail: impl Into<String>) -> Self {
        Self {
            type_uri: "about:blank".to_owned(),
            title: title.to_owned(),
            status: status.as_u16(),
            detail: detail.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: &str) -> Self {
        self.type_uri = format!("urn:team-access:{code}");
        self.code = Some(code.to_owned());
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match serde_json::to_vec(&self) {
            Ok(body) => (
                status,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
                )],
                body,
            )
                .into_response(),
            Err(_) => status.into_response(),
        }
    }
}

#[must_use]
pub fn denial_status(reason: &AccessDenied) -> StatusCode {
    match reason {
        AccessDenied::NotAuthenticated => StatusCode::UNAUTHORIZED,
        AccessDenied::NoTeamAccess | AccessDenied::TeamNotAuthorized { .. } => {
            StatusCode::FORBIDDEN
        }
        AccessDenied::LookupNotConfigured | AccessDenied::DirectoryUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Convert a resolver error into a problem response.
///
/// Directory failure details stay in the logs.
#[must_use]
pub fn resolver_error_to_response(err: &TeamResolverError) -> Response {
    match err {
        TeamResolverError::Denied(reason) => {
            let status = denial_status(reason);
            let title = status.canonical_reason().unwrap_or("Forbidden");
            let detail = match reason {
                AccessDenied::DirectoryUnavailable(_) => "Team directory unavailable".to_owned(),
                other => other.to_string(),
            };
            Problem::new(status, title, detail)
                .with_code(reason.code())
                .into_response()
        }
        TeamResolverError::Internal(_) => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Internal team access error",
        )
        .into_response(),
    }
}

#[must_use]
pub fn cache_error_to_response(err: &CacheError) -> Response {
    match err {
        CacheError::Unavailable(_) => Problem::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable",
            "Team cache backend unavailable; in-process entries were purged",
        )
        .with_code("cache-unavailable")
        .into_response(),
    }
}
