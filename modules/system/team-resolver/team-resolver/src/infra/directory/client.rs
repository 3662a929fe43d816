use std::sync::Arc;
use std::time::Duration;

use access_security::{Principal, TeamSet};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use team_resolver_sdk::{
    DirectoryDiagnostics, LookupError, LookupResult, TeamCache, TeamDirectoryClient,
};
use thiserror::Error;
use tokio::time::{Instant, timeout};

use super::telemetry::Telemetry;
use super::wire::{self, GraphQlRequest};
use crate::config::{DirectoryConfig, TtlPolicy};

type Parser = fn(&[u8]) -> LookupResult<TeamSet>;

/// Cache identity of "the current caller" lookups.
const CALLER_IDENTITY_PREFIX: &str = "caller:";

/// Invalid directory client configuration.
#[derive(Debug, Error)]
pub enum DirectoryBuildError {
    #[error("directory url is not configured")]
    MissingUrl,

    #[error("invalid directory url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid directory service token")]
    InvalidServiceToken,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug)]
struct RecentFailure {
    error: LookupError,
    until: Instant,
}

/// Cache-aside client for the GraphQL team-membership directory.
///
/// Cheap to clone; clones share the HTTP pool, cache handle, failure memo
/// and telemetry.
#[derive(Clone)]
pub struct GraphQlTeamDirectory {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    url: reqwest::Url,
    service_auth: Option<HeaderValue>,
    cache: Arc<dyn TeamCache>,
    ttl: TtlPolicy,
    request_timeout: Duration,
    failure_memo: Duration,
    failures: DashMap<String, RecentFailure>,
    telemetry: Telemetry,
}

impl std::fmt::Debug for GraphQlTeamDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQlTeamDirectory")
            .field("url", &self.inner.url.as_str())
            .field("request_timeout", &self.inner.request_timeout)
            .field("failure_memo", &self.inner.failure_memo)
            .finish_non_exhaustive()
    }
}

impl GraphQlTeamDirectory {
    /// # Errors
    ///
    /// Returns [`DirectoryBuildError`] if the URL is missing or malformed,
    /// the service token cannot be sent as a header, or the HTTP client
    /// cannot be built.
    pub fn new(
        config: &DirectoryConfig,
        cache: Arc<dyn TeamCache>,
        ttl: TtlPolicy,
    ) -> Result<Self, DirectoryBuildError> {
        let raw_url = config.url.trim();
        if raw_url.is_empty() {
            return Err(DirectoryBuildError::MissingUrl);
        }
        let url = reqwest::Url::parse(raw_url).map_err(|e| DirectoryBuildError::InvalidUrl {
            url: raw_url.to_owned(),
            reason: e.to_string(),
        })?;
        let service_auth = config
            .service_token
            .as_ref()
            .map(bearer_header)
            .transpose()
            .map_err(|_| DirectoryBuildError::InvalidServiceToken)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| DirectoryBuildError::Client(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                url,
                service_auth,
                cache,
                ttl,
                request_timeout: config.request_timeout(),
                failure_memo: config.failure_memo(),
                failures: DashMap::new(),
                telemetry: Telemetry::default(),
            }),
        })
    }

    /// Cache-aside lookup. `identity` keys the cache and the failure memo;
    /// `None` always goes to the directory and stores nothing.
    async fn lookup(
        &self,
        identity: Option<String>,
        request: GraphQlRequest,
        auth: Option<HeaderValue>,
        parse: Parser,
    ) -> LookupResult<TeamSet> {
        let inner = &self.inner;
        if let Some(identity) = identity.as_deref() {
            if let Some(teams) = inner.cache.get(identity).await {
                inner.telemetry.cache_hit();
                return Ok(teams);
            }
            inner.telemetry.cache_miss();

            if let Some(error) = inner.recent_failure(identity) {
                inner.telemetry.replayed_failure();
                return Err(LookupError::RecentFailure(Box::new(error)));
            }
        }

        // Detached so a dropped request still lets the call finish and fill the cache.
        let task = tokio::spawn(Arc::clone(inner).call(identity, request, auth, parse));
        task.await
            .unwrap_or_else(|e| Err(LookupError::Transport(format!("directory task failed: {e}"))))
    }
}

impl Inner {
    fn recent_failure(&self, identity: &str) -> Option<LookupError> {
        if self.failure_memo.is_zero() {
            return None;
        }
        let now = Instant::now();
        if let Some(entry) = self.failures.get(identity)
            && now < entry.until
        {
            return Some(entry.error.clone());
        }
        self.failures.remove_if(identity, |_, entry| now >= entry.until);
        None
    }

    async fn call(
        self: Arc<Self>,
        identity: Option<String>,
        request: GraphQlRequest,
        auth: Option<HeaderValue>,
        parse: Parser,
    ) -> LookupResult<TeamSet> {
        self.telemetry.call_started();
        let started = Instant::now();
        let outcome = timeout(self.request_timeout, self.fetch(&request, auth, parse))
            .await
            .unwrap_or(Err(LookupError::Timeout(self.request_timeout)));

        match &outcome {
            Ok(teams) => {
                tracing::debug!(
                    operation = request.operation,
                    teams = teams.len(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Directory lookup succeeded"
                );
                self.telemetry.call_succeeded();
                if let Some(identity) = identity {
                    self.failures.remove(&identity);
                    self.cache
                        .set(&identity, teams, self.ttl.for_len(teams.len()))
                        .await;
                }
            }
            Err(error) => {
                self.telemetry.call_failed(error.to_string());
                if let Some(identity) = identity {
                    self.remember_failure(identity, error);
                }
            }
        }
        outcome
    }

    /// Memoize a live failure. Expired entries of every identity are swept on
    /// each insert.
    fn remember_failure(&self, identity: String, error: &LookupError) {
        if self.failure_memo.is_zero() {
            return;
        }
        let now = Instant::now();
        self.failures.retain(|_, entry| now < entry.until);
        self.failures.insert(
            identity,
            RecentFailure {
                error: error.clone(),
                until: now + self.failure_memo,
            },
        );
    }

    async fn fetch(
        &self,
        request: &GraphQlRequest,
        auth: Option<HeaderValue>,
        parse: Parser,
    ) -> LookupResult<TeamSet> {
        let mut builder = self.http.post(self.url.clone()).json(request);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }

        let response = builder.send().await.map_err(|e| self.map_transport(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                detail: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_owned(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.map_transport(&e))?;
        parse(&body)
    }

    fn map_transport(&self, err: &reqwest::Error) -> LookupError {
        if err.is_timeout() {
            LookupError::Timeout(self.request_timeout)
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

fn bearer_header(token: &SecretString) -> Result<HeaderValue, reqwest::header::InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait]
impl TeamDirectoryClient for GraphQlTeamDirectory {
    #[tracing::instrument(skip_all)]
    async fn lookup_by_identity(&self, email: &str) -> LookupResult<TeamSet> {
        let identity = email.trim().to_lowercase();
        if identity.is_empty() {
            return Ok(TeamSet::new());
        }
        let request = GraphQlRequest::teams_by_email(&identity);
        let auth = self.inner.service_auth.clone();
        self.lookup(Some(identity), request, auth, wire::parse_by_email)
            .await
    }

    #[tracing::instrument(skip_all, fields(user_id = %caller.user_id()))]
    async fn lookup_current_caller(&self, caller: &Principal) -> LookupResult<TeamSet> {
        let auth = match caller.bearer_token() {
            Some(token) => Some(bearer_header(token).map_err(|_| {
                LookupError::Transport("caller credential is not a valid header value".to_owned())
            })?),
            None => self.inner.service_auth.clone(),
        };
        // Callers without a user id are never cached or memoized.
        let user_id = caller.user_id().trim();
        let identity =
            (!user_id.is_empty()).then(|| format!("{CALLER_IDENTITY_PREFIX}{user_id}"));
        self.lookup(
            identity,
            GraphQlRequest::teams_of_caller(),
            auth,
            wire::parse_caller,
        )
        .await
    }

    fn diagnostics(&self) -> DirectoryDiagnostics {
        self.inner.telemetry.snapshot()
    }
}
