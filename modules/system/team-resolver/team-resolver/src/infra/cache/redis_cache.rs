use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use access_security::TeamSet;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use team_resolver_sdk::{CacheError, TeamCache};
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::LocalTeamCache;

/// Keys deleted per `DEL` while clearing.
const CLEAR_BATCH: usize = 500;

/// Redis-backed team cache with write-through to a [`LocalTeamCache`].
///
/// Every Redis failure (connect, command, timeout) is absorbed: reads fall
/// back to the local store, writes still land locally, and the health flag
/// flips to unhealthy until the next successful Redis operation.
///
/// One multiplexed connection is opened lazily and shared by all operations.
/// It is dropped after any failure and reopened by the next operation.
///
/// Values are JSON arrays of slugs; an empty set is stored as `[]`, which is
/// how "checked recently, zero teams" differs from a missing key.
pub struct RedisTeamCache {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    prefix: String,
    op_timeout: Duration,
    local: LocalTeamCache,
    healthy: AtomicBool,
}

impl std::fmt::Debug for RedisTeamCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTeamCache")
            .field("prefix", &self.prefix)
            .field("op_timeout", &self.op_timeout)
            .field("local_entries", &self.local.len())
            .field("healthy", &self.healthy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Encode a team set as stored in Redis.
///
/// # Errors
///
/// Returns an error if the set cannot be serialized.
pub fn encode_teams(teams: &TeamSet) -> serde_json::Result<String> {
    serde_json::to_string(teams)
}

/// Decode a stored team set. `[]` decodes to the empty set.
///
/// # Errors
///
/// Returns an error if `raw` is not a JSON array of strings.
pub fn decode_teams(raw: &str) -> serde_json::Result<TeamSet> {
    serde_json::from_str(raw)
}

impl RedisTeamCache {
    /// Build the cache. Does not connect; the shared connection is opened by
    /// the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid Redis connection URL.
    pub fn new(url: &str, prefix: &str, op_timeout: Duration) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix: prefix.trim_end_matches(':').to_owned(),
            op_timeout,
            local: LocalTeamCache::new(),
            healthy: AtomicBool::new(true),
        })
    }

    fn key(&self, identity: &str) -> String {
        format!("{}:{identity}", self.prefix)
    }

    async fn connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn run<T, F, Fut>(&self, op: F) -> Result<T, String>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let attempt = async {
            let conn = self.connection().await?;
            op(conn).await
        };
        let result = match timeout(self.op_timeout, attempt).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "redis operation timed out after {}ms",
                self.op_timeout.as_millis()
            )),
        };
        if result.is_err() {
            self.connection.lock().await.take();
        }
        self.record(result.is_ok());
        result
    }

    fn record(&self, ok: bool) {
        let was_healthy = self.healthy.swap(ok, Ordering::Relaxed);
        if was_healthy && !ok {
            tracing::warn!("Team cache degraded to in-process store");
        } else if !was_healthy && ok {
            tracing::info!("Team cache recovered");
        }
    }
}

#[async_trait]
impl TeamCache for RedisTeamCache {
    async fn get(&self, identity: &str) -> Option<TeamSet> {
        let key = self.key(identity);
        let fetched = self
            .run(|mut conn| async move {
                let raw: Option<String> = conn.get(key).await?;
                Ok::<_, redis::RedisError>(raw)
            })
            .await;

        match fetched {
            Ok(Some(raw)) => match decode_teams(&raw) {
                Ok(teams) => Some(teams),
                Err(e) => {
                    tracing::warn!(identity, error = %e, "Discarding malformed cached team set");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(identity, error = %e, "Redis read failed; using in-process cache");
                self.local.get_now(identity)
            }
        }
    }

    async fn set(&self, identity: &str, teams: &TeamSet, ttl: Duration) {
        self.local.set_now(identity, teams, ttl);

        let payload = match encode_teams(teams) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(identity, error = %e, "Failed to encode team set");
                return;
            }
        };
        let key = self.key(identity);
        let secs = ttl.as_secs().max(1);
        if let Err(e) = self
            .run(|mut conn| async move {
                let () = conn.set_ex(key, payload, secs).await?;
                Ok::<_, redis::RedisError>(())
            })
            .await
        {
            tracing::debug!(identity, error = %e, "Redis write failed; kept in-process only");
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.local.clear_now();

        let pattern = format!("{}:*", self.prefix);
        self.run(|mut conn| async move {
            let mut scan_conn = conn.clone();
            let mut keys: redis::AsyncIter<'_, String> = scan_conn.scan_match(pattern).await?;
            let mut batch = Vec::with_capacity(CLEAR_BATCH);
            while let Some(key) = keys.next_item().await {
                batch.push(key);
                if batch.len() == CLEAR_BATCH {
                    let () = conn.del(std::mem::take(&mut batch)).await?;
                }
            }
            if !batch.is_empty() {
                let () = conn.del(batch).await?;
            }
            Ok::<_, redis::RedisError>(())
        })
        .await
        .map_err(CacheError::Unavailable)
    }
}
