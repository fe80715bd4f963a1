use crate::attempt::SignInAttempt;
use crate::error::{DeadboltError, Result};
use crate::store::AttemptStore;
use async_trait::async_trait;
use std::time::Duration;

/// Redis-backed attempt store.
///
/// Attempts are stored as JSON under a prefixed key with a TTL, so abandoned
/// attempts are garbage collected by Redis itself. The TTL is a store-level
/// optimization: expiry is still enforced lazily by the code service, and the
/// TTL must comfortably exceed the service's expiration window so Redis never
/// drops an attempt the service still considers live.
#[derive(Clone)]
pub struct RedisAttemptStore {
    client: redis::Client,
    key_prefix: String,
    ttl: Duration,
}

impl RedisAttemptStore {
    /// Create a store from a connection URL.
    ///
    /// `ttl` bounds how long Redis keeps an abandoned attempt; pass several
    /// multiples of the configured expiration window.
    pub fn new(url: &str, ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            DeadboltError::store_unavailable(format!("failed to create Redis client: {}", e))
        })?;

        Ok(Self {
            client,
            key_prefix: "deadbolt:attempt:".to_string(),
            ttl,
        })
    }

    /// Override the key prefix (default: `deadbolt:attempt:`).
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                DeadboltError::store_unavailable(format!("failed to get Redis connection: {}", e))
            })
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn insert(&self, attempt: SignInAttempt) -> Result<()> {
        let payload = serde_json::to_vec(&attempt)
            .map_err(|e| DeadboltError::internal(format!("failed to serialize attempt: {}", e)))?;

        let mut conn = self.connection().await?;
        redis::cmd("SETEX")
            .arg(self.key(attempt.session_id()))
            .arg(self.ttl.as_secs())
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| DeadboltError::store_unavailable(format!("Redis SETEX failed: {}", e)))?;

        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SignInAttempt>> {
        if session_id.is_empty() {
            return Ok(None);
        }

        let mut conn = self.connection().await?;
        let payload: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.key(session_id))
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(|e| DeadboltError::store_unavailable(format!("Redis GET failed: {}", e)))?;

        match payload {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                DeadboltError::store_unavailable(format!("corrupt attempt record: {}", e))
            }),
            None => Ok(None),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(self.key(session_id))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| DeadboltError::store_unavailable(format!("Redis DEL failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running Redis instance; enable for integration testing.

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_round_trip() {
        let store =
            RedisAttemptStore::new("redis://127.0.0.1/", Duration::from_secs(600)).unwrap();

        let attempt = SignInAttempt::issued_now("redis-sess", "alice", Some("482913".to_string()));
        store.insert(attempt.clone()).await.unwrap();

        let loaded = store.get("redis-sess").await.unwrap();
        assert_eq!(loaded, Some(attempt));

        store.remove("redis-sess").await.unwrap();
        assert_eq!(store.get("redis-sess").await.unwrap(), None);
    }
}
