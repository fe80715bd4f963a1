use crate::attempt::{now_millis, SignInAttempt};
use crate::error::Result;
use crate::store::AttemptStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory attempt store.
///
/// Keeps attempts in a HashMap behind an async RwLock. Suitable for tests and
/// single-process deployments; attempts are lost on restart and not shared
/// across instances. Cloning yields a handle to the same map.
#[derive(Clone, Default)]
pub struct InMemoryAttemptStore {
    attempts: Arc<RwLock<HashMap<String, SignInAttempt>>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop attempts older than `window_millis`.
    ///
    /// Expiry is checked lazily on every access, so this sweep is an
    /// optimization to bound memory on abandoned sessions, not a correctness
    /// requirement. Returns the number of attempts removed.
    pub async fn cleanup_expired(&self, window_millis: u64) -> usize {
        let cutoff = now_millis().saturating_sub(window_millis);
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|_, attempt| attempt.created_at() >= cutoff);
        before - attempts.len()
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn insert(&self, attempt: SignInAttempt) -> Result<()> {
        let mut attempts = self.attempts.write().await;
        attempts.insert(attempt.session_id().to_string(), attempt);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SignInAttempt>> {
        if session_id.is_empty() {
            return Ok(None);
        }
        let attempts = self.attempts.read().await;
        Ok(attempts.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let mut attempts = self.attempts.write().await;
        attempts.remove(session_id);
        Ok(())
    }
}
