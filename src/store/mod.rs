//! Attempt storage backends.
//!
//! The state machine is correct regardless of which backend is plugged in;
//! backends differ only in persistence and latency. Each keys attempts by
//! session id with last-writer-wins semantics per key.

use crate::attempt::SignInAttempt;
use crate::error::Result;
use async_trait::async_trait;

mod memory;

#[cfg(feature = "cache")]
mod redis;

#[cfg(feature = "database")]
pub mod database;

pub use memory::InMemoryAttemptStore;

#[cfg(feature = "cache")]
pub use self::redis::RedisAttemptStore;

#[cfg(feature = "database")]
pub use database::DatabaseAttemptStore;

/// Trait for keyed storage of in-flight sign-in attempts.
///
/// Implement this for a custom backend.
///
/// # Example
///
/// ```rust,ignore
/// use deadbolt::{AttemptStore, SignInAttempt, Result};
/// use async_trait::async_trait;
///
/// struct MyStore {
///     pool: sqlx::PgPool,
/// }
///
/// #[async_trait]
/// impl AttemptStore for MyStore {
///     async fn insert(&self, attempt: SignInAttempt) -> Result<()> {
///         // Upsert by session id
///     }
///
///     // ... implement other methods
/// }
/// ```
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Store the attempt, replacing any existing attempt for its session.
    ///
    /// Backend I/O failure is `StoreUnavailable`; callers must surface it as
    /// an operational error, never as an invalid code.
    async fn insert(&self, attempt: SignInAttempt) -> Result<()>;

    /// Fetch the attempt for a session. An unknown or empty session id is
    /// `Ok(None)`, not an error.
    async fn get(&self, session_id: &str) -> Result<Option<SignInAttempt>>;

    /// Remove the attempt for a session. Removing an absent key is not an
    /// error.
    async fn remove(&self, session_id: &str) -> Result<()>;

    /// Remove by attempt rather than by session id.
    async fn remove_attempt(&self, attempt: &SignInAttempt) -> Result<()> {
        self.remove(attempt.session_id()).await
    }
}
