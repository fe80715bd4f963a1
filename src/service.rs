//! The two-factor code service, the orchestration authority for attempt
//! lifecycle: generation, persistence, expiry, and cleanup.

use crate::attempt::{now_millis, SignInAttempt};
use crate::error::Result;
use crate::generator::{CodeGenerator, SixDigitCodeGenerator};
use crate::store::AttemptStore;
use std::time::Duration;

/// Configuration for the code service.
#[derive(Debug, Clone)]
pub struct CodeServiceConfig {
    /// How long a delivered code (or pending TOTP challenge) stays valid.
    /// Default: 90 seconds. A short window limits the blast radius of an
    /// intercepted code.
    pub expiration: Duration,
}

impl Default for CodeServiceConfig {
    fn default() -> Self {
        Self {
            expiration: Duration::from_millis(90_000),
        }
    }
}

impl CodeServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiration window.
    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }
}

/// Orchestrates attempt lifecycle over a pluggable store and code generator.
///
/// `is_step_one_complete` and `is_code_expired` share the same staleness
/// predicate, so the mid-flow gate and verification can never disagree about
/// whether a session is alive.
pub struct CodeService<S, G = SixDigitCodeGenerator> {
    store: S,
    generator: G,
    config: CodeServiceConfig,
}

impl<S: AttemptStore> CodeService<S> {
    /// Create a service with the default six-digit generator and a 90-second
    /// expiration window.
    pub fn new(store: S) -> Self {
        Self::with_config(store, CodeServiceConfig::default())
    }

    pub fn with_config(store: S, config: CodeServiceConfig) -> Self {
        Self {
            store,
            generator: SixDigitCodeGenerator::new(),
            config,
        }
    }
}

impl<S, G> CodeService<S, G> {
    /// Swap in a custom code generation strategy.
    pub fn with_generator<G2: CodeGenerator>(self, generator: G2) -> CodeService<S, G2> {
        CodeService {
            store: self.store,
            generator,
            config: self.config,
        }
    }

    /// The configured expiration window.
    pub fn expiration(&self) -> Duration {
        self.config.expiration
    }
}

impl<S: AttemptStore, G: CodeGenerator> CodeService<S, G> {
    /// Produce a fresh one-time code. Does not persist anything.
    pub fn generate_code(&self) -> String {
        self.generator.generate_code()
    }

    /// Construct and persist a new attempt stamped with the current time,
    /// replacing any existing attempt for the session.
    ///
    /// `code = None` models the TOTP path: nothing will be delivered and the
    /// user is expected to derive the code on their own device.
    pub async fn save_attempt(
        &self,
        session_id: &str,
        username: &str,
        code: Option<String>,
    ) -> Result<SignInAttempt> {
        let attempt = SignInAttempt::issued_now(session_id, username, code);
        self.store.insert(attempt.clone()).await?;
        tracing::debug!(session_id, username, "sign-in attempt persisted");
        Ok(attempt)
    }

    /// Read-through to the store.
    pub async fn get_attempt(&self, session_id: &str) -> Result<Option<SignInAttempt>> {
        self.store.get(session_id).await
    }

    /// Remove the attempt for a session. Idempotent. Called after successful
    /// second-factor verification to prevent replay.
    pub async fn clean_up(&self, session_id: &str) -> Result<()> {
        self.store.remove(session_id).await
    }

    /// Whether the session is mid-flow: an attempt exists AND is not expired.
    ///
    /// A missing attempt and an expired one are indistinguishable through
    /// this gate; callers must not give them different user-visible outcomes.
    pub async fn is_step_one_complete(&self, session_id: &str) -> Result<bool> {
        match self.get_attempt(session_id).await? {
            Some(attempt) => Ok(!self.is_code_expired(&attempt)),
            None => Ok(false),
        }
    }

    /// Whether the attempt's validity window has lapsed. The single source of
    /// truth for staleness; nothing is ever marked expired in the store.
    pub fn is_code_expired(&self, attempt: &SignInAttempt) -> bool {
        attempt.created_at() + (self.config.expiration.as_millis() as u64) < now_millis()
    }

    /// The username that completed step one for a session, if any.
    pub async fn username_for_session(&self, session_id: &str) -> Result<Option<String>> {
        Ok(self
            .get_attempt(session_id)
            .await?
            .map(|attempt| attempt.username().to_string()))
    }
}
