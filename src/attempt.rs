//! The sign-in attempt record.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One in-progress second-factor challenge for a browser session.
///
/// An attempt is immutable once created: the code and timestamp never change.
/// Re-issuing a challenge creates a new attempt that replaces this one in the
/// store (the store keys by session id), which logically invalidates the
/// previous code. Staleness is computed from `created_at` by
/// [`CodeService::is_code_expired`](crate::CodeService::is_code_expired),
/// never stored as a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInAttempt {
    session_id: String,
    username: String,
    delivered_code: Option<String>,
    created_at: u64,
}

impl SignInAttempt {
    /// Create an attempt with an explicit creation timestamp (epoch millis).
    pub fn new(
        session_id: impl Into<String>,
        username: impl Into<String>,
        delivered_code: Option<String>,
        created_at: u64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            username: username.into(),
            delivered_code,
            created_at,
        }
    }

    /// Create an attempt stamped with the current wall-clock time.
    ///
    /// `delivered_code` is `None` on the TOTP path: the user derives the code
    /// on their own device and nothing is sent.
    pub fn issued_now(
        session_id: impl Into<String>,
        username: impl Into<String>,
        delivered_code: Option<String>,
    ) -> Self {
        Self::new(session_id, username, delivered_code, now_millis())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The generated one-time code, trimmed of surrounding whitespace.
    ///
    /// `None` means this session authenticates via a pre-shared TOTP secret.
    pub fn delivered_code(&self) -> Option<&str> {
        self.delivered_code.as_deref().map(str::trim)
    }

    /// Creation time in epoch milliseconds.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Whether this session is expected to submit a TOTP code.
    pub fn expects_totp(&self) -> bool {
        self.delivered_code.is_none()
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
