//! Console code sender for development.
//!
//! Prints codes to stdout instead of delivering them. Stdout is often
//! captured by logging systems in containerized environments, so the code
//! value is redacted by default; opt in to full output for local development
//! only.

use crate::attempt::SignInAttempt;
use crate::delivery::CodeSender;
use crate::error::{DeadboltError, Result};
use async_trait::async_trait;

/// A sender that prints codes to stdout instead of delivering them.
///
/// # Example
///
/// ```rust,ignore
/// use deadbolt::delivery::ConsoleCodeSender;
///
/// // Default: the code value is redacted
/// let sender = ConsoleCodeSender::new();
///
/// // Development only: show the actual code
/// let sender = ConsoleCodeSender::new().with_full_output(true);
/// ```
#[derive(Debug, Clone)]
pub struct ConsoleCodeSender {
    prefix: String,
    show_code: bool,
}

impl ConsoleCodeSender {
    /// Create a console sender. The code value is redacted by default.
    pub fn new() -> Self {
        Self {
            prefix: "[2FA]".to_string(),
            show_code: false,
        }
    }

    /// Create a console sender with a custom output prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            show_code: false,
        }
    }

    /// Enable or disable printing the actual code value.
    ///
    /// Only enable this in development environments where stdout is not
    /// captured by logging systems.
    pub fn with_full_output(mut self, enabled: bool) -> Self {
        if enabled {
            tracing::warn!(
                "ConsoleCodeSender: full output enabled - codes will be visible in logs. \
                 Do not use in production!"
            );
        }
        self.show_code = enabled;
        self
    }
}

impl Default for ConsoleCodeSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeSender for ConsoleCodeSender {
    async fn send_code(&self, destination: &str, attempt: &SignInAttempt) -> Result<()> {
        let code = attempt
            .delivered_code()
            .ok_or_else(|| DeadboltError::internal("attempt has no delivered code to send"))?;

        if self.show_code {
            println!(
                "{} code for {} (session {}): {}",
                self.prefix,
                destination,
                attempt.session_id(),
                code
            );
        } else {
            println!(
                "{} code for {} (session {}): {} digits [REDACTED]",
                self.prefix,
                destination,
                attempt.session_id(),
                code.len()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sends_without_error() {
        let sender = ConsoleCodeSender::new();
        let attempt = SignInAttempt::issued_now("sess1", "alice", Some("482913".to_string()));

        sender
            .send_code("alice@example.com", &attempt)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejects_attempt_without_code() {
        let sender = ConsoleCodeSender::new();
        let attempt = SignInAttempt::issued_now("sess1", "alice", None);

        let err = sender
            .send_code("alice@example.com", &attempt)
            .await
            .unwrap_err();
        assert!(matches!(err, DeadboltError::Internal(_)));
    }
}
