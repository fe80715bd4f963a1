//! Code delivery strategies.
//!
//! Delivery is out-of-band, slow, and allowed to fail: the flow persists the
//! attempt *before* dispatching, catches sender errors, and routes them to a
//! [`SendFailureHandler`] so a later resend can still succeed. Delivery
//! failures never surface as authentication errors.

use crate::attempt::SignInAttempt;
use crate::error::Result;
use async_trait::async_trait;

mod console;

#[cfg(feature = "smtp")]
mod smtp;

pub use console::ConsoleCodeSender;

#[cfg(feature = "smtp")]
pub use smtp::{SmtpCodeSender, SmtpSenderConfig};

/// Strategy for delivering a generated code to the user.
///
/// `destination` is the delivery preference's data (email address, phone
/// number) and `attempt` carries the code. Transport errors should be
/// reported as [`DeadboltError::DeliveryFailed`](crate::DeadboltError::DeliveryFailed).
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(&self, destination: &str, attempt: &SignInAttempt) -> Result<()>;
}

/// Plain-value context handed to the failure handler; no framework request
/// object crosses this boundary.
#[derive(Debug, Clone)]
pub struct SendFailureContext {
    /// Session whose code failed to send.
    pub session_id: String,
    /// Destination the send was addressed to.
    pub destination: String,
    /// Rendered delivery error.
    pub error: String,
}

/// Fallback behavior for when a code sender fails.
///
/// Handlers are infallible by contract: there is nowhere further for a
/// failure-of-the-failure-path to go.
#[async_trait]
pub trait SendFailureHandler: Send + Sync {
    async fn on_send_failure(&self, attempt: &SignInAttempt, context: &SendFailureContext);
}

/// Drops delivery failures silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSendFailureHandler;

#[async_trait]
impl SendFailureHandler for NullSendFailureHandler {
    async fn on_send_failure(&self, _attempt: &SignInAttempt, _context: &SendFailureContext) {}
}

/// Logs delivery failures with structured fields. Never logs the code itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSendFailureHandler;

#[async_trait]
impl SendFailureHandler for LogSendFailureHandler {
    async fn on_send_failure(&self, attempt: &SignInAttempt, context: &SendFailureContext) {
        tracing::error!(
            session_id = attempt.session_id(),
            destination = %context.destination,
            error = %context.error,
            "two-factor code delivery failed"
        );
    }
}
