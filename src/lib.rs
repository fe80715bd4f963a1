//! Deadbolt - a second authentication factor for username/password logins
//!
//! Deadbolt tracks, per login session, whether primary credentials have been
//! verified, generates and dispatches one-time codes, validates submitted
//! codes (delivered codes or TOTP codes derived from a shared secret) against
//! expiration and correctness rules, and cleans up state on success so codes
//! cannot be replayed.
//!
//! # Features
//!
//! - **Flow**: the full `AwaitingPrimary → AwaitingSecondFactor →
//!   Authenticated` state machine in [`TwoFactorFlow`]
//! - **TOTP**: RFC 4226/6238 verification with a backward-only tolerance
//!   window
//! - **Storage**: pluggable attempt stores (in-memory, Redis, SeaORM)
//! - **Delivery**: pluggable code senders (console, SMTP) with a failure
//!   handler hook
//! - **Testing**: in-memory collaborators for exercising the flow
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use deadbolt::{CodeService, InMemoryAttemptStore, LoginOutcome, LoginRequest, TwoFactorFlow, VerifyOutcome};
//! use deadbolt::delivery::ConsoleCodeSender;
//!
//! #[tokio::main]
//! async fn main() -> deadbolt::Result<()> {
//!     deadbolt::init_tracing();
//!
//!     let flow = TwoFactorFlow::new(
//!         my_user_realm,
//!         CodeService::new(InMemoryAttemptStore::new()),
//!         ConsoleCodeSender::new(),
//!     );
//!
//!     // Step one: primary credentials.
//!     match flow.login(LoginRequest::new(session_id, username, password)).await? {
//!         LoginOutcome::Authenticated(principal) => { /* signed in, no second factor */ }
//!         LoginOutcome::ChallengeIssued(_) | LoginOutcome::ChallengePending => {
//!             // Step two: the user submits the code for their session.
//!             match flow.verify(session_id, submitted_code).await? {
//!                 VerifyOutcome::Verified(principal) => { /* signed in */ }
//!                 VerifyOutcome::Restart => { /* back to the login page */ }
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod attempt;
pub mod delivery;
mod error;
mod flow;
mod generator;
mod preference;
mod principal;
mod realm;
mod service;
pub mod store;
pub mod testing;
mod totp;

// Re-exports for public API
pub use attempt::SignInAttempt;
pub use error::{DeadboltError, Result};
pub use flow::{LoginOutcome, LoginRequest, ResendOutcome, TwoFactorFlow, VerifyOutcome};
pub use generator::{CodeGenerator, SixDigitCodeGenerator};
pub use preference::TwoFactorPreference;
pub use principal::{AuthenticatedPrincipal, ChallengeMethod, PendingChallenge};
pub use realm::{UserRealm, PRIMARY_PREFERENCE_INDEX};
pub use service::{CodeService, CodeServiceConfig};
pub use store::{AttemptStore, InMemoryAttemptStore};
pub use totp::{TotpConfig, TotpEngine};

#[cfg(feature = "cache")]
pub use store::RedisAttemptStore;

#[cfg(feature = "database")]
pub use store::DatabaseAttemptStore;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "deadbolt=debug")
/// - `DEADBOLT_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("DEADBOLT_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
