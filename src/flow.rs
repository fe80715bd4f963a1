//! The two-factor sign-in flow.
//!
//! Drives the state machine `AwaitingPrimary → AwaitingSecondFactor →
//! Authenticated`. The states live in the attempt store: a session with no
//! live attempt is awaiting primary credentials, a session with a live
//! attempt is awaiting its second factor, and a fully authenticated sign-in
//! removes the attempt so the code can never be replayed.

use crate::attempt::SignInAttempt;
use crate::delivery::{CodeSender, LogSendFailureHandler, SendFailureContext, SendFailureHandler};
use crate::error::{DeadboltError, Result};
use crate::generator::{CodeGenerator, SixDigitCodeGenerator};
use crate::principal::{AuthenticatedPrincipal, ChallengeMethod, PendingChallenge};
use crate::realm::UserRealm;
use crate::service::CodeService;
use crate::store::AttemptStore;
use crate::totp::TotpEngine;
use subtle::ConstantTimeEq;

/// A primary (username/password) sign-in submission.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Opaque session id, unique per browser session.
    pub session_id: String,
    /// Submitted username.
    pub username: String,
    /// Submitted password.
    pub password: String,
}

impl LoginRequest {
    pub fn new(
        session_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Outcome of a primary sign-in submission.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials verified and no second factor is required.
    Authenticated(AuthenticatedPrincipal),
    /// Credentials verified; a second-factor challenge is now pending.
    ChallengeIssued(PendingChallenge),
    /// A live challenge already exists for this session. The password was
    /// not re-checked; the caller should show the code-entry page.
    ChallengePending,
}

/// Outcome of a second-factor code submission.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// The second factor is satisfied; the sign-in is complete.
    Verified(AuthenticatedPrincipal),
    /// No live challenge for this session (never existed, already consumed,
    /// or expired, deliberately indistinguishable). Restart at primary
    /// login.
    Restart,
}

/// Outcome of a resend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// The stored code was re-dispatched.
    Sent,
    /// The pending challenge is a TOTP challenge; there is no stored code to
    /// resend.
    NothingToSend,
    /// No live challenge; restart at primary login.
    Restart,
}

/// The two-factor authentication verifier.
///
/// Composes the user realm (primary credential check + lookup), the code
/// service (attempt lifecycle), a code sender, and a failure handler. All
/// collaborators are owned per instance; there is no process-wide state.
///
/// # Example
///
/// ```rust,ignore
/// use deadbolt::{CodeService, InMemoryAttemptStore, LoginOutcome, LoginRequest, TwoFactorFlow};
/// use deadbolt::delivery::ConsoleCodeSender;
///
/// let flow = TwoFactorFlow::new(
///     my_realm,
///     CodeService::new(InMemoryAttemptStore::new()),
///     ConsoleCodeSender::new(),
/// );
///
/// match flow.login(LoginRequest::new(session_id, username, password)).await? {
///     LoginOutcome::Authenticated(principal) => { /* establish the session */ }
///     LoginOutcome::ChallengeIssued(_) | LoginOutcome::ChallengePending => {
///         /* render the code-entry page */
///     }
/// }
/// ```
pub struct TwoFactorFlow<R, S, D, F = LogSendFailureHandler, G = SixDigitCodeGenerator> {
    realm: R,
    codes: CodeService<S, G>,
    sender: D,
    failure_handler: F,
    totp: TotpEngine,
}

impl<R, S, D> TwoFactorFlow<R, S, D>
where
    R: UserRealm,
    S: AttemptStore,
    D: CodeSender,
{
    /// Create a flow with the default TOTP engine and a logging failure
    /// handler.
    pub fn new(realm: R, codes: CodeService<S>, sender: D) -> Self {
        Self {
            realm,
            codes,
            sender,
            failure_handler: LogSendFailureHandler,
            totp: TotpEngine::default(),
        }
    }
}

impl<R, S, D, F, G> TwoFactorFlow<R, S, D, F, G>
where
    R: UserRealm,
    S: AttemptStore,
    D: CodeSender,
    F: SendFailureHandler,
    G: CodeGenerator,
{
    /// Swap in a custom failure handler.
    pub fn with_failure_handler<F2: SendFailureHandler>(
        self,
        failure_handler: F2,
    ) -> TwoFactorFlow<R, S, D, F2, G> {
        TwoFactorFlow {
            realm: self.realm,
            codes: self.codes,
            sender: self.sender,
            failure_handler,
            totp: self.totp,
        }
    }

    /// Swap in a custom TOTP engine.
    pub fn with_totp_engine(mut self, totp: TotpEngine) -> Self {
        self.totp = totp;
        self
    }

    /// The underlying code service.
    pub fn code_service(&self) -> &CodeService<S, G> {
        &self.codes
    }

    /// Handle a primary username/password submission.
    ///
    /// If the session already has a live challenge, returns
    /// [`LoginOutcome::ChallengePending`] without re-checking the password.
    /// Otherwise the primary check runs; `BadCredentials` propagates
    /// unchanged. A user without a second factor is authenticated
    /// immediately. For everyone else the primary registered preference
    /// decides the challenge: a TOTP key issues a challenge with nothing
    /// sent, a delivery preference generates a code, persists the attempt,
    /// and then dispatches it, in that order, so the attempt survives
    /// delivery failure and a resend can still succeed.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        if self.codes.is_step_one_complete(&request.session_id).await? {
            tracing::debug!(
                session_id = %request.session_id,
                "challenge already pending for session"
            );
            return Ok(LoginOutcome::ChallengePending);
        }

        let user = self
            .realm
            .authenticate(&request.username, &request.password)
            .await?;
        let username = self.realm.username(&user);

        if !self.realm.two_factor_enabled(&user) {
            return Ok(LoginOutcome::Authenticated(self.principal_for(&user)));
        }

        let preference = self.realm.primary_preference(&user).ok_or_else(|| {
            DeadboltError::internal("two-factor is enabled but no primary preference is registered")
        })?;

        if preference.is_key() {
            // The user derives the code on their own device; nothing is sent.
            let attempt = self
                .codes
                .save_attempt(&request.session_id, &username, None)
                .await?;
            Ok(LoginOutcome::ChallengeIssued(PendingChallenge::new(
                attempt.session_id(),
                username,
                ChallengeMethod::Totp,
            )))
        } else {
            let code = self.codes.generate_code();
            let attempt = self
                .codes
                .save_attempt(&request.session_id, &username, Some(code))
                .await?;
            self.dispatch(preference.data(), &attempt).await;
            Ok(LoginOutcome::ChallengeIssued(PendingChallenge::new(
                attempt.session_id(),
                username,
                ChallengeMethod::Delivered {
                    destination: preference.data().to_string(),
                },
            )))
        }
    }

    /// Handle a second-factor code submission.
    ///
    /// Sessions with no live challenge get [`VerifyOutcome::Restart`]; a
    /// missing attempt and an expired one look identical. A TOTP session is
    /// checked against the user's registered key; a delivered-code session
    /// compares the trimmed codes and re-checks expiry (the window can lapse
    /// between the gate and the comparison). Success removes the attempt so
    /// the code cannot be replayed; failure preserves it so the user may
    /// retry or request a resend.
    pub async fn verify(&self, session_id: &str, submitted_code: &str) -> Result<VerifyOutcome> {
        if !self.codes.is_step_one_complete(session_id).await? {
            return Ok(VerifyOutcome::Restart);
        }

        let attempt = match self.codes.get_attempt(session_id).await? {
            Some(attempt) => attempt,
            // Removed by a concurrent verification between the gate and here.
            None => return Ok(VerifyOutcome::Restart),
        };

        let user = self.realm.load_by_username(attempt.username()).await?;

        match attempt.delivered_code() {
            None => self.confirm_totp(&user, submitted_code)?,
            Some(stored) => {
                let submitted = submitted_code.trim();
                if !bool::from(submitted.as_bytes().ct_eq(stored.as_bytes())) {
                    return Err(DeadboltError::InvalidCode);
                }
                if self.codes.is_code_expired(&attempt) {
                    return Err(DeadboltError::CodeExpired);
                }
            }
        }

        self.codes.clean_up(session_id).await?;
        tracing::info!(session_id, username = attempt.username(), "second factor satisfied");
        Ok(VerifyOutcome::Verified(self.principal_for(&user)))
    }

    /// Re-dispatch the stored code for a session.
    ///
    /// Resend repeats the existing code; it never mints a new one. A session
    /// with no live challenge gets [`ResendOutcome::Restart`]; a TOTP session
    /// has nothing to resend.
    pub async fn resend(&self, session_id: &str) -> Result<ResendOutcome> {
        if !self.codes.is_step_one_complete(session_id).await? {
            return Ok(ResendOutcome::Restart);
        }

        let attempt = match self.codes.get_attempt(session_id).await? {
            Some(attempt) => attempt,
            None => return Ok(ResendOutcome::Restart),
        };

        if attempt.expects_totp() {
            return Ok(ResendOutcome::NothingToSend);
        }

        let user = self.realm.load_by_username(attempt.username()).await?;
        let destination = self
            .realm
            .primary_preference(&user)
            .filter(|preference| !preference.is_key())
            .or_else(|| {
                self.realm
                    .two_factor_preferences(&user)
                    .into_values()
                    .find(|preference| !preference.is_key())
            });

        let Some(destination) = destination else {
            // The delivery preference was removed after the code was issued.
            return Ok(ResendOutcome::NothingToSend);
        };

        self.dispatch(destination.data(), &attempt).await;
        Ok(ResendOutcome::Sent)
    }

    /// Check the submitted code against the user's registered TOTP key.
    fn confirm_totp(&self, user: &R::User, submitted: &str) -> Result<()> {
        let preferences = self.realm.two_factor_preferences(user);
        let key = preferences
            .values()
            .find(|preference| preference.is_key())
            // The key was removed after the challenge was issued; an opaque
            // rejection reveals nothing to a probing client.
            .ok_or(DeadboltError::InvalidCode)?;

        self.totp.confirm_code(key.data(), submitted)
    }

    /// Dispatch a code, routing any delivery error to the failure handler.
    /// The attempt is already persisted by the time this runs.
    async fn dispatch(&self, destination: &str, attempt: &SignInAttempt) {
        if let Err(error) = self.sender.send_code(destination, attempt).await {
            let context = SendFailureContext {
                session_id: attempt.session_id().to_string(),
                destination: destination.to_string(),
                error: error.to_string(),
            };
            self.failure_handler.on_send_failure(attempt, &context).await;
        }
    }

    fn principal_for(&self, user: &R::User) -> AuthenticatedPrincipal {
        AuthenticatedPrincipal::with_authorities(
            self.realm.username(user),
            self.realm.authorities(user),
        )
    }
}
