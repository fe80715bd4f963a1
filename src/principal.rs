//! Authentication results.
//!
//! A sign-in produces one of two immutable outcomes: a [`PendingChallenge`]
//! (the password was right but a second factor is still owed) or an
//! [`AuthenticatedPrincipal`] (fully signed in, carrying authorities). There
//! is intentionally no way to flip a pending challenge into an authenticated
//! principal in place; the only path to an authenticated principal is the
//! factory that takes the granted authorities up front.

/// How a pending second-factor challenge will be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeMethod {
    /// The user derives the code on their own device from a shared secret.
    /// Nothing was sent.
    Totp,
    /// A one-time code was generated and dispatched to this destination.
    Delivered {
        /// Email address or phone number the code was sent to.
        destination: String,
    },
}

/// A half-finished sign-in: primary credentials verified, second factor owed.
///
/// Carries no authorities and never reports itself authenticated.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    session_id: String,
    username: String,
    method: ChallengeMethod,
}

impl PendingChallenge {
    pub(crate) fn new(
        session_id: impl Into<String>,
        username: impl Into<String>,
        method: ChallengeMethod,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            username: username.into(),
            method,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn method(&self) -> &ChallengeMethod {
        &self.method
    }

    /// Always `false`.
    pub fn is_authenticated(&self) -> bool {
        false
    }
}

/// A fully authenticated user identity with granted authorities.
///
/// Constructed only via [`with_authorities`](Self::with_authorities), which
/// makes the authenticated state implicit in the type rather than a mutable
/// flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    username: String,
    authorities: Vec<String>,
}

impl AuthenticatedPrincipal {
    /// Create an authenticated principal. Authorities must be supplied here;
    /// there is no later setter.
    pub fn with_authorities(username: impl Into<String>, authorities: Vec<String>) -> Self {
        Self {
            username: username.into(),
            authorities,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Always `true`.
    pub fn is_authenticated(&self) -> bool {
        true
    }
}
