/// The main error type for deadbolt operations.
///
/// Authentication rejections (`BadCredentials`, `InvalidCode`, `CodeExpired`)
/// deliberately carry no detail payload: they are shown to users and must not
/// reveal why a check failed, which time window was closest, or whether a
/// session exists at all. Operational failures (`StoreUnavailable`,
/// `DeliveryFailed`, `Internal`) carry context for operators and must never be
/// presented as an authentication outcome.
#[derive(Debug, thiserror::Error)]
pub enum DeadboltError {
    /// The primary username/password check rejected the credentials.
    #[error("bad credentials")]
    BadCredentials,

    /// The submitted second-factor code did not match.
    #[error("invalid two-factor code")]
    InvalidCode,

    /// The delivered code matched but its validity window has lapsed.
    #[error("two-factor code expired")]
    CodeExpired,

    /// The attempt store backend failed (I/O, connectivity, corrupt record).
    #[error("attempt store unavailable: {0}")]
    StoreUnavailable(String),

    /// A code sender failed to deliver. The flow catches this and routes it
    /// to the configured failure handler; it never reaches the user as an
    /// authentication error.
    #[error("code delivery failed: {0}")]
    DeliveryFailed(String),

    /// Misconfiguration or a broken invariant (malformed TOTP secret, a user
    /// with 2FA enabled but no registered preference).
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl DeadboltError {
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn delivery_failed(msg: impl Into<String>) -> Self {
        Self::DeliveryFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a user-facing authentication rejection, as
    /// opposed to an operational failure that should be surfaced to operators.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::BadCredentials | Self::InvalidCode | Self::CodeExpired
        )
    }
}

/// Result type alias for deadbolt operations.
pub type Result<T> = std::result::Result<T, DeadboltError>;
