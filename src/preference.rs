//! Registered second-factor methods.

use serde::{Deserialize, Serialize};

/// One registered second-factor method for a user.
///
/// A preference is either a TOTP shared secret (the user derives codes on
/// their own device) or a delivery destination for server-generated codes
/// (an email address or phone number). The two are distinguished by
/// [`is_key`](Self::is_key); [`data`](Self::data) holds the base32 secret or
/// the destination accordingly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorPreference {
    is_key: bool,
    data: String,
}

impl TwoFactorPreference {
    /// A TOTP preference holding a base32-encoded shared secret.
    pub fn totp_key(secret: impl Into<String>) -> Self {
        Self {
            is_key: true,
            data: secret.into(),
        }
    }

    /// A delivery preference holding a destination (email/phone).
    pub fn delivery(destination: impl Into<String>) -> Self {
        Self {
            is_key: false,
            data: destination.into(),
        }
    }

    /// `true` when this preference is a TOTP shared secret.
    pub fn is_key(&self) -> bool {
        self.is_key
    }

    /// The shared secret or delivery destination.
    pub fn data(&self) -> &str {
        &self.data
    }
}
