//! TOTP (Time-based One-Time Password) verification.
//!
//! Implements RFC 4226/6238 semantics with HMAC-SHA1 and a backward-only
//! tolerance window: a submitted code is checked against the current
//! 30-second interval and the two before it (90 seconds of clock skew and
//! typing delay), never against future intervals.

use crate::error::{DeadboltError, Result};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::{Choice, ConstantTimeEq};

type HmacSha1 = Hmac<Sha1>;

/// Configuration for TOTP verification.
#[derive(Debug, Clone)]
pub struct TotpConfig {
    /// Number of digits in the code (default: 6).
    pub code_length: usize,
    /// Time step in milliseconds (default: 30_000).
    pub step_millis: u64,
    /// How many past intervals to accept besides the current one
    /// (default: 2, i.e. a 90-second window with the default step).
    pub back_steps: u64,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            step_millis: 30_000,
            back_steps: 2,
        }
    }
}

impl TotpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of digits.
    pub fn code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Set the time step in milliseconds.
    pub fn step_millis(mut self, millis: u64) -> Self {
        self.step_millis = millis;
        self
    }

    /// Set the number of accepted past intervals.
    pub fn back_steps(mut self, steps: u64) -> Self {
        self.back_steps = steps;
        self
    }
}

/// Validates submitted TOTP codes against a base32 shared secret.
///
/// Stateless; safe for unsynchronized concurrent use.
#[derive(Debug, Clone, Default)]
pub struct TotpEngine {
    config: TotpConfig,
}

impl TotpEngine {
    pub fn new(config: TotpConfig) -> Self {
        Self { config }
    }

    /// Check a submitted code against the secret at the current time.
    ///
    /// Fails with [`DeadboltError::InvalidCode`] when no accepted interval
    /// matches. The error never indicates which interval was closest; all
    /// candidates are evaluated and compared in constant time.
    pub fn confirm_code(&self, secret: &str, submitted: &str) -> Result<()> {
        self.confirm_code_at(secret, submitted, now_millis())
    }

    /// Check a submitted code at an explicit wall-clock time (epoch millis).
    pub fn confirm_code_at(&self, secret: &str, submitted: &str, now_millis: u64) -> Result<()> {
        let submitted = submitted.trim();
        let key = decode_secret(secret)?;
        let interval = now_millis / self.config.step_millis;

        // Fold every window into one comparison result; no early exit, so the
        // outcome does not depend on which candidate (if any) matched.
        let mut matched = Choice::from(0u8);
        for back in 0..=self.config.back_steps {
            let Some(step) = interval.checked_sub(back) else {
                break;
            };
            let candidate = hotp(&key, step, self.config.code_length);
            matched |= candidate.as_bytes().ct_eq(submitted.as_bytes());
        }

        if bool::from(matched) {
            Ok(())
        } else {
            Err(DeadboltError::InvalidCode)
        }
    }

    /// Compute the code for a specific interval (useful for testing and for
    /// provisioning checks during setup).
    pub fn generate_at(&self, secret: &str, interval: u64) -> Result<String> {
        let key = decode_secret(secret)?;
        Ok(hotp(&key, interval, self.config.code_length))
    }

    /// The interval the current wall-clock time falls into.
    pub fn current_interval(&self) -> u64 {
        now_millis() / self.config.step_millis
    }
}

/// Decode a base32 secret (RFC 4648). Padded and unpadded input accepted.
///
/// A malformed secret is operator misconfiguration, not a user error, so this
/// fails with `Internal` rather than `InvalidCode`.
fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized = secret.trim().trim_end_matches('=').to_ascii_uppercase();
    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &normalized)
        .ok_or_else(|| DeadboltError::internal("two-factor secret is not valid base32"))
}

/// RFC 4226 HOTP: HMAC-SHA1 over the big-endian counter, dynamic truncation
/// to a 31-bit integer, reduced modulo 10^code_length and zero-padded.
fn hotp(key: &[u8], interval: u64, code_length: usize) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(&interval.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let word = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    let code = word % 10u32.pow(code_length as u32);
    format!("{code:0width$}", width = code_length)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
