//! User realm trait: the primary credential verifier and user lookup.

use crate::error::Result;
use crate::preference::TwoFactorPreference;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The preference index consulted first when starting a challenge.
pub const PRIMARY_PREFERENCE_INDEX: u32 = 1;

/// Trait for the user-side collaborators the flow needs: the primary
/// username/password check and user re-resolution during verification.
///
/// Implement this for your user database / identity provider. The flow never
/// sees passwords beyond passing them through to [`authenticate`], and never
/// stores users; it re-resolves them by username on every verification.
///
/// # Example
///
/// ```rust,ignore
/// use deadbolt::{UserRealm, TwoFactorPreference, Result};
/// use async_trait::async_trait;
/// use std::collections::BTreeMap;
///
/// struct MyRealm {
///     db: DatabaseConnection,
/// }
///
/// #[async_trait]
/// impl UserRealm for MyRealm {
///     type User = MyUser;
///
///     async fn authenticate(&self, username: &str, password: &str) -> Result<Self::User> {
///         // Verify the password hash; Err(DeadboltError::BadCredentials) on mismatch
///         self.db.check_credentials(username, password).await
///     }
///
///     // ... implement other methods
/// }
/// ```
///
/// [`authenticate`]: UserRealm::authenticate
#[async_trait]
pub trait UserRealm: Send + Sync {
    /// The user type returned by this realm.
    type User: Send + Sync + Clone;

    /// Verify primary credentials.
    ///
    /// Fails with [`DeadboltError::BadCredentials`](crate::DeadboltError::BadCredentials)
    /// on mismatch; the flow propagates that unchanged.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Self::User>;

    /// Re-resolve a user during second-factor verification.
    ///
    /// A username that no longer resolves should fail with `BadCredentials`
    /// rather than a descriptive error, so probing session ids learns nothing.
    async fn load_by_username(&self, username: &str) -> Result<Self::User>;

    /// The user's username.
    fn username(&self, user: &Self::User) -> String;

    /// Authorities granted to the user once fully authenticated.
    fn authorities(&self, _user: &Self::User) -> Vec<String> {
        Vec::new()
    }

    /// Whether the user has a second factor enabled at all.
    fn two_factor_enabled(&self, user: &Self::User) -> bool;

    /// The user's registered second-factor methods, keyed by preference
    /// index. Index [`PRIMARY_PREFERENCE_INDEX`] is the default method.
    fn two_factor_preferences(&self, user: &Self::User) -> BTreeMap<u32, TwoFactorPreference>;

    /// The preference consulted first when starting a challenge.
    fn primary_preference(&self, user: &Self::User) -> Option<TwoFactorPreference> {
        self.two_factor_preferences(user)
            .get(&PRIMARY_PREFERENCE_INDEX)
            .cloned()
    }
}
