//! In-memory collaborators for tests and examples.
//!
//! These implementations keep everything in process memory and compare
//! passwords in plain text; they exist so the flow can be exercised without a
//! real user database or delivery channel. Do not use them in production.

use crate::attempt::SignInAttempt;
use crate::delivery::{CodeSender, SendFailureContext, SendFailureHandler};
use crate::error::{DeadboltError, Result};
use crate::preference::TwoFactorPreference;
use crate::realm::UserRealm;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// A test user with builder-style setup.
#[derive(Debug, Clone)]
pub struct TestUser {
    username: String,
    password: String,
    authorities: Vec<String>,
    two_factor_enabled: bool,
    preferences: BTreeMap<u32, TwoFactorPreference>,
}

impl TestUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            authorities: Vec::new(),
            two_factor_enabled: false,
            preferences: BTreeMap::new(),
        }
    }

    /// Grant an authority.
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.push(authority.into());
        self
    }

    /// Register a second-factor preference at the given index. Also enables
    /// two-factor for the user.
    pub fn with_preference(mut self, index: u32, preference: TwoFactorPreference) -> Self {
        self.preferences.insert(index, preference);
        self.two_factor_enabled = true;
        self
    }

    /// Enable two-factor without registering a preference (for exercising
    /// misconfiguration handling).
    pub fn with_two_factor_enabled(mut self) -> Self {
        self.two_factor_enabled = true;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// In-memory user realm with plain-text password comparison.
#[derive(Clone, Default)]
pub struct InMemoryUserRealm {
    users: Arc<RwLock<HashMap<String, TestUser>>>,
    authenticate_calls: Arc<AtomicUsize>,
}

impl InMemoryUserRealm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: TestUser) {
        let mut users = self.users.write().unwrap();
        users.insert(user.username.clone(), user);
    }

    /// How many times `authenticate` has been called.
    pub fn authenticate_calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRealm for InMemoryUserRealm {
    type User = TestUser;

    async fn authenticate(&self, username: &str, password: &str) -> Result<Self::User> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        let users = self.users.read().unwrap();
        match users.get(username) {
            Some(user) if user.password == password => Ok(user.clone()),
            _ => Err(DeadboltError::BadCredentials),
        }
    }

    async fn load_by_username(&self, username: &str) -> Result<Self::User> {
        let users = self.users.read().unwrap();
        users
            .get(username)
            .cloned()
            .ok_or(DeadboltError::BadCredentials)
    }

    fn username(&self, user: &Self::User) -> String {
        user.username.clone()
    }

    fn authorities(&self, user: &Self::User) -> Vec<String> {
        user.authorities.clone()
    }

    fn two_factor_enabled(&self, user: &Self::User) -> bool {
        user.two_factor_enabled
    }

    fn two_factor_preferences(&self, user: &Self::User) -> BTreeMap<u32, TwoFactorPreference> {
        user.preferences.clone()
    }
}

/// A code sender that records every dispatch instead of delivering.
#[derive(Clone, Default)]
pub struct RecordingCodeSender {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl RecordingCodeSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every dispatch fails with `DeliveryFailed`.
    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    /// Every `(destination, code)` pair dispatched so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recently dispatched code.
    pub fn last_code(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl CodeSender for RecordingCodeSender {
    async fn send_code(&self, destination: &str, attempt: &SignInAttempt) -> Result<()> {
        if self.fail {
            return Err(DeadboltError::delivery_failed("recording sender set to fail"));
        }

        let code = attempt
            .delivered_code()
            .ok_or_else(|| DeadboltError::internal("attempt has no delivered code to send"))?;
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), code.to_string()));
        Ok(())
    }
}

/// A failure handler that records every failure context.
#[derive(Clone, Default)]
pub struct RecordingFailureHandler {
    failures: Arc<Mutex<Vec<SendFailureContext>>>,
}

impl RecordingFailureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<SendFailureContext> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl SendFailureHandler for RecordingFailureHandler {
    async fn on_send_failure(&self, _attempt: &SignInAttempt, context: &SendFailureContext) {
        self.failures.lock().unwrap().push(context.clone());
    }
}
