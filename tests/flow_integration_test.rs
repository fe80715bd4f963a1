//! Integration tests for the two-factor sign-in flow.
//!
//! These tests drive the complete lifecycle (primary login, challenge
//! issuance, code submission, resend, expiry) through the public API with
//! in-memory collaborators.

use deadbolt::delivery::{SendFailureContext, SendFailureHandler};
use deadbolt::testing::{InMemoryUserRealm, RecordingCodeSender, RecordingFailureHandler, TestUser};
use deadbolt::{
    AttemptStore, CodeService, CodeServiceConfig, DeadboltError, InMemoryAttemptStore,
    LoginOutcome, LoginRequest, ResendOutcome, SignInAttempt, TotpEngine, TwoFactorFlow,
    TwoFactorPreference, VerifyOutcome,
};
use std::time::Duration;

const SECRET: &str = "JBSWY3DPEHPK3PXP";

struct Harness {
    realm: InMemoryUserRealm,
    store: InMemoryAttemptStore,
    sender: RecordingCodeSender,
    flow: TwoFactorFlow<InMemoryUserRealm, InMemoryAttemptStore, RecordingCodeSender>,
}

fn harness() -> Harness {
    let realm = InMemoryUserRealm::new();
    let store = InMemoryAttemptStore::new();
    let sender = RecordingCodeSender::new();
    let flow = TwoFactorFlow::new(
        realm.clone(),
        CodeService::new(store.clone()),
        sender.clone(),
    );
    Harness {
        realm,
        store,
        sender,
        flow,
    }
}

fn delivery_user(username: &str) -> TestUser {
    TestUser::new(username, "hunter2")
        .with_authority("ROLE_USER")
        .with_preference(
            1,
            TwoFactorPreference::delivery(format!("{username}@example.com")),
        )
}

fn totp_user(username: &str) -> TestUser {
    TestUser::new(username, "hunter2")
        .with_authority("ROLE_USER")
        .with_preference(1, TwoFactorPreference::totp_key(SECRET))
}

// =============================================================================
// Full sign-in scenarios
// =============================================================================

#[tokio::test]
async fn delivered_code_sign_in_end_to_end() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));

    // Step one: password accepted, challenge issued, code dispatched.
    let outcome = h
        .flow
        .login(LoginRequest::new("sess1", "alice", "hunter2"))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::ChallengeIssued(_)));
    let code = h.sender.last_code().unwrap();

    // Step two: the delivered code completes the sign-in.
    match h.flow.verify("sess1", &code).await.unwrap() {
        VerifyOutcome::Verified(principal) => {
            assert_eq!(principal.username(), "alice");
            assert_eq!(principal.authorities(), ["ROLE_USER".to_string()]);
            assert!(principal.is_authenticated());
        }
        VerifyOutcome::Restart => panic!("expected verified sign-in"),
    }

    // The attempt is gone: the same code cannot be replayed.
    assert!(h.store.get("sess1").await.unwrap().is_none());
    assert!(matches!(
        h.flow.verify("sess1", &code).await.unwrap(),
        VerifyOutcome::Restart
    ));
}

#[tokio::test]
async fn totp_sign_in_end_to_end() {
    let h = harness();
    h.realm.add_user(totp_user("bob"));

    h.flow
        .login(LoginRequest::new("sess2", "bob", "hunter2"))
        .await
        .unwrap();

    // Nothing was dispatched; the user derives the code themselves.
    assert!(h.sender.sent().is_empty());

    let engine = TotpEngine::default();
    let code = engine
        .generate_at(SECRET, engine.current_interval())
        .unwrap();
    assert!(matches!(
        h.flow.verify("sess2", &code).await.unwrap(),
        VerifyOutcome::Verified(_)
    ));
    assert!(h.store.get("sess2").await.unwrap().is_none());
}

#[tokio::test]
async fn totp_accepts_previous_interval_but_not_stale_ones() {
    let h = harness();
    h.realm.add_user(totp_user("bob"));

    h.flow
        .login(LoginRequest::new("sess2", "bob", "hunter2"))
        .await
        .unwrap();

    let engine = TotpEngine::default();
    let interval = engine.current_interval();

    // A code from five intervals ago is outside the 90-second window.
    let stale = engine.generate_at(SECRET, interval - 5).unwrap();
    let err = h.flow.verify("sess2", &stale).await.unwrap_err();
    assert!(matches!(err, DeadboltError::InvalidCode));

    // One interval back is still accepted, and the failed try above did not
    // consume the attempt.
    let previous = engine.generate_at(SECRET, interval - 1).unwrap();
    assert!(matches!(
        h.flow.verify("sess2", &previous).await.unwrap(),
        VerifyOutcome::Verified(_)
    ));
}

#[tokio::test]
async fn concurrent_sessions_are_independent() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));
    h.realm.add_user(delivery_user("carol"));

    h.flow
        .login(LoginRequest::new("sess-a", "alice", "hunter2"))
        .await
        .unwrap();
    let alice_code = h.sender.last_code().unwrap();

    h.flow
        .login(LoginRequest::new("sess-c", "carol", "hunter2"))
        .await
        .unwrap();
    let carol_code = h.sender.last_code().unwrap();

    // Carol's code is useless for Alice's session unless they collide.
    if alice_code != carol_code {
        let err = h.flow.verify("sess-a", &carol_code).await.unwrap_err();
        assert!(matches!(err, DeadboltError::InvalidCode));
    }

    // Each session verifies with its own code; finishing one leaves the
    // other live.
    assert!(matches!(
        h.flow.verify("sess-a", &alice_code).await.unwrap(),
        VerifyOutcome::Verified(_)
    ));
    assert!(h.store.get("sess-c").await.unwrap().is_some());
    assert!(matches!(
        h.flow.verify("sess-c", &carol_code).await.unwrap(),
        VerifyOutcome::Verified(_)
    ));
}

// =============================================================================
// Expiry
// =============================================================================

#[tokio::test]
async fn expired_attempt_rejects_even_the_correct_code() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));

    // An attempt created long before the 90-second window.
    h.store
        .insert(SignInAttempt::new(
            "sess1",
            "alice",
            Some("482913".to_string()),
            0,
        ))
        .await
        .unwrap();

    assert!(matches!(
        h.flow.verify("sess1", "482913").await.unwrap(),
        VerifyOutcome::Restart
    ));

    // Expiry did not delete anything; staleness is computed, not stored.
    assert!(h.store.get("sess1").await.unwrap().is_some());
}

#[tokio::test]
async fn step_one_gate_follows_the_window() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));
    let service = h.flow.code_service();

    assert!(!service.is_step_one_complete("sess1").await.unwrap());

    h.flow
        .login(LoginRequest::new("sess1", "alice", "hunter2"))
        .await
        .unwrap();
    assert!(service.is_step_one_complete("sess1").await.unwrap());

    // Replace with an attempt whose window has elapsed: the gate closes with
    // no explicit deletion.
    h.store
        .insert(SignInAttempt::new("sess1", "alice", None, 0))
        .await
        .unwrap();
    assert!(!service.is_step_one_complete("sess1").await.unwrap());
}

#[tokio::test]
async fn short_window_expires_in_real_time() {
    let realm = InMemoryUserRealm::new();
    realm.add_user(delivery_user("alice"));
    let store = InMemoryAttemptStore::new();
    let sender = RecordingCodeSender::new();
    let config = CodeServiceConfig::new().expiration(Duration::from_millis(50));
    let flow = TwoFactorFlow::new(
        realm,
        CodeService::with_config(store, config),
        sender.clone(),
    );

    flow.login(LoginRequest::new("sess1", "alice", "hunter2"))
        .await
        .unwrap();
    let code = sender.last_code().unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(matches!(
        flow.verify("sess1", &code).await.unwrap(),
        VerifyOutcome::Restart
    ));
}

// =============================================================================
// Resend
// =============================================================================

#[tokio::test]
async fn resend_never_mints_a_new_code() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));

    h.flow
        .login(LoginRequest::new("sess1", "alice", "hunter2"))
        .await
        .unwrap();
    assert_eq!(h.flow.resend("sess1").await.unwrap(), ResendOutcome::Sent);
    assert_eq!(h.flow.resend("sess1").await.unwrap(), ResendOutcome::Sent);

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 3);
    let first = &sent[0].1;
    assert!(sent.iter().all(|(_, code)| code == first));

    // The resent code still verifies.
    assert!(matches!(
        h.flow.verify("sess1", first).await.unwrap(),
        VerifyOutcome::Verified(_)
    ));
}

#[tokio::test]
async fn resend_after_expiry_requires_restart() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));

    h.store
        .insert(SignInAttempt::new(
            "sess1",
            "alice",
            Some("482913".to_string()),
            0,
        ))
        .await
        .unwrap();

    assert_eq!(h.flow.resend("sess1").await.unwrap(), ResendOutcome::Restart);
    assert!(h.sender.sent().is_empty());
}

// =============================================================================
// Delivery failure
// =============================================================================

#[tokio::test]
async fn resend_succeeds_after_initial_delivery_failure() {
    let realm = InMemoryUserRealm::new();
    realm.add_user(delivery_user("alice"));
    let store = InMemoryAttemptStore::new();
    let handler = RecordingFailureHandler::new();

    // First flow: delivery is down.
    let broken = TwoFactorFlow::new(
        realm.clone(),
        CodeService::new(store.clone()),
        RecordingCodeSender::failing(),
    )
    .with_failure_handler(handler.clone());

    broken
        .login(LoginRequest::new("sess1", "alice", "hunter2"))
        .await
        .unwrap();
    assert_eq!(handler.failures().len(), 1);

    // The attempt was persisted before the dispatch, so once delivery is
    // healthy again the same session can resend the same code.
    let sender = RecordingCodeSender::new();
    let healthy = TwoFactorFlow::new(realm, CodeService::new(store.clone()), sender.clone());

    assert_eq!(healthy.resend("sess1").await.unwrap(), ResendOutcome::Sent);
    let code = sender.last_code().unwrap();
    assert_eq!(
        store.get("sess1").await.unwrap().unwrap().delivered_code(),
        Some(code.as_str())
    );
}

#[tokio::test]
async fn custom_failure_handler_never_sees_the_code() {
    // Handlers receive the attempt and a plain-value context; the context
    // itself carries only session, destination, and the rendered error.
    #[derive(Clone, Default)]
    struct AssertingHandler;

    #[async_trait::async_trait]
    impl SendFailureHandler for AssertingHandler {
        async fn on_send_failure(&self, attempt: &SignInAttempt, context: &SendFailureContext) {
            assert_eq!(context.session_id, attempt.session_id());
            assert!(!context.error.is_empty());
        }
    }

    let realm = InMemoryUserRealm::new();
    realm.add_user(delivery_user("alice"));
    let flow = TwoFactorFlow::new(
        realm,
        CodeService::new(InMemoryAttemptStore::new()),
        RecordingCodeSender::failing(),
    )
    .with_failure_handler(AssertingHandler);

    let outcome = flow
        .login(LoginRequest::new("sess1", "alice", "hunter2"))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::ChallengeIssued(_)));
}

// =============================================================================
// Information-minimal failure modes
// =============================================================================

#[tokio::test]
async fn unknown_and_expired_sessions_are_indistinguishable() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));

    // Session that never existed.
    let unknown = h.flow.verify("ghost", "123456").await.unwrap();

    // Session whose attempt expired.
    h.store
        .insert(SignInAttempt::new(
            "stale",
            "alice",
            Some("123456".to_string()),
            0,
        ))
        .await
        .unwrap();
    let expired = h.flow.verify("stale", "123456").await.unwrap();

    assert!(matches!(unknown, VerifyOutcome::Restart));
    assert!(matches!(expired, VerifyOutcome::Restart));
}

#[tokio::test]
async fn primary_failure_is_distinct_from_code_failure() {
    let h = harness();
    h.realm.add_user(delivery_user("alice"));

    let err = h
        .flow
        .login(LoginRequest::new("sess1", "alice", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeadboltError::BadCredentials));
    assert!(err.is_authentication_failure());

    // No attempt was created for the failed primary step.
    assert!(h.store.get("sess1").await.unwrap().is_none());
}
