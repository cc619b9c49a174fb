use std::collections::BTreeSet;

use serde_json::json;

use super::*;
use crate::net::auth::REFRESH_ENDPOINT;
use crate::net::transport::test_helpers::{MockTransport, reply};
use crate::net::types::{Role, UserProfile};
use crate::state::auth::SessionEvent;
use crate::state::store::{ACCESS_TOKEN_KEY, MemoryStore, REFRESH_TOKEN_KEY, SessionStore, USER_KEY};

const PROFILE: &str = "/riders/getMyProfile";

fn rider() -> UserProfile {
    UserProfile {
        id: 1,
        name: "Asha".into(),
        email: "a@b.com".into(),
        phone_number: None,
        roles: BTreeSet::from([Role::Rider]),
    }
}

/// Backend that accepts only `valid` as access token and answers refreshes
/// with `refresh_status` / `{"accessToken": "T2"}`.
fn backend(valid: &'static str, refresh_status: u16) -> Arc<MockTransport> {
    Arc::new(MockTransport::new(move |req| {
        if req.path == REFRESH_ENDPOINT {
            return if refresh_status == 200 {
                reply(200, &json!({ "accessToken": "T2" }))
            } else {
                reply(refresh_status, &json!({ "message": "refresh token expired" }))
            };
        }
        if req.bearer() == Some(valid) {
            reply(200, &json!({ "ok": true }))
        } else {
            reply(401, &json!({ "message": "token expired" }))
        }
    }))
}

fn gateway_with(
    transport: &Arc<MockTransport>,
    access: Option<&str>,
    refresh: Option<&str>,
) -> (Gateway, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = SessionHandle::new(store.clone());
    session.hydrate();
    if let Some(access) = access {
        session.establish(access.to_owned(), refresh.map(ToOwned::to_owned), Some(rider()));
    }
    (Gateway::new(transport.clone(), session), store)
}

// =============================================================================
// Token attachment
// =============================================================================

#[tokio::test]
async fn attaches_bearer_when_token_present() {
    let transport = backend("T1", 200);
    let (gateway, _) = gateway_with(&transport, Some("T1"), None);

    gateway.send(&HttpRequest::get(PROFILE)).await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].bearer(), Some("T1"));
}

#[tokio::test]
async fn dispatches_unauthenticated_without_token() {
    let transport = Arc::new(MockTransport::new(|_| reply(200, &json!([]))));
    let (gateway, _) = gateway_with(&transport, None, None);

    gateway.send(&HttpRequest::get("/drivers/availableRides")).await.unwrap();

    assert!(transport.sent()[0].headers.get(reqwest::header::AUTHORIZATION).is_none());
}

#[tokio::test]
async fn success_body_is_returned_unchanged() {
    let transport = backend("T1", 200);
    let (gateway, _) = gateway_with(&transport, Some("T1"), None);

    let value: serde_json::Value = gateway.send_json(&HttpRequest::get(PROFILE)).await.unwrap();
    assert_eq!(value, json!({ "ok": true }));
}

// =============================================================================
// Refresh and retry
// =============================================================================

#[tokio::test]
async fn refresh_then_retry_uses_new_token() {
    let transport = backend("T2", 200);
    let (gateway, store) = gateway_with(&transport, Some("T1"), Some("R1"));

    gateway.send(&HttpRequest::get(PROFILE)).await.unwrap();

    let calls = transport.sent();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].bearer(), Some("T1"));
    assert_eq!(calls[1].path, REFRESH_ENDPOINT);
    assert_eq!(calls[2].bearer(), Some("T2"));
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("T2"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
}

#[tokio::test]
async fn refresh_call_is_anonymous_and_carries_only_refresh_token() {
    let transport = backend("T2", 200);
    let (gateway, _) = gateway_with(&transport, Some("T1"), Some("R1"));

    gateway.send(&HttpRequest::get(PROFILE)).await.unwrap();

    let refresh = &transport.sent_to(REFRESH_ENDPOINT)[0];
    assert!(refresh.bearer().is_none());
    assert_eq!(refresh.body, Some(json!({ "refreshToken": "R1" })));
}

#[tokio::test]
async fn retried_request_is_not_retried_again() {
    // Backend accepts nothing, but refresh keeps succeeding.
    let transport = backend("NEVER", 200);
    let (gateway, store) = gateway_with(&transport, Some("T1"), Some("R1"));

    let err = gateway.send(&HttpRequest::get(PROFILE)).await.unwrap_err();

    assert!(matches!(err, ApiError::Authentication { .. }));
    assert_eq!(transport.sent_to(PROFILE).len(), 2);
    assert_eq!(transport.sent_to(REFRESH_ENDPOINT).len(), 1);
    // A rejected retry is surfaced, not treated as an invalidation.
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("T2"));
}

#[tokio::test]
async fn missing_refresh_token_invalidates_and_returns_original_error() {
    let transport = backend("T2", 200);
    let (gateway, store) = gateway_with(&transport, Some("T1"), None);
    let mut events = gateway.session().events();

    let err = gateway.send(&HttpRequest::get(PROFILE)).await.unwrap_err();

    assert_eq!(err, ApiError::Authentication { message: "token expired".into() });
    assert!(transport.sent_to(REFRESH_ENDPOINT).is_empty());
    assert!(store.is_empty());
    assert!(!gateway.session().is_authenticated());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Invalidated);
}

fn persisted_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries([
        (ACCESS_TOKEN_KEY.to_owned(), "T1".to_owned()),
        (REFRESH_TOKEN_KEY.to_owned(), "R1".to_owned()),
        (USER_KEY.to_owned(), serde_json::to_string(&rider()).unwrap()),
    ]))
}

#[tokio::test]
async fn send_before_hydration_uses_persisted_credentials() {
    let transport = backend("T1", 200);
    let store = persisted_store();
    let gateway = Gateway::new(transport.clone(), SessionHandle::new(store.clone()));

    gateway.send(&HttpRequest::get(PROFILE)).await.unwrap();

    assert_eq!(transport.sent()[0].bearer(), Some("T1"));
    assert!(gateway.session().is_authenticated());
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
    assert!(store.get(USER_KEY).is_some());
}

#[tokio::test]
async fn expired_token_before_hydration_is_renewed_not_wiped() {
    let transport = backend("T2", 200);
    let store = persisted_store();
    let gateway = Gateway::new(transport.clone(), SessionHandle::new(store.clone()));

    gateway.send(&HttpRequest::get(PROFILE)).await.unwrap();

    assert_eq!(transport.sent_to(REFRESH_ENDPOINT).len(), 1);
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("T2"));
    assert!(store.get(USER_KEY).is_some());
    assert!(gateway.session().is_authenticated());
}

#[tokio::test]
async fn failed_refresh_clears_everything_and_returns_refresh_error() {
    let transport = backend("T2", 403);
    let (gateway, store) = gateway_with(&transport, Some("T1"), Some("R1"));
    let mut events = gateway.session().events();

    let err = gateway.send(&HttpRequest::get(PROFILE)).await.unwrap_err();

    assert_eq!(err, ApiError::Authentication { message: "refresh token expired".into() });
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
        assert!(store.get(key).is_none(), "{key} should be cleared");
    }
    assert_eq!(gateway.session().snapshot(), crate::state::auth::Session::default());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Invalidated);
    assert_eq!(transport.sent_to(PROFILE).len(), 1);
}

#[tokio::test]
async fn refresh_network_failure_also_invalidates() {
    let transport = Arc::new(MockTransport::new(|req| {
        if req.path == REFRESH_ENDPOINT {
            Err(ApiError::Network("connection reset".into()))
        } else {
            reply(401, &json!({}))
        }
    }));
    let (gateway, store) = gateway_with(&transport, Some("T1"), Some("R1"));

    let err = gateway.send(&HttpRequest::get(PROFILE)).await.unwrap_err();

    assert!(matches!(err, ApiError::Authentication { .. }));
    assert!(!err.retryable());
    assert!(store.is_empty());
}

#[tokio::test]
async fn non_401_errors_propagate_without_refresh() {
    let transport = Arc::new(MockTransport::new(|_| reply(400, &json!({ "message": "Invalid OTP" }))));
    let (gateway, store) = gateway_with(&transport, Some("T1"), Some("R1"));

    let err = gateway.send(&HttpRequest::post("/drivers/startRide/4")).await.unwrap_err();

    assert_eq!(err, ApiError::Validation { status: 400, message: "Invalid OTP".into() });
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("T1"));
}

#[tokio::test]
async fn network_error_leaves_session_untouched() {
    let transport = Arc::new(MockTransport::new(|_| Err(ApiError::Network("offline".into()))));
    let (gateway, store) = gateway_with(&transport, Some("T1"), Some("R1"));

    let err = gateway.send(&HttpRequest::get(PROFILE)).await.unwrap_err();

    assert!(err.retryable());
    assert!(gateway.session().is_authenticated());
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let transport = backend("T2", 200);
    let (gateway, _) = gateway_with(&transport, Some("T1"), Some("R1"));
    let request = HttpRequest::get(PROFILE);

    let (a, b) = tokio::join!(gateway.send(&request), gateway.send(&request));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(transport.sent_to(REFRESH_ENDPOINT).len(), 1);
    let retried: Vec<_> = transport.sent_to(PROFILE).into_iter().filter(|r| r.bearer() == Some("T2")).collect();
    assert_eq!(retried.len(), 2);
}

#[tokio::test]
async fn concurrent_waiter_fails_quietly_after_invalidation() {
    let transport = backend("T2", 401);
    let (gateway, _) = gateway_with(&transport, Some("T1"), Some("R1"));
    let mut events = gateway.session().events();
    let request = HttpRequest::get(PROFILE);

    let (a, b) = tokio::join!(gateway.send(&request), gateway.send(&request));

    assert!(a.is_err());
    assert!(b.is_err());
    assert_eq!(transport.sent_to(REFRESH_ENDPOINT).len(), 1);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Invalidated);
    assert!(events.try_recv().is_err());
}

// =============================================================================
// Anonymous dispatch
// =============================================================================

#[tokio::test]
async fn anonymous_requests_skip_token_and_refresh() {
    let transport = backend("T1", 200);
    let (gateway, store) = gateway_with(&transport, Some("T1"), Some("R1"));

    let err = gateway.send_anonymous(&HttpRequest::post("/api/auth/login")).await.unwrap_err();

    assert!(matches!(err, ApiError::Authentication { .. }));
    assert_eq!(transport.sent().len(), 1);
    assert!(transport.sent()[0].bearer().is_none());
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("T1"));
}
