mod common;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use uuid::Uuid;

use weblarek_api_rust::auth::{self, validate_jwt, TokenKind, REFRESH_COOKIE_NAME};
use weblarek_api_rust::client::{
    api::OrderStatus, ApiClient, Call, ClientError, CredentialStore, MemoryCredentialStore, WebLarekApi,
};

/// Stand-in for the WebLarek API with call counters.
#[derive(Default)]
struct Backend {
    csrf_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    order_calls: AtomicUsize,
    omit_csrf_field: AtomicBool,
    /// Token the last successful refresh hands out; `None` makes refresh fail.
    refreshed_token: Mutex<Option<String>>,
    /// Bearer token order routes accept.
    accepted_token: Mutex<String>,
    /// CSRF token order routes accept.
    accepted_csrf: Mutex<Option<String>>,
}

impl Backend {
    fn new(accepted_token: &str, refreshed_token: Option<&str>) -> Arc<Self> {
        let backend = Backend::default();
        *backend.accepted_token.lock().unwrap() = accepted_token.to_string();
        *backend.refreshed_token.lock().unwrap() = refreshed_token.map(str::to_string);
        Arc::new(backend)
    }
}

async fn csrf_token(State(backend): State<Arc<Backend>>) -> Json<Value> {
    let n = backend.csrf_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if backend.omit_csrf_field.load(Ordering::SeqCst) {
        return Json(json!({}));
    }
    let token = format!("csrf-{}", n);
    *backend.accepted_csrf.lock().unwrap() = Some(token.clone());
    Json(json!({ "csrfToken": token }))
}

async fn refresh(State(backend): State<Arc<Backend>>) -> Response {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    match backend.refreshed_token.lock().unwrap().clone() {
        Some(token) => Json(json!({ "success": true, "accessToken": token })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": true, "message": "Invalid refresh token" })),
        )
            .into_response(),
    }
}

async fn order_patch(
    State(backend): State<Arc<Backend>>,
    Path(number): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.order_calls.fetch_add(1, Ordering::SeqCst);

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    if bearer.as_deref() != Some(backend.accepted_token.lock().unwrap().as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "jwt expired" }))).into_response();
    }

    let csrf = headers.get("x-csrf-token").and_then(|v| v.to_str().ok()).map(str::to_string);
    if csrf.is_none() || csrf != *backend.accepted_csrf.lock().unwrap() {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "Invalid CSRF token" }))).into_response();
    }

    Json(json!({ "_id": "o-1", "orderNumber": number, "status": body["status"] })).into_response()
}

async fn boom() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" }))).into_response()
}

struct Harness {
    backend: Arc<Backend>,
    store: Arc<MemoryCredentialStore>,
    api: WebLarekApi,
}

async fn harness(backend: Arc<Backend>, initial_token: &str) -> Result<Harness> {
    let app = Router::new()
        .route("/csrf-token", get(csrf_token))
        .route("/auth/token", get(refresh))
        .route("/order/:number", patch(order_patch))
        .route("/boom", get(boom))
        .with_state(backend.clone());
    let server = common::spawn(app).await?;

    let store = Arc::new(MemoryCredentialStore::new(Some(initial_token.to_string())));
    let client = ApiClient::new(&server.base_url, store.clone())?;
    let api = WebLarekApi::new(Arc::new(client), format!("{}/images", server.base_url));
    Ok(Harness { backend, store, api })
}

#[tokio::test]
async fn expired_token_is_refreshed_and_call_replayed_once() -> Result<()> {
    let h = harness(Backend::new("fresh", Some("fresh")), "stale").await?;

    let order = h.api.update_order_status("42", OrderStatus::Cancelled).await?;
    assert_eq!(order.status, Some(OrderStatus::Cancelled));

    assert_eq!(h.backend.order_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.access_token().await?.as_deref(), Some("fresh"));
    Ok(())
}

#[tokio::test]
async fn failed_refresh_is_final_and_call_not_replayed() -> Result<()> {
    let h = harness(Backend::new("fresh", None), "stale").await?;

    let err = h.api.update_order_status("42", OrderStatus::Completed).await.unwrap_err();
    assert!(matches!(err, ClientError::RefreshFailed { .. }), "{:?}", err);
    assert_eq!(err.status(), Some(401));

    assert_eq!(h.backend.order_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.access_token().await?.as_deref(), Some("stale"));
    Ok(())
}

#[tokio::test]
async fn replay_outcome_is_final() -> Result<()> {
    // Refresh succeeds but hands out a token the route still rejects
    let h = harness(Backend::new("fresh", Some("also-stale")), "stale").await?;

    let err = h.api.update_order_status("42", OrderStatus::New).await.unwrap_err();
    assert!(err.is_unauthorized(), "{:?}", err);

    assert_eq!(h.backend.order_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.backend.refresh_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn other_failures_do_not_trigger_refresh() -> Result<()> {
    let h = harness(Backend::new("fresh", Some("fresh")), "fresh").await?;

    let err = h.api.client().execute::<Value>(Call::get("/boom")).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.payload().and_then(|p| p.get("message")), Some(&json!("boom")));
    assert_eq!(h.backend.refresh_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn csrf_token_is_fetched_once_and_reused() -> Result<()> {
    let h = harness(Backend::new("fresh", Some("fresh")), "fresh").await?;

    h.api.update_order_status("1", OrderStatus::Delivering).await?;
    h.api.update_order_status("2", OrderStatus::Completed).await?;

    assert_eq!(h.backend.csrf_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.backend.order_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_callers_share_one_csrf_fetch() -> Result<()> {
    let h = harness(Backend::new("fresh", Some("fresh")), "fresh").await?;
    let client = h.api.client();

    let tokens = futures::future::join_all((0..8).map(|_| client.csrf_token())).await;
    for token in tokens {
        assert_eq!(token?, "csrf-1");
    }
    assert_eq!(h.backend.csrf_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_csrf_token_is_dropped_from_cache() -> Result<()> {
    let h = harness(Backend::new("fresh", Some("fresh")), "fresh").await?;

    h.api.update_order_status("1", OrderStatus::Delivering).await?;

    // Server rotates its secret; the cached token no longer verifies
    *h.backend.accepted_csrf.lock().unwrap() = Some("rotated".to_string());
    let err = h.api.update_order_status("1", OrderStatus::Completed).await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden { .. }), "{:?}", err);
    assert_eq!(h.backend.refresh_calls.load(Ordering::SeqCst), 0);

    h.api.update_order_status("1", OrderStatus::Completed).await?;
    assert_eq!(h.backend.csrf_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.backend.order_calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn missing_csrf_field_fails_before_mutation() -> Result<()> {
    let backend = Backend::new("fresh", Some("fresh"));
    backend.omit_csrf_field.store(true, Ordering::SeqCst);
    let h = harness(backend, "fresh").await?;

    let err = h.api.update_order_status("1", OrderStatus::Completed).await.unwrap_err();
    assert!(matches!(err, ClientError::CsrfTokenMissing), "{:?}", err);
    assert_eq!(h.backend.order_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn expired_session_patch_against_live_router() -> Result<()> {
    let server = common::spawn_api().await?;
    let user = common::admin();
    let expired = common::expired_access_token(&user);

    let store = Arc::new(MemoryCredentialStore::new(Some(expired.clone())));
    let client = ApiClient::new(&server.base_url, store.clone())?;
    client.add_cookie(REFRESH_COOKIE_NAME, auth::refresh_cookie(&user)?.value());

    let call = Call::new(Method::PATCH, format!("/customers/{}", Uuid::new_v4())).json(json!({ "name": "Ann" }));
    let outcome = client.execute_mutating::<Value>(call).await;

    // Past authentication and the CSRF gate; what remains is storage.
    if let Err(err) = &outcome {
        assert!(!matches!(err, ClientError::Unauthorized { .. } | ClientError::Forbidden { .. } | ClientError::RefreshFailed { .. }), "{:?}", err);
    }

    let refreshed = store.access_token().await?.expect("token stored");
    assert_ne!(refreshed, expired);
    assert_eq!(validate_jwt(&refreshed, TokenKind::Access)?.sub, user.id);
    Ok(())
}
