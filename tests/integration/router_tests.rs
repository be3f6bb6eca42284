//! In-process API tests against the memory store

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use autostelle_server::{
    api,
    config::{AppConfig, StoreBackend},
    error::AppResult,
    realtime::{MemoryStore, RealtimeStore},
    repository::Repository,
    services::{
        identity::{IdentityError, IdentityProvider, SignedInUser},
        redis::RevocationList,
        Services,
    },
    AppState,
};

struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError> {
        match (email, password) {
            ("operator@example.com", "secret") | ("new@example.com", "secret") => Ok(SignedInUser {
                user_id: format!("id-{}", email),
                email: email.to_string(),
                id_token: "id-token".to_string(),
                email_verified: email == "operator@example.com",
            }),
            ("not-an-email", _) => Err(IdentityError::InvalidEmail),
            _ => Err(IdentityError::InvalidCredential),
        }
    }

    async fn send_email_verification(&self, _id_token: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeRevocations(Mutex<HashSet<String>>);

#[async_trait]
impl RevocationList for FakeRevocations {
    async fn revoke(&self, jti: &str, _ttl_seconds: u64) -> AppResult<()> {
        self.0.lock().unwrap().insert(jti.to_string());
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        Ok(self.0.lock().unwrap().contains(jti))
    }
}

fn app(data: Value) -> (Router, Arc<MemoryStore>) {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackend::Memory;
    config.auth.login_per_second = 0;
    config.scan.result_display_ms = 100;

    let store = Arc::new(MemoryStore::with_data(data));
    let services = Services::new(
        Repository::new(store.clone()),
        &config,
        Arc::new(FakeIdentity),
        Arc::new(FakeRevocations::default()),
    );
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    (api::router(state), store)
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn sign_in(app: &Router) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "operator@example.com", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Poll the store until `check` holds, for at most two seconds
async fn eventually(store: &MemoryStore, path: &str, check: impl Fn(Option<&Value>) -> bool) {
    for _ in 0..40 {
        if check(store.get(path).await.unwrap().as_ref()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition on {} never held: {:?}", path, store.get(path).await);
}

#[tokio::test]
async fn test_health_and_ready() {
    let (app, store) = app(json!({"scanMode": false}));

    let (status, body) = call(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = call(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);

    store.inject_failure("scanMode");
    let (status, body) = call(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Realtime store unreachable");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (app, _) = app(Value::Null);

    let (status, body) = call(&app, Method::GET, "/api/v1/authorized-uids", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = call(&app, Method::GET, "/api/v1/parking-slots", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_me_and_logout() {
    let (app, _) = app(Value::Null);
    let token = sign_in(&app).await;

    let (status, body) = call(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "operator@example.com");

    let (status, body) = call(&app, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "login.html");

    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_failures_use_operator_messages() {
    let (app, _) = app(Value::Null);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "operator@example.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password.");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "not-an-email", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please enter a properly formatted email address.");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "new@example.com", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Verification email sent. Please check your inbox before logging in again."
    );
}

#[tokio::test]
async fn test_session_gate_redirects() {
    let (app, _) = app(Value::Null);

    let (status, body) = call(&app, Method::GET, "/api/v1/auth/session?page=protected", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["redirect"], "login.html");

    let token = sign_in(&app).await;
    let (_, body) = call(&app, Method::GET, "/api/v1/auth/session?page=login", Some(&token), None).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["redirect"], "index.html");

    let (_, body) = call(&app, Method::GET, "/api/v1/auth/session?page=protected", Some(&token), None).await;
    assert!(body.get("redirect").is_none());
}

#[tokio::test]
async fn test_scan_authorizes_new_tag() {
    let (app, store) = app(json!({"scanMode": false, "lastScannedUID": ""}));
    let token = sign_in(&app).await;

    let (status, body) = call(&app, Method::POST, "/api/v1/scan/form", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "form_open");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/scan",
        Some(&token),
        Some(json!({"name": " Alice ", "plate": "ABC123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "awaiting_scan");
    assert_eq!(store.get("scanMode").await.unwrap(), Some(json!(true)));

    store.set("lastScannedUID", json!("04A1B2")).await.unwrap();

    eventually(&store, "authorizedUIDs/04A1B2", |v| v.is_some()).await;
    let record = store.get("authorizedUIDs/04A1B2").await.unwrap().unwrap();
    assert_eq!(record["allowed"], true);
    assert_eq!(record["name"], "Alice");
    assert_eq!(record["plate"], "ABC123");
    assert!(record["timestamp"].is_i64());

    eventually(&store, "scanMode", |v| v == Some(&json!(false))).await;
    eventually(&store, "lastScannedUID", |v| v.map_or(true, |v| v == "")).await;
}

#[tokio::test]
async fn test_scan_rejects_taken_plate_and_cancels() {
    let (app, store) = app(json!({
        "authorizedUIDs": {"11FF00": {"allowed": true, "name": "Bob", "plate": "XYZ789", "timestamp": 1}}
    }));
    let token = sign_in(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/scan",
        Some(&token),
        Some(json!({"name": "Carol", "plate": "XYZ789"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Name or plate already registered under a different UID.");
    assert_eq!(store.get("scanMode").await.unwrap(), None);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/scan",
        Some(&token),
        Some(json!({"name": "Carol", "plate": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/scan",
        Some(&token),
        Some(json!({"name": "Carol", "plate": "LMN456"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::DELETE, "/api/v1/scan", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "idle");
    assert_eq!(store.get("scanMode").await.unwrap(), Some(json!(false)));

    let (status, _) = call(&app, Method::DELETE, "/api/v1/scan", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_roster_list_and_delete() {
    let (app, store) = app(json!({
        "authorizedUIDs": {
            "04A1B2": {"allowed": true, "name": "alice", "plate": "ABC123", "timestamp": 300},
            "11FF00": {"allowed": true, "name": "Bob", "plate": "XYZ789", "timestamp": 100},
            "22EE22": {"allowed": true, "plate": "LMN456"}
        }
    }));
    let token = sign_in(&app).await;

    let (status, body) = call(&app, Method::GET, "/api/v1/authorized-uids?sort=newest", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let uids: Vec<&str> = body.as_array().unwrap().iter().map(|e| e["uid"].as_str().unwrap()).collect();
    assert_eq!(uids, vec!["04A1B2", "11FF00", "22EE22"]);
    assert_eq!(body[2]["name"], "Unnamed");

    let (_, body) = call(&app, Method::GET, "/api/v1/authorized-uids?search=xyz", Some(&token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(&app, Method::DELETE, "/api/v1/authorized-uids/11FF00", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "UID 11FF00 removed");
    assert!(store.get("authorizedUIDs/11FF00").await.unwrap().is_none());

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/authorized-uids/bulk-delete",
        Some(&token),
        Some(json!({"uids": ["04A1B2", "22EE22"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/authorized-uids/bulk-delete",
        Some(&token),
        Some(json!({"uids": ["04A1B2", "22EE22"], "confirm": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);
    assert_eq!(body["notice"]["message"], "2 UID(s) deleted");
    assert!(store.get("authorizedUIDs").await.unwrap().is_none());
}

#[tokio::test]
async fn test_parking_slots() {
    let (app, _) = app(json!({"parkingSlots": {"2": true, "4": 1, "5": "occupied"}}));
    let token = sign_in(&app).await;

    let (status, body) = call(&app, Method::GET, "/api/v1/parking-slots", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let occupied: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["occupied"] == true)
        .map(|s| s["label"].as_str().unwrap())
        .collect();
    assert_eq!(occupied, vec!["A2", "R1", "R2"]);
}
