#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use gather_api::auth::jwt::JwtConfig;
use gather_api::config::{LogFormat, ServerConfig};
use gather_api::router::build_app_router;
use gather_api::state::AppState;
use gather_cloud::{
    CheckoutRequest, CheckoutSession, MediaProvider, PaymentProvider, ProviderError, SignedUpload,
    UploadRequest, UploadedMedia,
};
use gather_core::status::{MediaKind, MemorialStatus};
use gather_core::types::DbId;
use gather_db::models::memorial::Memorial;
use gather_db::repositories::MemorialRepo;
use gather_events::EventBus;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig::with_secret(TEST_JWT_SECRET),
        memorial_access_expiry_mins: 120,
        app_base_url: "http://localhost:5173".to_string(),
        publish_price_cents: 4999,
        publish_currency: "usd".to_string(),
        stripe_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        media_folder: "gather-test".to_string(),
        log_format: LogFormat::Pretty,
    }
}

// ---------------------------------------------------------------------------
// Fake providers
// ---------------------------------------------------------------------------

/// In-memory checkout processor. Sessions start open and unpaid; tests flip
/// them with [`FakePayments::set_state`].
#[derive(Default)]
pub struct FakePayments {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
}

impl FakePayments {
    pub fn set_state(&self, session_id: &str, status: &str, payment_status: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(session_id).expect("unknown fake session");
        session.status = status.to_string();
        session.payment_status = payment_status.to_string();
    }

    pub fn session(&self, session_id: &str) -> CheckoutSession {
        self.sessions.lock().unwrap()[session_id].clone()
    }
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let mut sessions = self.sessions.lock().unwrap();
        let id = format!("cs_test_{}_{}", request.memorial_id, sessions.len() + 1);
        let session = CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.test/pay/{id}")),
            status: "open".to_string(),
            payment_status: "unpaid".to_string(),
            amount_total: Some(request.amount_cents),
            currency: Some(request.currency.clone()),
            metadata: HashMap::from([
                ("memorial_id".to_string(), request.memorial_id.to_string()),
                ("user_id".to_string(), request.user_id.to_string()),
            ]),
        };
        sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, ProviderError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(ProviderError::Api {
                provider: "fake",
                status: 404,
                body: "no such session".to_string(),
            })
    }
}

/// In-memory CDN that records destroyed public ids.
#[derive(Default)]
pub struct FakeMedia {
    pub destroyed: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaProvider for FakeMedia {
    fn sign_upload(&self, _kind: MediaKind, folder: &str, timestamp: i64) -> SignedUpload {
        SignedUpload {
            upload_url: "https://cdn.test/upload".to_string(),
            api_key: "test-key".to_string(),
            cloud_name: "test-cloud".to_string(),
            folder: folder.to_string(),
            timestamp,
            signature: "fake-signature".to_string(),
        }
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadedMedia, ProviderError> {
        let public_id = format!("{}/{}", request.folder, request.file_name);
        let ext = match request.kind {
            MediaKind::Photo => "png",
            MediaKind::Video => "mp4",
        };
        Ok(UploadedMedia {
            secure_url: format!("https://cdn.test/{public_id}.{ext}"),
            public_id,
            width: None,
            height: None,
            bytes: request.data.len() as i64,
            duration: matches!(request.kind, MediaKind::Video).then_some(12.5),
        })
    }

    async fn destroy(&self, public_id: &str, _kind: MediaKind) -> Result<(), ProviderError> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// Handles to the fakes behind a test app.
#[derive(Clone, Default)]
pub struct TestProviders {
    pub payments: Arc<FakePayments>,
    pub media: Arc<FakeMedia>,
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router with fake providers.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, TestProviders::default())
}

pub fn build_test_app_with(pool: PgPool, providers: TestProviders) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
        payments: Some(providers.payments as Arc<dyn PaymentProvider>),
        media: Some(providers.media as Arc<dyn MediaProvider>),
    };
    build_app_router(state, &config)
}

/// Build the router without any external providers configured.
pub fn build_test_app_without_providers(pool: PgPool) -> Router {
    let mut config = test_config();
    config.stripe_webhook_secret = None;
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
        payments: None,
        media: None,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, "GET", uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, "GET", uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, "POST", uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, "POST", uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, "PUT", uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, "PATCH", uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, "DELETE", uri, Some(token), None).await
}

/// Read the full response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A registered account and its access token.
pub struct TestUser {
    pub id: DbId,
    pub token: String,
}

/// Register `username` through the API.
pub async fn register_user(app: &Router, username: &str) -> TestUser {
    let body = json!({
        "username": username,
        "email": format!("{username}@test.com"),
        "password": TEST_PASSWORD,
    });
    let response = post_json(app.clone(), "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), 201, "registering {username} should succeed");
    let json = body_json(response).await;
    TestUser {
        id: json["data"]["user"]["id"].as_i64().unwrap(),
        token: json["data"]["access_token"].as_str().unwrap().to_string(),
    }
}

/// Promote a user to admin and return a fresh token carrying the role.
pub async fn make_admin(app: &Router, pool: &PgPool, username: &str, user_id: DbId) -> String {
    sqlx::query("UPDATE users SET role_id = 1 WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
    let body = json!({ "username": username, "password": TEST_PASSWORD });
    let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
    body_json(response).await["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Create a draft through the API and return its JSON.
pub async fn create_draft(app: &Router, owner: &TestUser, body: Value) -> Value {
    let response = post_json_auth(app.clone(), "/api/v1/memorials", body, &owner.token).await;
    assert_eq!(response.status(), 201, "creating a draft should succeed");
    body_json(response).await["data"].clone()
}

/// Create a draft and move it straight to published, bypassing payment.
pub async fn create_published(
    app: &Router,
    pool: &PgPool,
    owner: &TestUser,
    guestbook_moderated: bool,
) -> Memorial {
    let draft = create_draft(
        app,
        owner,
        json!({
            "first_name": "Eleanor",
            "last_name": "Rigby",
            "birth_date": "1931-03-14",
            "death_date": "2019-11-02",
            "guestbook_moderated": guestbook_moderated,
        }),
    )
    .await;
    let id = draft["id"].as_i64().unwrap();
    MemorialRepo::transition(pool, id, MemorialStatus::Draft, MemorialStatus::Published)
        .await
        .unwrap()
        .expect("draft should transition to published")
}

/// A guestbook message long enough to pass validation and free of spam
/// signals.
pub fn heartfelt_message(n: usize) -> String {
    format!("She was a wonderful neighbour and friend, remembered with love ({n}).")
}

/// Submit a guestbook entry and return the raw response.
pub async fn submit_entry(
    app: &Router,
    memorial_id: DbId,
    author: &TestUser,
    message: &str,
) -> Response<Body> {
    post_json_auth(
        app.clone(),
        &format!("/api/v1/memorials/{memorial_id}/guestbook"),
        json!({ "author_name": "A Friend", "message": message }),
        &author.token,
    )
    .await
}
