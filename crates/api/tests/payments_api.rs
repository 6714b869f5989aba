//! HTTP-level integration tests for the publish checkout: session creation,
//! client-side verification and the signed webhook.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::{
    body_json, create_draft, create_published, get, post_json_auth, register_user, TestProviders,
    TestUser, TEST_WEBHOOK_SECRET,
};
use gather_core::payment::sign_webhook;
use gather_core::status::{MemorialStatus, PaymentStatus};
use gather_db::repositories::{MemorialRepo, PaymentRepo};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn start_checkout(app: &axum::Router, owner: &TestUser) -> (i64, String) {
    let draft = create_draft(app, owner, json!({ "first_name": "Iris", "last_name": "Moss" })).await;
    let memorial_id = draft["id"].as_i64().unwrap();
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/memorials/{memorial_id}/checkout"),
        json!({}),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let session_id = json["data"]["session_id"].as_str().unwrap().to_string();
    (memorial_id, session_id)
}

fn webhook_event(event_type: &str, session_id: &str, status: &str, payment_status: &str) -> Value {
    json!({
        "id": "evt_test_1",
        "type": event_type,
        "data": {
            "object": {
                "id": session_id,
                "url": null,
                "status": status,
                "payment_status": payment_status,
                "amount_total": 4999,
                "currency": "usd",
                "metadata": {}
            }
        }
    })
}

async fn post_webhook(app: &axum::Router, body: &Value, signature: Option<String>) -> axum::response::Response {
    let raw = body.to_string();
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/payments/webhook")
        .header("Content-Type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    app.clone()
        .oneshot(builder.body(Body::from(raw)).unwrap())
        .await
        .unwrap()
}

fn sign(body: &Value) -> String {
    sign_webhook(TEST_WEBHOOK_SECRET, body.to_string().as_bytes(), Utc::now().timestamp())
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_checkout_creates_pending_payment(pool: PgPool) {
    let providers = TestProviders::default();
    let app = common::build_test_app_with(pool.clone(), providers.clone());
    let owner = register_user(&app, "owner").await;

    let (memorial_id, session_id) = start_checkout(&app, &owner).await;

    let payment = PaymentRepo::find_by_session_id(&pool, &session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.memorial_id, memorial_id);
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount_cents, 4999);

    let session = providers.payments.session(&session_id);
    assert_eq!(session.metadata["memorial_id"], memorial_id.to_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_checkout_only_for_owned_drafts(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let stranger = register_user(&app, "stranger").await;
    let published = create_published(&app, &pool, &owner, false).await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/memorials/{}/checkout", published.id),
        json!({}),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let draft = create_draft(&app, &owner, json!({ "first_name": "A", "last_name": "B" })).await;
    let response = post_json_auth(
        app,
        &format!("/api/v1/memorials/{}/checkout", draft["id"]),
        json!({}),
        &stranger.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_checkout_without_processor_is_unavailable(pool: PgPool) {
    let app = common::build_test_app_without_providers(pool);
    let owner = register_user(&app, "owner").await;
    let draft = create_draft(&app, &owner, json!({ "first_name": "A", "last_name": "B" })).await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/memorials/{}/checkout", draft["id"]),
        json!({}),
        &owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// Verify
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_verify_publishes_once_paid(pool: PgPool) {
    let providers = TestProviders::default();
    let app = common::build_test_app_with(pool.clone(), providers.clone());
    let owner = register_user(&app, "owner").await;
    let (memorial_id, session_id) = start_checkout(&app, &owner).await;
    let verify = json!({ "session_id": session_id });

    let response = post_json_auth(app.clone(), "/api/v1/payments/verify", verify.clone(), &owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["payment"]["status"], "pending");
    assert_eq!(json["data"]["memorial"]["status"], "draft");

    providers.payments.set_state(&session_id, "complete", "paid");

    let response = post_json_auth(app.clone(), "/api/v1/payments/verify", verify.clone(), &owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["payment"]["status"], "paid");
    assert!(json["data"]["payment"]["paid_at"].is_string());
    assert_eq!(json["data"]["memorial"]["status"], "published");
    assert!(json["data"]["memorial"]["published_at"].is_string());

    // Verifying again is harmless.
    let response = post_json_auth(app.clone(), "/api/v1/payments/verify", verify, &owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        get(app, &format!("/api/v1/memorials/{memorial_id}")).await.status(),
        StatusCode::OK
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_verify_records_expired_session(pool: PgPool) {
    let providers = TestProviders::default();
    let app = common::build_test_app_with(pool.clone(), providers.clone());
    let owner = register_user(&app, "owner").await;
    let (memorial_id, session_id) = start_checkout(&app, &owner).await;
    providers.payments.set_state(&session_id, "expired", "unpaid");

    let response = post_json_auth(
        app,
        "/api/v1/payments/verify",
        json!({ "session_id": session_id }),
        &owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["payment"]["status"], "expired");
    let memorial = MemorialRepo::find_by_id(&pool, memorial_id).await.unwrap().unwrap();
    assert_eq!(memorial.status, MemorialStatus::Draft);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_verify_is_scoped_to_payer(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register_user(&app, "owner").await;
    let stranger = register_user(&app, "stranger").await;
    let (_, session_id) = start_checkout(&app, &owner).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/payments/verify",
        json!({ "session_id": session_id }),
        &stranger.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app,
        "/api/v1/payments/verify",
        json!({ "session_id": "cs_unknown" }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_signed_webhook_publishes_memorial(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let (memorial_id, session_id) = start_checkout(&app, &owner).await;

    let event = webhook_event("checkout.session.completed", &session_id, "complete", "paid");
    let response = post_webhook(&app, &event, Some(sign(&event))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, json!({ "received": true }));

    let memorial = MemorialRepo::find_by_id(&pool, memorial_id).await.unwrap().unwrap();
    assert_eq!(memorial.status, MemorialStatus::Published);
    assert!(PaymentRepo::has_paid(&pool, memorial_id).await.unwrap());

    // Redelivery is acknowledged and changes nothing.
    let response = post_webhook(&app, &event, Some(sign(&event))).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The manual publish path now sees a non-draft.
    let response = post_json_auth(
        app,
        &format!("/api/v1/memorials/{memorial_id}/publish"),
        json!({}),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_webhook_closes_payment(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let owner = register_user(&app, "owner").await;
    let (_, session_id) = start_checkout(&app, &owner).await;

    let event = webhook_event("checkout.session.expired", &session_id, "expired", "unpaid");
    let response = post_webhook(&app, &event, Some(sign(&event))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payment = PaymentRepo::find_by_session_id(&pool, &session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Expired);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_signature_checks(pool: PgPool) {
    let app = common::build_test_app(pool);
    let event = webhook_event("checkout.session.completed", "cs_unknown", "complete", "paid");

    let response = post_webhook(&app, &event, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let forged = sign_webhook("whsec_wrong", event.to_string().as_bytes(), Utc::now().timestamp());
    let response = post_webhook(&app, &event, Some(forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let stale = sign_webhook(
        TEST_WEBHOOK_SECRET,
        event.to_string().as_bytes(),
        Utc::now().timestamp() - 3600,
    );
    let response = post_webhook(&app, &event, Some(stale)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown sessions are acknowledged so the processor stops retrying.
    let response = post_webhook(&app, &event, Some(sign(&event))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_without_secret_is_unavailable(pool: PgPool) {
    let app = common::build_test_app_without_providers(pool);
    let event = webhook_event("checkout.session.completed", "cs_x", "complete", "paid");

    let response = post_webhook(&app, &event, Some(sign(&event))).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
