//! Handlers for the publish checkout flow.
//!
//! A memorial is published once a checkout session for it is paid. Payment
//! state arrives either from the client calling `verify` after the redirect
//! or from the processor's webhook; both paths settle through
//! [`PaymentRepo::complete`], which is idempotent.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use gather_cloud::{CheckoutRequest, WebhookEvent};
use gather_core::error::CoreError;
use gather_core::payment::{
    verify_webhook_signature, CHECKOUT_COMPLETED_EVENT, CHECKOUT_EXPIRED_EVENT,
};
use gather_core::platform_events::{ENTITY_PAYMENT, MEMORIAL_PUBLISHED, PAYMENT_COMPLETED};
use gather_core::status::{MemorialStatus, PaymentStatus};
use gather_core::types::DbId;
use gather_db::models::memorial::Memorial;
use gather_db::models::payment::{CreatePayment, Payment};
use gather_db::repositories::{MemorialRepo, PaymentRepo, UserRepo};
use gather_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::access::load_owned;
use crate::handlers::memorial::publish_lifecycle_event;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub payment: Payment,
    pub memorial: Memorial,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/memorials/{id}/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let memorial = load_owned(&state, memorial_id, &auth).await?;
    if memorial.status != MemorialStatus::Draft {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Only drafts can be paid for; memorial is '{}'",
            memorial.status
        ))));
    }
    if PaymentRepo::has_paid(&state.pool, memorial_id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "This memorial has already been paid for".into(),
        )));
    }
    let provider = state.payment_provider()?;

    let customer_email = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .map(|u| u.email);
    let base = &state.config.app_base_url;
    let request = CheckoutRequest {
        memorial_id,
        user_id: auth.user_id,
        amount_cents: state.config.publish_price_cents,
        currency: state.config.publish_currency.clone(),
        product_name: format!("Memorial for {}", memorial.display_name()),
        customer_email,
        success_url: format!(
            "{base}/memorials/{memorial_id}/payment/success?session_id={{CHECKOUT_SESSION_ID}}"
        ),
        cancel_url: format!("{base}/memorials/{memorial_id}/payment/cancelled"),
    };

    let session = provider.create_checkout_session(&request).await?;
    let Some(checkout_url) = session.url.clone() else {
        return Err(AppError::InternalError(
            "Checkout session was created without a URL".into(),
        ));
    };

    PaymentRepo::create(
        &state.pool,
        &CreatePayment {
            memorial_id,
            user_id: auth.user_id,
            provider_session_id: session.id.clone(),
            amount_cents: request.amount_cents,
            currency: request.currency,
        },
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        memorial_id,
        session_id = %session.id,
        "Checkout session created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CheckoutResponse {
                checkout_url,
                session_id: session.id,
            },
        }),
    ))
}

/// POST /api/v1/payments/verify
///
/// Pull the session state from the processor and settle the payment.
pub async fn verify_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<VerifyPaymentRequest>,
) -> AppResult<Json<DataResponse<VerifyPaymentResponse>>> {
    let payment = PaymentRepo::find_by_session_id(&state.pool, &input.session_id)
        .await?
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
    if payment.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "This payment belongs to another account".into(),
        )));
    }

    if payment.status.is_open() {
        let provider = state.payment_provider()?;
        let session = provider.retrieve_checkout_session(&input.session_id).await?;
        match session.payment_state() {
            PaymentStatus::Paid => {
                settle_paid(&state, &input.session_id, &payment, Some(auth.user_id)).await?;
            }
            status @ (PaymentStatus::Expired | PaymentStatus::Failed) => {
                PaymentRepo::close(&state.pool, &input.session_id, status).await?;
                tracing::info!(session_id = %input.session_id, status = %status, "Payment closed");
            }
            PaymentStatus::Pending => {}
        }
    }

    let payment = PaymentRepo::find_by_session_id(&state.pool, &input.session_id)
        .await?
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
    let memorial = MemorialRepo::find_by_id(&state.pool, payment.memorial_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Memorial",
            id: payment.memorial_id,
        }))?;

    Ok(Json(DataResponse {
        data: VerifyPaymentResponse { payment, memorial },
    }))
}

/// POST /api/v1/payments/webhook
///
/// Unauthenticated; trust comes from the HMAC signature over the raw body.
/// Events for unknown sessions are acknowledged so the processor stops
/// retrying them.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Payment webhooks are not configured".into()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {SIGNATURE_HEADER} header")))?;

    verify_webhook_signature(secret, signature, &body, Utc::now().timestamp()).inspect_err(
        |e| tracing::warn!(error = %e, "Rejected payment webhook"),
    )?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;
    tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Payment webhook received");

    match event.event_type.as_str() {
        CHECKOUT_COMPLETED_EVENT => {
            let session = event
                .checkout_session()
                .map_err(|e| AppError::BadRequest(format!("Invalid checkout session: {e}")))?;
            if session.payment_state() != PaymentStatus::Paid {
                tracing::info!(session_id = %session.id, "Checkout completed but not yet paid");
                return Ok(Json(WebhookAck { received: true }));
            }
            match PaymentRepo::find_by_session_id(&state.pool, &session.id).await? {
                Some(payment) => {
                    settle_paid(&state, &session.id, &payment, None).await?;
                }
                None => {
                    tracing::warn!(session_id = %session.id, "Webhook for unknown checkout session");
                }
            }
        }
        CHECKOUT_EXPIRED_EVENT => {
            let session = event
                .checkout_session()
                .map_err(|e| AppError::BadRequest(format!("Invalid checkout session: {e}")))?;
            if PaymentRepo::close(&state.pool, &session.id, PaymentStatus::Expired)
                .await?
                .is_some()
            {
                tracing::info!(session_id = %session.id, "Payment expired");
            }
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring payment webhook event");
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mark the payment paid, publish its draft and emit events for whatever
/// actually changed.
async fn settle_paid(
    state: &AppState,
    session_id: &str,
    before: &Payment,
    actor: Option<DbId>,
) -> AppResult<()> {
    let Some(completion) = PaymentRepo::complete(&state.pool, session_id).await? else {
        return Ok(());
    };
    let payment = &completion.payment;

    if before.status.is_open() {
        tracing::info!(
            payment_id = payment.id,
            memorial_id = payment.memorial_id,
            "Payment completed"
        );
        let mut event = PlatformEvent::new(PAYMENT_COMPLETED)
            .with_source(ENTITY_PAYMENT, payment.id)
            .with_payload(json!({
                "memorial_id": payment.memorial_id,
                "user_id": payment.user_id,
                "amount_cents": payment.amount_cents,
                "currency": payment.currency,
            }));
        if let Some(actor) = actor {
            event = event.with_actor(actor);
        }
        state.event_bus.publish(event);
    }

    if completion.memorial_published {
        if let Some(memorial) = MemorialRepo::find_by_id(&state.pool, payment.memorial_id).await? {
            tracing::info!(memorial_id = memorial.id, "Memorial published after payment");
            publish_lifecycle_event(
                state,
                MEMORIAL_PUBLISHED,
                &memorial,
                actor.unwrap_or(payment.user_id),
            );
        }
    }
    Ok(())
}
