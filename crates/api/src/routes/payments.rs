//! Route definitions for the `/payments` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::payment;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST /verify   -> verify_payment (requires auth)
/// POST /webhook  -> payment_webhook (signature-verified, no auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify", post(payment::verify_payment))
        .route("/webhook", post(payment::payment_webhook))
}
