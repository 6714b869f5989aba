//! Publish payment model and DTOs.

use gather_core::status::PaymentStatus;
use gather_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `payments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub memorial_id: DbId,
    pub user_id: DbId,
    pub provider_session_id: String,
    pub amount_cents: i64,
    pub currency: String,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: PaymentStatus,
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a newly created checkout session.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub memorial_id: DbId,
    pub user_id: DbId,
    pub provider_session_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// Result of completing a payment.
#[derive(Debug, Clone)]
pub struct PaymentCompletion {
    pub payment: Payment,
    /// `true` when this call moved the memorial from draft to published.
    pub memorial_published: bool,
}
