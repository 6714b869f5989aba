//! Checkout-session payments.

pub mod stripe;

use std::collections::HashMap;

use async_trait::async_trait;
use gather_core::payment::status_from_session;
use gather_core::status::PaymentStatus;
use gather_core::types::DbId;
use serde::Deserialize;

use crate::error::ProviderError;

/// What to charge for and where to send the buyer afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub memorial_id: DbId,
    pub user_id: DbId,
    pub amount_cents: i64,
    pub currency: String,
    /// Line item shown on the hosted checkout page.
    pub product_name: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session as reported by the processor.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page URL; only present while the session is open.
    pub url: Option<String>,
    /// `open`, `complete` or `expired`.
    pub status: String,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Our payment status for this session.
    pub fn payment_state(&self) -> PaymentStatus {
        status_from_session(&self.status, &self.payment_status)
    }

    /// The memorial id stored in the session metadata, if any.
    pub fn memorial_id(&self) -> Option<DbId> {
        self.metadata.get("memorial_id")?.parse().ok()
    }
}

/// A webhook delivery. Only checkout-session events are decoded; anything
/// else keeps its raw object.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode the event object as a checkout session.
    pub fn checkout_session(&self) -> Result<CheckoutSession, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError>;

    /// Fetch the current state of a session.
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, ProviderError>;
}
