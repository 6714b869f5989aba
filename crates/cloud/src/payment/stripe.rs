//! Stripe-compatible checkout client.
//!
//! Uses the form-encoded `/v1/checkout/sessions` API with bearer
//! authentication.

use async_trait::async_trait;

use super::{CheckoutRequest, CheckoutSession, PaymentProvider};
use crate::error::ProviderError;
use crate::http::parse_response;

const PROVIDER: &str = "stripe";

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
}

impl StripeConfig {
    /// Load from `STRIPE_SECRET_KEY` and `STRIPE_API_BASE`.
    ///
    /// Returns `None` if no secret key is set; payments are disabled then.
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY").ok()?;
        Some(Self {
            secret_key,
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        })
    }
}

pub struct StripeClient {
    client: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn sessions_url(&self) -> String {
        format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

/// Form fields for a one-off payment session.
pub fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount_cents.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
        (
            "metadata[memorial_id]".to_string(),
            request.memorial_id.to_string(),
        ),
        ("metadata[user_id]".to_string(), request.user_id.to_string()),
        (
            "client_reference_id".to_string(),
            request.memorial_id.to_string(),
        ),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let response = self
            .client
            .post(self.sessions_url())
            .bearer_auth(&self.config.secret_key)
            .form(&checkout_form(request))
            .send()
            .await?;

        let session: CheckoutSession = parse_response(PROVIDER, response).await?;
        if session.url.is_none() {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: format!("session {} has no checkout url", session.id),
            });
        }
        tracing::info!(
            session_id = %session.id,
            memorial_id = request.memorial_id,
            "Checkout session created"
        );
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, ProviderError> {
        let response = self
            .client
            .get(format!("{}/{session_id}", self.sessions_url()))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;
        parse_response(PROVIDER, response).await
    }
}
