//! Publish payment rules and webhook signature verification.
//!
//! Webhooks carry a `Stripe-Signature` style header:
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`, where each `v1` is
//! HMAC-SHA256 over `"{t}.{raw body}"` keyed with the webhook secret.

use crate::error::CoreError;
use crate::hashing::verify_hmac_sha256_hex;
use crate::status::PaymentStatus;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Maximum age of a webhook timestamp, in seconds.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Smallest charge the processor accepts, in minor units.
pub const MIN_PRICE_CENTS: i64 = 50;

/// Webhook event that completes a checkout.
pub const CHECKOUT_COMPLETED_EVENT: &str = "checkout.session.completed";

/// Webhook event emitted when a checkout session lapses.
pub const CHECKOUT_EXPIRED_EVENT: &str = "checkout.session.expired";

/* --------------------------------------------------------------------------
Price
-------------------------------------------------------------------------- */

/// Validate the configured publish price and currency.
pub fn validate_price(amount_cents: i64, currency: &str) -> Result<(), CoreError> {
    if amount_cents < MIN_PRICE_CENTS {
        return Err(CoreError::Validation(format!(
            "Publish price must be at least {MIN_PRICE_CENTS} cents"
        )));
    }
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(CoreError::Validation(format!(
            "Currency '{currency}' must be a lowercase ISO 4217 code"
        )));
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Session status mapping
-------------------------------------------------------------------------- */

/// Map a checkout session's (`status`, `payment_status`) pair onto our
/// payment status.
pub fn status_from_session(session_status: &str, payment_status: &str) -> PaymentStatus {
    match (session_status, payment_status) {
        (_, "paid") | (_, "no_payment_required") => PaymentStatus::Paid,
        ("expired", _) => PaymentStatus::Expired,
        ("complete", _) => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

impl PaymentStatus {
    /// Whether the payment can still change state.
    pub fn is_open(self) -> bool {
        self == PaymentStatus::Pending
    }
}

/* --------------------------------------------------------------------------
Webhook signatures
-------------------------------------------------------------------------- */

/// Parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSignature {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

/// Parse a `t=...,v1=...` header. Unknown schemes are ignored.
pub fn parse_signature_header(header: &str) -> Result<WebhookSignature, CoreError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    CoreError::Unauthorized("Malformed webhook timestamp".to_string())
                })?);
            }
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }
    let timestamp = timestamp
        .ok_or_else(|| CoreError::Unauthorized("Webhook signature missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(CoreError::Unauthorized(
            "Webhook signature missing v1 entry".to_string(),
        ));
    }
    Ok(WebhookSignature {
        timestamp,
        signatures,
    })
}

/// Verify a webhook body against its signature header.
///
/// `now` is Unix seconds. The timestamp must be within
/// [`WEBHOOK_TOLERANCE_SECS`] of `now` in either direction.
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: i64,
) -> Result<(), CoreError> {
    let parsed = parse_signature_header(header)?;
    if (now - parsed.timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(CoreError::Unauthorized(
            "Webhook timestamp outside tolerance".to_string(),
        ));
    }
    let mut signed = format!("{}.", parsed.timestamp).into_bytes();
    signed.extend_from_slice(body);
    let valid = parsed
        .signatures
        .iter()
        .any(|sig| verify_hmac_sha256_hex(secret, &signed, sig));
    if valid {
        Ok(())
    } else {
        Err(CoreError::Unauthorized(
            "Webhook signature mismatch".to_string(),
        ))
    }
}

/// Build a signature header for `body`. Used by tests and local tooling.
pub fn sign_webhook(secret: &str, body: &[u8], timestamp: i64) -> String {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(body);
    format!(
        "t={timestamp},v1={}",
        crate::hashing::hmac_sha256_hex(secret, &signed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"type":"checkout.session.completed"}"#;

    #[test]
    fn price_validation() {
        assert!(validate_price(4999, "usd").is_ok());
        assert!(validate_price(10, "usd").is_err());
        assert!(validate_price(4999, "USD").is_err());
        assert!(validate_price(4999, "dollars").is_err());
    }

    #[test]
    fn session_status_mapping() {
        assert_eq!(status_from_session("complete", "paid"), PaymentStatus::Paid);
        assert_eq!(status_from_session("open", "unpaid"), PaymentStatus::Pending);
        assert_eq!(status_from_session("expired", "unpaid"), PaymentStatus::Expired);
        assert_eq!(status_from_session("complete", "unpaid"), PaymentStatus::Failed);
    }

    #[test]
    fn parses_header_with_multiple_signatures() {
        let parsed = parse_signature_header("t=100,v1=aa,v0=zz,v1=bb").unwrap();
        assert_eq!(parsed.timestamp, 100);
        assert_eq!(parsed.signatures, vec!["aa".to_string(), "bb".to_string()]);
    }

    #[test]
    fn header_without_timestamp_is_rejected() {
        assert_matches!(
            parse_signature_header("v1=aa"),
            Err(CoreError::Unauthorized(_))
        );
        assert_matches!(parse_signature_header("t=1"), Err(CoreError::Unauthorized(_)));
        assert_matches!(parse_signature_header("t=abc,v1=aa"), Err(CoreError::Unauthorized(_)));
    }

    #[test]
    fn signed_body_verifies() {
        let header = sign_webhook(SECRET, BODY, 1_000);
        assert!(verify_webhook_signature(SECRET, &header, BODY, 1_010).is_ok());
    }

    #[test]
    fn tampered_body_or_wrong_secret_fails() {
        let header = sign_webhook(SECRET, BODY, 1_000);
        assert!(verify_webhook_signature(SECRET, &header, b"{}", 1_000).is_err());
        assert!(verify_webhook_signature("other", &header, BODY, 1_000).is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let header = sign_webhook(SECRET, BODY, 1_000);
        let err = verify_webhook_signature(SECRET, &header, BODY, 1_000 + 301).unwrap_err();
        assert_matches!(err, CoreError::Unauthorized(msg) if msg.contains("tolerance"));
    }
}
