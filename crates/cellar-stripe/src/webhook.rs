//! # Stripe Webhook Verification
//!
//! Checks the `Stripe-Signature` header and decodes the event body.

use crate::config::StripeConfig;
use cellar_core::{ShopError, ShopResult, WebhookEvent};
use chrono::Utc;
use tracing::{debug, warn};

/// Accepted clock skew between Stripe's timestamp and ours
const TOLERANCE_SECS: i64 = 300;

/// Events to enable on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "source.chargeable",
    "source.failed",
    "source.canceled",
];

/// How inbound webhooks are authenticated
#[derive(Clone)]
pub enum WebhookVerifier {
    /// HMAC-SHA256 signature check with the endpoint's signing secret
    Signed { secret: String },
    /// No verification; only built when explicitly allowed
    Unsigned,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookVerifier::Signed { .. } => f.write_str("Signed"),
            WebhookVerifier::Unsigned => f.write_str("Unsigned"),
        }
    }
}

impl WebhookVerifier {
    /// Build from config.
    ///
    /// Without a signing secret this fails unless unsigned webhooks were
    /// allowed explicitly.
    pub fn from_config(config: &StripeConfig) -> ShopResult<Self> {
        match (&config.webhook_secret, config.allow_unsigned_webhooks) {
            (Some(secret), _) => Ok(WebhookVerifier::Signed {
                secret: secret.clone(),
            }),
            (None, true) => {
                warn!("Webhook signatures are NOT verified (WEBHOOK_ALLOW_UNSIGNED=true)");
                Ok(WebhookVerifier::Unsigned)
            }
            (None, false) => Err(ShopError::Configuration(
                "STRIPE_SHOPPING_CART_WEBHOOK_SECRET not set; set WEBHOOK_ALLOW_UNSIGNED=true to accept unsigned webhooks".to_string(),
            )),
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, WebhookVerifier::Signed { .. })
    }

    /// Verify the signature (when signed) and decode the event
    pub fn verify(&self, payload: &[u8], signature: Option<&str>) -> ShopResult<WebhookEvent> {
        self.verify_at(payload, signature, Utc::now().timestamp())
    }

    fn verify_at(&self, payload: &[u8], signature: Option<&str>, now: i64) -> ShopResult<WebhookEvent> {
        if let WebhookVerifier::Signed { secret } = self {
            let signature = signature.ok_or_else(|| {
                ShopError::WebhookVerification("Missing Stripe-Signature header".to_string())
            })?;
            check_signature(secret, payload, signature, now)?;
        }

        let event = WebhookEvent::from_slice(payload)?;
        debug!("Accepted webhook: id={}, type={}", event.id, event.event_type);
        Ok(event)
    }
}

fn check_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> ShopResult<()> {
    let parts = parse_signature_header(header)?;

    if now.abs_diff(parts.timestamp) > TOLERANCE_SECS.unsigned_abs() {
        return Err(ShopError::WebhookVerification(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_signature(secret, parts.timestamp, payload);
    let valid = parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected));

    if !valid {
        return Err(ShopError::WebhookVerification(
            "Signature mismatch".to_string(),
        ));
    }
    Ok(())
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::WebhookVerification("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(ShopError::WebhookVerification(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`
fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    // HMAC accepts keys of any length, so this never fails
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// `Stripe-Signature` header value for a payload (tests and local tooling)
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={},v1={}", timestamp, compute_signature(secret, timestamp, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::EventObject;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    fn payload() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "source.chargeable",
            "created": NOW,
            "data": {"object": {
                "id": "src_1",
                "object": "source",
                "status": "chargeable",
                "metadata": {"paymentIntent": "pi_1"}
            }}
        }))
        .unwrap()
    }

    fn signed() -> WebhookVerifier {
        WebhookVerifier::Signed {
            secret: SECRET.to_string(),
        }
    }

    #[test]
    fn test_parse_signature_header() {
        let parsed = parse_signature_header("t=1234567890,v1=abc123,v0=old,v1=def456").unwrap();
        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures, vec!["abc123", "def456"]);

        assert!(parse_signature_header("v1=abc").is_err());
        assert!(parse_signature_header("t=123").is_err());
    }

    #[test]
    fn test_valid_signature() {
        let body = payload();
        let header = sign_payload(SECRET, NOW - 10, &body);

        let event = signed().verify_at(&body, Some(&header), NOW).unwrap();
        assert_eq!(event.id, "evt_1");
        assert!(matches!(event.object, EventObject::Source(_)));
    }

    #[test]
    fn test_rejections() {
        let body = payload();
        let verifier = signed();

        let wrong_secret = sign_payload("whsec_other", NOW, &body);
        let stale = sign_payload(SECRET, NOW - TOLERANCE_SECS - 1, &body);
        let mut tampered = body.clone();
        tampered.extend_from_slice(b" ");
        let good = sign_payload(SECRET, NOW, &body);

        for (payload, header) in [
            (&body, Some(wrong_secret.as_str())),
            (&body, Some(stale.as_str())),
            (&tampered, Some(good.as_str())),
            (&body, None),
        ] {
            let err = verifier.verify_at(payload, header, NOW).unwrap_err();
            assert!(matches!(err, ShopError::WebhookVerification(_)), "{:?}", err);
            assert_eq!(err.status_code(), 401);
        }
    }

    #[test]
    fn test_extreme_timestamps_are_rejected() {
        let verifier = signed();
        for ts in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1=00", ts);
            let err = verifier.verify_at(b"{}", Some(&header), NOW).unwrap_err();
            assert!(matches!(err, ShopError::WebhookVerification(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_unsigned_mode_skips_signature() {
        let event = WebhookVerifier::Unsigned.verify(&payload(), None).unwrap();
        assert_eq!(event.event_type, "source.chargeable");

        let err = WebhookVerifier::Unsigned.verify(b"{}", None).unwrap_err();
        assert!(matches!(err, ShopError::WebhookParse(_)));
    }

    #[test]
    fn test_from_config() {
        let base = StripeConfig::new("sk_test_abc");
        assert!(WebhookVerifier::from_config(&base).is_err());
        assert!(!WebhookVerifier::from_config(&base.clone().allow_unsigned_webhooks())
            .unwrap()
            .is_signed());
        assert!(WebhookVerifier::from_config(&base.with_webhook_secret(SECRET))
            .unwrap()
            .is_signed());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
