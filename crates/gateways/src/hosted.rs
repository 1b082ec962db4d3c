//! Hosted-checkout adapter (synchronous capture provider).
//!
//! The client is redirected to a provider-hosted session; completion is
//! reported later via a signed server-to-server callback. The redirect back
//! to the site carries no authoritative state.
//!
//! Callback authenticity is mandatory: every payload is verified against the
//! pre-shared signing secret before decoding. The signature header has the
//! form `t=<unix-seconds>,v1=<hex(hmac_sha256(secret, "{t}.{body}"))>` and is
//! rejected when malformed, mismatched, or older than the configured
//! tolerance.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use storefront_core::OrderId;
use storefront_orders::Order;

use crate::error::GatewayError;
use crate::events::{CallbackEvent, CheckoutContext};

type HmacSha256 = Hmac<Sha256>;

/// Hosted provider configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    pub base_url: String,
    pub api_key: String,
    /// Pre-shared callback signing secret.
    pub signing_secret: String,
    /// Maximum accepted callback signature age, in seconds.
    pub signature_tolerance_secs: i64,
}

/// Handle of a provider-hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// Adapter for the hosted-session provider.
pub struct HostedGateway {
    http: reqwest::Client,
    config: HostedConfig,
}

#[derive(Debug, Serialize)]
struct SessionLineItem<'a> {
    name: &'a str,
    quantity: u32,
    unit_amount: i64,
}

#[derive(Debug, Serialize)]
struct SessionMetadata<'a> {
    order_id: String,
    total: i64,
    client_ip: &'a str,
    user_agent: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    line_items: Vec<SessionLineItem<'a>>,
    metadata: SessionMetadata<'a>,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
    url: String,
}

impl HostedGateway {
    pub fn new(config: HostedConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Register a hosted checkout session for a pending order.
    ///
    /// The correlation metadata carries the order id, the server-side total
    /// and the customer's IP/user-agent; the provider echoes it back in the
    /// completion callback. No local state changes beyond the returned
    /// session handle.
    pub async fn create_session(
        &self,
        order: &Order,
        context: &CheckoutContext,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        let body = CreateSessionRequest {
            line_items: order
                .items
                .iter()
                .map(|item| SessionLineItem {
                    name: &item.label,
                    quantity: item.quantity,
                    unit_amount: item.unit_price.cents(),
                })
                .collect(),
            metadata: SessionMetadata {
                order_id: order.id.to_string(),
                total: order.total_amount.cents(),
                client_ip: &context.client_ip,
                user_agent: &context.user_agent,
            },
            success_url,
            cancel_url,
        };

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::decode(format!("session response: {e}")))?;

        Ok(CheckoutSession {
            session_id: session.id,
            redirect_url: session.url,
        })
    }

    /// Verify and decode a provider callback.
    ///
    /// Signature failure is fatal for this single delivery (the provider gets
    /// a 4xx and stops retrying a payload we cannot trust); decoding happens
    /// only after verification.
    pub fn handle_callback(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<CallbackEvent, GatewayError> {
        verify_signature(
            &self.config.signing_secret,
            payload,
            signature_header,
            now,
            self.config.signature_tolerance_secs,
        )?;
        decode_callback(payload)
    }
}

/// Compute the `v1` signature for a payload (used by tests and tooling).
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a `t=...,v1=...` signature header against the payload.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> Result<(), GatewayError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<Vec<u8>> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse()
                        .map_err(|_| GatewayError::signature("malformed timestamp"))?,
                );
            }
            Some(("v1", value)) => {
                signature = Some(
                    hex::decode(value)
                        .map_err(|_| GatewayError::signature("malformed signature"))?,
                );
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| GatewayError::signature("missing timestamp"))?;
    let signature = signature.ok_or_else(|| GatewayError::signature("missing signature"))?;

    let age = now.timestamp() - timestamp;
    if age.abs() > tolerance_secs {
        return Err(GatewayError::signature("timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Constant-time comparison.
    mac.verify_slice(&signature)
        .map_err(|_| GatewayError::signature("signature mismatch"))
}

#[derive(Debug, Deserialize)]
struct CallbackEnvelope {
    event_type: String,
    resource: CallbackResource,
}

#[derive(Debug, Deserialize)]
struct CallbackResource {
    #[serde(default)]
    transaction_id: Option<String>,
    metadata: CallbackMetadata,
}

#[derive(Debug, Deserialize)]
struct CallbackMetadata {
    order_id: String,
    #[serde(default)]
    client_ip: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
}

/// Decode a verified callback payload into a [`CallbackEvent`].
pub fn decode_callback(payload: &[u8]) -> Result<CallbackEvent, GatewayError> {
    let envelope: CallbackEnvelope = serde_json::from_slice(payload)
        .map_err(|e| GatewayError::decode(format!("callback envelope: {e}")))?;

    let order_id: OrderId = envelope
        .resource
        .metadata
        .order_id
        .parse()
        .map_err(|_| GatewayError::decode("callback metadata order_id is not a valid id"))?;

    match envelope.event_type.as_str() {
        "checkout.session.completed" => {
            let provider_tx_id = envelope
                .resource
                .transaction_id
                .ok_or_else(|| GatewayError::decode("completed callback without transaction_id"))?;
            Ok(CallbackEvent::SessionCompleted {
                order_id,
                provider_tx_id,
                context: CheckoutContext {
                    client_ip: envelope.resource.metadata.client_ip.unwrap_or_default(),
                    user_agent: envelope.resource.metadata.user_agent.unwrap_or_default(),
                },
            })
        }
        "checkout.session.expired" => Ok(CallbackEvent::SessionExpired { order_id }),
        other => Ok(CallbackEvent::Ignored {
            event_type: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn completed_payload(order_id: OrderId) -> Vec<u8> {
        serde_json::json!({
            "event_type": "checkout.session.completed",
            "resource": {
                "session_id": "cs_1",
                "transaction_id": "tx_abc",
                "metadata": {
                    "order_id": order_id.to_string(),
                    "total": 2000,
                    "client_ip": "203.0.113.9",
                    "user_agent": "test-agent"
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn header_for(payload: &[u8], secret: &str, now: DateTime<Utc>) -> String {
        let t = now.timestamp();
        format!("t={},v1={}", t, sign_payload(secret, t, payload))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let now = Utc::now();
        let payload = b"{}";
        let header = header_for(payload, SECRET, now);
        verify_signature(SECRET, payload, &header, now, 300).unwrap();
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let payload = b"{}";
        let header = header_for(payload, "wrong_secret", now);
        let err = verify_signature(SECRET, payload, &header, now, 300).unwrap_err();
        assert!(matches!(err, GatewayError::Signature(_)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let now = Utc::now();
        let header = header_for(b"{\"a\":1}", SECRET, now);
        let err = verify_signature(SECRET, b"{\"a\":2}", &header, now, 300).unwrap_err();
        assert!(matches!(err, GatewayError::Signature(_)));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let now = Utc::now();
        let old = now - chrono::Duration::seconds(400);
        let payload = b"{}";
        let header = header_for(payload, SECRET, old);
        let err = verify_signature(SECRET, payload, &header, now, 300).unwrap_err();
        assert!(matches!(err, GatewayError::Signature(_)));
    }

    #[test]
    fn missing_parts_are_rejected() {
        let now = Utc::now();
        for header in ["", "t=1234567890", "v1=deadbeef", "garbage"] {
            let err = verify_signature(SECRET, b"{}", header, now, 300).unwrap_err();
            assert!(matches!(err, GatewayError::Signature(_)), "header {header:?}");
        }
    }

    #[test]
    fn completed_callback_decodes_with_context() {
        let order_id = OrderId::new();
        let event = decode_callback(&completed_payload(order_id)).unwrap();
        match event {
            CallbackEvent::SessionCompleted {
                order_id: decoded,
                provider_tx_id,
                context,
            } => {
                assert_eq!(decoded, order_id);
                assert_eq!(provider_tx_id, "tx_abc");
                assert_eq!(context.client_ip, "203.0.113.9");
                assert_eq!(context.user_agent, "test-agent");
            }
            other => panic!("expected SessionCompleted, got {other:?}"),
        }
    }

    #[test]
    fn expired_callback_decodes() {
        let order_id = OrderId::new();
        let payload = serde_json::json!({
            "event_type": "checkout.session.expired",
            "resource": {
                "metadata": { "order_id": order_id.to_string() }
            }
        })
        .to_string();
        let event = decode_callback(payload.as_bytes()).unwrap();
        assert_eq!(event, CallbackEvent::SessionExpired { order_id });
    }

    #[test]
    fn unknown_event_type_is_ignored_not_an_error() {
        let payload = serde_json::json!({
            "event_type": "checkout.session.async_payment_pending",
            "resource": {
                "metadata": { "order_id": OrderId::new().to_string() }
            }
        })
        .to_string();
        let event = decode_callback(payload.as_bytes()).unwrap();
        assert!(matches!(event, CallbackEvent::Ignored { .. }));
    }

    #[test]
    fn completed_without_transaction_id_is_undecodable() {
        let payload = serde_json::json!({
            "event_type": "checkout.session.completed",
            "resource": {
                "metadata": { "order_id": OrderId::new().to_string() }
            }
        })
        .to_string();
        let err = decode_callback(payload.as_bytes()).unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn bad_order_id_is_undecodable() {
        let payload = serde_json::json!({
            "event_type": "checkout.session.completed",
            "resource": {
                "transaction_id": "tx_1",
                "metadata": { "order_id": "nope" }
            }
        })
        .to_string();
        let err = decode_callback(payload.as_bytes()).unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }
}
