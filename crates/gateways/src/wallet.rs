//! Wallet adapter (two-phase approval provider).
//!
//! Flow: create an intent (returns an approval URL), the customer approves at
//! the provider, then the client triggers an explicit capture. Intent
//! creation never touches the ledger; a completed capture is what the
//! reconciliation engine turns into a Paid order.

use serde::{Deserialize, Serialize};

use storefront_core::{Money, ProductId};
use storefront_orders::{OrderItem, ShippingAddress};

use crate::error::GatewayError;

/// Wallet provider configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Result of intent creation: where to send the customer for approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentHandle {
    pub intent_id: String,
    pub approval_url: String,
}

/// Result of a successful capture call.
///
/// Carries the priced items and shipping destination echoed from intent
/// creation, since no pending order exists on this path to read them from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub provider_tx_id: String,
    pub amount: Money,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<ShippingAddress>,
}

/// Adapter for the two-phase wallet provider.
pub struct WalletGateway {
    http: reqwest::Client,
    config: WalletConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireItem {
    product_id: ProductId,
    label: String,
    quantity: u32,
    unit_price: i64,
}

#[derive(Debug, Serialize)]
struct CreateIntentRequest<'a> {
    amount: i64,
    items: Vec<WireItem>,
    shipping: &'a ShippingAddress,
}

#[derive(Debug, Deserialize)]
struct Link {
    rel: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct CreateIntentResponse {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    status: String,
    #[serde(default)]
    purchase: Option<CapturePurchase>,
}

#[derive(Debug, Deserialize)]
struct CapturePurchase {
    transaction_id: String,
    amount: i64,
    #[serde(default)]
    items: Vec<WireItem>,
    #[serde(default)]
    shipping: Option<ShippingAddress>,
}

impl WalletGateway {
    pub fn new(config: WalletConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Create a payment intent for server-priced items.
    ///
    /// No ledger write happens here; the intent holds no ledger-visible
    /// state until capture succeeds.
    pub async fn create_intent(
        &self,
        items: &[OrderItem],
        shipping: &ShippingAddress,
        total: Money,
    ) -> Result<IntentHandle, GatewayError> {
        let body = CreateIntentRequest {
            amount: total.cents(),
            items: items.iter().map(wire_item).collect(),
            shipping,
        };

        let response = self
            .http
            .post(format!("{}/v2/intents", self.config.base_url))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
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

        let intent: CreateIntentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::decode(format!("intent response: {e}")))?;

        let approval_url = approval_link(&intent.links)
            .ok_or_else(|| GatewayError::decode("intent response without approval link"))?;

        Ok(IntentHandle {
            intent_id: intent.id,
            approval_url,
        })
    }

    /// Capture a previously approved intent.
    ///
    /// A non-`COMPLETED` provider status is a terminal business decline
    /// (`GatewayError::Capture`), distinct from transport failures which the
    /// client may retry.
    pub async fn capture(&self, intent_id: &str) -> Result<CaptureResult, GatewayError> {
        let response = self
            .http
            .post(format!(
                "{}/v2/intents/{}/capture",
                self.config.base_url, intent_id
            ))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        parse_capture_response(&body)
    }
}

fn wire_item(item: &OrderItem) -> WireItem {
    WireItem {
        product_id: item.product_id,
        label: item.label.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price.cents(),
    }
}

fn order_item(item: WireItem) -> OrderItem {
    OrderItem {
        product_id: item.product_id,
        label: item.label,
        quantity: item.quantity,
        unit_price: Money::from_cents(item.unit_price),
    }
}

/// Extract the customer-approval link from the provider's link relations.
fn approval_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel == "approve")
        .map(|l| l.href.clone())
}

/// Parse a capture response body into a [`CaptureResult`].
///
/// Kept pure for testability; the status gate lives here so every caller
/// gets the decline-vs-transport distinction.
pub fn parse_capture_response(body: &[u8]) -> Result<CaptureResult, GatewayError> {
    let response: CaptureResponse = serde_json::from_slice(body)
        .map_err(|e| GatewayError::decode(format!("capture response: {e}")))?;

    if response.status != "COMPLETED" {
        return Err(GatewayError::Capture {
            status: response.status,
        });
    }

    let purchase = response
        .purchase
        .ok_or_else(|| GatewayError::decode("completed capture without purchase details"))?;

    Ok(CaptureResult {
        provider_tx_id: purchase.transaction_id,
        amount: Money::from_cents(purchase.amount),
        items: purchase.items.into_iter().map(order_item).collect(),
        shipping_address: purchase.shipping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_body() -> Vec<u8> {
        serde_json::json!({
            "status": "COMPLETED",
            "purchase": {
                "transaction_id": "wtx_1",
                "amount": 2000,
                "items": [
                    {
                        "product_id": ProductId::new(),
                        "label": "Widget",
                        "quantity": 2,
                        "unit_price": 1000
                    }
                ],
                "shipping": {
                    "recipient": "J. Doe",
                    "line1": "1 Main St",
                    "city": "Lyon",
                    "postal_code": "69001",
                    "country": "FR"
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn completed_capture_parses() {
        let result = parse_capture_response(&completed_body()).unwrap();
        assert_eq!(result.provider_tx_id, "wtx_1");
        assert_eq!(result.amount, Money::from_cents(2000));
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].quantity, 2);
        assert!(result.shipping_address.is_some());
    }

    #[test]
    fn declined_capture_is_a_capture_error() {
        let body = serde_json::json!({ "status": "DECLINED" }).to_string();
        let err = parse_capture_response(body.as_bytes()).unwrap_err();
        match err {
            GatewayError::Capture { status } => assert_eq!(status, "DECLINED"),
            other => panic!("expected Capture, got {other:?}"),
        }
    }

    #[test]
    fn completed_without_purchase_is_undecodable() {
        let body = serde_json::json!({ "status": "COMPLETED" }).to_string();
        let err = parse_capture_response(body.as_bytes()).unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn garbage_body_is_undecodable() {
        let err = parse_capture_response(b"not json").unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn approval_link_found_among_relations() {
        let links = vec![
            Link {
                rel: "self".to_string(),
                href: "https://wallet.test/v2/intents/1".to_string(),
            },
            Link {
                rel: "approve".to_string(),
                href: "https://wallet.test/approve/1".to_string(),
            },
        ];
        assert_eq!(
            approval_link(&links).as_deref(),
            Some("https://wallet.test/approve/1")
        );
        assert!(approval_link(&links[..1]).is_none());
    }
}
