use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;

use storefront_api::app::{build_app, AppServices};
use storefront_catalog::{Catalog, InMemoryCatalog};
use storefront_core::{CustomerId, Money, ProductId};
use storefront_gateways::{
    hosted::sign_payload, HostedConfig, HostedGateway, WalletConfig, WalletGateway,
};
use storefront_infra::{
    InMemoryInvoiceStore, InMemoryLegalStore, InMemoryNotificationStore,
    InMemoryOrderStore,
};
use storefront_orders::{
    Order, OrderItem, PaymentMethod, PricingPolicy, ShippingAddress,
};
use storefront_reconcile::{
    FinalizePolicy, InvoiceStore, LegalStore, NotificationStore, OrderStore,
    ReconciliationEngine,
};

const SIGNING_SECRET: &str = "whsec_blackbox";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let orders: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
        let invoices: Arc<dyn InvoiceStore> = Arc::new(InMemoryInvoiceStore::new());
        let legal: Arc<dyn LegalStore> = Arc::new(InMemoryLegalStore::new());
        let notifications: Arc<dyn NotificationStore> =
            Arc::new(InMemoryNotificationStore::new());

        let engine = ReconciliationEngine::new(
            orders.clone(),
            invoices.clone(),
            legal.clone(),
            notifications.clone(),
            FinalizePolicy {
                billing: Default::default(),
                staff_recipients: vec![],
            },
        );

        let services = Arc::new(AppServices {
            catalog: catalog.clone() as Arc<dyn Catalog>,
            orders,
            invoices,
            legal,
            notifications,
            engine,
            hosted: HostedGateway::new(HostedConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                api_key: "sk_test".to_string(),
                signing_secret: SIGNING_SECRET.to_string(),
                signature_tolerance_secs: 300,
            }),
            wallet: WalletGateway::new(WalletConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            }),
            pricing: PricingPolicy::default(),
            checkout_expiry: chrono::Duration::hours(1),
            checkout_success_url: "http://shop.test/success".to_string(),
            checkout_cancel_url: "http://shop.test/cancel".to_string(),
        });

        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    async fn seed_pending_order(&self, customer_id: CustomerId) -> Order {
        let order = Order::pending(
            customer_id,
            vec![OrderItem {
                product_id: ProductId::new(),
                label: "Widget".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(1500),
            }],
            ShippingAddress {
                recipient: "J. Doe".to_string(),
                line1: "1 Main St".to_string(),
                line2: None,
                city: "Lyon".to_string(),
                postal_code: "69001".to_string(),
                country: "FR".to_string(),
            },
            PaymentMethod::HostedCard,
            Utc::now(),
        )
        .unwrap();
        self.services.orders.insert_pending(&order).await.unwrap();
        order
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn completion_payload(order: &Order, tx: &str) -> String {
    serde_json::json!({
        "event_type": "checkout.session.completed",
        "resource": {
            "transaction_id": tx,
            "metadata": {
                "order_id": order.id.to_string(),
                "client_ip": "203.0.113.9",
                "user_agent": "blackbox-test"
            }
        }
    })
    .to_string()
}

fn signature_for(payload: &str) -> String {
    let t = Utc::now().timestamp();
    format!("t={},v1={}", t, sign_payload(SIGNING_SECRET, t, payload.as_bytes()))
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn identity_header_is_required_for_customer_routes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/orders", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_callback_finalizes_the_order_end_to_end() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let customer = CustomerId::new();
    let order = srv.seed_pending_order(customer).await;

    let payload = completion_payload(&order, "tx_bb_1");
    let res = client
        .post(format!("{}/webhooks/hosted", srv.base_url))
        .header("x-provider-signature", signature_for(&payload))
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["disposition"], "finalized");

    // The owner sees the finalized order.
    let res = client
        .get(format!("{}/orders/{}", srv.base_url, order.id))
        .header("x-customer-id", customer.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "paid");
    assert_eq!(body["provider_tx_id"], "tx_bb_1");

    // Invoice and legal trail were fanned out.
    let res = client
        .get(format!("{}/orders/{}/invoice", srv.base_url, order.id))
        .header("x-customer-id", customer.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let invoice: serde_json::Value = res.json().await.unwrap();
    assert_eq!(invoice["total_excl_tax"], 3000);
    assert_eq!(invoice["total_incl_tax"], 3600);

    let res = client
        .get(format!("{}/orders/{}/legal", srv.base_url, order.id))
        .header("x-customer-id", customer.to_string())
        .send()
        .await
        .unwrap();
    let legal: serde_json::Value = res.json().await.unwrap();
    assert_eq!(legal["all_required_accepted"], true);
    assert_eq!(legal["items"].as_array().unwrap().len(), 2);

    // The buyer got notified and can mark it read.
    let res = client
        .get(format!("{}/notifications", srv.base_url))
        .header("x-customer-id", customer.to_string())
        .send()
        .await
        .unwrap();
    let inbox: serde_json::Value = res.json().await.unwrap();
    let items = inbox["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    let notification_id = items[0]["id"].as_str().unwrap();

    let res = client
        .post(format!(
            "{}/notifications/{}/read",
            srv.base_url, notification_id
        ))
        .header("x-customer-id", customer.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn tampered_callback_is_rejected_and_mutates_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let customer = CustomerId::new();
    let order = srv.seed_pending_order(customer).await;

    let payload = completion_payload(&order, "tx_bb_2");
    let signature = signature_for(&payload);
    let tampered = payload.replace("tx_bb_2", "tx_evil");

    let res = client
        .post(format!("{}/webhooks/hosted", srv.base_url))
        .header("x-provider-signature", signature)
        .body(tampered)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let stored = srv.services.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, storefront_orders::OrderStatus::Pending);
}

#[tokio::test]
async fn other_customers_cannot_see_the_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let order = srv.seed_pending_order(CustomerId::new()).await;

    let res = client
        .get(format!("{}/orders/{}", srv.base_url, order.id))
        .header("x-customer-id", CustomerId::new().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Staff can.
    let res = client
        .get(format!("{}/orders/{}", srv.base_url, order.id))
        .header("x-customer-id", CustomerId::new().to_string())
        .header("x-staff", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_staff() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/admin/orders/sweep", srv.base_url))
        .header("x-customer-id", CustomerId::new().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/admin/orders/sweep", srv.base_url))
        .header("x-customer-id", CustomerId::new().to_string())
        .header("x-staff", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
