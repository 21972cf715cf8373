use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::Utc;
use log::debug;
use reepay_api::{ChargeResponse, ChargeState, Invoice};
use rpg_common::MinorUnits;
use rpg_engine::{
    db_types::{Address, LineItem, Order, OrderId, OrderStatusType},
    events::{EventType, WebhookEvent},
    helpers::calculate_signature,
    MemoryStore,
};

// Shared secret served by `MockProcessor::with_webhook_secret`. DO NOT re-use this secret anywhere.
pub const WEBHOOK_SECRET: &str = "whsec_test_1234";

pub fn physical_item(price: i64, quantity: i64) -> LineItem {
    LineItem {
        product_id: 10,
        name: "Boxed widget".to_string(),
        quantity,
        unit_price: MinorUnits::from(price),
        is_virtual: false,
        is_downloadable: false,
        is_recurring: false,
    }
}

pub fn order(id: i64, status: OrderStatusType, items: Vec<LineItem>) -> Order {
    let total = items.iter().map(|i| i.total()).sum();
    Order {
        id: OrderId(id),
        user_id: Some(501),
        currency: "DKK".to_string(),
        total,
        status,
        transaction_id: None,
        billing: Address {
            first_name: "Asta".to_string(),
            last_name: "Nielsen".to_string(),
            address_1: "Strandvejen 100".to_string(),
            city: "Aarhus".to_string(),
            postcode: "8000".to_string(),
            country: "DK".to_string(),
            email: "asta@example.com".to_string(),
            ..Default::default()
        },
        shipping: Address::default(),
        needs_shipping: false,
        items,
        meta: Default::default(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub async fn seeded_store(orders: Vec<Order>) -> MemoryStore {
    let store = MemoryStore::new();
    for order in orders {
        store.insert_order(order).await;
    }
    store
}

/// A correctly signed webhook event for the given invoice handle.
pub fn signed_event(event_type: EventType, invoice: &str, transaction: &str) -> WebhookEvent {
    let id = format!("ev_{invoice}_{transaction}");
    let timestamp = "2024-05-01T12:00:00.000+00:00".to_string();
    let signature = calculate_signature(WEBHOOK_SECRET, &timestamp, &id).unwrap();
    WebhookEvent {
        event_type,
        id,
        timestamp,
        signature,
        invoice: Some(invoice.to_string()),
        transaction: Some(transaction.to_string()),
        customer: None,
        payment_method: None,
    }
}

pub fn charge_response(state: ChargeState, transaction: &str) -> ChargeResponse {
    ChargeResponse { state, transaction: Some(transaction.to_string()), handle: None }
}

pub fn invoice(handle: &str, state: ChargeState, authorized: i64, settled: i64, refunded: i64) -> Invoice {
    Invoice {
        handle: handle.to_string(),
        state,
        transaction: Some("tx_1".to_string()),
        authorized_amount: MinorUnits::from(authorized),
        settled_amount: MinorUnits::from(settled),
        refunded_amount: MinorUnits::from(refunded),
        credit_notes: vec![],
        created: None,
    }
}

pub async fn post_request(
    path: &str,
    body: serde_json::Value,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = TestRequest::post().uri(path).set_json(body).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request to {path}");
    let (_, res) = test::call_service(&service, req).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub async fn get_request(path: &str, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request to {path}");
    let (_, res) = test::call_service(&service, req).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
