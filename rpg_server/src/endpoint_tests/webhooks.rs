use actix_web::{web, web::ServiceConfig};
use rpg_engine::{
    db_types::{meta_keys, OrderId, OrderStatusType},
    events::EventType,
    settlement::SettleConfig,
    traits::OrderStore,
    MemoryStore,
    Reconciler,
};

use super::{helpers::*, mocks::MockProcessor};
use crate::routes::WebhookRoute;

fn configure_app(store: MemoryStore, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let reconciler = Reconciler::new(store, processor, SettleConfig::default());
        cfg.app_data(web::Data::new(reconciler)).service(WebhookRoute::<MemoryStore, MockProcessor>::new());
    }
}

#[actix_web::test]
async fn authorized_event_updates_the_order() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(42, OrderStatusType::Pending, vec![physical_item(10_000, 1)])]).await;
    let event = signed_event(EventType::InvoiceAuthorized, "order-42", "tx_1");
    let body = serde_json::to_value(&event).unwrap();

    let func = configure_app(store.clone(), MockProcessor::with_webhook_secret());
    let (status, res) = post_request("/webhook", body, func).await;
    assert!(status.is_success(), "was: {res}");

    let updated = store.fetch_order(OrderId(42)).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::Authorized);
    assert_eq!(updated.transaction_id.as_deref(), Some("tx_1"));
    assert_eq!(store.stock_reductions(OrderId(42)).await, 1);
    assert_eq!(updated.meta.get(meta_keys::CHARGE_STATE).map(String::as_str), Some("authorized"));
}

#[actix_web::test]
async fn duplicate_deliveries_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(43, OrderStatusType::Pending, vec![physical_item(5_000, 2)])]).await;
    let event = signed_event(EventType::InvoiceAuthorized, "order-43", "tx_2");
    let body = serde_json::to_value(&event).unwrap();

    let func = configure_app(store.clone(), MockProcessor::with_webhook_secret());
    let (status, _) = post_request("/webhook", body.clone(), func).await;
    assert!(status.is_success());

    let func = configure_app(store.clone(), MockProcessor::with_webhook_secret());
    let (status, res) = post_request("/webhook", body, func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains("AlreadyApplied"), "was: {res}");
    // Stock must not be reduced twice.
    assert_eq!(store.stock_reductions(OrderId(43)).await, 1);
}

#[actix_web::test]
async fn tampered_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(44, OrderStatusType::Pending, vec![physical_item(5_000, 1)])]).await;
    let mut event = signed_event(EventType::InvoiceSettled, "order-44", "tx_3");
    event.signature = "0000000000000000000000000000000000000000000000000000000000000000".to_string();
    let body = serde_json::to_value(&event).unwrap();

    let func = configure_app(store.clone(), MockProcessor::with_webhook_secret());
    let (status, res) = post_request("/webhook", body, func).await;
    assert_eq!(status.as_u16(), 400);
    assert!(res.contains("signature"), "was: {res}");
    // The event must not have been applied.
    let untouched = store.fetch_order(OrderId(44)).await.unwrap();
    assert_eq!(untouched.status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn unknown_event_types_are_rejected() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![]).await;
    let event = signed_event(EventType::Other("invoice_reactivate".to_string()), "order-45", "tx_4");
    let body = serde_json::to_value(&event).unwrap();

    let func = configure_app(store, MockProcessor::with_webhook_secret());
    let (status, res) = post_request("/webhook", body, func).await;
    assert_eq!(status.as_u16(), 400);
    assert!(res.contains("invoice_reactivate"), "was: {res}");
}
