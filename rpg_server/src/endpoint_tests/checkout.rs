use actix_web::{web, web::ServiceConfig};
use reepay_api::CheckoutSession;
use rpg_engine::{
    db_types::{meta_keys, OrderId, OrderStatusType},
    settlement::SettleConfig,
    traits::OrderStore,
    CheckoutApi,
    MemoryStore,
    Reconciler,
};
use serde_json::json;

use super::{helpers::*, mocks::MockProcessor};
use crate::routes::{CheckoutRoute, ConfirmRoute};

fn configure_checkout(store: MemoryStore, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = CheckoutApi::new(
            store,
            processor,
            SettleConfig::default(),
            "en_US".to_string(),
            "https://shop.example/thanks".to_string(),
            "https://shop.example/cart".to_string(),
            false,
        );
        cfg.app_data(web::Data::new(api)).service(CheckoutRoute::<MemoryStore, MockProcessor>::new());
    }
}

fn configure_confirm(store: MemoryStore, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let reconciler = Reconciler::new(store, processor, SettleConfig::default());
        cfg.app_data(web::Data::new(reconciler)).service(ConfirmRoute::<MemoryStore, MockProcessor>::new());
    }
}

#[actix_web::test]
async fn checkout_creates_a_hosted_session() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(60, OrderStatusType::Pending, vec![physical_item(10_000, 1)])]).await;
    let mut processor = MockProcessor::new();
    processor.expect_is_test_mode().return_const(true);
    processor
        .expect_create_charge_session()
        .withf(|req| !req.recurring && req.order.handle == "order-60")
        .returning(|_| {
            Ok(CheckoutSession { id: "cs_1".to_string(), url: "https://checkout.example/cs_1".to_string() })
        })
        .times(1);

    let func = configure_checkout(store.clone(), processor);
    let (status, res) = post_request("/checkout", json!({ "order_id": 60 }), func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains("https://checkout.example/cs_1"), "was: {res}");

    // The invoice handle is bound before the customer is redirected.
    let updated = store.fetch_order(OrderId(60)).await.unwrap();
    assert_eq!(updated.meta.get(meta_keys::REEPAY_ORDER).map(String::as_str), Some("order-60"));
}

#[actix_web::test]
async fn payment_method_changes_use_a_card_storing_session() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(61, OrderStatusType::Pending, vec![physical_item(10_000, 1)])]).await;
    let mut processor = MockProcessor::new();
    processor.expect_is_test_mode().return_const(true);
    processor
        .expect_create_recurring_session()
        .returning(|_| {
            Ok(CheckoutSession { id: "cs_2".to_string(), url: "https://checkout.example/cs_2".to_string() })
        })
        .times(1);

    let func = configure_checkout(store, processor);
    let (status, res) =
        post_request("/checkout", json!({ "order_id": 61, "change_payment_method": true }), func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains("cs_2"), "was: {res}");
}

#[actix_web::test]
async fn checkout_for_an_unknown_order_fails() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![]).await;
    let processor = MockProcessor::new();

    let func = configure_checkout(store, processor);
    let (status, res) = post_request("/checkout", json!({ "order_id": 999 }), func).await;
    assert!(status.is_server_error(), "was: {res}");
}

#[actix_web::test]
async fn confirm_reports_the_order_status() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(62, OrderStatusType::Authorized, vec![physical_item(10_000, 1)])]).await;
    let processor = MockProcessor::new();

    let func = configure_confirm(store.clone(), processor);
    let (status, res) = get_request("/confirm/62", func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains("Authorized"), "was: {res}");

    let updated = store.fetch_order(OrderId(62)).await.unwrap();
    assert_eq!(updated.meta.get(meta_keys::PAYMENT_CONFIRMED).map(String::as_str), Some("1"));
}
