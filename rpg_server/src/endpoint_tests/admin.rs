use actix_web::{web, web::ServiceConfig};
use reepay_api::ChargeState;
use rpg_common::MinorUnits;
use rpg_engine::{
    db_types::{meta_keys, OrderId, OrderStatusType},
    traits::OrderStore,
    AdminApi,
    MemoryStore,
};
use serde_json::json;

use super::{helpers::*, mocks::MockProcessor};
use crate::routes::{CancelRoute, CapturePartlyRoute, CaptureRoute, RefundPartlyRoute, RefundRoute};

fn configure_app(store: MemoryStore, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = AdminApi::new(store, processor);
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/api")
                .service(CaptureRoute::<MemoryStore, MockProcessor>::new())
                .service(CapturePartlyRoute::<MemoryStore, MockProcessor>::new())
                .service(CancelRoute::<MemoryStore, MockProcessor>::new())
                .service(RefundRoute::<MemoryStore, MockProcessor>::new())
                .service(RefundPartlyRoute::<MemoryStore, MockProcessor>::new()),
        );
    }
}

async fn authorized_order(id: i64) -> MemoryStore {
    seeded_store(vec![order(id, OrderStatusType::Authorized, vec![physical_item(10_000, 1)])]).await
}

#[actix_web::test]
async fn capture_settles_the_outstanding_amount() {
    let _ = env_logger::try_init().ok();
    let store = authorized_order(50).await;
    let mut processor = MockProcessor::new();
    processor.expect_fetch_invoice().returning(|handle| Ok(invoice(handle, ChargeState::Authorized, 10_000, 0, 0)));
    processor
        .expect_settle()
        .withf(|handle, amount| handle == "order-50" && *amount == MinorUnits::from(10_000))
        .returning(|_, _| Ok(charge_response(ChargeState::Settled, "tx_cap")))
        .times(1);

    let func = configure_app(store.clone(), processor);
    let (status, res) = post_request("/api/capture", json!({ "order_id": 50 }), func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains(r#""success":true"#), "was: {res}");

    let updated = store.fetch_order(OrderId(50)).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::Settled);
    assert_eq!(updated.meta.get(meta_keys::CAPTURE_TRANSACTION).map(String::as_str), Some("tx_cap"));
}

#[actix_web::test]
async fn partial_capture_parses_free_text_amounts() {
    let _ = env_logger::try_init().ok();
    let store = authorized_order(51).await;
    let mut processor = MockProcessor::new();
    processor.expect_fetch_invoice().returning(|handle| Ok(invoice(handle, ChargeState::Authorized, 10_000, 0, 0)));
    processor
        .expect_settle()
        .withf(|_, amount| *amount == MinorUnits::from(5000))
        .returning(|_, _| Ok(charge_response(ChargeState::Authorized, "tx_part")))
        .times(1);

    let func = configure_app(store.clone(), processor);
    let (status, res) =
        post_request("/api/capture_partly", json!({ "order_id": 51, "amount": "50.00" }), func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains(r#""success":true"#), "was: {res}");

    // Only half the total is settled, so the order is not marked settled yet.
    let updated = store.fetch_order(OrderId(51)).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::Authorized);
    let notes = store.notes(OrderId(51)).await;
    assert!(notes.iter().any(|n| n.contains("partly settled")), "notes were: {notes:?}");
}

#[actix_web::test]
async fn unparseable_amounts_are_rejected() {
    let _ = env_logger::try_init().ok();
    let store = authorized_order(52).await;
    let processor = MockProcessor::new();

    let func = configure_app(store.clone(), processor);
    let (status, res) =
        post_request("/api/capture_partly", json!({ "order_id": 52, "amount": "fifty" }), func).await;
    assert_eq!(status.as_u16(), 400);
    assert!(res.contains("not a valid amount"), "was: {res}");
    let untouched = store.fetch_order(OrderId(52)).await.unwrap();
    assert_eq!(untouched.status, OrderStatusType::Authorized);
}

#[actix_web::test]
async fn cancel_blocks_further_processor_calls() {
    let _ = env_logger::try_init().ok();
    let store = authorized_order(53).await;
    let mut processor = MockProcessor::new();
    processor.expect_fetch_invoice().returning(|handle| Ok(invoice(handle, ChargeState::Authorized, 10_000, 0, 0)));
    processor
        .expect_cancel()
        .returning(|_| Ok(charge_response(ChargeState::Cancelled, "tx_cxl")))
        .times(1);

    let func = configure_app(store.clone(), processor);
    let (status, res) = post_request("/api/cancel", json!({ "order_id": 53 }), func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains(r#""success":true"#), "was: {res}");

    let updated = store.fetch_order(OrderId(53)).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::Cancelled);
    assert!(updated.is_cancelled_locally());

    // A second capture attempt must fail without touching the processor again.
    let processor = MockProcessor::new();
    let func = configure_app(store.clone(), processor);
    let (status, res) = post_request("/api/capture", json!({ "order_id": 53 }), func).await;
    assert!(status.is_success());
    assert!(res.contains(r#""success":false"#), "was: {res}");
}

#[actix_web::test]
async fn full_refund_takes_the_refundable_remainder() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(54, OrderStatusType::Settled, vec![physical_item(10_000, 1)])]).await;
    let mut processor = MockProcessor::new();
    processor.expect_fetch_invoice().returning(|handle| Ok(invoice(handle, ChargeState::Settled, 10_000, 10_000, 0)));
    processor
        .expect_refund()
        .withf(|handle, amount| handle == "order-54" && *amount == MinorUnits::from(10_000))
        .returning(|_, _| Ok(charge_response(ChargeState::Settled, "tx_ref")))
        .times(1);

    let func = configure_app(store.clone(), processor);
    let (status, res) = post_request("/api/refund", json!({ "order_id": 54 }), func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains(r#""success":true"#), "was: {res}");

    let updated = store.fetch_order(OrderId(54)).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::RefundedFull);
    // The refund record itself arrives with the invoice_refund webhook.
    assert!(store.refunds(OrderId(54)).await.is_empty());
}

#[actix_web::test]
async fn partial_refund_parses_free_text_amounts() {
    let _ = env_logger::try_init().ok();
    let store = seeded_store(vec![order(55, OrderStatusType::Settled, vec![physical_item(10_000, 1)])]).await;
    let mut processor = MockProcessor::new();
    processor.expect_fetch_invoice().returning(|handle| Ok(invoice(handle, ChargeState::Settled, 10_000, 10_000, 0)));
    processor
        .expect_refund()
        .withf(|_, amount| *amount == MinorUnits::from(2500))
        .returning(|_, _| Ok(charge_response(ChargeState::Settled, "tx_ref2")))
        .times(1);

    let func = configure_app(store.clone(), processor);
    let (status, res) = post_request("/api/refund_partly", json!({ "order_id": 55, "amount": "25.00" }), func).await;
    assert!(status.is_success(), "was: {res}");
    assert!(res.contains(r#""success":true"#), "was: {res}");

    let updated = store.fetch_order(OrderId(55)).await.unwrap();
    assert_eq!(updated.status, OrderStatusType::RefundedPartial);
}
