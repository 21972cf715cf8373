//! The payment flows.
//!
//! * [`checkout_api::CheckoutApi`] turns a checkout or renewal into a hosted session or a direct charge.
//! * [`reconciler_api::Reconciler`] is the state machine that applies webhook events and polling results to
//!   orders, idempotently.
//! * [`admin_api::AdminApi`] exposes the operator commands (capture, cancel, refund and the partial variants).
pub mod admin_api;
pub mod checkout_api;
pub mod errors;
pub mod reconciler_api;
