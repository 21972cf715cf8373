//! # RPG server
//!
//! The HTTP surface of the Reepay payment gateway. It is responsible for:
//! * Listening for incoming webhook notifications from the processor and feeding them to the order reconciler.
//! * Exposing the operator commands (capture, cancel, refund and the partial variants) under `/api`.
//! * Creating hosted payment sessions and confirming payments when customers return from them.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook`: The inbound webhook route. Verified and handled events return 200; bad signatures, missing
//!   fields and unknown event types return 400.
//! * `/checkout`, `/confirm/{order_id}`: hosted-session creation and the post-redirect payment confirmation.
//! * `/api/capture`, `/api/cancel`, `/api/refund`, `/api/capture_partly`, `/api/refund_partly`: operator commands.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
