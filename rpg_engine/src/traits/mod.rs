//! The contracts between the engine and its collaborators.
//!
//! Order persistence lives outside this crate. Any backend implementing [`OrderStore`] (a web-shop database, an
//! ORM adapter, or the in-memory [`crate::MemoryStore`]) can drive the payment flows. The processor side is
//! [`ProcessorApi`], which the `reepay_api` HTTP client implements and the tests mock.
mod order_store;
mod processor;

pub use order_store::{OrderStore, OrderStoreError};
pub use processor::ProcessorApi;
