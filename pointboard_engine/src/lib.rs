//! PointBoard Engine
//!
//! The PointBoard engine contains the core logic for taking orders and matching bank-transfer payments to them.
//! Customers pay by transfer, quoting a short order number (e.g. `POINTBOARDA123456`) in the transfer narration. The
//! payment gateway forwards each transfer to us, and the engine finds the order the customer meant.
//!
//! The library is divided into these main sections:
//! 1. Domain types ([`mod@db_types`]) and the storage contracts ([`mod@traits`]). SQLite is currently the only
//!    backend ([`SqliteDatabase`]). You should never need to access the database directly. Instead, use the public
//!    API provided by the engine.
//! 2. The engine's public API ([`OrderFlowApi`] and [`ReconciliationApi`]). The APIs are generic over the storage
//!    traits, so any backend implementing them can be used.
//! 3. Order-number generation and the status rules applied during reconciliation ([`mod@helpers`]).
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur within the engine. For example, when a payment completes an order, an `OrderPaid` event is emitted.
//! A simple Actor framework is used so that you can easily hook into these events and perform custom actions.
pub mod db_types;
pub mod events;
pub mod helpers;
mod pb_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use pb_api::{
    order_flow_api::{OrderFlowApi, DEFAULT_VAT_RATE},
    order_objects,
    payment_objects,
    reconciliation_api::ReconciliationApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{OrderFlowError, OrderManagement, ShopDatabase, TransactionStore};
