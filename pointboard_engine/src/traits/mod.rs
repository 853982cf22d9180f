//! #  Storage backends.
//!
//! This module defines the contracts that a storage backend must fulfil to be used by the PointBoard engine.
//!
//! ## Orders
//! [`OrderManagement`] stores orders and their line items, and provides the single-row status updates used by the
//! order lifecycle and the reconciliation matcher. Every update is a compare-and-set against the status the caller
//! last saw, so two concurrent requests can never both apply a transition.
//!
//! ## Transactions
//! [`TransactionStore`] is the append-mostly log of payment gateway notifications. Raw payload fields are never
//! rewritten; only the status changes over time (plus the explicit amount/gateway correction).
//!
//! ## Traits
//! * [`ShopDatabase`] ties the two together and is what the flow APIs are generic over.
//! * [`OrderManagement`] defines behaviour for storing and querying orders.
//! * [`TransactionStore`] defines behaviour for storing and querying payment notifications.
mod data_objects;
mod order_management;
mod shop_database;
mod transaction_store;

pub use data_objects::{NarrationField, TransactionCorrection};
pub use order_management::OrderManagement;
pub use shop_database::{OrderFlowError, ShopDatabase};
pub use transaction_store::TransactionStore;
