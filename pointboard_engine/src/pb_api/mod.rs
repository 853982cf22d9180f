//! # PointBoard engine public API
//!
//! * [`order_flow_api`] creates orders, and handles the admin status changes over their life cycle.
//! * [`reconciliation_api`] ingests payment-gateway notifications, and matches them to orders by the order number the
//!   customer wrote in the transfer narration.
//!
//! The other submodules hold the request and response types for these APIs.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use pointboard_engine::{OrderFlowApi, SqliteDatabase, helpers::OrderNumberGenerator, events::EventProducers};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderFlowApi::new(db, OrderNumberGenerator::default(), EventProducers::default());
//! let result = api.create_order(request).await?;
//! ```
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_objects;
pub mod reconciliation_api;
