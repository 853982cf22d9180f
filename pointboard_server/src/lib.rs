//! # PointBoard server
//! This crate hosts the HTTP front end of the PointBoard engine. It is responsible for:
//! Accepting orders from the storefront and handing back their payment codes.
//! Listening for payment notifications from the bank-transfer gateway and passing them to the reconciliation matcher.
//! Giving back-office staff a way to inspect and correct orders and transactions.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/payment`: The webhook route for payment gateway notifications. It always replies with 200 OK.
//! * `/api/...`: Order, reconciliation and transaction management. See [routes](routes/index.html).

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod notifications;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
