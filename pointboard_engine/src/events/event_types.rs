use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, OrderStatus, Transaction};

/// A new order has been stored and is waiting for payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// An order's payment status has just moved to `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    /// The transaction that paid for the order. Manual payment updates carry no transaction.
    pub transaction: Option<Transaction>,
}

impl OrderPaidEvent {
    pub fn new(order: Order, transaction: Option<Transaction>) -> Self {
        Self { order, transaction }
    }
}

/// An order has been cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    /// The status the order had before it was cancelled
    pub previous_status: OrderStatus,
    pub reason: Option<String>,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, previous_status: OrderStatus, reason: Option<String>) -> Self {
        Self { order, previous_status, reason }
    }
}
