use pb_common::Money;
use thiserror::Error;

use crate::{
    db_types::OrderNumber,
    traits::{OrderManagement, TransactionStore},
};

/// This trait defines the highest level of behaviour for backends supporting the PointBoard engine.
///
/// A backend must be cheap to clone (typically it wraps a connection pool), since every API object holds its own
/// copy.
#[allow(async_fn_in_trait)]
pub trait ShopDatabase: Clone + OrderManagement + TransactionStore {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("'{0}' is not a valid order number")]
    MalformedOrderNumber(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("The requested transaction {0} does not exist")]
    TransactionNotFound(i64),
    #[error("No transaction matches the order reference {0}")]
    NoMatchingTransaction(OrderNumber),
    #[error("Cannot insert order, since order number {0} is already taken")]
    OrderNumberExists(OrderNumber),
    #[error("Could not generate a unique order number after {0} attempts. Please try again.")]
    GenerationExhausted(u32),
    #[error("The order total does not match. Computed total: {computed}, provided total: {provided}.")]
    AmountMismatch { computed: Money, provided: Money },
    #[error("Cannot change the {kind} status of order {order_number} from {from} to {to}.")]
    InvalidTransition { order_number: OrderNumber, kind: &'static str, from: String, to: String },
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("Order {0} was modified by another request. Please try again.")]
    ConcurrentModification(OrderNumber),
    #[error("Transaction {0} cannot be modified. {1}")]
    TransactionModificationForbidden(i64, String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
