use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderNumber, OrderStatus, PaymentStatus},
    order_objects::OrderQueryFilter,
    traits::OrderFlowError,
};

/// The `OrderManagement` trait defines behaviour for storing and updating orders.
///
/// Status updates take the status the caller expects the order to currently have. If the stored order no longer has
/// that status (or does not exist), nothing is written and `None` is returned. This keeps every transition a single
/// atomic row update, without any cross-row transactions.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Checks whether an order with the given number has already been stored. The comparison is case-insensitive.
    async fn order_number_exists(&self, order_number: &OrderNumber) -> Result<bool, OrderFlowError>;

    /// Stores the order and its line items in a single atomic transaction.
    ///
    /// If the order number is already taken, [`OrderFlowError::OrderNumberExists`] is returned and nothing is
    /// written.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// Fetches the order with the given order number, if it exists.
    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;

    /// Fetches the line items for the order with the given internal id.
    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderFlowError>;

    /// Fetches orders according to the criteria in `query`, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Sets the order status, provided it is still `expected`.
    async fn update_order_status(
        &self,
        order_number: &OrderNumber,
        expected: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Sets the payment status, provided it is still `expected`.
    async fn update_payment_status(
        &self,
        order_number: &OrderNumber,
        expected: PaymentStatus,
        new_status: PaymentStatus,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Links a transaction to the order and overwrites both statuses, provided the order still has the `expected`
    /// (payment, order) statuses.
    async fn link_transaction(
        &self,
        order_number: &OrderNumber,
        transaction_id: i64,
        expected: (PaymentStatus, OrderStatus),
        new_statuses: (PaymentStatus, OrderStatus),
    ) -> Result<Option<Order>, OrderFlowError>;
}
