use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderNumber, OrderStatus, PaymentStatus},
    order_objects::OrderQueryFilter,
    traits::OrderFlowError,
};

/// Inserts a new order and its line items. This is not atomic on its own. Embed the call in a transaction and pass
/// `&mut *tx` as the connection argument so that an order is never stored without its items.
///
/// A clash on the order number returns [`OrderFlowError::OrderNumberExists`].
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let order_number = order.order_number.clone();
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                frontend_order_ref,
                customer_name,
                customer_email,
                customer_phone,
                shipping_address,
                payment_method,
                subtotal,
                include_vat,
                vat_rate,
                vat_amount,
                total_amount
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(order.order_number)
    .bind(order.frontend_order_ref)
    .bind(order.customer.name)
    .bind(order.customer.email)
    .bind(order.customer.phone)
    .bind(order.shipping_address)
    .bind(order.payment_method)
    .bind(order.subtotal)
    .bind(order.include_vat)
    .bind(order.vat_rate)
    .bind(order.vat_amount)
    .bind(order.total_amount)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => OrderFlowError::OrderNumberExists(order_number),
        _ => OrderFlowError::from(e),
    })?;
    for item in order.items {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(inserted.id)
        .bind(item.product_id)
        .bind(item.product_name)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *conn)
        .await?;
    }
    debug!("🗃️ Order [{}] inserted with id {}", inserted.order_number, inserted.id);
    Ok(inserted)
}

/// Returns the order with the given number. The comparison is case-insensitive.
pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1 COLLATE NOCASE")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn order_number_exists(order_number: &OrderNumber, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_number = $1 COLLATE NOCASE")
        .bind(order_number.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await?;
    Ok(items)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_number) = query.order_number {
        where_clause.push("order_number = ");
        where_clause.push_bind_unseparated(order_number.as_str().to_string());
        where_clause.push_unseparated(" COLLATE NOCASE");
    }
    if let Some(frontend_ref) = query.frontend_order_ref {
        where_clause.push("frontend_order_ref = ");
        where_clause.push_bind_unseparated(frontend_ref);
    }
    if let Some(email) = query.customer_email {
        where_clause.push("customer_email = ");
        where_clause.push_bind_unseparated(email);
        where_clause.push_unseparated(" COLLATE NOCASE");
    }
    // Statuses come from closed enums, so they can be inlined safely
    if let Some(statuses) = query.order_status.filter(|s| !s.is_empty()) {
        let statuses = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("order_status IN ({statuses})"));
    }
    if let Some(statuses) = query.payment_status.filter(|s| !s.is_empty()) {
        let statuses = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("payment_status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("datetime(created_at) >= datetime(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("datetime(created_at) <= datetime(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {} orders", orders.len());
    Ok(orders)
}

/// Sets the order status, but only if the order still has the `expected` status. Returns `None` otherwise.
pub(crate) async fn update_order_status(
    order_number: &OrderNumber,
    expected: OrderStatus,
    new_status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let result: Option<Order> = sqlx::query_as(
        r#"UPDATE orders SET order_status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE order_number = $2 COLLATE NOCASE AND order_status = $3
        RETURNING *"#,
    )
    .bind(new_status)
    .bind(order_number.as_str())
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Order status update for {order_number} ({expected} -> {new_status}) applied: {}", result.is_some());
    Ok(result)
}

/// Sets the payment status, but only if the order still has the `expected` payment status. Returns `None` otherwise.
pub(crate) async fn update_payment_status(
    order_number: &OrderNumber,
    expected: PaymentStatus,
    new_status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let result: Option<Order> = sqlx::query_as(
        r#"UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE order_number = $2 COLLATE NOCASE AND payment_status = $3
        RETURNING *"#,
    )
    .bind(new_status)
    .bind(order_number.as_str())
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Payment status update for {order_number} ({expected} -> {new_status}) applied: {}", result.is_some());
    Ok(result)
}

/// Points the order at the given transaction and overwrites both statuses in one statement. Nothing is written unless
/// the order still has the `expected` statuses.
pub(crate) async fn link_transaction(
    order_number: &OrderNumber,
    transaction_id: i64,
    expected: (PaymentStatus, OrderStatus),
    new_statuses: (PaymentStatus, OrderStatus),
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let (expected_payment, expected_order) = expected;
    let (payment_status, order_status) = new_statuses;
    let result: Option<Order> = sqlx::query_as(
        r#"UPDATE orders SET
            transaction_id = $1,
            payment_status = $2,
            order_status = $3,
            updated_at = CURRENT_TIMESTAMP
        WHERE order_number = $4 COLLATE NOCASE AND payment_status = $5 AND order_status = $6
        RETURNING *"#,
    )
    .bind(transaction_id)
    .bind(payment_status)
    .bind(order_status)
    .bind(order_number.as_str())
    .bind(expected_payment)
    .bind(expected_order)
    .fetch_optional(conn)
    .await?;
    match &result {
        Some(_) => debug!("🗃️ Order {order_number} linked to transaction #{transaction_id}"),
        None => debug!("🗃️ Order {order_number} changed before transaction #{transaction_id} could be linked"),
    }
    Ok(result)
}
