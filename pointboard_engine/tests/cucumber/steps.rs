use cucumber::{then, when};
use pb_common::Money;
use pointboard_engine::{
    db_types::{NewOrderItem, OrderNumber, OrderStatus, PaymentStatus},
    order_objects::OrderRequest,
};
use serde_json::json;

use crate::cucumber::PointBoardWorld;

#[when(expr = "a customer orders {int} x {word} at {int} VND with VAT")]
async fn order_with_vat(world: &mut PointBoardWorld, qty: i64, product: String, price: i64) {
    place_order(world, qty, product, price, true, None).await;
}

#[when(expr = "a customer orders {int} x {word} at {int} VND without VAT")]
async fn order_without_vat(world: &mut PointBoardWorld, qty: i64, product: String, price: i64) {
    place_order(world, qty, product, price, false, None).await;
}

#[when(expr = "a customer orders {int} x {word} at {int} VND with VAT as order {word}")]
async fn order_with_number(world: &mut PointBoardWorld, qty: i64, product: String, price: i64, number: String) {
    place_order(world, qty, product, price, true, Some(number)).await;
}

async fn place_order(
    world: &mut PointBoardWorld,
    qty: i64,
    product: String,
    price: i64,
    include_vat: bool,
    number: Option<String>,
) {
    let mut request = OrderRequest::new(vec![NewOrderItem::new(product, qty, Money::from(price))])
        .with_vat(include_vat)
        .with_vat_rate(0.10);
    if let Some(n) = number {
        request = request.with_order_number(n);
    }
    let result = world.system().orders.create_order(request).await.expect("Error creating order");
    world.last_order = Some(result.details.order.order_number);
}

#[when(expr = "the gateway reports a {word} transfer of {int} VND with content {string}")]
async fn gateway_transfer(world: &mut PointBoardWorld, status: String, amount: i64, content: String) {
    let content = content.replace("<order>", world.last_order().as_str());
    let body = json!({
        "gateway": "VCB",
        "content": content,
        "transferAmount": amount,
        "referenceCode": "FT00001",
        "status": status,
    })
    .to_string();
    world.system().payments.process_raw_notification(&body).await.expect("Error processing webhook");
}

#[when(expr = "the admin moves the order to {word}")]
async fn admin_moves_order(world: &mut PointBoardWorld, status: String) {
    let status = status.parse::<OrderStatus>().expect("Invalid order status");
    let n = world.last_order();
    world.last_error = world.system().orders.modify_order_status(&n, status).await.err();
}

#[when("the admin cancels the order")]
async fn admin_cancels_order(world: &mut PointBoardWorld) {
    let n = world.last_order();
    world.last_error = world.system().orders.cancel_order(&n, Some("Requested by customer".into())).await.err();
}

#[then(expr = "the order totals are {int}, {int} and {int} VND")]
async fn check_totals(world: &mut PointBoardWorld, subtotal: i64, vat: i64, total: i64) {
    let order = world.fetch_order(&world.last_order()).await;
    assert_eq!(order.subtotal, Money::from(subtotal), "Subtotal is incorrect");
    assert_eq!(order.vat_amount, Money::from(vat), "VAT is incorrect");
    assert_eq!(order.total_amount, Money::from(total), "Total is incorrect");
}

#[then(expr = "the order number starts with {word}")]
async fn check_prefix(world: &mut PointBoardWorld, prefix: String) {
    let n = world.last_order();
    assert!(n.as_str().starts_with(&prefix), "{n} does not start with {prefix}");
    assert_eq!(n.as_str().len(), prefix.len() + 7);
}

#[then(expr = "order {word} has payment status {word} and order status {word}")]
async fn check_named_order(world: &mut PointBoardWorld, number: String, payment: String, status: String) {
    check_statuses(world, OrderNumber::from(number), payment, status).await;
}

#[then(expr = "the order has payment status {word} and order status {word}")]
async fn check_last_order(world: &mut PointBoardWorld, payment: String, status: String) {
    let n = world.last_order();
    check_statuses(world, n, payment, status).await;
}

async fn check_statuses(world: &PointBoardWorld, n: OrderNumber, payment: String, status: String) {
    let order = world.fetch_order(&n).await;
    let payment = payment.parse::<PaymentStatus>().expect("Invalid payment status");
    let status = status.parse::<OrderStatus>().expect("Invalid order status");
    assert_eq!(order.payment_status, payment, "Payment status is incorrect");
    assert_eq!(order.order_status, status, "Order status is incorrect");
}

#[then("the order is linked to a transaction")]
async fn check_linked(world: &mut PointBoardWorld) {
    let order = world.fetch_order(&world.last_order()).await;
    assert!(order.transaction_id.is_some(), "Order has no transaction");
}

#[then("the order is not linked to a transaction")]
async fn check_not_linked(world: &mut PointBoardWorld) {
    let order = world.fetch_order(&world.last_order()).await;
    assert!(order.transaction_id.is_none(), "Order should not have a transaction");
}

#[then(expr = "the request fails with {string}")]
async fn check_error(world: &mut PointBoardWorld, fragment: String) {
    let err = world.last_error.take().expect("The request should have failed");
    assert!(err.to_string().contains(&fragment), "'{err}' does not contain '{fragment}'");
}

#[then(expr = "{int} transactions have been stored")]
async fn check_transaction_count(world: &mut PointBoardWorld, count: usize) {
    let txs = world.system().payments.fetch_recent_transactions(100).await.expect("Error fetching transactions");
    assert_eq!(txs.len(), count);
}
