use chrono::{DateTime, Utc};
use pointboard_engine::{
    db_types::{OrderNumber, OrderStatus, PaymentStatus, TransactionStatus},
    order_objects::{CreateOrderResult, OrderDetails, OrderQueryFilter},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRANSACTION_LIMIT: i64 = 50;

/// The webhook acknowledgement. Gateways only look at `success`, and retry on anything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
}

impl Default for WebhookAck {
    fn default() -> Self {
        Self { success: true }
    }
}

/// The response to a new order. `paymentCode` is the order number the customer must quote in their transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    #[serde(flatten)]
    pub details: OrderDetails,
    pub payment_code: OrderNumber,
    pub created: bool,
}

impl From<CreateOrderResult> for NewOrderResponse {
    fn from(result: CreateOrderResult) -> Self {
        let payment_code = result.details.order.order_number.clone();
        Self { details: result.details, payment_code, created: result.created }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusUpdate {
    pub order_number: OrderNumber,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    pub order_number: OrderNumber,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusUpdate {
    pub id: i64,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

impl LimitParams {
    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_TRANSACTION_LIMIT)
    }
}

/// Query-string form of [`OrderQueryFilter`]. Query strings can't carry lists, so at most one order status and one
/// payment status can be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSearchParams {
    pub order_number: Option<OrderNumber>,
    pub frontend_order_ref: Option<String>,
    pub customer_email: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl From<OrderSearchParams> for OrderQueryFilter {
    fn from(params: OrderSearchParams) -> Self {
        let mut filter = OrderQueryFilter {
            order_number: params.order_number,
            frontend_order_ref: params.frontend_order_ref,
            customer_email: params.customer_email,
            since: params.since,
            until: params.until,
            ..Default::default()
        };
        if let Some(status) = params.order_status {
            filter = filter.with_order_status(status);
        }
        if let Some(status) = params.payment_status {
            filter = filter.with_payment_status(status);
        }
        filter
    }
}
