use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::warn;
use pb_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The human-facing payment code of an order, e.g. `POINTBOARDA123456`.
///
/// Order numbers are always held in upper case, so that comparisons are case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(from = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     OrderStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order has been placed, and no payment has been matched to it yet.
    Pending,
    /// A payment for the order has been received.
    Confirmed,
    /// The order is being prepared.
    Processing,
    /// The order has left the warehouse.
    Shipped,
    /// The order has reached the customer.
    Delivered,
    /// The order was cancelled by the customer, an admin, or because its payment failed.
    Cancelled,
}

impl OrderStatus {
    /// The next step on the happy path, if there is one.
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Shipped, delivered and cancelled orders cannot be cancelled (again).
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Processing)
    }

    /// True if `new_status` is a legal next state for an order in this state.
    pub fn can_transition_to(&self, new_status: OrderStatus) -> bool {
        match new_status {
            Self::Cancelled => self.is_cancellable(),
            s => self.successor() == Some(s),
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Failed and refunded payments are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Refunded)
    }

    /// True if `new_status` is a legal next state for a payment in this state.
    ///
    /// | From \ To  | Processing | Completed | Failed | Refunded |
    /// |------------|------------|-----------|--------|----------|
    /// | Pending    | ✔          | ✔         | ✔      | ✔        |
    /// | Processing |            | ✔         | ✔      | ✔        |
    /// | Completed  |            |           |        | ✔        |
    /// | Failed     |            |           |        |          |
    /// | Refunded   |            |           |        |          |
    pub fn can_transition_to(&self, new_status: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (self, new_status) {
            (Pending, Processing | Completed | Failed | Refunded) => true,
            (Processing, Completed | Failed | Refunded) => true,
            (Completed, Refunded) => true,
            _ => false,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------  TransactionStatus    ---------------------------------------------------------
/// The status of a payment notification, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Received,
    Processing,
    Completed,
    Success,
    Failed,
    Rejected,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Success | Self::Failed | Self::Rejected)
    }

    /// Gateways are not consistent about status names. Anything we don't recognise is treated as `Pending`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|e| {
            warn!("{e}. Treating the transaction as pending.");
            Self::Pending
        })
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Received => write!(f, "received"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "received" => Ok(Self::Received),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    /// Correlation id generated by the storefront. Not guaranteed to be unique.
    pub frontend_order_ref: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Snapshot of the shipping address at the time the order was placed
    pub shipping_address: String,
    pub payment_method: String,
    pub subtotal: Money,
    pub include_vat: bool,
    pub vat_rate: f64,
    pub vat_amount: Money,
    pub total_amount: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    /// The transaction that was matched to this order, if any
    pub transaction_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------      NewOrder         ---------------------------------------------------------
/// An order that is ready to be written to the database. The order number has been assigned and the totals computed.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub frontend_order_ref: Option<String>,
    pub customer: CustomerInfo,
    pub shipping_address: String,
    pub payment_method: String,
    pub items: Vec<NewOrderItem>,
    pub subtotal: Money,
    pub include_vat: bool,
    pub vat_rate: f64,
    pub vat_amount: Money,
    pub total_amount: Money,
}

impl NewOrder {
    /// Returns a copy of this order with a different order number. Used when retrying after a number collision.
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = order_number;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: Option<String>,
    #[serde(alias = "qty")]
    pub quantity: i64,
    #[serde(alias = "unitPrice")]
    pub price: Money,
}

impl NewOrderItem {
    pub fn new<S: Into<String>>(product_id: S, quantity: i64, price: Money) -> Self {
        Self { product_id: product_id.into(), product_name: None, quantity, price }
    }

    /// The price times the quantity, or `None` if that cannot be represented.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

//--------------------------------------     Transaction       ---------------------------------------------------------
/// A payment notification exactly as the gateway delivered it (after defaults have been applied).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub gateway: String,
    /// Gateway-supplied and opaque. We never try to interpret it.
    pub transaction_date: Option<String>,
    pub account_number: Option<String>,
    /// Free-text narration. This is where customers usually type the payment code.
    pub content: Option<String>,
    pub description: Option<String>,
    pub transfer_amount: Money,
    /// The gateway's own identifier for the transfer. Not in the same namespace as order numbers.
    pub reference_code: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    NewTransaction     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub gateway: String,
    pub transaction_date: Option<String>,
    pub account_number: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub transfer_amount: Money,
    pub reference_code: String,
    pub status: TransactionStatus,
}

impl NewTransaction {
    pub fn new<S: Into<String>>(gateway: S, reference_code: S, amount: Money) -> Self {
        Self {
            gateway: gateway.into(),
            transaction_date: None,
            account_number: None,
            content: None,
            description: None,
            transfer_amount: amount,
            reference_code: reference_code.into(),
            status: TransactionStatus::Received,
        }
    }

    pub fn with_content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }
}

//--------------------------------------   WebhookFailure      ---------------------------------------------------------
/// A webhook delivery that could not be parsed or stored. Kept verbatim so that it can be replayed by hand.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookFailure {
    pub id: i64,
    pub payload: String,
    pub error: String,
    pub created_at: DateTime<Utc>,
}
