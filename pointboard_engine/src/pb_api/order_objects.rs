use std::fmt::Display;

use chrono::{DateTime, Utc};
use pb_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{CustomerInfo, NewOrderItem, Order, OrderItem, OrderNumber, OrderStatus, PaymentStatus},
    traits::OrderFlowError,
};

pub const DEFAULT_PAYMENT_METHOD: &str = "bank_transfer";

//--------------------------------------     OrderRequest      ---------------------------------------------------------
/// An order as submitted by the storefront.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// An order number proposed by the client. It is only honoured if it is well-formed.
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default, alias = "orderId")]
    pub frontend_order_ref: Option<String>,
    #[serde(default)]
    pub customer: CustomerInfo,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub items: Vec<NewOrderItem>,
    #[serde(default, rename = "includeVAT", alias = "includeVat")]
    pub include_vat: bool,
    /// Overrides the configured VAT rate for this order
    #[serde(default)]
    pub vat_rate: Option<f64>,
    /// The total the storefront computed. It is checked against ours unless a total policy says otherwise.
    #[serde(default)]
    pub total_amount: Option<Money>,
    #[serde(default)]
    pub total_policy: Option<TotalPolicy>,
}

impl OrderRequest {
    pub fn new(items: Vec<NewOrderItem>) -> Self {
        Self { items, ..Default::default() }
    }

    pub fn with_vat(mut self, include_vat: bool) -> Self {
        self.include_vat = include_vat;
        self
    }

    pub fn with_vat_rate(mut self, rate: f64) -> Self {
        self.vat_rate = Some(rate);
        self
    }

    pub fn with_order_number<S: Into<String>>(mut self, order_number: S) -> Self {
        self.order_number = Some(order_number.into());
        self
    }

    pub fn with_customer(mut self, customer: CustomerInfo) -> Self {
        self.customer = customer;
        self
    }

    pub fn with_total_policy(mut self, policy: TotalPolicy) -> Self {
        self.total_policy = Some(policy);
        self
    }

    pub fn with_total_amount(mut self, total: Money) -> Self {
        self.total_amount = Some(total);
        self
    }

    /// An explicit policy wins. Otherwise a client total is verified, and without one the server total stands.
    pub fn total_policy(&self) -> TotalPolicy {
        match (self.total_policy, self.total_amount) {
            (Some(policy), _) => policy,
            (None, Some(total)) => TotalPolicy::Verify(total),
            (None, None) => TotalPolicy::ServerComputed,
        }
    }

    pub fn payment_method(&self) -> String {
        self.payment_method.clone().unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string())
    }

    /// Checks the request for obvious problems before anything is written.
    pub fn validate(&self, vat_rate: f64) -> Result<(), OrderFlowError> {
        if self.items.is_empty() {
            return Err(OrderFlowError::ValidationError("An order must contain at least one item".into()));
        }
        for item in &self.items {
            if item.product_id.trim().is_empty() {
                return Err(OrderFlowError::ValidationError("Every item must have a product id".into()));
            }
            if item.quantity < 1 {
                return Err(OrderFlowError::ValidationError(format!(
                    "Item {} has an invalid quantity ({}). Quantities must be at least 1",
                    item.product_id, item.quantity
                )));
            }
            if item.price.is_negative() {
                return Err(OrderFlowError::ValidationError(format!(
                    "Item {} has a negative price ({})",
                    item.product_id, item.price
                )));
            }
        }
        if !(0.0..=1.0).contains(&vat_rate) {
            return Err(OrderFlowError::ValidationError(format!("VAT rate {vat_rate} must be between 0 and 1")));
        }
        Ok(())
    }
}

//--------------------------------------      TotalPolicy      ---------------------------------------------------------
/// How the stored order total is arrived at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode", content = "total")]
pub enum TotalPolicy {
    /// The server's computation is authoritative. Any client total is ignored.
    #[default]
    ServerComputed,
    /// The client's total must agree with the server's to within one unit.
    Verify(Money),
    /// The caller's total is stored as is.
    Override(Money),
}

//--------------------------------------      OrderTotals      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total_amount: Money,
}

/// Computes the subtotal, VAT and total for the given items, and applies the total policy.
pub fn compute_totals(
    items: &[NewOrderItem],
    include_vat: bool,
    vat_rate: f64,
    policy: TotalPolicy,
) -> Result<OrderTotals, OrderFlowError> {
    let too_large = || OrderFlowError::ValidationError("The order total is too large".into());
    let subtotal = items
        .iter()
        .try_fold(Money::default(), |acc, item| item.line_total().and_then(|line| acc.checked_add(line)))
        .ok_or_else(too_large)?;
    let vat_amount = if include_vat { subtotal.scale(vat_rate) } else { Money::default() };
    let computed = subtotal.checked_add(vat_amount).ok_or_else(too_large)?;
    let total_amount = match policy {
        TotalPolicy::ServerComputed => computed,
        TotalPolicy::Verify(provided) if computed.is_close_to(provided) => computed,
        TotalPolicy::Verify(provided) => return Err(OrderFlowError::AmountMismatch { computed, provided }),
        TotalPolicy::Override(total) => total,
    };
    Ok(OrderTotals { subtotal, vat_amount, total_amount })
}

//--------------------------------------     OrderDetails      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderResult {
    pub details: OrderDetails,
    /// False if the order already existed and was returned unchanged
    pub created: bool,
}

//--------------------------------------   OrderQueryFilter    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_number: Option<OrderNumber>,
    pub frontend_order_ref: Option<String>,
    pub customer_email: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub order_status: Option<Vec<OrderStatus>>,
    pub payment_status: Option<Vec<PaymentStatus>>,
}

impl OrderQueryFilter {
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = Some(order_number);
        self
    }

    pub fn with_frontend_order_ref<S: Into<String>>(mut self, frontend_ref: S) -> Self {
        self.frontend_order_ref = Some(frontend_ref.into());
        self
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_order_status(mut self, status: OrderStatus) -> Self {
        self.order_status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_number.is_none() &&
            self.frontend_order_ref.is_none() &&
            self.customer_email.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.order_status.as_ref().map(Vec::is_empty).unwrap_or(true) &&
            self.payment_status.as_ref().map(Vec::is_empty).unwrap_or(true)
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(n) = &self.order_number {
            write!(f, "order_number: {n}. ")?;
        }
        if let Some(r) = &self.frontend_order_ref {
            write!(f, "frontend_order_ref: {r}. ")?;
        }
        if let Some(e) = &self.customer_email {
            write!(f, "customer_email: {e}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.order_status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "order statuses: [{statuses}]. ")?;
        }
        if let Some(statuses) = &self.payment_status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "payment statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}
