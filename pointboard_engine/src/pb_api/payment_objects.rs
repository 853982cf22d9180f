use chrono::Utc;
use log::*;
use pb_common::Money;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{NewTransaction, Order, OrderNumber, Transaction, TransactionStatus};

pub const UNKNOWN_GATEWAY: &str = "unknown";
pub const UNKNOWN_STATUS: &str = "unknown";

//--------------------------------------    GatewayPayload     ---------------------------------------------------------
/// The body of a payment-gateway webhook.
///
/// Gateways differ in how they type these fields (amounts as strings, references as numbers, and so on), so the
/// payload is built leniently from a JSON value with [`GatewayPayload::from_json`] rather than deserialized directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPayload {
    pub gateway: Option<String>,
    pub transaction_date: Option<String>,
    pub account_number: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub transfer_amount: Option<Money>,
    pub reference_code: Option<String>,
    pub status: Option<String>,
}

impl GatewayPayload {
    /// Builds a payload from any JSON object. Unknown fields are ignored. Returns `None` if `value` is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(json_to_text);
        Some(Self {
            gateway: text("gateway"),
            transaction_date: text("transactionDate"),
            account_number: text("accountNumber"),
            content: text("content"),
            description: text("description"),
            transfer_amount: obj.get("transferAmount").and_then(json_to_amount),
            reference_code: text("referenceCode"),
            status: text("status"),
        })
    }

    /// Applies the defaults for missing fields and produces a record ready for storage.
    pub fn into_new_transaction(self) -> NewTransaction {
        let status = match self.status.as_deref() {
            Some(s) => TransactionStatus::parse_lenient(s),
            None => TransactionStatus::Received,
        };
        NewTransaction {
            gateway: self.gateway.unwrap_or_else(|| UNKNOWN_GATEWAY.to_string()),
            transaction_date: self.transaction_date,
            account_number: self.account_number,
            content: self.content,
            description: self.description,
            transfer_amount: self.transfer_amount.unwrap_or_default(),
            reference_code: self.reference_code.unwrap_or_else(local_reference_code),
            status,
        }
    }
}

fn json_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_to_amount(value: &Value) -> Option<Money> {
    let amount = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Money::from(i)),
            None => n.as_f64().and_then(|f| Money::try_from(f).ok()),
        },
        Value::String(s) => {
            let s = s.trim().replace(',', "");
            s.parse::<i64>().ok().map(Money::from).or_else(|| s.parse::<f64>().ok().and_then(|f| Money::try_from(f).ok()))
        },
        _ => None,
    };
    if amount.is_none() {
        warn!("🧾️ Could not interpret '{value}' as a transfer amount. Using 0.");
    }
    amount
}

/// A reference code for notifications that arrive without one: `LOCAL-<unix millis>-<8 hex digits>`
pub fn local_reference_code() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("LOCAL-{}-{suffix:08x}", Utc::now().timestamp_millis())
}

//--------------------------------------    WebhookOutcome     ---------------------------------------------------------
/// What happened to a webhook delivery after it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub transaction: Transaction,
    /// The order number found in the narration, if any
    pub order_reference: Option<OrderNumber>,
    /// The order after reconciliation, if the reference matched one
    pub order: Option<Order>,
}

impl WebhookOutcome {
    pub fn unmatched(transaction: Transaction) -> Self {
        Self { transaction, order_reference: None, order: None }
    }
}

//--------------------------------------  VerificationResult   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub order_number: OrderNumber,
    /// True if a transaction mentioning the order number has been received
    pub found: bool,
    /// The status of the transaction, or `unknown` if there isn't one
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl VerificationResult {
    pub fn new(order_number: OrderNumber, transaction: Option<Transaction>, order: Option<Order>) -> Self {
        let status = transaction.as_ref().map(|t| t.status.to_string()).unwrap_or_else(|| UNKNOWN_STATUS.to_string());
        Self { order_number, found: transaction.is_some(), status, transaction, order }
    }
}
