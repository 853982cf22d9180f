use std::fmt::Display;

use pb_common::Money;
use serde::{Deserialize, Serialize};

/// The free-text fields of a transaction that may carry the customer's payment code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationField {
    Content,
    Description,
}

impl NarrationField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Description => "description",
        }
    }
}

impl Display for NarrationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Manual corrections that may be applied to a transaction when an operator marks it as completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCorrection {
    pub transfer_amount: Option<Money>,
    pub gateway: Option<String>,
}

impl TransactionCorrection {
    pub fn with_amount(mut self, amount: Money) -> Self {
        self.transfer_amount = Some(amount);
        self
    }

    pub fn with_gateway<S: Into<String>>(mut self, gateway: S) -> Self {
        self.gateway = Some(gateway.into());
        self
    }
}
