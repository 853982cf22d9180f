use crate::{
    db_types::{NewTransaction, Transaction, TransactionStatus, WebhookFailure},
    traits::{NarrationField, OrderFlowError, TransactionCorrection},
};

/// The `TransactionStore` trait defines behaviour for the log of inbound payment notifications.
#[allow(async_fn_in_trait)]
pub trait TransactionStore {
    /// Appends a notification to the log. Identical payloads are stored again; the store does not de-duplicate.
    async fn record_transaction(&self, transaction: NewTransaction) -> Result<Transaction, OrderFlowError>;

    /// Fetches the transaction with the given id, if it exists.
    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, OrderFlowError>;

    /// Fetches the most recently received transactions, newest first.
    async fn fetch_recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, OrderFlowError>;

    /// Fetches the most recent transaction whose gateway reference code equals `reference` (case-insensitive).
    async fn fetch_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>, OrderFlowError>;

    /// Fetches every transaction whose `field` contains `needle` (case-insensitive), newest first.
    ///
    /// This is a coarse substring search. Callers are expected to confirm the candidates.
    async fn search_transaction_narrations(
        &self,
        field: NarrationField,
        needle: &str,
    ) -> Result<Vec<Transaction>, OrderFlowError>;

    /// Sets the transaction status, provided it is still `expected`. Returns `None` if the transaction does not exist
    /// or its status has changed in the meantime.
    async fn update_transaction_status(
        &self,
        id: i64,
        expected: TransactionStatus,
        new_status: TransactionStatus,
    ) -> Result<Option<Transaction>, OrderFlowError>;

    /// Marks the transaction as completed, applying any corrections to the amount or gateway.
    async fn complete_transaction(
        &self,
        id: i64,
        correction: TransactionCorrection,
    ) -> Result<Option<Transaction>, OrderFlowError>;

    /// Stores a webhook payload that could not be processed, together with the reason.
    async fn record_webhook_failure(&self, payload: &str, error: &str) -> Result<WebhookFailure, OrderFlowError>;

    /// Fetches the most recent webhook failures, newest first.
    async fn fetch_webhook_failures(&self, limit: i64) -> Result<Vec<WebhookFailure>, OrderFlowError>;
}
