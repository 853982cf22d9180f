use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderNumber, OrderStatus, Transaction, TransactionStatus, WebhookFailure},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    helpers::{reconcile_statuses, OrderNumberFormat},
    payment_objects::{GatewayPayload, VerificationResult, WebhookOutcome},
    traits::{NarrationField, OrderFlowError, OrderManagement, TransactionCorrection, TransactionStore},
};

/// How many times a link is retried when the order changes underneath it.
const LINK_ATTEMPTS: usize = 3;

pub const PAYMENT_FAILED_REASON: &str = "Payment failed";

/// `ReconciliationApi` stores inbound payment notifications and matches them to orders.
///
/// Matching relies entirely on the order number that the customer typed into the transfer narration. Amounts are
/// recorded, but never compared against the order total.
pub struct ReconciliationApi<B> {
    db: B,
    format: OrderNumberFormat,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({})", self.format.prefix())
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, format: OrderNumberFormat, producers: EventProducers) -> Self {
        Self { db, format, producers }
    }

    pub fn format(&self) -> &OrderNumberFormat {
        &self.format
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    /// Looks for an order number in the transaction's narration. `content` is searched first, then `description`,
    /// then the gateway reference code.
    pub fn find_order_reference(&self, transaction: &Transaction) -> Option<OrderNumber> {
        [transaction.content.as_deref(), transaction.description.as_deref(), Some(transaction.reference_code.as_str())]
            .into_iter()
            .flatten()
            .find_map(|text| self.format.extract(text))
    }

    fn parse_token(&self, token: &str) -> Result<OrderNumber, OrderFlowError> {
        if self.format.is_well_formed(token) {
            Ok(OrderNumber::new(token))
        } else {
            Err(OrderFlowError::MalformedOrderNumber(token.trim().to_string()))
        }
    }
}

impl<B> ReconciliationApi<B>
where B: OrderManagement + TransactionStore
{
    /// Handles a raw webhook body: parses it, stores the transaction and tries to reconcile it.
    ///
    /// If the body cannot be parsed, or the transaction cannot be stored, the body is written to the dead-letter log
    /// and the error is returned. Reconciliation problems are logged but do not fail the call, since the transaction
    /// has been stored and can be reconciled later.
    pub async fn process_raw_notification(&self, body: &str) -> Result<WebhookOutcome, OrderFlowError> {
        let payload = serde_json::from_str::<serde_json::Value>(body)
            .map_err(|e| format!("Invalid JSON. {e}"))
            .and_then(|v| GatewayPayload::from_json(&v).ok_or_else(|| "The payload is not a JSON object".to_string()));
        let payload = match payload {
            Ok(p) => p,
            Err(msg) => {
                warn!("🧾️ Could not parse webhook payload. {msg}");
                self.record_webhook_failure(body, &msg).await;
                return Err(OrderFlowError::ValidationError(msg));
            },
        };
        match self.process_gateway_notification(payload).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.record_webhook_failure(body, &e.to_string()).await;
                Err(e)
            },
        }
    }

    /// Stores the notification, then matches it to an order if the narration mentions one.
    pub async fn process_gateway_notification(&self, payload: GatewayPayload) -> Result<WebhookOutcome, OrderFlowError> {
        let transaction = self.db.record_transaction(payload.into_new_transaction()).await?;
        info!(
            "🧾️ Transaction #{} [{}] of {} from {} received with status {}",
            transaction.id, transaction.reference_code, transaction.transfer_amount, transaction.gateway, transaction.status
        );
        Ok(self.try_reconcile(transaction).await)
    }

    /// Best-effort reconciliation of a stored transaction. Never fails.
    async fn try_reconcile(&self, transaction: Transaction) -> WebhookOutcome {
        let Some(order_number) = self.find_order_reference(&transaction) else {
            info!("🧾️ Transaction #{} does not mention an order number. It is kept for later.", transaction.id);
            return WebhookOutcome::unmatched(transaction);
        };
        let order = match self.link_transaction_to_order(&order_number, &transaction).await {
            Ok(order) => Some(order),
            Err(OrderFlowError::OrderNotFound(n)) => {
                warn!("🧾️ Transaction #{} mentions {n}, but there is no such order", transaction.id);
                None
            },
            Err(e) => {
                error!("🧾️ Could not reconcile transaction #{} with order {order_number}. {e}", transaction.id);
                None
            },
        };
        WebhookOutcome { transaction, order_reference: Some(order_number), order }
    }

    /// Applies the transaction's status to the order with the given number.
    ///
    /// The update is an overwrite guarded by the order's current statuses, and never moves an order backwards (see
    /// [`reconcile_statuses`]). Linking the same transaction twice leaves the order as it is. An `OrderPaid` event is
    /// only published when this call is the one that completes the payment.
    pub async fn link_transaction_to_order(
        &self,
        order_number: &OrderNumber,
        transaction: &Transaction,
    ) -> Result<Order, OrderFlowError> {
        for attempt in 1..=LINK_ATTEMPTS {
            let order = self
                .db
                .fetch_order_by_number(order_number)
                .await?
                .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.clone()))?;
            let current = (order.payment_status, order.order_status);
            let reconciled = reconcile_statuses(order.payment_status, order.order_status, transaction.status);
            // Only move the back-reference when the transaction actually changes something, or when there is none yet
            if !reconciled.changed && order.transaction_id.is_some() {
                debug!("🧾️ Transaction #{} changes nothing on order {order_number}", transaction.id);
                return Ok(order);
            }
            let new_statuses = (reconciled.payment_status, reconciled.order_status);
            match self.db.link_transaction(order_number, transaction.id, current, new_statuses).await? {
                Some(updated) => {
                    info!(
                        "🧾️ Order {order_number} reconciled with transaction #{}. Payment: {}, order: {}",
                        transaction.id, updated.payment_status, updated.order_status
                    );
                    self.notify(&order, &updated, transaction, reconciled.newly_paid).await;
                    return Ok(updated);
                },
                None => debug!("🧾️ Order {order_number} changed during reconciliation (attempt {attempt})"),
            }
        }
        Err(OrderFlowError::ConcurrentModification(order_number.clone()))
    }

    async fn notify(&self, old: &Order, updated: &Order, transaction: &Transaction, newly_paid: bool) {
        if newly_paid {
            let event = OrderPaidEvent::new(updated.clone(), Some(transaction.clone()));
            self.producers.publish_order_paid(event).await;
        }
        if old.order_status != OrderStatus::Cancelled && updated.order_status == OrderStatus::Cancelled {
            let event = OrderAnnulledEvent::new(updated.clone(), old.order_status, Some(PAYMENT_FAILED_REASON.into()));
            self.producers.publish_order_annulled(event).await;
        }
    }

    /// Finds the transaction that pays for the given order number. The first of these that succeeds wins:
    /// 1. a transaction whose gateway reference code equals the token,
    /// 2. the transaction already linked to the order with that number,
    /// 3. the most recent transaction whose `content` mentions the token,
    /// 4. the most recent transaction whose `description` mentions the token.
    ///
    /// Fails with [`OrderFlowError::MalformedOrderNumber`] if the token is not a well-formed order number.
    pub async fn find_transaction_for_token(&self, token: &str) -> Result<Option<Transaction>, OrderFlowError> {
        let order_number = self.parse_token(token)?;
        if let Some(tx) = self.db.fetch_transaction_by_reference(order_number.as_str()).await? {
            trace!("🧾️ {order_number} matched transaction #{} by reference code", tx.id);
            return Ok(Some(tx));
        }
        let linked = self.db.fetch_order_by_number(&order_number).await?.and_then(|o| o.transaction_id);
        if let Some(id) = linked {
            if let Some(tx) = self.db.fetch_transaction(id).await? {
                trace!("🧾️ {order_number} is already linked to transaction #{id}");
                return Ok(Some(tx));
            }
        }
        for field in [NarrationField::Content, NarrationField::Description] {
            let candidates = self.db.search_transaction_narrations(field, order_number.as_str()).await?;
            let found = candidates.into_iter().find(|tx| {
                let text = match field {
                    NarrationField::Content => tx.content.as_deref(),
                    NarrationField::Description => tx.description.as_deref(),
                };
                text.map(|t| self.format.mentions(t, &order_number)).unwrap_or(false)
            });
            if let Some(tx) = found {
                trace!("🧾️ {order_number} found in the {field} of transaction #{}", tx.id);
                return Ok(Some(tx));
            }
        }
        Ok(None)
    }

    /// Reports whether a payment for the order number has been received. Nothing is written.
    pub async fn verify_order_reference(&self, token: &str) -> Result<VerificationResult, OrderFlowError> {
        let order_number = self.parse_token(token)?;
        let transaction = self.find_transaction_for_token(token).await?;
        let order = self.db.fetch_order_by_number(&order_number).await?;
        Ok(VerificationResult::new(order_number, transaction, order))
    }

    /// Searches for a transaction that pays for the order and links it. Use this to recover orders whose payment
    /// arrived before the order was stored, or when reconciliation was interrupted.
    pub async fn reconcile_order(&self, token: &str) -> Result<Order, OrderFlowError> {
        let order_number = self.parse_token(token)?;
        if self.db.fetch_order_by_number(&order_number).await?.is_none() {
            return Err(OrderFlowError::OrderNotFound(order_number));
        }
        let transaction = self
            .find_transaction_for_token(token)
            .await?
            .ok_or_else(|| OrderFlowError::NoMatchingTransaction(order_number.clone()))?;
        self.link_transaction_to_order(&order_number, &transaction).await
    }

    /// Marks a transaction as completed, optionally correcting its amount and gateway, and then reconciles it again.
    pub async fn complete_transaction(
        &self,
        id: i64,
        correction: TransactionCorrection,
    ) -> Result<WebhookOutcome, OrderFlowError> {
        let transaction =
            self.db.complete_transaction(id, correction).await?.ok_or(OrderFlowError::TransactionNotFound(id))?;
        info!("🧾️ Transaction #{id} has been marked as completed by hand. Amount: {}", transaction.transfer_amount);
        Ok(self.try_reconcile(transaction).await)
    }

    /// Changes the status of a transaction. Transactions in a terminal status cannot be changed, and setting the
    /// current status again returns the transaction as is.
    pub async fn update_transaction_status(
        &self,
        id: i64,
        new_status: TransactionStatus,
    ) -> Result<Transaction, OrderFlowError> {
        let transaction = self.fetch_transaction(id).await?;
        let old_status = transaction.status;
        if old_status == new_status {
            debug!("🧾️ Transaction #{id} is already {new_status}");
            return Ok(transaction);
        }
        if old_status.is_terminal() {
            warn!("🧾️ Refusing to move transaction #{id} out of terminal status {old_status}");
            return Err(OrderFlowError::TransactionModificationForbidden(
                id,
                format!("It has terminal status '{old_status}'"),
            ));
        }
        let updated = self.db.update_transaction_status(id, old_status, new_status).await?.ok_or_else(|| {
            OrderFlowError::TransactionModificationForbidden(id, "Its status changed during the update".into())
        })?;
        info!("🧾️ Transaction #{id} moved from {old_status} to {new_status}");
        Ok(updated)
    }

    pub async fn fetch_transaction(&self, id: i64) -> Result<Transaction, OrderFlowError> {
        self.db.fetch_transaction(id).await?.ok_or(OrderFlowError::TransactionNotFound(id))
    }

    pub async fn fetch_recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, OrderFlowError> {
        self.db.fetch_recent_transactions(limit.max(1)).await
    }

    pub async fn fetch_webhook_failures(&self, limit: i64) -> Result<Vec<WebhookFailure>, OrderFlowError> {
        self.db.fetch_webhook_failures(limit.max(1)).await
    }

    /// Writes the payload to the dead-letter log. If even that fails, all we can do is log it.
    pub async fn record_webhook_failure(&self, payload: &str, error: &str) {
        if let Err(e) = self.db.record_webhook_failure(payload, error).await {
            error!("🧾️ Could not record webhook failure ({error}). {e}. Payload: {payload}");
        }
    }
}
