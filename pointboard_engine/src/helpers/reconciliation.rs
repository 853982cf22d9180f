use log::*;

use crate::db_types::{OrderStatus, PaymentStatus, TransactionStatus};

/// The fixed mapping from a gateway-reported transaction status to the (payment, order) status pair it implies.
///
/// | Transaction status              | Payment status | Order status |
/// |---------------------------------|----------------|--------------|
/// | completed, success, received    | completed      | confirmed    |
/// | pending                         | pending        | pending      |
/// | failed                          | failed         | cancelled    |
/// | anything else                   | pending        | pending      |
pub fn map_transaction_status(status: TransactionStatus) -> (PaymentStatus, OrderStatus) {
    use TransactionStatus::*;
    match status {
        Completed | Success | Received => (PaymentStatus::Completed, OrderStatus::Confirmed),
        Failed => (PaymentStatus::Failed, OrderStatus::Cancelled),
        Pending | Processing | Rejected => (PaymentStatus::Pending, OrderStatus::Pending),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciledStatus {
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    /// True if either status differs from the order's current state
    pub changed: bool,
    /// True if this reconciliation is the one that moved the payment to `Completed`
    pub newly_paid: bool,
}

/// Works out the statuses an order should have after a transaction with status `incoming` is matched to it.
///
/// The mapping in [`map_transaction_status`] is applied as an overwrite, but never in a way that regresses the order:
/// * completed, failed and refunded payments keep their status,
/// * a `pending` mapping never moves a payment backwards,
/// * orders are only confirmed from `pending`, and only cancelled while they are still cancellable.
///
/// Applying the same transaction twice therefore yields `changed == false` the second time.
pub fn reconcile_statuses(
    payment_status: PaymentStatus,
    order_status: OrderStatus,
    incoming: TransactionStatus,
) -> ReconciledStatus {
    let (target_payment, target_order) = map_transaction_status(incoming);
    let new_payment = match (payment_status, target_payment) {
        (current, target) if current == target => current,
        (PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Refunded, target) => {
            debug!("🧾️ Payment is already {payment_status}. Ignoring the '{target}' status implied by '{incoming}'");
            payment_status
        },
        (current, PaymentStatus::Pending) => current,
        (_, target) => target,
    };
    let new_order = if new_payment != target_payment {
        order_status
    } else {
        match target_order {
            OrderStatus::Confirmed if order_status == OrderStatus::Pending => OrderStatus::Confirmed,
            OrderStatus::Cancelled if order_status.is_cancellable() => OrderStatus::Cancelled,
            OrderStatus::Confirmed if order_status == OrderStatus::Cancelled => {
                warn!("🧾️ A completed payment was matched to a cancelled order. The order stays cancelled.");
                order_status
            },
            _ => order_status,
        }
    };
    ReconciledStatus {
        payment_status: new_payment,
        order_status: new_order,
        changed: new_payment != payment_status || new_order != order_status,
        newly_paid: payment_status != PaymentStatus::Completed && new_payment == PaymentStatus::Completed,
    }
}
