//! Customer and back-office notifications.
//!
//! The server does not send any email itself. These hooks record what would be sent, so that a mailer (or any other
//! integration) can be wired in by replacing them.
use log::*;
use pointboard_engine::events::{EventFuture, EventHooks};

pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| {
            Box::pin(async move {
                let order = &ev.order;
                info!(
                    "📬️ Order {} received for {} ({} items, total {}). Awaiting payment.",
                    order.order_number,
                    order.customer_name,
                    ev.items.len(),
                    order.total_amount
                );
            }) as EventFuture
        })
        .on_order_paid(|ev| {
            Box::pin(async move {
                let order = &ev.order;
                let source = match &ev.transaction {
                    Some(tx) => format!("transaction #{} ({})", tx.id, tx.reference_code),
                    None => "a manual update".to_string(),
                };
                info!("📬️ Payment confirmed for order {} via {source}.", order.order_number);
                if let Some(email) = &order.customer_email {
                    debug!("📬️ Payment confirmation for {} would go to {email}", order.order_number);
                }
            }) as EventFuture
        })
        .on_order_annulled(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ Order {} was cancelled (was {}). Reason: {}",
                    ev.order.order_number,
                    ev.previous_status,
                    ev.reason.as_deref().unwrap_or("none given")
                );
            }) as EventFuture
        });
    hooks
}
