use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatus, PaymentStatus},
    events::{EventProducers, OrderAnnulledEvent, OrderCreatedEvent, OrderPaidEvent},
    helpers::OrderNumberGenerator,
    order_objects::{compute_totals, CreateOrderResult, OrderDetails, OrderQueryFilter, OrderRequest},
    traits::{OrderFlowError, OrderManagement},
};

/// The default VAT rate, used when neither the configuration nor the order specifies one.
pub const DEFAULT_VAT_RATE: f64 = 0.10;

/// `OrderFlowApi` is the primary API for creating orders and moving them through their life cycle.
pub struct OrderFlowApi<B> {
    db: B,
    generator: OrderNumberGenerator,
    producers: EventProducers,
    default_vat_rate: f64,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.generator.format().prefix())
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, generator: OrderNumberGenerator, producers: EventProducers) -> Self {
        Self { db, generator, producers, default_vat_rate: DEFAULT_VAT_RATE }
    }

    pub fn with_default_vat_rate(mut self, rate: f64) -> Self {
        self.default_vat_rate = rate;
        self
    }

    pub fn generator(&self) -> &OrderNumberGenerator {
        &self.generator
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Validates and prices the order, assigns it an order number, and stores it with its items.
    ///
    /// A well-formed order number proposed by the client is honoured. If an order already exists under that number,
    /// it is returned unchanged with `created == false`, so that a storefront can safely retry a submission.
    /// Otherwise a fresh number is generated. Should another request claim the same number between the check and the
    /// insert, a new number is drawn, up to the generator's attempt budget.
    pub async fn create_order(&self, request: OrderRequest) -> Result<CreateOrderResult, OrderFlowError> {
        let vat_rate = request.vat_rate.unwrap_or(self.default_vat_rate);
        request.validate(vat_rate)?;
        let totals = compute_totals(&request.items, request.include_vat, vat_rate, request.total_policy())?;
        let proposed = request.order_number.as_deref().and_then(|n| {
            if self.generator.format().is_well_formed(n) {
                Some(OrderNumber::new(n))
            } else {
                warn!("🔄️ Ignoring malformed client order number '{n}'. A new one will be generated.");
                None
            }
        });
        if let Some(number) = &proposed {
            if let Some(details) = self.existing_order(number).await? {
                info!("🔄️ Order {number} already exists. Returning it unchanged.");
                return Ok(CreateOrderResult { details, created: false });
            }
        }
        let payment_method = request.payment_method();
        let mut order = NewOrder {
            order_number: OrderNumber::new(""),
            frontend_order_ref: request.frontend_order_ref,
            customer: request.customer,
            shipping_address: request.shipping_address,
            payment_method,
            items: request.items,
            subtotal: totals.subtotal,
            include_vat: request.include_vat,
            vat_rate,
            vat_amount: totals.vat_amount,
            total_amount: totals.total_amount,
        };
        let budget = self.generator.max_attempts();
        let honoured = proposed.is_some();
        let mut proposed = proposed;
        for attempt in 1..=budget {
            let number = match proposed.take() {
                Some(n) => n,
                None => self.generate_order_number().await?,
            };
            order = order.with_order_number(number.clone());
            match self.db.insert_order(order.clone()).await {
                Ok(stored) => {
                    let details = self.details_for(stored).await?;
                    info!("🔄️ Order {number} created. Total: {}", details.order.total_amount);
                    let event = OrderCreatedEvent::new(details.order.clone(), details.items.clone());
                    self.producers.publish_order_created(event).await;
                    return Ok(CreateOrderResult { details, created: true });
                },
                Err(OrderFlowError::OrderNumberExists(n)) => {
                    // A client-proposed number that was claimed in the meantime is still an idempotent retry.
                    // Generated numbers are never shared, so those are always drawn again.
                    if honoured && attempt == 1 {
                        if let Some(details) = self.existing_order(&n).await? {
                            return Ok(CreateOrderResult { details, created: false });
                        }
                    }
                    debug!("🔄️ Order number {n} was claimed concurrently (attempt {attempt}/{budget}). Drawing again.");
                },
                Err(e) => return Err(e),
            }
        }
        warn!("🔄️ Every order number drawn for this order was claimed by a concurrent request");
        Err(OrderFlowError::GenerationExhausted(budget))
    }

    async fn generate_order_number(&self) -> Result<OrderNumber, OrderFlowError> {
        let db = &self.db;
        self.generator.generate(|n| async move { db.order_number_exists(&n).await }).await
    }

    async fn existing_order(&self, order_number: &OrderNumber) -> Result<Option<OrderDetails>, OrderFlowError> {
        match self.db.fetch_order_by_number(order_number).await? {
            Some(order) => Ok(Some(self.details_for(order).await?)),
            None => Ok(None),
        }
    }

    async fn details_for(&self, order: Order) -> Result<OrderDetails, OrderFlowError> {
        let items = self.db.fetch_order_items(order.id).await?;
        Ok(OrderDetails { order, items })
    }

    /// Fetches the order with its line items.
    pub async fn fetch_order_details(&self, order_number: &OrderNumber) -> Result<OrderDetails, OrderFlowError> {
        self.existing_order(order_number).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_number.clone()))
    }

    pub async fn fetch_order(&self, order_number: &OrderNumber) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.clone()))
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    /// Moves the order one step along its fulfilment path, or cancels it.
    ///
    /// | From \ To  | Confirmed | Processing | Shipped | Delivered | Cancelled |
    /// |------------|-----------|------------|---------|-----------|-----------|
    /// | Pending    | ✔         |            |         |           | ✔         |
    /// | Confirmed  |           | ✔          |         |           | ✔         |
    /// | Processing |           |            | ✔       |           | ✔         |
    /// | Shipped    |           |            |         | ✔         |           |
    /// | Delivered  |           |            |         |           |           |
    /// | Cancelled  |           |            |         |           |           |
    ///
    /// Setting the current status again fails with [`OrderFlowError::OrderModificationNoOp`]. Any other change fails
    /// with [`OrderFlowError::InvalidTransition`].
    pub async fn modify_order_status(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatus,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_number).await?;
        let old_status = order.order_status;
        if old_status == new_status {
            debug!("🔄️ Order {order_number} is already {new_status}");
            return Err(OrderFlowError::OrderModificationNoOp);
        }
        if !old_status.can_transition_to(new_status) {
            return Err(invalid_transition(order_number, "order", old_status, new_status));
        }
        let updated = self
            .db
            .update_order_status(order_number, old_status, new_status)
            .await?
            .ok_or_else(|| OrderFlowError::ConcurrentModification(order_number.clone()))?;
        info!("🔄️ Order {order_number} moved from {old_status} to {new_status}");
        if new_status == OrderStatus::Cancelled {
            let event = OrderAnnulledEvent::new(updated.clone(), old_status, None);
            self.producers.publish_order_annulled(event).await;
        }
        Ok(updated)
    }

    /// Cancels the order. Only pending, confirmed and processing orders can be cancelled.
    pub async fn cancel_order(&self, order_number: &OrderNumber, reason: Option<String>) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_number).await?;
        let old_status = order.order_status;
        if !old_status.is_cancellable() {
            return Err(invalid_transition(order_number, "order", old_status, OrderStatus::Cancelled));
        }
        let updated = self
            .db
            .update_order_status(order_number, old_status, OrderStatus::Cancelled)
            .await?
            .ok_or_else(|| OrderFlowError::ConcurrentModification(order_number.clone()))?;
        info!(
            "🔄️ Order {order_number} has been cancelled. Reason: {}",
            reason.as_deref().unwrap_or("No reason given")
        );
        let event = OrderAnnulledEvent::new(updated.clone(), old_status, reason);
        self.producers.publish_order_annulled(event).await;
        Ok(updated)
    }

    /// Changes the payment status of an order by hand. See [`PaymentStatus::can_transition_to`] for the legal moves.
    pub async fn modify_payment_status(
        &self,
        order_number: &OrderNumber,
        new_status: PaymentStatus,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_number).await?;
        let old_status = order.payment_status;
        if old_status == new_status {
            debug!("🔄️ Payment for order {order_number} is already {new_status}");
            return Err(OrderFlowError::OrderModificationNoOp);
        }
        if !old_status.can_transition_to(new_status) {
            return Err(invalid_transition(order_number, "payment", old_status, new_status));
        }
        let updated = self
            .db
            .update_payment_status(order_number, old_status, new_status)
            .await?
            .ok_or_else(|| OrderFlowError::ConcurrentModification(order_number.clone()))?;
        info!("🔄️ Payment for order {order_number} moved from {old_status} to {new_status}");
        if new_status == PaymentStatus::Completed {
            self.producers.publish_order_paid(OrderPaidEvent::new(updated.clone(), None)).await;
        }
        Ok(updated)
    }
}

fn invalid_transition<S: ToString>(order_number: &OrderNumber, kind: &'static str, from: S, to: S) -> OrderFlowError {
    let (from, to) = (from.to_string(), to.to_string());
    warn!("🔄️ Rejected {kind} status change for {order_number}: {from} -> {to}");
    OrderFlowError::InvalidTransition { order_number: order_number.clone(), kind, from, to }
}
