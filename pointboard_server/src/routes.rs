//! Request handler definitions
//!
//! Define each route and its handler here. Handlers should do little more than unpack the request, call into the
//! engine API and pack the result. Anything longer belongs in the engine.
//!
//! Every handler is async and awaits the database. Never block a worker thread in a handler, since each worker
//! processes its requests sequentially.
use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use log::*;
use pointboard_engine::{
    db_types::OrderNumber,
    order_objects::{OrderQueryFilter, OrderRequest},
    traits::TransactionCorrection,
    OrderFlowApi,
    ReconciliationApi,
    ShopDatabase,
};

use crate::{
    data_objects::{
        CancelOrderRequest,
        LimitParams,
        NewOrderResponse,
        OrderSearchParams,
        OrderStatusUpdate,
        PaymentStatusUpdate,
        TransactionStatusUpdate,
        WebhookAck,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(payment_webhook => Post "/webhook/payment" impl ShopDatabase);
/// Route handler for payment gateway notifications.
///
/// The gateway gets `{"success": true}` no matter what. Bodies that cannot be parsed or stored are kept in the
/// webhook failure log instead, and matching problems never surface here. A non-200 reply would only make the gateway
/// retry a notification that we have already dealt with.
pub async fn payment_webhook<B: ShopDatabase>(body: web::Bytes, api: web::Data<ReconciliationApi<B>>) -> HttpResponse {
    let body = String::from_utf8_lossy(&body);
    trace!("💻️ Received payment notification: {body}");
    match api.process_raw_notification(&body).await {
        Ok(outcome) => match (outcome.order_reference, outcome.order) {
            (_, Some(order)) => info!(
                "💻️ Payment notification #{} reconciled with order {}",
                outcome.transaction.id, order.order_number
            ),
            (Some(reference), None) => info!(
                "💻️ Payment notification #{} refers to {reference}, but no such order exists yet",
                outcome.transaction.id
            ),
            (None, None) => info!("💻️ Payment notification #{} has no order reference", outcome.transaction.id),
        },
        Err(e) => warn!("💻️ Could not process payment notification. {e}"),
    }
    HttpResponse::Ok().json(WebhookAck::default())
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl ShopDatabase);
/// Creates a new order and returns it with its payment code.
///
/// Replies with `201 Created` for a new order. If the request proposed an order number that is already stored, the
/// existing order is returned with `200 OK`.
pub async fn create_order<B: ShopDatabase>(
    body: web::Json<OrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST new order with {} items", request.items.len());
    let result = api.create_order(request).await.map_err(|e| {
        debug!("💻️ Could not create order. {e}");
        ServerError::from(e)
    })?;
    let status = if result.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok(HttpResponse::build(status).json(NewOrderResponse::from(result)))
}

route!(search_orders => Get "/orders" impl ShopDatabase);
pub async fn search_orders<B: ShopDatabase>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = OrderQueryFilter::from(query.into_inner());
    debug!("💻️ GET orders search for [{query}]");
    let orders = api.search_orders(query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_number => Get "/order/{order_number}" impl ShopDatabase);
pub async fn order_by_number<B: ShopDatabase>(
    path: web::Path<OrderNumber>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = path.into_inner();
    debug!("💻️ GET order {order_number}");
    let details = api.fetch_order_details(&order_number).await?;
    Ok(HttpResponse::Ok().json(details))
}

route!(update_order_status => Patch "/order_status" impl ShopDatabase);
pub async fn update_order_status<B: ShopDatabase>(
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let OrderStatusUpdate { order_number, status } = body.into_inner();
    info!("💻️ Request to change the status of order {order_number} to {status}");
    let order = api.modify_order_status(&order_number, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_payment_status => Patch "/payment_status" impl ShopDatabase);
pub async fn update_payment_status<B: ShopDatabase>(
    body: web::Json<PaymentStatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PaymentStatusUpdate { order_number, status } = body.into_inner();
    info!("💻️ Request to change the payment status of order {order_number} to {status}");
    let order = api.modify_payment_status(&order_number, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/cancel" impl ShopDatabase);
pub async fn cancel_order<B: ShopDatabase>(
    body: web::Json<CancelOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let CancelOrderRequest { order_number, reason } = body.into_inner();
    info!("💻️ Request to cancel order {order_number}");
    let order = api.cancel_order(&order_number, reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Reconciliation  ----------------------------------------------------
route!(verify_payment => Get "/verify/{token}" impl ShopDatabase);
/// Reports whether a payment quoting the given order number has arrived. This is a read-only check.
pub async fn verify_payment<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let token = path.into_inner();
    debug!("💻️ GET payment verification for {token}");
    let result = api.verify_order_reference(&token).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(reconcile_order => Post "/reconcile/{order_number}" impl ShopDatabase);
/// Looks for a payment for the order and links it. Replies with `404` if either the order or a matching payment is
/// missing.
pub async fn reconcile_order<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let token = path.into_inner();
    info!("💻️ Reconciliation requested for {token}");
    let order = api.reconcile_order(&token).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Transactions  ----------------------------------------------------
route!(transactions => Get "/transactions" impl ShopDatabase);
pub async fn transactions<B: ShopDatabase>(
    query: web::Query<LimitParams>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let limit = query.limit();
    debug!("💻️ GET the {limit} most recent transactions");
    let transactions = api.fetch_recent_transactions(limit).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

route!(transaction_by_id => Get "/transactions/{id}" impl ShopDatabase);
pub async fn transaction_by_id<B: ShopDatabase>(
    path: web::Path<i64>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET transaction #{id}");
    let transaction = api.fetch_transaction(id).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

route!(update_transaction_status => Patch "/transaction_status" impl ShopDatabase);
pub async fn update_transaction_status<B: ShopDatabase>(
    body: web::Json<TransactionStatusUpdate>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let TransactionStatusUpdate { id, status } = body.into_inner();
    info!("💻️ Request to change the status of transaction #{id} to {status}");
    let transaction = api.update_transaction_status(id, status).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

route!(complete_transaction => Post "/transactions/{id}/complete" impl ShopDatabase);
/// Marks a transaction as completed by hand, optionally correcting the amount and gateway, and then tries to
/// reconcile it again. The body may be omitted.
pub async fn complete_transaction<B: ShopDatabase>(
    path: web::Path<i64>,
    body: Option<web::Json<TransactionCorrection>>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let correction = body.map(|b| b.into_inner()).unwrap_or_default();
    info!("💻️ Request to complete transaction #{id}");
    let outcome = api.complete_transaction(id, correction).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(webhook_failures => Get "/webhook_failures" impl ShopDatabase);
pub async fn webhook_failures<B: ShopDatabase>(
    query: web::Query<LimitParams>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let limit = query.limit();
    debug!("💻️ GET the {limit} most recent webhook failures");
    let failures = api.fetch_webhook_failures(limit).await?;
    Ok(HttpResponse::Ok().json(failures))
}
