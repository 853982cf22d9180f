use std::time::Duration;

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpRequest,
    HttpServer,
};
use log::*;
use pointboard_engine::{
    events::{EventHandlers, EventProducers},
    helpers::{OrderNumberFormat, OrderNumberGenerator},
    OrderFlowApi,
    ReconciliationApi,
    ShopDatabase,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    notifications::notification_hooks,
    routes::{
        health,
        CancelOrderRoute,
        CompleteTransactionRoute,
        CreateOrderRoute,
        OrderByNumberRoute,
        PaymentWebhookRoute,
        ReconcileOrderRoute,
        SearchOrdersRoute,
        TransactionByIdRoute,
        TransactionsRoute,
        UpdateOrderStatusRoute,
        UpdatePaymentStatusRoute,
        UpdateTransactionStatusRoute,
        VerifyPaymentRoute,
        WebhookFailuresRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        info!("🗃️ Running database migrations on {}", db.url());
        db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    }
    let handlers = EventHandlers::new(config.event_buffer_size, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    // Fail fast on a bad prefix, rather than in every worker
    config.order_number_format()?;
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pb::access_log"))
            .configure(|cfg| configure_app(cfg, db.clone(), producers.clone(), &options))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Installs the engine APIs and every route. Shared by the server and the endpoint tests.
pub fn configure_app<B: ShopDatabase + 'static>(
    cfg: &mut ServiceConfig,
    db: B,
    producers: EventProducers,
    options: &ServerOptions,
) {
    let (orders_api, payments_api) = match build_apis(db, producers, options) {
        Ok(apis) => apis,
        Err(e) => {
            // The prefix is checked before the server starts, so this only happens with hand-built options
            error!("💻️ Could not configure the engine APIs. {e}");
            return;
        },
    };
    cfg.app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(payments_api))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(health)
        .service(PaymentWebhookRoute::<B>::new())
        .service(
            web::scope("/api")
                .service(CreateOrderRoute::<B>::new())
                .service(SearchOrdersRoute::<B>::new())
                .service(OrderByNumberRoute::<B>::new())
                .service(UpdateOrderStatusRoute::<B>::new())
                .service(UpdatePaymentStatusRoute::<B>::new())
                .service(CancelOrderRoute::<B>::new())
                .service(VerifyPaymentRoute::<B>::new())
                .service(ReconcileOrderRoute::<B>::new())
                .service(TransactionsRoute::<B>::new())
                .service(TransactionByIdRoute::<B>::new())
                .service(UpdateTransactionStatusRoute::<B>::new())
                .service(CompleteTransactionRoute::<B>::new())
                .service(WebhookFailuresRoute::<B>::new()),
        );
}

/// Rejected JSON bodies get the same `{"error": ...}` reply as every other failed request.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Rejecting request body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}

fn build_apis<B: ShopDatabase>(
    db: B,
    producers: EventProducers,
    options: &ServerOptions,
) -> Result<(OrderFlowApi<B>, ReconciliationApi<B>), ServerError> {
    let format =
        OrderNumberFormat::new(&options.order_prefix).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    let generator = OrderNumberGenerator::new(format.clone());
    let orders_api =
        OrderFlowApi::new(db.clone(), generator, producers.clone()).with_default_vat_rate(options.vat_rate);
    let payments_api = ReconciliationApi::new(db, format, producers);
    Ok((orders_api, payments_api))
}
