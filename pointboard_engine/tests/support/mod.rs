#![allow(dead_code)]
use log::*;
use pb_common::Money;
use pointboard_engine::{
    db_types::{CustomerInfo, NewOrderItem, OrderNumber},
    events::EventProducers,
    helpers::{OrderNumberFormat, OrderNumberGenerator},
    order_objects::{CreateOrderResult, OrderRequest},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderFlowApi,
    ReconciliationApi,
    ShopDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub struct TestSystem {
    pub db_path: String,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: ReconciliationApi<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db_path = random_db_path();
        prepare_test_env(&db_path).await;
        let db = SqliteDatabase::new_with_url(&db_path, 5).await.expect("Error creating database");
        let format = OrderNumberFormat::default();
        let orders = OrderFlowApi::new(db.clone(), OrderNumberGenerator::new(format.clone()), producers.clone());
        let payments = ReconciliationApi::new(db, format, producers);
        Self { db_path, orders, payments }
    }

    /// Creates a pending order for two items at 25,000 each, with 10% VAT (55,000 in total).
    pub async fn create_standard_order(&self) -> CreateOrderResult {
        self.orders.create_order(standard_order()).await.expect("Error creating order")
    }

    pub async fn tear_down(mut self) {
        if let Err(e) = self.orders.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = self.payments.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&self.db_path).await {
            warn!("🚀️ Could not remove test database {}: {e}", self.db_path);
        }
    }
}

pub fn standard_order() -> OrderRequest {
    let customer =
        CustomerInfo { name: "Nguyen Van A".into(), email: Some("a@example.com".into()), phone: Some("0901234567".into()) };
    OrderRequest::new(vec![NewOrderItem::new("tee-black-m", 2, Money::from(25_000))])
        .with_vat(true)
        .with_vat_rate(0.10)
        .with_customer(customer)
}

pub fn order_number(s: &str) -> OrderNumber {
    OrderNumber::from(s)
}
