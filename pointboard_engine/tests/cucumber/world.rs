use std::fmt::Debug;

use cucumber::World;
use log::*;
use pointboard_engine::{
    db_types::{Order, OrderNumber},
    events::EventProducers,
    helpers::{OrderNumberFormat, OrderNumberGenerator},
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    OrderFlowApi,
    OrderFlowError,
    ReconciliationApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct PointBoardWorld {
    pub system: Option<ShopSystem>,
    /// The order number of the most recently created order
    pub last_order: Option<OrderNumber>,
    /// The result of the last operation that was expected to be able to fail
    pub last_error: Option<OrderFlowError>,
}

pub struct ShopSystem {
    pub db_path: String,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: ReconciliationApi<SqliteDatabase>,
}

impl Debug for ShopSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShopSystem ({})", self.db_path)
    }
}

impl PointBoardWorld {
    pub fn system(&self) -> &ShopSystem {
        self.system.as_ref().expect("The shop system has not been initialised")
    }

    pub fn last_order(&self) -> OrderNumber {
        self.last_order.clone().expect("No order has been created yet")
    }

    pub async fn fetch_order(&self, order_number: &OrderNumber) -> Order {
        self.system().orders.fetch_order(order_number).await.expect("Error fetching order")
    }
}

impl ShopSystem {
    pub async fn new(prefix: &str) -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let format = OrderNumberFormat::new(prefix).expect("Invalid order number prefix");
        let producers = EventProducers::default();
        let orders = OrderFlowApi::new(db.clone(), OrderNumberGenerator::new(format.clone()), producers.clone());
        let payments = ReconciliationApi::new(db, format, producers);
        Self { db_path: url, orders, payments }
    }
}
