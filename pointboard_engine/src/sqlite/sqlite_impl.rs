//! `SqliteDatabase` is a concrete implementation of a PointBoard engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, new_pool, orders, transactions, webhook_failures};
use crate::{
    db_types::{
        NewOrder,
        NewTransaction,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatus,
        PaymentStatus,
        Transaction,
        TransactionStatus,
        WebhookFailure,
    },
    order_objects::OrderQueryFilter,
    traits::{NarrationField, OrderFlowError, OrderManagement, ShopDatabase, TransactionCorrection, TransactionStore},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl ShopDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_number_exists(&self, order_number: &OrderNumber) -> Result<bool, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let exists = orders::order_number_exists(order_number, &mut conn).await?;
        Ok(exists)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_number: &OrderNumber,
        expected: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(order_number, expected, new_status, &mut conn).await
    }

    async fn update_payment_status(
        &self,
        order_number: &OrderNumber,
        expected: PaymentStatus,
        new_status: PaymentStatus,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_payment_status(order_number, expected, new_status, &mut conn).await
    }

    async fn link_transaction(
        &self,
        order_number: &OrderNumber,
        transaction_id: i64,
        expected: (PaymentStatus, OrderStatus),
        new_statuses: (PaymentStatus, OrderStatus),
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::link_transaction(order_number, transaction_id, expected, new_statuses, &mut conn).await
    }
}

impl TransactionStore for SqliteDatabase {
    async fn record_transaction(&self, transaction: NewTransaction) -> Result<Transaction, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        transactions::insert_transaction(transaction, &mut conn).await
    }

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction(id, &mut conn).await?;
        Ok(tx)
    }

    async fn fetch_recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let txs = transactions::fetch_recent_transactions(limit, &mut conn).await?;
        Ok(txs)
    }

    async fn fetch_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction_by_reference(reference, &mut conn).await?;
        Ok(tx)
    }

    async fn search_transaction_narrations(
        &self,
        field: NarrationField,
        needle: &str,
    ) -> Result<Vec<Transaction>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let txs = transactions::search_narrations(field, needle, &mut conn).await?;
        Ok(txs)
    }

    async fn update_transaction_status(
        &self,
        id: i64,
        expected: TransactionStatus,
        new_status: TransactionStatus,
    ) -> Result<Option<Transaction>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        transactions::update_status(id, expected, new_status, &mut conn).await
    }

    async fn complete_transaction(
        &self,
        id: i64,
        correction: TransactionCorrection,
    ) -> Result<Option<Transaction>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        transactions::complete_transaction(id, correction, &mut conn).await
    }

    async fn record_webhook_failure(&self, payload: &str, error: &str) -> Result<WebhookFailure, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let failure = webhook_failures::insert_failure(payload, error, &mut conn).await?;
        warn!("🗃️ Webhook failure #{} recorded: {error}", failure.id);
        Ok(failure)
    }

    async fn fetch_webhook_failures(&self, limit: i64) -> Result<Vec<WebhookFailure>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let failures = webhook_failures::fetch_recent_failures(limit, &mut conn).await?;
        Ok(failures)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `PB_DATABASE_URL` environment variable (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Running the migrations on an up-to-date database is a no-op.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
