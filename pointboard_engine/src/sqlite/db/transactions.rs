use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewTransaction, Transaction, TransactionStatus},
    traits::{NarrationField, OrderFlowError, TransactionCorrection},
};

/// Appends a transaction to the log. Re-deliveries of the same notification are stored as new rows.
pub async fn insert_transaction(
    transaction: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, OrderFlowError> {
    let stored: Transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                gateway,
                transaction_date,
                account_number,
                content,
                description,
                transfer_amount,
                reference_code,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(transaction.gateway)
    .bind(transaction.transaction_date)
    .bind(transaction.account_number)
    .bind(transaction.content)
    .bind(transaction.description)
    .bind(transaction.transfer_amount)
    .bind(transaction.reference_code)
    .bind(transaction.status)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Transaction #{} [{}] stored with status {}", stored.id, stored.reference_code, stored.status);
    Ok(stored)
}

pub async fn fetch_transaction(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tx)
}

pub async fn fetch_recent_transactions(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let txs = sqlx::query_as("SELECT * FROM transactions ORDER BY created_at DESC, id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(txs)
}

/// Returns the most recent transaction carrying the given gateway reference code (case-insensitive).
pub async fn fetch_transaction_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let tx = sqlx::query_as(
        "SELECT * FROM transactions WHERE reference_code = $1 COLLATE NOCASE ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(reference.trim())
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

/// Returns every transaction whose narration `field` contains `needle`. SQLite's `LIKE` is case-insensitive for ASCII.
pub async fn search_narrations(
    field: NarrationField,
    needle: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM transactions WHERE ");
    builder.push(field.column());
    builder.push(" LIKE ");
    builder.push_bind(format!("%{}%", escape_like(needle.trim())));
    builder.push(" ESCAPE '\\' ORDER BY created_at DESC, id DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let txs = builder.build_query_as::<Transaction>().fetch_all(conn).await?;
    Ok(txs)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Sets the status of the transaction, provided it still has the `expected` status.
pub(crate) async fn update_status(
    id: i64,
    expected: TransactionStatus,
    new_status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, OrderFlowError> {
    let tx = sqlx::query_as(
        "UPDATE transactions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(new_status)
    .bind(id)
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

/// Marks the transaction as completed, overwriting the amount and gateway if corrections are given.
pub(crate) async fn complete_transaction(
    id: i64,
    correction: TransactionCorrection,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, OrderFlowError> {
    let mut builder = QueryBuilder::new("UPDATE transactions SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(TransactionStatus::Completed);
    if let Some(amount) = correction.transfer_amount {
        builder.push(", transfer_amount = ");
        builder.push_bind(amount);
    }
    if let Some(gateway) = correction.gateway {
        builder.push(", gateway = ");
        builder.push_bind(gateway);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let tx = builder.build_query_as::<Transaction>().fetch_optional(conn).await?;
    Ok(tx)
}
