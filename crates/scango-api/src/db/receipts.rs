//! Receipt persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `receipts` table.
//! Status ordering is enforced by the in-memory ledger, not in SQL; the
//! upsert simply stores whatever the ledger committed last.

use sqlx::PgPool;

use scango_state::Receipt;

/// Insert a receipt, or overwrite the stored copy of an existing one.
pub async fn upsert(pool: &PgPool, receipt: &Receipt) -> Result<(), sqlx::Error> {
    let record = serde_json::to_value(receipt).map_err(|e| {
        tracing::error!(receipt_number = %receipt.receipt_number, error = %e, "failed to serialize receipt");
        sqlx::Error::Encode(Box::new(e))
    })?;

    sqlx::query(
        "INSERT INTO receipts (receipt_number, order_hash, store_id, status, chain_sync,
         record, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (receipt_number) DO UPDATE SET
           status = EXCLUDED.status,
           chain_sync = EXCLUDED.chain_sync,
           record = EXCLUDED.record,
           updated_at = EXCLUDED.updated_at",
    )
    .bind(receipt.receipt_number.as_str())
    .bind(receipt.order_hash.as_str())
    .bind(receipt.store_id.as_str())
    .bind(receipt.status().as_str())
    .bind(receipt.chain_sync.as_str())
    .bind(&record)
    .bind(receipt.created_at)
    .bind(receipt.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every receipt, oldest first. Rows whose record no longer
/// deserializes are skipped with an error log.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Receipt>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReceiptRow>(
        "SELECT receipt_number, record FROM receipts ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(ReceiptRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ReceiptRow {
    receipt_number: String,
    record: serde_json::Value,
}

impl ReceiptRow {
    fn into_record(self) -> Option<Receipt> {
        match serde_json::from_value(self.record) {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                tracing::error!(
                    receipt_number = %self.receipt_number,
                    error = %e,
                    "stored receipt does not deserialize; skipping"
                );
                None
            }
        }
    }
}
