//! Read snapshot for connection queries.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::trace;

use waypoint_core::error::{StorageError, StorageResult};
use waypoint_core::ports::{Filter, RangeScan, RangeSource};

use super::helpers::{count_query, scan_query, TableSpec};

/// Range source over one table inside a `REPEATABLE READ, READ ONLY`
/// transaction, so a count and the page fetched after it see the same rows.
///
/// `R` is the row type decoded from the table. The transaction is rolled
/// back when the snapshot is dropped without [`finish`](PgSnapshot::finish).
pub struct PgSnapshot<R> {
    tx: Mutex<Transaction<'static, Postgres>>,
    table: &'static TableSpec,
    _row: PhantomData<fn() -> R>,
}

impl<R> PgSnapshot<R> {
    /// Open a snapshot on `table`.
    pub async fn begin(pool: &PgPool, table: &'static TableSpec) -> StorageResult<Self> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        trace!(table = table.name, "Snapshot opened");

        Ok(Self {
            tx: Mutex::new(tx),
            table,
            _row: PhantomData,
        })
    }

    /// Release the snapshot.
    pub async fn finish(self) -> StorageResult<()> {
        self.tx
            .into_inner()
            .commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))
    }
}

#[async_trait]
impl<R, T> RangeSource<T> for PgSnapshot<R>
where
    R: for<'r> FromRow<'r, PgRow> + Into<T> + Send + Unpin,
    T: Send,
{
    async fn count(&self, filter: &Filter) -> StorageResult<i64> {
        let mut qb = count_query(self.table, filter)?;
        let mut tx = self.tx.lock().await;

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(count)
    }

    async fn scan(&self, filter: &Filter, scan: &RangeScan<'_>) -> StorageResult<Vec<T>> {
        let mut qb = scan_query(self.table, filter, scan)?;
        let mut tx = self.tx.lock().await;

        let rows: Vec<R> = qb
            .build_query_as()
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
