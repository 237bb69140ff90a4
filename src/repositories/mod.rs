//! Repositories bound to one tenant database.
//!
//! Nothing here knows a tenant's schema ahead of time: every operation introspects the
//! live catalog (`information_schema`, `pg_catalog`, statistics views) when called.

mod columns;
mod functions;
mod indexes;
mod rows;
mod stats;
mod tables;

pub use columns::{ColumnDefinition, ColumnInfo, ColumnRepository};
pub use functions::{FunctionInfo, FunctionRepository};
pub use indexes::{IndexDefinition, IndexInfo, IndexRepository};
pub use rows::{ColumnDescriptor, RowDescriptor, RowRepository, DEFAULT_ROW_LIMIT, MAX_INSERT_ROWS};
pub use stats::{
    DatabaseStats, IndexScan, SlowQuery, StatsRepository, TableRowCount, TableSize, UnusedIndex,
    SLOW_QUERY_LIMIT, UNUSED_INDEX_SCAN_THRESHOLD,
};
pub use tables::{TableInfo, TableRepository};

use crate::error::{storage, AppError};
use sqlx::{Postgres, Transaction};

/// Finish a multi-statement write: commit on success, roll back on failure.
/// A failed rollback is reported as its own error instead of the original one.
pub(crate) async fn finish_transaction<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, AppError>,
    method: &'static str,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(storage("transactionCommit", method))?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback()
                .await
                .map_err(|source| AppError::Rollback { method, source })?;
            Err(err)
        }
    }
}
