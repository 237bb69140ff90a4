//! Read-only database statistics from PostgreSQL's statistics views.

use crate::error::{storage, AppError};
use serde::Serialize;
use sqlx::PgPool;

/// Indexes scanned fewer times than this are reported as unused.
pub const UNUSED_INDEX_SCAN_THRESHOLD: i64 = 50;
/// Number of slowest statements reported.
pub const SLOW_QUERY_LIMIT: i64 = 5;

const UNUSED_INDEXES_SQL: &str = r#"SELECT relname::text AS table_name,
       indexrelname::text AS index_name,
       idx_scan AS index_scans,
       pg_size_pretty(pg_relation_size(indexrelid)) AS index_size
FROM pg_stat_user_indexes
WHERE idx_scan < $1
ORDER BY idx_scan, indexrelname"#;

fn slow_queries_sql(total: &str, mean: &str) -> String {
    format!(
        "SELECT query, calls, {total}::float8 AS total_time, {mean}::float8 AS mean_time \
         FROM pg_stat_statements ORDER BY {total} DESC LIMIT $1"
    )
}

/// SQLSTATE 55000: `pg_stat_statements` installed but not preloaded.
const OBJECT_NOT_IN_PREREQUISITE_STATE: &str = "55000";

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UnusedIndex {
    pub table_name: String,
    pub index_name: String,
    pub index_scans: i64,
    pub index_size: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SlowQuery {
    pub query: String,
    pub calls: i64,
    pub total_time: f64,
    pub mean_time: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IndexScan {
    pub table_name: String,
    pub index_scans: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TableSize {
    pub table_name: String,
    pub total_size: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TableRowCount {
    pub table_name: String,
    pub estimated_row_count: i64,
}

/// Every statistic in one payload. `slow_queries` is `None` when `pg_stat_statements` is unavailable.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub total_database_size: String,
    pub total_index_size: String,
    pub unused_indexes: Vec<UnusedIndex>,
    pub slow_queries: Option<Vec<SlowQuery>>,
    pub index_scans_per_table: Vec<IndexScan>,
    pub size_per_table: Vec<TableSize>,
    pub row_count_per_table: Vec<TableRowCount>,
}

#[derive(Clone, Debug)]
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self {
        StatsRepository { pool }
    }

    pub async fn total_database_size(&self) -> Result<String, AppError> {
        sqlx::query_scalar::<_, String>("SELECT pg_size_pretty(pg_database_size(current_database()))")
            .fetch_one(&self.pool)
            .await
            .map_err(storage("select", "StatsRepository::total_database_size"))
    }

    pub async fn total_index_size(&self) -> Result<String, AppError> {
        sqlx::query_scalar::<_, String>(
            "SELECT pg_size_pretty(COALESCE(sum(pg_relation_size(indexrelid)), 0)::bigint) FROM pg_stat_user_indexes",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage("select", "StatsRepository::total_index_size"))
    }

    /// Indexes with fewer than [`UNUSED_INDEX_SCAN_THRESHOLD`] scans, least used first.
    pub async fn unused_indexes(&self) -> Result<Vec<UnusedIndex>, AppError> {
        sqlx::query_as::<_, UnusedIndex>(UNUSED_INDEXES_SQL)
        .bind(UNUSED_INDEX_SCAN_THRESHOLD)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("select", "StatsRepository::unused_indexes"))
    }

    /// Top [`SLOW_QUERY_LIMIT`] statements by total time.
    ///
    /// Fails with `Unavailable` when `pg_stat_statements` is not installed or not preloaded.
    pub async fn slow_queries(&self) -> Result<Vec<SlowQuery>, AppError> {
        let (total, mean) = self.statement_time_columns().await?;
        let sql = slow_queries_sql(total, mean);
        sqlx::query_as::<_, SlowQuery>(&sql)
            .bind(SLOW_QUERY_LIMIT)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.code().as_deref() == Some(OBJECT_NOT_IN_PREREQUISITE_STATE) => {
                    AppError::Unavailable(db.message().to_string())
                }
                other => storage("select", "StatsRepository::slow_queries")(other),
            })
    }

    /// PostgreSQL 13 renamed `total_time`/`mean_time` to `total_exec_time`/`mean_exec_time`.
    async fn statement_time_columns(&self) -> Result<(&'static str, &'static str), AppError> {
        let has_exec_time = sqlx::query_scalar::<_, Option<bool>>(
            r#"SELECT CASE WHEN to_regclass('pg_stat_statements') IS NULL THEN NULL
                      ELSE EXISTS (SELECT 1 FROM pg_attribute
                                   WHERE attrelid = to_regclass('pg_stat_statements')
                                     AND attname = 'total_exec_time' AND NOT attisdropped)
                      END"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage("select", "StatsRepository::statement_time_columns"))?;
        match has_exec_time {
            None => Err(AppError::Unavailable("pg_stat_statements is not installed".into())),
            Some(true) => Ok(("total_exec_time", "mean_exec_time")),
            Some(false) => Ok(("total_time", "mean_time")),
        }
    }

    pub async fn index_scans_per_table(&self) -> Result<Vec<IndexScan>, AppError> {
        sqlx::query_as::<_, IndexScan>(
            r#"SELECT relname::text AS table_name, COALESCE(idx_scan, 0) AS index_scans
               FROM pg_stat_user_tables
               ORDER BY index_scans DESC, relname"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage("select", "StatsRepository::index_scans_per_table"))
    }

    pub async fn size_per_table(&self) -> Result<Vec<TableSize>, AppError> {
        sqlx::query_as::<_, TableSize>(
            r#"SELECT relname::text AS table_name,
                      pg_size_pretty(pg_total_relation_size(relid)) AS total_size
               FROM pg_catalog.pg_statio_user_tables
               ORDER BY pg_total_relation_size(relid) DESC, relname"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage("select", "StatsRepository::size_per_table"))
    }

    pub async fn row_count_per_table(&self) -> Result<Vec<TableRowCount>, AppError> {
        sqlx::query_as::<_, TableRowCount>(
            r#"SELECT relname::text AS table_name, n_live_tup AS estimated_row_count
               FROM pg_stat_user_tables
               ORDER BY estimated_row_count DESC, relname"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage("select", "StatsRepository::row_count_per_table"))
    }

    /// Every statistic. A missing statements extension degrades to `slow_queries: None`.
    pub async fn all(&self) -> Result<DatabaseStats, AppError> {
        let slow_queries = match self.slow_queries().await {
            Ok(queries) => Some(queries),
            Err(AppError::Unavailable(reason)) => {
                tracing::debug!(%reason, "slow query statistics unavailable");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(DatabaseStats {
            total_database_size: self.total_database_size().await?,
            total_index_size: self.total_index_size().await?,
            unused_indexes: self.unused_indexes().await?,
            slow_queries,
            index_scans_per_table: self.index_scans_per_table().await?,
            size_per_table: self.size_per_table().await?,
            row_count_per_table: self.row_count_per_table().await?,
        })
    }
}
