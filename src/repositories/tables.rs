//! Tenant tables, read from `information_schema.tables` at call time.

use super::ColumnDefinition;
use crate::error::{storage, AppError};
use crate::sql;
use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};

const SELECT_TABLES: &str = r#"
SELECT t.table_schema::text AS schema,
       t.table_name::text AS name,
       COALESCE(s.n_live_tup, 0) AS estimated_rows,
       pg_size_pretty(pg_total_relation_size(format('%I.%I', t.table_schema, t.table_name)::regclass)) AS total_size
FROM information_schema.tables t
LEFT JOIN pg_stat_user_tables s ON s.schemaname = t.table_schema AND s.relname = t.table_name
WHERE t.table_schema = $1 AND t.table_type = 'BASE TABLE'"#;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub estimated_rows: i64,
    pub total_size: String,
}

impl<'r> FromRow<'r, PgRow> for TableInfo {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(TableInfo {
            schema: row.try_get("schema")?,
            name: row.try_get("name")?,
            estimated_rows: row.try_get("estimated_rows")?,
            total_size: row.try_get("total_size")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TableRepository {
    pool: PgPool,
}

impl TableRepository {
    pub fn new(pool: PgPool) -> Self {
        TableRepository { pool }
    }

    pub async fn list(&self, schema: &str) -> Result<Vec<TableInfo>, AppError> {
        let sql = format!("{} ORDER BY t.table_name", SELECT_TABLES);
        sqlx::query_as::<_, TableInfo>(&sql)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("select", "TableRepository::list"))
    }

    pub async fn exists(&self, schema: &str, table: &str) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("select", "TableRepository::exists"))
    }

    pub async fn get(&self, schema: &str, table: &str) -> Result<TableInfo, AppError> {
        let sql = format!("{} AND t.table_name = $2", SELECT_TABLES);
        sqlx::query_as::<_, TableInfo>(&sql)
            .bind(schema)
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch", "TableRepository::get"))?
            .ok_or(AppError::NotFound("table.error.notFound"))
    }

    pub async fn create(&self, schema: &str, table: &str, columns: &[ColumnDefinition]) -> Result<TableInfo, AppError> {
        sqlx::query(&sql::create_table(schema, table, columns))
            .execute(&self.pool)
            .await
            .map_err(storage("create", "TableRepository::create"))?;
        self.get(schema, table).await
    }

    pub async fn rename(&self, schema: &str, table: &str, new_name: &str) -> Result<TableInfo, AppError> {
        sqlx::query(&sql::rename_table(schema, table, new_name))
            .execute(&self.pool)
            .await
            .map_err(storage("alter", "TableRepository::rename"))?;
        self.get(schema, new_name).await
    }

    pub async fn drop(&self, schema: &str, table: &str) -> Result<(), AppError> {
        sqlx::query(&sql::drop_table(schema, table))
            .execute(&self.pool)
            .await
            .map_err(storage("drop", "TableRepository::drop"))?;
        Ok(())
    }
}
