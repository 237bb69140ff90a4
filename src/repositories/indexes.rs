//! Tenant indexes from `pg_indexes` joined to `pg_index` for flags.

use crate::error::{storage, AppError};
use crate::sql;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};

const SELECT_INDEXES: &str = r#"
SELECT i.indexname::text AS name,
       i.tablename::text AS table_name,
       i.indexdef AS definition,
       ix.indisunique AS is_unique,
       ix.indisprimary AS is_primary,
       pg_size_pretty(pg_relation_size(c.oid)) AS size
FROM pg_indexes i
JOIN pg_namespace n ON n.nspname = i.schemaname
JOIN pg_class c ON c.relname = i.indexname AND c.relnamespace = n.oid
JOIN pg_index ix ON ix.indexrelid = c.oid
WHERE i.schemaname = $1"#;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: String,
    pub table_name: String,
    pub definition: String,
    pub unique: bool,
    pub primary: bool,
    pub size: String,
}

impl<'r> FromRow<'r, PgRow> for IndexInfo {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(IndexInfo {
            name: row.try_get("name")?,
            table_name: row.try_get("table_name")?,
            definition: row.try_get("definition")?,
            unique: row.try_get("is_unique")?,
            primary: row.try_get("is_primary")?,
            size: row.try_get("size")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct IndexRepository {
    pool: PgPool,
}

impl IndexRepository {
    pub fn new(pool: PgPool) -> Self {
        IndexRepository { pool }
    }

    pub async fn list(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>, AppError> {
        let sql = format!("{} AND i.tablename = $2 ORDER BY i.indexname", SELECT_INDEXES);
        sqlx::query_as::<_, IndexInfo>(&sql)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("select", "IndexRepository::list"))
    }

    pub async fn get(&self, schema: &str, table: &str, name: &str) -> Result<IndexInfo, AppError> {
        let sql = format!("{} AND i.tablename = $2 AND i.indexname = $3", SELECT_INDEXES);
        sqlx::query_as::<_, IndexInfo>(&sql)
            .bind(schema)
            .bind(table)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch", "IndexRepository::get"))?
            .ok_or(AppError::NotFound("index.error.notFound"))
    }

    /// Index names are unique per schema, so no table is needed.
    pub async fn has(&self, schema: &str, name: &str) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_indexes WHERE schemaname = $1 AND indexname = $2)",
        )
        .bind(schema)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("select", "IndexRepository::has"))
    }

    pub async fn create(&self, schema: &str, table: &str, index: &IndexDefinition) -> Result<IndexInfo, AppError> {
        sqlx::query(&sql::create_index(schema, table, index))
            .execute(&self.pool)
            .await
            .map_err(storage("create", "IndexRepository::create"))?;
        self.get(schema, table, &index.name).await
    }

    pub async fn drop(&self, schema: &str, name: &str) -> Result<(), AppError> {
        sqlx::query(&sql::drop_index(schema, name))
            .execute(&self.pool)
            .await
            .map_err(storage("drop", "IndexRepository::drop"))?;
        Ok(())
    }
}
