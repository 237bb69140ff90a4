//! Row browsing and inserts for tables whose shape is only known at call time.

use super::finish_transaction;
use crate::error::{storage, AppError};
use crate::sql::{self, QueryBuf};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, query::Query, PgPool, Postgres, Row};

pub const DEFAULT_ROW_LIMIT: u32 = 100;
/// Upper bound on rows accepted by one `insert_many`.
pub const MAX_INSERT_ROWS: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    /// Full type as printed by `format_type`, usable in a cast.
    pub data_type: String,
}

/// Ordered column name/type pairs plus primary key for one table, read from the live catalog.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDescriptor {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
}

impl RowDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn bind_all<'q>(q: &'q QueryBuf) -> Query<'q, Postgres, PgArguments> {
    q.params
        .iter()
        .fold(sqlx::query(&q.sql), |query, p| query.bind(p.as_deref()))
}

#[derive(Clone, Debug)]
pub struct RowRepository {
    pool: PgPool,
}

impl RowRepository {
    pub fn new(pool: PgPool) -> Self {
        RowRepository { pool }
    }

    /// Fails with `NotFound("table.error.notFound")` when the table has no visible columns.
    pub async fn describe(&self, schema: &str, table: &str) -> Result<RowDescriptor, AppError> {
        let rows = sqlx::query(
            r#"SELECT a.attname::text AS name,
                      format_type(a.atttypid, a.atttypmod) AS data_type,
                      COALESCE(a.attnum = ANY(i.indkey), false) AS is_primary
               FROM pg_attribute a
               JOIN pg_class c ON c.oid = a.attrelid
               JOIN pg_namespace n ON n.oid = c.relnamespace
               LEFT JOIN pg_index i ON i.indrelid = c.oid AND i.indisprimary
               WHERE n.nspname = $1 AND c.relname = $2 AND c.relkind IN ('r', 'p')
                 AND a.attnum > 0 AND NOT a.attisdropped
               ORDER BY a.attnum"#,
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("select", "RowRepository::describe"))?;
        if rows.is_empty() {
            return Err(AppError::NotFound("table.error.notFound"));
        }

        let mut columns = Vec::with_capacity(rows.len());
        let mut primary_key = Vec::new();
        for row in rows {
            let name: String = row.try_get("name").map_err(storage("decode", "RowRepository::describe"))?;
            let data_type: String = row
                .try_get("data_type")
                .map_err(storage("decode", "RowRepository::describe"))?;
            let is_primary: bool = row
                .try_get("is_primary")
                .map_err(storage("decode", "RowRepository::describe"))?;
            if is_primary {
                primary_key.push(name.clone());
            }
            columns.push(ColumnDescriptor { name, data_type });
        }
        Ok(RowDescriptor {
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
            primary_key,
        })
    }

    /// Rows as JSON objects. Any row failing to decode fails the whole call.
    pub async fn list(
        &self,
        schema: &str,
        table: &str,
        filters: &[(String, Value)],
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, AppError> {
        let desc = self.describe(schema, table).await?;
        let q = sql::select_rows(&desc, filters, limit, offset);
        let rows = bind_all(&q)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("select", "RowRepository::list"))?;
        rows.iter()
            .map(|r| r.try_get::<Value, _>("row"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage("decode", "RowRepository::list"))
    }

    pub async fn count(&self, schema: &str, table: &str, filters: &[(String, Value)]) -> Result<i64, AppError> {
        let desc = self.describe(schema, table).await?;
        let q = sql::count_rows(&desc, filters);
        let row = bind_all(&q)
            .fetch_one(&self.pool)
            .await
            .map_err(storage("select", "RowRepository::count"))?;
        row.try_get::<i64, _>(0).map_err(storage("decode", "RowRepository::count"))
    }

    /// Insert every row in one transaction and return them as stored.
    pub async fn insert_many(&self, schema: &str, table: &str, rows: &[Map<String, Value>]) -> Result<Vec<Value>, AppError> {
        if rows.len() > MAX_INSERT_ROWS {
            return Err(AppError::Validation(format!(
                "at most {} rows can be inserted at once",
                MAX_INSERT_ROWS
            )));
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let desc = self.describe(schema, table).await?;
        let queries = rows
            .iter()
            .map(|row| sql::insert_row(&desc, row))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("transactionBegin", "RowRepository::insert_many"))?;
        let mut inserted = Vec::with_capacity(queries.len());
        let mut result = Ok(());
        for q in &queries {
            let outcome = match bind_all(q).fetch_one(&mut *tx).await {
                Ok(row) => row.try_get::<Value, _>("row").map_err(storage("decode", "RowRepository::insert_many")),
                Err(e) => Err(storage("insert", "RowRepository::insert_many")(e)),
            };
            match outcome {
                Ok(value) => inserted.push(value),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        finish_transaction(tx, result, "RowRepository::insert_many").await?;
        Ok(inserted)
    }
}
