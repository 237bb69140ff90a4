//! Tenant columns, read from `information_schema.columns` at call time.

use super::finish_transaction;
use crate::error::{storage, AppError};
use crate::sql;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};

/// Column requested by a caller for `CREATE TABLE` or `ADD COLUMN`.
/// `default` is written as a literal, never as an expression.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub position: i32,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub primary: bool,
    pub default_value: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for ColumnInfo {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(ColumnInfo {
            name: row.try_get("name")?,
            position: row.try_get("position")?,
            data_type: row.try_get("data_type")?,
            nullable: row.try_get("nullable")?,
            primary: row.try_get("is_primary")?,
            default_value: row.try_get("default_value")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ColumnRepository {
    pool: PgPool,
}

impl ColumnRepository {
    pub fn new(pool: PgPool) -> Self {
        ColumnRepository { pool }
    }

    pub async fn list(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>, AppError> {
        sqlx::query_as::<_, ColumnInfo>(
            r#"SELECT c.column_name::text AS name,
                      c.ordinal_position::int4 AS position,
                      c.data_type::text AS data_type,
                      c.is_nullable = 'YES' AS nullable,
                      c.column_default::text AS default_value,
                      EXISTS (
                          SELECT 1
                          FROM information_schema.table_constraints tc
                          JOIN information_schema.key_column_usage k
                            ON k.constraint_name = tc.constraint_name
                           AND k.table_schema = tc.table_schema
                           AND k.table_name = tc.table_name
                          WHERE tc.constraint_type = 'PRIMARY KEY'
                            AND tc.table_schema = c.table_schema
                            AND tc.table_name = c.table_name
                            AND k.column_name = c.column_name
                      ) AS is_primary
               FROM information_schema.columns c
               WHERE c.table_schema = $1 AND c.table_name = $2
               ORDER BY c.ordinal_position"#,
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("select", "ColumnRepository::list"))
    }

    /// How many of `names` exist on the table.
    async fn count_existing(&self, schema: &str, table: &str, names: &[String], method: &'static str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(DISTINCT column_name) FROM information_schema.columns
               WHERE table_schema = $1 AND table_name = $2 AND column_name::text = ANY($3)"#,
        )
        .bind(schema)
        .bind(table)
        .bind(names)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("select", method))
    }

    pub async fn has(&self, schema: &str, table: &str, column: &str) -> Result<bool, AppError> {
        let names = [column.to_string()];
        Ok(self.count_existing(schema, table, &names, "ColumnRepository::has").await? == 1)
    }

    pub async fn has_all(&self, schema: &str, table: &str, columns: &[String]) -> Result<bool, AppError> {
        let mut distinct = columns.to_vec();
        distinct.sort();
        distinct.dedup();
        let found = self.count_existing(schema, table, &distinct, "ColumnRepository::has_all").await?;
        Ok(found == distinct.len() as i64)
    }

    pub async fn has_any(&self, schema: &str, table: &str, columns: &[String]) -> Result<bool, AppError> {
        Ok(self.count_existing(schema, table, columns, "ColumnRepository::has_any").await? > 0)
    }

    /// Add every column in one transaction; either all are added or none.
    pub async fn add(&self, schema: &str, table: &str, columns: &[ColumnDefinition]) -> Result<Vec<ColumnInfo>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("transactionBegin", "ColumnRepository::add"))?;
        let mut result = Ok(());
        for column in columns {
            if let Err(e) = sqlx::query(&sql::add_column(schema, table, column))
                .execute(&mut *tx)
                .await
            {
                result = Err(storage("alter", "ColumnRepository::add")(e));
                break;
            }
        }
        finish_transaction(tx, result, "ColumnRepository::add").await?;
        self.list(schema, table).await
    }

    pub async fn rename(&self, schema: &str, table: &str, column: &str, new_name: &str) -> Result<(), AppError> {
        sqlx::query(&sql::rename_column(schema, table, column, new_name))
            .execute(&self.pool)
            .await
            .map_err(storage("alter", "ColumnRepository::rename"))?;
        Ok(())
    }

    pub async fn drop(&self, schema: &str, table: &str, column: &str) -> Result<(), AppError> {
        sqlx::query(&sql::drop_column(schema, table, column))
            .execute(&self.pool)
            .await
            .map_err(storage("alter", "ColumnRepository::drop"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_definition_defaults_to_nullable_plain_column() {
        let c: ColumnDefinition = serde_json::from_value(json!({"name": "title", "type": "text"})).unwrap();

        assert!(c.nullable);
        assert!(!c.primary);
        assert!(!c.unique);
        assert_eq!(c.default, None);
    }
}
