//! Functions and procedures defined in a tenant schema.

use crate::error::{storage, AppError};
use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};

const SELECT_FUNCTIONS: &str = r#"
SELECT p.proname::text AS name,
       CASE p.prokind WHEN 'p' THEN 'procedure' ELSE 'function' END AS kind,
       pg_get_function_result(p.oid) AS data_type,
       pg_get_functiondef(p.oid) AS definition,
       l.lanname::text AS language
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
JOIN pg_language l ON l.oid = p.prolang
WHERE n.nspname = $1 AND p.prokind IN ('f', 'p')"#;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,
    /// `function` or `procedure`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Return type; procedures have none.
    pub data_type: Option<String>,
    pub definition: String,
    pub language: String,
}

impl<'r> FromRow<'r, PgRow> for FunctionInfo {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(FunctionInfo {
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            data_type: row.try_get("data_type")?,
            definition: row.try_get("definition")?,
            language: row.try_get("language")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct FunctionRepository {
    pool: PgPool,
}

impl FunctionRepository {
    pub fn new(pool: PgPool) -> Self {
        FunctionRepository { pool }
    }

    pub async fn list(&self, schema: &str) -> Result<Vec<FunctionInfo>, AppError> {
        let sql = format!("{} ORDER BY p.proname, p.oid", SELECT_FUNCTIONS);
        sqlx::query_as::<_, FunctionInfo>(&sql)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("select", "FunctionRepository::list"))
    }

    /// First overload by oid when the name is overloaded.
    pub async fn get(&self, schema: &str, name: &str) -> Result<FunctionInfo, AppError> {
        let sql = format!("{} AND p.proname = $2 ORDER BY p.oid LIMIT 1", SELECT_FUNCTIONS);
        sqlx::query_as::<_, FunctionInfo>(&sql)
            .bind(schema)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch", "FunctionRepository::get"))?
            .ok_or(AppError::NotFound("function.error.notFound"))
    }
}
