//! Catalog DDL and database bootstrap. All catalog tables live in one schema (`CATALOG_SCHEMA`, default `control`).

use crate::error::{storage, AppError, ConfigError};
use crate::sql::quoted;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Returns schema-qualified catalog table name (e.g. `"control"."backups"`).
pub fn catalog_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Create the catalog schema and tables if missing. Safe to call on every start.
pub async fn ensure_catalog_tables(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    const METHOD: &str = "store::ensure_catalog_tables";
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
        .execute(pool)
        .await
        .map_err(storage("createSchema", METHOD))?;

    let organizations = catalog_table(schema, "organizations");
    let users = catalog_table(schema, "users");
    let members = catalog_table(schema, "organization_members");
    let projects = catalog_table(schema, "projects");
    let backups = catalog_table(schema, "backups");

    let statements = [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {organizations} (
                uuid UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {users} (
                uuid UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'viewer',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {members} (
                organization_uuid UUID NOT NULL REFERENCES {organizations} (uuid) ON DELETE CASCADE,
                user_uuid UUID NOT NULL REFERENCES {users} (uuid) ON DELETE CASCADE,
                role TEXT NOT NULL DEFAULT 'viewer',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (organization_uuid, user_uuid)
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {projects} (
                uuid UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                organization_uuid UUID NOT NULL REFERENCES {organizations} (uuid),
                name TEXT NOT NULL,
                db_name TEXT NOT NULL UNIQUE,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {backups} (
                uuid UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                project_uuid UUID NOT NULL REFERENCES {projects} (uuid),
                status TEXT NOT NULL,
                error TEXT,
                started_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ
            )
            "#
        ),
        format!("CREATE INDEX IF NOT EXISTS backups_project_uuid_idx ON {backups} (project_uuid)"),
        format!("CREATE INDEX IF NOT EXISTS backups_status_idx ON {backups} (status)"),
    ];

    for ddl in &statements {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(storage("createTable", METHOD))?;
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    const METHOD: &str = "store::ensure_database_exists";
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|_| ConfigError::Invalid {
        name: "DATABASE_URL",
        value: "<redacted>".into(),
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(|source| AppError::ConnectionFailed {
        database: "postgres".into(),
        source,
    })?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(storage("select", METHOD))?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating catalog database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(storage("createDatabase", METHOD))?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url.rfind('/').ok_or(ConfigError::Invalid {
        name: "DATABASE_URL",
        value: "no database path".into(),
    })? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_table_is_quoted_and_qualified() {
        assert_eq!(catalog_table("control", "backups"), r#""control"."backups""#);
    }

    #[test]
    fn database_name_is_split_from_url() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@db:5432/control?sslmode=disable").unwrap();

        assert_eq!(admin, "postgres://u:p@db:5432/postgres");
        assert_eq!(name, "control");
    }
}
