//! Project catalog. One project maps to exactly one tenant database (`db_name`).

use crate::error::{storage, AppError};
use crate::store::catalog_table;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub uuid: Uuid,
    pub organization_uuid: Uuid,
    pub name: String,
    /// Globally unique; the only key the connection router accepts.
    pub db_name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Project {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Project {
            uuid: row.try_get("uuid")?,
            organization_uuid: row.try_get("organization_uuid")?,
            name: row.try_get("name")?,
            db_name: row.try_get("db_name")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Lookups fail with `NotFound("project.error.notFound")` when the project is absent.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    async fn get_by_uuid(&self, project_uuid: Uuid) -> Result<Project, AppError>;

    async fn get_database_name_by_uuid(&self, project_uuid: Uuid) -> Result<String, AppError>;

    async fn get_organization_uuid_by_project_uuid(&self, project_uuid: Uuid) -> Result<Uuid, AppError>;
}

#[derive(Clone, Debug)]
pub struct PgProjectCatalog {
    pool: PgPool,
    table: String,
}

impl PgProjectCatalog {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        PgProjectCatalog {
            pool,
            table: catalog_table(schema, "projects"),
        }
    }
}

#[async_trait]
impl ProjectCatalog for PgProjectCatalog {
    async fn get_by_uuid(&self, project_uuid: Uuid) -> Result<Project, AppError> {
        let sql = format!(
            "SELECT uuid, organization_uuid, name, db_name, description, status, created_at, updated_at FROM {} WHERE uuid = $1",
            self.table
        );
        sqlx::query_as::<_, Project>(&sql)
            .bind(project_uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch", "PgProjectCatalog::get_by_uuid"))?
            .ok_or(AppError::NotFound("project.error.notFound"))
    }

    async fn get_database_name_by_uuid(&self, project_uuid: Uuid) -> Result<String, AppError> {
        let sql = format!("SELECT db_name FROM {} WHERE uuid = $1", self.table);
        sqlx::query_scalar::<_, String>(&sql)
            .bind(project_uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch", "PgProjectCatalog::get_database_name_by_uuid"))?
            .ok_or(AppError::NotFound("project.error.notFound"))
    }

    async fn get_organization_uuid_by_project_uuid(&self, project_uuid: Uuid) -> Result<Uuid, AppError> {
        let sql = format!("SELECT organization_uuid FROM {} WHERE uuid = $1", self.table);
        sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(project_uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch", "PgProjectCatalog::get_organization_uuid_by_project_uuid"))?
            .ok_or(AppError::NotFound("project.error.notFound"))
    }
}
