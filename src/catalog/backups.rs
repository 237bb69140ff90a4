//! Backup record persistence.

use crate::backup::{Backup, BackupStatus, NewBackup};
use crate::error::{storage, AppError};
use crate::store::catalog_table;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "uuid, project_uuid, status, error, started_at, completed_at";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackupStore: Send + Sync {
    async fn create(&self, backup: NewBackup) -> Result<Backup, AppError>;

    /// Fails with `NotFound("backup.error.notFound")` when absent.
    async fn get_by_uuid(&self, backup_uuid: Uuid) -> Result<Backup, AppError>;

    async fn list_for_project(&self, project_uuid: Uuid) -> Result<Vec<Backup>, AppError>;

    /// Write `status`, `error` and `completed_at` only while the record is still `expected`.
    /// Returns `false` when the record has moved on; fails with `NotFound` when absent.
    async fn complete(
        &self,
        backup_uuid: Uuid,
        expected: BackupStatus,
        status: BackupStatus,
        error: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Atomically move a `Created` or `Failed` backup to `Deleting`.
    /// Returns `false` when the record is in any other status.
    async fn begin_deletion(&self, backup_uuid: Uuid) -> Result<bool, AppError>;

    /// Records still waiting on an external operation.
    async fn list_in_progress(&self) -> Result<Vec<Backup>, AppError>;
}

#[derive(Clone, Debug)]
pub struct PgBackupStore {
    pool: PgPool,
    table: String,
}

impl PgBackupStore {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        PgBackupStore {
            pool,
            table: catalog_table(schema, "backups"),
        }
    }
}

#[async_trait]
impl BackupStore for PgBackupStore {
    async fn create(&self, backup: NewBackup) -> Result<Backup, AppError> {
        let sql = format!(
            "INSERT INTO {} (project_uuid, status, error, started_at) VALUES ($1, $2, NULL, $3) RETURNING {}",
            self.table, COLUMNS
        );
        sqlx::query_as::<_, Backup>(&sql)
            .bind(backup.project_uuid)
            .bind(backup.status.as_str())
            .bind(backup.started_at)
            .fetch_one(&self.pool)
            .await
            .map_err(storage("insert", "PgBackupStore::create"))
    }

    async fn get_by_uuid(&self, backup_uuid: Uuid) -> Result<Backup, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE uuid = $1", COLUMNS, self.table);
        sqlx::query_as::<_, Backup>(&sql)
            .bind(backup_uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch", "PgBackupStore::get_by_uuid"))?
            .ok_or(AppError::NotFound("backup.error.notFound"))
    }

    async fn list_for_project(&self, project_uuid: Uuid) -> Result<Vec<Backup>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE project_uuid = $1 ORDER BY started_at DESC",
            COLUMNS, self.table
        );
        sqlx::query_as::<_, Backup>(&sql)
            .bind(project_uuid)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("select", "PgBackupStore::list_for_project"))
    }

    async fn complete(
        &self,
        backup_uuid: Uuid,
        expected: BackupStatus,
        status: BackupStatus,
        error: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE {} SET status = $3, error = $4, completed_at = $5 WHERE uuid = $1 AND status = $2",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(backup_uuid)
            .bind(expected.as_str())
            .bind(status.as_str())
            .bind(error)
            .bind(completed_at)
            .execute(&self.pool)
            .await
            .map_err(storage("update", "PgBackupStore::complete"))?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        // Distinguish a lost swap from a missing record.
        self.get_by_uuid(backup_uuid).await.map(|_| false)
    }

    async fn begin_deletion(&self, backup_uuid: Uuid) -> Result<bool, AppError> {
        // Single-row compare-and-swap; concurrent callers serialize on the row lock.
        let sql = format!(
            "UPDATE {} SET status = $2, error = NULL WHERE uuid = $1 AND status IN ($3, $4)",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(backup_uuid)
            .bind(BackupStatus::Deleting.as_str())
            .bind(BackupStatus::Created.as_str())
            .bind(BackupStatus::Failed.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage("update", "PgBackupStore::begin_deletion"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_in_progress(&self) -> Result<Vec<Backup>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE status IN ($1, $2) ORDER BY started_at",
            COLUMNS, self.table
        );
        sqlx::query_as::<_, Backup>(&sql)
            .bind(BackupStatus::Creating.as_str())
            .bind(BackupStatus::Deleting.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(storage("select", "PgBackupStore::list_in_progress"))
    }
}
