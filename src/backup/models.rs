//! Backup record and lifecycle status.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

/// Lifecycle status persisted as lowercase text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Creating,
    Created,
    Deleting,
    Deleted,
    Failed,
}

impl BackupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupStatus::Creating => "creating",
            BackupStatus::Created => "created",
            BackupStatus::Deleting => "deleting",
            BackupStatus::Deleted => "deleted",
            BackupStatus::Failed => "failed",
        }
    }

    /// Statuses a delete may start from.
    pub fn is_deletable(self) -> bool {
        matches!(self, BackupStatus::Created | BackupStatus::Failed)
    }

    /// Whether an external operation is still expected to report back.
    pub fn is_in_progress(self) -> bool {
        matches!(self, BackupStatus::Creating | BackupStatus::Deleting)
    }
}

impl std::fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackupStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creating" => Ok(BackupStatus::Creating),
            "created" => Ok(BackupStatus::Created),
            "deleting" => Ok(BackupStatus::Deleting),
            "deleted" => Ok(BackupStatus::Deleted),
            "failed" => Ok(BackupStatus::Failed),
            other => Err(AppError::Validation(format!("unknown backup status: {}", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub uuid: Uuid,
    pub project_uuid: Uuid,
    pub status: BackupStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Values for a backup row about to be inserted. The store assigns the uuid.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBackup {
    pub project_uuid: Uuid,
    pub status: BackupStatus,
    pub started_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Backup {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        let status = status.parse().map_err(|e: AppError| sqlx::Error::ColumnDecode {
            index: "status".into(),
            source: Box::new(e),
        })?;
        Ok(Backup {
            uuid: row.try_get("uuid")?,
            project_uuid: row.try_get("project_uuid")?,
            status,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}
