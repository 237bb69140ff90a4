//! Backup operations gated by project policy.

use super::{Backup, BackupStatus, BackupWorkflow, NewBackup};
use crate::auth::Actor;
use crate::catalog::{BackupStore, ProjectCatalog};
use crate::error::AppError;
use crate::policy::ProjectPolicy;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct BackupService {
    projects: Arc<dyn ProjectCatalog>,
    backups: Arc<dyn BackupStore>,
    policy: ProjectPolicy,
    workflow: BackupWorkflow,
}

impl BackupService {
    pub fn new(
        projects: Arc<dyn ProjectCatalog>,
        backups: Arc<dyn BackupStore>,
        policy: ProjectPolicy,
        workflow: BackupWorkflow,
    ) -> Self {
        BackupService {
            projects,
            backups,
            policy,
            workflow,
        }
    }

    pub fn workflow(&self) -> &BackupWorkflow {
        &self.workflow
    }

    pub async fn list(&self, project_uuid: Uuid, actor: &Actor) -> Result<Vec<Backup>, AppError> {
        let organization_uuid = self.projects.get_organization_uuid_by_project_uuid(project_uuid).await?;
        if !self.policy.can_access(organization_uuid, actor).await {
            return Err(AppError::Forbidden("backup.error.listForbidden"));
        }
        self.backups.list_for_project(project_uuid).await
    }

    pub async fn get_by_uuid(&self, backup_uuid: Uuid, actor: &Actor) -> Result<Backup, AppError> {
        let backup = self.backups.get_by_uuid(backup_uuid).await?;
        let organization_uuid = self
            .projects
            .get_organization_uuid_by_project_uuid(backup.project_uuid)
            .await?;
        if !self.policy.can_access(organization_uuid, actor).await {
            return Err(AppError::Forbidden("backup.error.viewForbidden"));
        }
        Ok(backup)
    }

    /// Persist a `Creating` backup and start the external create. Returns without waiting for it.
    pub async fn create(&self, project_uuid: Uuid, actor: &Actor) -> Result<Backup, AppError> {
        let project = self.projects.get_by_uuid(project_uuid).await?;
        if !self.policy.can_create(project.organization_uuid, actor).await {
            return Err(AppError::Forbidden("backup.error.createForbidden"));
        }

        let backup = self
            .backups
            .create(NewBackup {
                project_uuid,
                status: BackupStatus::Creating,
                started_at: Utc::now(),
            })
            .await?;
        self.workflow.dispatch_create(backup.uuid, project.db_name).await;
        Ok(backup)
    }

    /// Move a `Created` or `Failed` backup to `Deleting` and start the external delete.
    ///
    /// The status change is a compare-and-swap, so of two concurrent calls exactly one proceeds;
    /// the other fails with `BadRequest("backup.error.deleteInProgress")`. A backup still being
    /// created, or already deleted, is rejected with `BadRequest` as well.
    pub async fn delete(&self, backup_uuid: Uuid, actor: &Actor) -> Result<(), AppError> {
        let backup = self.backups.get_by_uuid(backup_uuid).await?;
        let project = self.projects.get_by_uuid(backup.project_uuid).await?;
        if !self.policy.can_update(project.organization_uuid, actor).await {
            return Err(AppError::Forbidden("backup.error.deleteForbidden"));
        }
        match backup.status {
            BackupStatus::Creating => return Err(AppError::BadRequest("backup.error.createInProgress")),
            BackupStatus::Deleting => return Err(AppError::BadRequest("backup.error.deleteInProgress")),
            BackupStatus::Deleted => return Err(AppError::BadRequest("backup.error.alreadyDeleted")),
            BackupStatus::Created | BackupStatus::Failed => {}
        }
        if !self.backups.begin_deletion(backup_uuid).await? {
            return Err(AppError::BadRequest("backup.error.deleteInProgress"));
        }
        self.workflow.dispatch_delete(backup_uuid, project.db_name).await;
        Ok(())
    }
}
