//! In-memory collaborators for service tests.

use crate::auth::{Actor, Role};
use crate::backup::{
    Backup, BackupExecutor, BackupService, BackupStatus, BackupWorkflow, ExecutorError, NewBackup,
};
use crate::catalog::{BackupStore, MembershipStore, Project, ProjectCatalog};
use crate::error::AppError;
use crate::policy::ProjectPolicy;
use crate::service::DatabaseAdminService;
use crate::settings::TenantPoolSettings;
use crate::state::AppState;
use crate::tenant::ClientService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

/// Backup table kept in a mutex; `complete` and `begin_deletion` compare-and-swap under the lock.
#[derive(Default)]
pub struct InMemoryBackupStore {
    rows: Mutex<HashMap<Uuid, Backup>>,
}

impl InMemoryBackupStore {
    pub fn insert(&self, project_uuid: Uuid, status: BackupStatus) -> Backup {
        let backup = Backup {
            uuid: Uuid::new_v4(),
            project_uuid,
            status,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.rows.lock().unwrap().insert(backup.uuid, backup.clone());
        backup
    }

    pub fn get(&self, uuid: Uuid) -> Option<Backup> {
        self.rows.lock().unwrap().get(&uuid).cloned()
    }

    pub fn all(&self) -> Vec<Backup> {
        self.rows.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl BackupStore for InMemoryBackupStore {
    async fn create(&self, backup: NewBackup) -> Result<Backup, AppError> {
        let created = Backup {
            uuid: Uuid::new_v4(),
            project_uuid: backup.project_uuid,
            status: backup.status,
            error: None,
            started_at: backup.started_at,
            completed_at: None,
        };
        self.rows.lock().unwrap().insert(created.uuid, created.clone());
        Ok(created)
    }

    async fn get_by_uuid(&self, backup_uuid: Uuid) -> Result<Backup, AppError> {
        self.get(backup_uuid).ok_or(AppError::NotFound("backup.error.notFound"))
    }

    async fn list_for_project(&self, project_uuid: Uuid) -> Result<Vec<Backup>, AppError> {
        let mut rows: Vec<Backup> = self.all().into_iter().filter(|b| b.project_uuid == project_uuid).collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(rows)
    }

    async fn complete(
        &self,
        backup_uuid: Uuid,
        expected: BackupStatus,
        status: BackupStatus,
        error: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&backup_uuid).ok_or(AppError::NotFound("backup.error.notFound"))?;
        if row.status != expected {
            return Ok(false);
        }
        row.status = status;
        row.error = error;
        row.completed_at = Some(completed_at);
        Ok(true)
    }

    async fn begin_deletion(&self, backup_uuid: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&backup_uuid).ok_or(AppError::NotFound("backup.error.notFound"))?;
        if !row.status.is_deletable() {
            return Ok(false);
        }
        row.status = BackupStatus::Deleting;
        row.error = None;
        Ok(true)
    }

    async fn list_in_progress(&self) -> Result<Vec<Backup>, AppError> {
        Ok(self.all().into_iter().filter(|b| b.status.is_in_progress()).collect())
    }
}

#[derive(Default)]
pub struct StaticProjects {
    projects: HashMap<Uuid, Project>,
}

impl StaticProjects {
    pub fn with(project: Project) -> Self {
        StaticProjects {
            projects: HashMap::from([(project.uuid, project)]),
        }
    }
}

#[async_trait]
impl ProjectCatalog for StaticProjects {
    async fn get_by_uuid(&self, project_uuid: Uuid) -> Result<Project, AppError> {
        self.projects
            .get(&project_uuid)
            .cloned()
            .ok_or(AppError::NotFound("project.error.notFound"))
    }

    async fn get_database_name_by_uuid(&self, project_uuid: Uuid) -> Result<String, AppError> {
        Ok(self.get_by_uuid(project_uuid).await?.db_name)
    }

    async fn get_organization_uuid_by_project_uuid(&self, project_uuid: Uuid) -> Result<Uuid, AppError> {
        Ok(self.get_by_uuid(project_uuid).await?.organization_uuid)
    }
}

/// Fixed `(organization, user)` membership pairs.
#[derive(Default)]
pub struct StaticMembers {
    pairs: HashSet<(Uuid, Uuid)>,
}

impl StaticMembers {
    pub fn with(organization_uuid: Uuid, user_uuid: Uuid) -> Self {
        StaticMembers {
            pairs: HashSet::from([(organization_uuid, user_uuid)]),
        }
    }
}

#[async_trait]
impl MembershipStore for StaticMembers {
    async fn is_organization_member(&self, organization_uuid: Uuid, user_uuid: Uuid) -> Result<bool, AppError> {
        Ok(self.pairs.contains(&(organization_uuid, user_uuid)))
    }
}

/// Records each call, then blocks until [`GatedExecutor::release`] is called.
pub struct GatedExecutor {
    calls: Mutex<Vec<(&'static str, String, Uuid)>>,
    gate: watch::Sender<bool>,
}

impl Default for GatedExecutor {
    fn default() -> Self {
        let (gate, _) = watch::channel(false);
        GatedExecutor {
            calls: Mutex::new(Vec::new()),
            gate,
        }
    }
}

impl GatedExecutor {
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<(&'static str, String, Uuid)> {
        self.calls.lock().unwrap().clone()
    }

    async fn run(&self, kind: &'static str, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError> {
        let mut open = self.gate.subscribe();
        let _ = open.wait_for(|released| *released).await;
        self.calls.lock().unwrap().push((kind, database.to_string(), backup_uuid));
        Ok(())
    }
}

#[async_trait]
impl BackupExecutor for GatedExecutor {
    async fn create_backup(&self, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError> {
        self.run("create", database, backup_uuid).await
    }

    async fn delete_backup(&self, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError> {
        self.run("delete", database, backup_uuid).await
    }
}

/// Never finishes.
pub struct StalledExecutor;

#[async_trait]
impl BackupExecutor for StalledExecutor {
    async fn create_backup(&self, _database: &str, _backup_uuid: Uuid) -> Result<(), ExecutorError> {
        std::future::pending().await
    }

    async fn delete_backup(&self, _database: &str, _backup_uuid: Uuid) -> Result<(), ExecutorError> {
        std::future::pending().await
    }
}

pub fn project() -> Project {
    Project {
        uuid: Uuid::new_v4(),
        organization_uuid: Uuid::new_v4(),
        name: "Acme".into(),
        db_name: "udb_acme".into(),
        description: None,
        status: "active".into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// One project, its owner as the only member, and a backup service over in-memory parts.
pub struct Fixture {
    pub project: Project,
    pub owner: Actor,
    pub store: Arc<InMemoryBackupStore>,
    pub executor: Arc<GatedExecutor>,
    pub service: BackupService,
    projects: Arc<StaticProjects>,
    policy: ProjectPolicy,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(Arc::new(InMemoryBackupStore::default()), None)
    }

    pub fn with_store(store: Arc<InMemoryBackupStore>) -> Self {
        Self::build(store, None)
    }

    pub fn with_members(members: Arc<dyn MembershipStore>) -> Self {
        Self::build(Arc::new(InMemoryBackupStore::default()), Some(members))
    }

    fn build(store: Arc<InMemoryBackupStore>, members: Option<Arc<dyn MembershipStore>>) -> Self {
        let project = project();
        let owner = Actor::new(Uuid::new_v4(), Role::Owner);
        let members: Arc<dyn MembershipStore> = match members {
            Some(members) => members,
            None => Arc::new(StaticMembers::with(project.organization_uuid, owner.uuid)),
        };
        let executor = Arc::new(GatedExecutor::default());
        let workflow = BackupWorkflow::new(store.clone(), executor.clone());
        let projects = Arc::new(StaticProjects::with(project.clone()));
        let policy = ProjectPolicy::new(members);
        let service = BackupService::new(projects.clone(), store.clone(), policy.clone(), workflow);
        Fixture {
            project,
            owner,
            store,
            executor,
            service,
            projects,
            policy,
        }
    }

    /// Router state over the fixture. Catalog and tenant databases point at a closed port.
    pub fn app_state(&self) -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://u:p@127.0.0.1:1/catalog")
            .unwrap();
        let clients = ClientService::new("postgres://u:p@127.0.0.1:1/unused", TenantPoolSettings::default()).unwrap();
        AppState {
            pool,
            backups: self.service.clone(),
            admin: DatabaseAdminService::new(self.projects.clone(), self.policy.clone(), clients),
        }
    }
}
