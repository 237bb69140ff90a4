//! Shared application state for all routes.

use crate::backup::{BackupService, BackupWorkflow, CommandExecutor};
use crate::catalog::{PgBackupStore, PgMembershipStore, PgProjectCatalog};
use crate::error::AppError;
use crate::policy::ProjectPolicy;
use crate::service::DatabaseAdminService;
use crate::settings::Settings;
use crate::tenant::ClientService;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Catalog database.
    pub pool: PgPool,
    pub backups: BackupService,
    pub admin: DatabaseAdminService,
}

impl AppState {
    /// Wire the Postgres-backed catalog, the tenant router and the command executor.
    pub fn from_settings(pool: PgPool, settings: &Settings) -> Result<Self, AppError> {
        let schema = settings.catalog_schema.as_str();
        let projects = Arc::new(PgProjectCatalog::new(pool.clone(), schema));
        let members = Arc::new(PgMembershipStore::new(pool.clone(), schema));
        let store = Arc::new(PgBackupStore::new(pool.clone(), schema));
        let policy = ProjectPolicy::new(members);
        let clients = ClientService::new(&settings.tenant_database_url, settings.tenant.clone())?;
        let workflow = BackupWorkflow::new(store.clone(), Arc::new(CommandExecutor::new(&settings.backup)));

        Ok(AppState {
            backups: BackupService::new(projects.clone(), store, policy.clone(), workflow),
            admin: DatabaseAdminService::new(projects, policy, clients),
            pool,
        })
    }
}
