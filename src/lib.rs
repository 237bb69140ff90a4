//! Tenant admin: control-plane core for per-project PostgreSQL databases.
//!
//! Routes administrative operations to the right tenant database, introspects tenant
//! schemas at call time, and runs backups as tracked background work, all gated by
//! organization-scoped policy.

pub mod auth;
pub mod backup;
pub mod catalog;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod message;
pub mod policy;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod tenant;

#[cfg(test)]
mod test;

pub use auth::{Actor, Role};
pub use backup::{Backup, BackupService, BackupStatus, BackupWorkflow};
pub use error::{AppError, ConfigError};
pub use policy::ProjectPolicy;
pub use routes::{app_routes, DEFAULT_BODY_LIMIT};
pub use service::DatabaseAdminService;
pub use settings::Settings;
pub use state::AppState;
pub use store::{ensure_catalog_tables, ensure_database_exists};
pub use tenant::{ClientService, TenantConnection};
