//! Backup lifecycle: records, the external executor, background workflow and the service.

mod executor;
mod models;
mod service;
mod workflow;

pub use executor::{BackupExecutor, CommandExecutor, ExecutorError};
pub use models::{Backup, BackupStatus, NewBackup};
pub use service::BackupService;
pub use workflow::BackupWorkflow;

#[cfg(test)]
pub use executor::MockBackupExecutor;
