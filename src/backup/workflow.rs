//! Background execution of backup operations.
//!
//! Callers persist the `Creating`/`Deleting` status before dispatching; the task only
//! ever writes the terminal status, error and completion time, and only while the record
//! still holds the status it was dispatched from.

use super::{BackupExecutor, BackupStatus};
use crate::catalog::BackupStore;
use crate::message;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use uuid::Uuid;

const INTERRUPTED: &str = "backup.error.interrupted";

#[derive(Clone)]
pub struct BackupWorkflow {
    store: Arc<dyn BackupStore>,
    executor: Arc<dyn BackupExecutor>,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackupWorkflow {
    pub fn new(store: Arc<dyn BackupStore>, executor: Arc<dyn BackupExecutor>) -> Self {
        BackupWorkflow {
            store,
            executor,
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Start the external create for a backup already persisted as `Creating`.
    pub async fn dispatch_create(&self, backup_uuid: Uuid, database: String) {
        let store = self.store.clone();
        let executor = self.executor.clone();
        self.spawn(async move {
            let outcome = executor.create_backup(&database, backup_uuid).await;
            finish(store.as_ref(), backup_uuid, BackupStatus::Creating, outcome.map_err(|e| e.to_string()), BackupStatus::Created).await;
        })
        .await;
        tracing::info!(backup = %backup_uuid, "backup create dispatched");
    }

    /// Start the external delete for a backup already persisted as `Deleting`.
    pub async fn dispatch_delete(&self, backup_uuid: Uuid, database: String) {
        let store = self.store.clone();
        let executor = self.executor.clone();
        self.spawn(async move {
            let outcome = executor.delete_backup(&database, backup_uuid).await;
            finish(store.as_ref(), backup_uuid, BackupStatus::Deleting, outcome.map_err(|e| e.to_string()), BackupStatus::Deleted).await;
        })
        .await;
        tracing::info!(backup = %backup_uuid, "backup delete dispatched");
    }

    async fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "backup task panicked");
            }
        }
        tasks.spawn(task);
    }

    /// Number of tasks not yet reaped.
    pub async fn in_flight(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wait for every dispatched task to finish.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        while tasks.join_next().await.is_some() {}
    }

    /// Wait up to `grace` for running tasks, then abort the rest.
    /// Aborted records stay `Creating`/`Deleting` until [`Self::reconcile_interrupted`] runs.
    pub async fn shutdown(&self, grace: Duration) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        if tasks.is_empty() {
            return;
        }
        tracing::info!(running = tasks.len(), "waiting for backup tasks");
        let drained = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(aborted = tasks.len(), "backup tasks still running after grace period, aborting");
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
    }

    /// Mark records left in progress by a previous process as failed. Returns how many were updated.
    ///
    /// Assumes a single control-plane instance owns the backup table.
    pub async fn reconcile_interrupted(&self) -> Result<usize, crate::error::AppError> {
        let stale = self.store.list_in_progress().await?;
        let mut failed = 0;
        for backup in &stale {
            tracing::warn!(backup = %backup.uuid, status = %backup.status, "marking interrupted backup as failed");
            let swapped = self
                .store
                .complete(
                    backup.uuid,
                    backup.status,
                    BackupStatus::Failed,
                    Some(message::lookup(INTERRUPTED).to_string()),
                    Utc::now(),
                )
                .await?;
            if swapped {
                failed += 1;
            }
        }
        Ok(failed)
    }
}

async fn finish(
    store: &dyn BackupStore,
    backup_uuid: Uuid,
    expected: BackupStatus,
    outcome: Result<(), String>,
    success: BackupStatus,
) {
    let operation = if expected == BackupStatus::Creating { "create" } else { "delete" };
    let (status, error) = match outcome {
        Ok(()) => {
            tracing::info!(backup = %backup_uuid, "backup {} finished", operation);
            (success, None)
        }
        Err(reason) => {
            tracing::warn!(backup = %backup_uuid, %reason, "backup {} failed", operation);
            (BackupStatus::Failed, Some(reason))
        }
    };
    match store.complete(backup_uuid, expected, status, error, Utc::now()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(backup = %backup_uuid, %status, "backup is no longer {}, dropping {} result", expected, operation);
        }
        Err(e) => {
            tracing::error!(backup = %backup_uuid, error = %e, "could not record backup {} result", operation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{ExecutorError, MockBackupExecutor};
    use crate::test::InMemoryBackupStore;
    use testresult::TestResult;

    fn workflow(store: Arc<InMemoryBackupStore>, executor: MockBackupExecutor) -> BackupWorkflow {
        BackupWorkflow::new(store, Arc::new(executor))
    }

    #[tokio::test]
    async fn successful_create_marks_created_with_completion_time() -> TestResult {
        let store = Arc::new(InMemoryBackupStore::default());
        let backup = store.insert(Uuid::new_v4(), BackupStatus::Creating);
        let mut executor = MockBackupExecutor::new();
        executor
            .expect_create_backup()
            .times(1)
            .returning(|_, _| Ok(()));
        let wf = workflow(store.clone(), executor);

        wf.dispatch_create(backup.uuid, "tenant_db".into()).await;
        wf.drain().await;

        let stored = store.get(backup.uuid).ok_or("missing")?;
        assert_eq!(stored.status, BackupStatus::Created);
        assert_eq!(stored.error, None);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.started_at, backup.started_at);
        assert_eq!(stored.project_uuid, backup.project_uuid);
        Ok(())
    }

    #[tokio::test]
    async fn failed_delete_records_the_error() -> TestResult {
        let store = Arc::new(InMemoryBackupStore::default());
        let backup = store.insert(Uuid::new_v4(), BackupStatus::Deleting);
        let mut executor = MockBackupExecutor::new();
        executor
            .expect_delete_backup()
            .returning(|_, _| Err(ExecutorError::NotConfigured("delete")));
        let wf = workflow(store.clone(), executor);

        wf.dispatch_delete(backup.uuid, "tenant_db".into()).await;
        wf.drain().await;

        let stored = store.get(backup.uuid).ok_or("missing")?;
        assert_eq!(stored.status, BackupStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("no delete command configured"));
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_aborts_tasks_past_grace_and_reconcile_fails_them() -> TestResult {
        let store = Arc::new(InMemoryBackupStore::default());
        let backup = store.insert(Uuid::new_v4(), BackupStatus::Creating);
        let done = store.insert(Uuid::new_v4(), BackupStatus::Created);
        let wf = BackupWorkflow::new(store.clone(), Arc::new(crate::test::StalledExecutor));

        wf.dispatch_create(backup.uuid, "tenant_db".into()).await;
        wf.shutdown(Duration::from_millis(20)).await;

        assert_eq!(wf.in_flight().await, 0);
        assert_eq!(store.get(backup.uuid).ok_or("missing")?.status, BackupStatus::Creating);

        let reconciled = workflow(store.clone(), MockBackupExecutor::new()).reconcile_interrupted().await?;

        assert_eq!(reconciled, 1);
        let stored = store.get(backup.uuid).ok_or("missing")?;
        assert_eq!(stored.status, BackupStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some(message::lookup(INTERRUPTED)));
        assert_eq!(store.get(done.uuid).ok_or("missing")?.status, BackupStatus::Created);
        Ok(())
    }

    #[tokio::test]
    async fn late_create_result_does_not_overwrite_a_moved_record() -> TestResult {
        let store = Arc::new(InMemoryBackupStore::default());
        let backup = store.insert(Uuid::new_v4(), BackupStatus::Creating);
        let executor = Arc::new(crate::test::GatedExecutor::default());
        let wf = BackupWorkflow::new(store.clone(), executor.clone());

        wf.dispatch_create(backup.uuid, "tenant_db".into()).await;
        let t = Utc::now();
        assert!(store.complete(backup.uuid, BackupStatus::Creating, BackupStatus::Deleted, None, t).await?);
        executor.release();
        wf.drain().await;

        let stored = store.get(backup.uuid).ok_or("missing")?;
        assert_eq!(stored.status, BackupStatus::Deleted);
        assert_eq!(stored.completed_at, Some(t));
        Ok(())
    }
}
