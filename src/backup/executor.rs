//! External backup tool invocation.

use crate::settings::BackupCommandSettings;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::process::Command;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("no {0} command configured")]
    NotConfigured(&'static str),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Runs the physical backup operations for one tenant database.
/// Calls resolve when the operation has finished, successfully or not.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackupExecutor: Send + Sync {
    async fn create_backup(&self, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError>;

    async fn delete_backup(&self, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError>;
}

/// Executes configured command templates. `{database}` and `{backup}` are substituted
/// per argument after splitting on whitespace, so values never add arguments.
#[derive(Clone, Debug)]
pub struct CommandExecutor {
    create_command: Option<String>,
    delete_command: Option<String>,
}

impl CommandExecutor {
    pub fn new(settings: &BackupCommandSettings) -> Self {
        CommandExecutor {
            create_command: settings.create_command.clone(),
            delete_command: settings.delete_command.clone(),
        }
    }

    fn render(template: &str, database: &str, backup_uuid: Uuid) -> Vec<String> {
        let backup = backup_uuid.to_string();
        template
            .split_whitespace()
            .map(|arg| arg.replace("{database}", database).replace("{backup}", &backup))
            .collect()
    }

    async fn run(&self, kind: &'static str, template: Option<&str>, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError> {
        let args = template
            .map(|t| Self::render(t, database, backup_uuid))
            .filter(|a| !a.is_empty())
            .ok_or(ExecutorError::NotConfigured(kind))?;
        let program = args[0].clone();
        tracing::debug!(%program, %database, backup = %backup_uuid, "running backup {}", kind);
        let output = Command::new(&program)
            .args(&args[1..])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecutorError::Spawn {
                program: program.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(ExecutorError::Failed {
            program,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[async_trait]
impl BackupExecutor for CommandExecutor {
    async fn create_backup(&self, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError> {
        self.run("create", self.create_command.as_deref(), database, backup_uuid).await
    }

    async fn delete_backup(&self, database: &str, backup_uuid: Uuid) -> Result<(), ExecutorError> {
        self.run("delete", self.delete_command.as_deref(), database, backup_uuid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    fn executor(create: Option<&str>, delete: Option<&str>) -> CommandExecutor {
        CommandExecutor::new(&BackupCommandSettings {
            create_command: create.map(String::from),
            delete_command: delete.map(String::from),
        })
    }

    #[test]
    fn placeholders_are_substituted_per_argument() {
        let id = Uuid::nil();
        let args = CommandExecutor::render("pg_dump -Fc -f /backups/{backup}.dump {database}", "db one", id);

        assert_eq!(
            args,
            vec![
                "pg_dump",
                "-Fc",
                "-f",
                "/backups/00000000-0000-0000-0000-000000000000.dump",
                "db one"
            ]
        );
    }

    #[tokio::test]
    async fn missing_template_is_not_configured() {
        let result = executor(None, None).delete_backup("db", Uuid::new_v4()).await;

        assert!(matches!(result, Err(ExecutorError::NotConfigured("delete"))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_success() -> TestResult {
        executor(Some("true"), None).create_backup("db", Uuid::new_v4()).await?;
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_captures_stderr() {
        let result = executor(Some("ls /definitely/not/here/{database}"), None)
            .create_backup("tenant_db", Uuid::new_v4())
            .await;

        match result {
            Err(ExecutorError::Failed { program, code, stderr }) => {
                assert_eq!(program, "ls");
                assert_ne!(code, Some(0));
                assert!(stderr.contains("tenant_db"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_program_fails_to_spawn() {
        let result = executor(Some("no-such-backup-tool-xyz {database}"), None)
            .create_backup("db", Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(ExecutorError::Spawn { .. })));
    }
}
