//! Tenant connection router and repository factory.
//!
//! A tenant is addressed only by its database name (`projects.db_name`). Pools are opened
//! on first use and cached by name; idle connections are reclaimed by the pool itself.

use crate::error::{AppError, ConfigError};
use crate::repositories::{
    ColumnRepository, FunctionRepository, IndexRepository, RowRepository, StatsRepository, TableRepository,
};
use crate::settings::TenantPoolSettings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

/// Open handle to one tenant database, shareable across repositories in one logical operation.
#[derive(Clone, Debug)]
pub struct TenantConnection {
    database: Arc<str>,
    pool: PgPool,
}

impl TenantConnection {
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Clone)]
pub struct ClientService {
    base: PgConnectOptions,
    settings: TenantPoolSettings,
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
}

impl ClientService {
    /// `base_url` supplies host and credentials; the database is replaced per tenant.
    pub fn new(base_url: &str, settings: TenantPoolSettings) -> Result<Self, AppError> {
        let base = PgConnectOptions::from_str(base_url).map_err(|_| ConfigError::Invalid {
            name: "TENANT_DATABASE_URL",
            value: "<unparseable url>".into(),
        })?;
        Ok(ClientService {
            base,
            settings,
            pools: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn cached(&self, db_name: &str) -> Option<PgPool> {
        let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
        pools.get(db_name).filter(|p| !p.is_closed()).cloned()
    }

    /// Resolve a tenant database name to a live connection.
    ///
    /// Every failure (unreachable host, bad credentials, missing database, timeout) is
    /// `ConnectionFailed`; transient and permanent causes are not distinguished.
    pub async fn connect_by_name(&self, db_name: &str) -> Result<TenantConnection, AppError> {
        if let Some(pool) = self.cached(db_name) {
            return Ok(TenantConnection {
                database: Arc::from(db_name),
                pool,
            });
        }

        let statement_timeout = self.settings.statement_timeout.as_millis().to_string();
        let options = self
            .base
            .clone()
            .database(db_name)
            .options([("statement_timeout", statement_timeout.as_str())]);
        let connect = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .min_connections(0)
            .acquire_timeout(self.settings.connect_timeout)
            .idle_timeout(Some(self.settings.idle_timeout))
            .connect_with(options);
        let pool = match tokio::time::timeout(self.settings.connect_timeout, connect).await {
            Ok(Ok(pool)) => pool,
            Ok(Err(source)) => {
                tracing::warn!(database = %db_name, error = %source, "tenant connection failed");
                return Err(AppError::ConnectionFailed {
                    database: db_name.to_string(),
                    source,
                });
            }
            Err(_) => {
                tracing::warn!(database = %db_name, "tenant connection timed out");
                return Err(AppError::ConnectionFailed {
                    database: db_name.to_string(),
                    source: sqlx::Error::PoolTimedOut,
                });
            }
        };

        // Another request may have connected concurrently; keep the first pool.
        let pool = {
            let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
            let entry = pools.entry(db_name.to_string()).or_insert_with(|| pool.clone());
            if entry.is_closed() {
                *entry = pool.clone();
            }
            entry.clone()
        };
        tracing::debug!(database = %db_name, "tenant pool ready");
        Ok(TenantConnection {
            database: Arc::from(db_name),
            pool,
        })
    }

    /// Reuse `existing` verbatim when supplied, otherwise connect by name.
    ///
    /// A supplied connection is not checked against `db_name`; a mismatch is only logged.
    pub async fn get_or_create_connection(
        &self,
        db_name: &str,
        existing: Option<TenantConnection>,
    ) -> Result<TenantConnection, AppError> {
        match existing {
            Some(conn) => {
                if conn.database() != db_name {
                    tracing::warn!(
                        requested = %db_name,
                        bound = %conn.database(),
                        "reusing a tenant connection bound to a different database"
                    );
                }
                Ok(conn)
            }
            None => self.connect_by_name(db_name).await,
        }
    }

    pub async fn get_stats_repo(
        &self,
        db_name: &str,
        existing: Option<TenantConnection>,
    ) -> Result<(StatsRepository, TenantConnection), AppError> {
        let conn = self.get_or_create_connection(db_name, existing).await?;
        Ok((StatsRepository::new(conn.pool().clone()), conn))
    }

    pub async fn get_table_repo(
        &self,
        db_name: &str,
        existing: Option<TenantConnection>,
    ) -> Result<(TableRepository, TenantConnection), AppError> {
        let conn = self.get_or_create_connection(db_name, existing).await?;
        Ok((TableRepository::new(conn.pool().clone()), conn))
    }

    pub async fn get_function_repo(
        &self,
        db_name: &str,
        existing: Option<TenantConnection>,
    ) -> Result<(FunctionRepository, TenantConnection), AppError> {
        let conn = self.get_or_create_connection(db_name, existing).await?;
        Ok((FunctionRepository::new(conn.pool().clone()), conn))
    }

    pub async fn get_column_repo(
        &self,
        db_name: &str,
        existing: Option<TenantConnection>,
    ) -> Result<(ColumnRepository, TenantConnection), AppError> {
        let conn = self.get_or_create_connection(db_name, existing).await?;
        Ok((ColumnRepository::new(conn.pool().clone()), conn))
    }

    pub async fn get_index_repo(
        &self,
        db_name: &str,
        existing: Option<TenantConnection>,
    ) -> Result<(IndexRepository, TenantConnection), AppError> {
        let conn = self.get_or_create_connection(db_name, existing).await?;
        Ok((IndexRepository::new(conn.pool().clone()), conn))
    }

    pub async fn get_row_repo(
        &self,
        db_name: &str,
        existing: Option<TenantConnection>,
    ) -> Result<(RowRepository, TenantConnection), AppError> {
        let conn = self.get_or_create_connection(db_name, existing).await?;
        Ok((RowRepository::new(conn.pool().clone()), conn))
    }

    /// Close every cached pool. Used during shutdown.
    pub async fn close_all(&self) {
        let pools: Vec<(String, PgPool)> = {
            let mut guard = self.pools.write().unwrap_or_else(PoisonError::into_inner);
            guard.drain().collect()
        };
        for (name, pool) in pools {
            pool.close().await;
            tracing::debug!(database = %name, "tenant pool closed");
        }
    }

    pub fn open_pools(&self) -> usize {
        self.pools.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use testresult::TestResult;

    fn unreachable_service() -> ClientService {
        let settings = TenantPoolSettings {
            connect_timeout: Duration::from_millis(500),
            ..TenantPoolSettings::default()
        };
        ClientService::new("postgres://u:p@127.0.0.1:1/x", settings).unwrap()
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let result = ClientService::new("not a url", TenantPoolSettings::default());

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn unknown_tenant_database_fails_with_connection_failed() -> TestResult {
        let clients = unreachable_service();

        let result = clients.get_table_repo("tenant_does_not_exist", None).await;

        match result {
            Err(AppError::ConnectionFailed { database, .. }) => assert_eq!(database, "tenant_does_not_exist"),
            Err(other) => panic!("expected ConnectionFailed, got {other:?}"),
            Ok(_) => panic!("repository must not be constructed"),
        }
        assert_eq!(clients.open_pools(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn supplied_connection_is_reused_verbatim() -> TestResult {
        let clients = unreachable_service();
        let pool = PgPoolOptions::new().connect_lazy("postgres://u:p@127.0.0.1:1/tenant_a")?;
        let conn = TenantConnection {
            database: Arc::from("tenant_a"),
            pool,
        };

        let (_repo, reused) = clients.get_index_repo("tenant_b", Some(conn)).await?;

        assert_eq!(reused.database(), "tenant_a");
        assert_eq!(clients.open_pools(), 0);
        Ok(())
    }
}
