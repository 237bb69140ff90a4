//! Process settings read from the environment.

use crate::error::ConfigError;
use crate::sql::is_valid_identifier;
use std::time::Duration;

/// Bounds applied to every tenant connection pool.
#[derive(Clone, Debug)]
pub struct TenantPoolSettings {
    pub max_connections: u32,
    pub connect_timeout: Duration,
    /// Sent as `statement_timeout` so each catalog query is bounded server-side.
    pub statement_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for TenantPoolSettings {
    fn default() -> Self {
        TenantPoolSettings {
            max_connections: 5,
            connect_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_millis(15_000),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Command templates for the external backup tool. `{database}` and `{backup}` are substituted.
#[derive(Clone, Debug, Default)]
pub struct BackupCommandSettings {
    pub create_command: Option<String>,
    pub delete_command: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub tenant_database_url: String,
    pub catalog_schema: String,
    pub tenant: TenantPoolSettings,
    pub backup: BackupCommandSettings,
    pub shutdown_grace: Duration,
    pub bind_addr: String,
}

impl Settings {
    /// Read settings from process env.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let tenant_database_url = get("TENANT_DATABASE_URL").unwrap_or_else(|| database_url.clone());
        let catalog_schema = get("CATALOG_SCHEMA").unwrap_or_else(|| "control".into());
        if !is_valid_identifier(&catalog_schema) {
            return Err(ConfigError::Invalid {
                name: "CATALOG_SCHEMA",
                value: catalog_schema,
            });
        }

        let defaults = TenantPoolSettings::default();
        let tenant = TenantPoolSettings {
            max_connections: parse_or(&get, "TENANT_MAX_CONNECTIONS", defaults.max_connections)?,
            connect_timeout: Duration::from_secs(parse_or(
                &get,
                "TENANT_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            statement_timeout: Duration::from_millis(parse_or(
                &get,
                "TENANT_STATEMENT_TIMEOUT_MS",
                defaults.statement_timeout.as_millis() as u64,
            )?),
            idle_timeout: Duration::from_secs(parse_or(
                &get,
                "TENANT_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )?),
        };
        if tenant.max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "TENANT_MAX_CONNECTIONS",
                value: "0".into(),
            });
        }

        Ok(Settings {
            database_url,
            tenant_database_url,
            catalog_schema,
            tenant,
            backup: BackupCommandSettings {
                create_command: get("BACKUP_CREATE_COMMAND"),
                delete_command: get("BACKUP_DELETE_COMMAND"),
            },
            shutdown_grace: Duration::from_secs(parse_or(&get, "SHUTDOWN_GRACE_SECS", 30)?),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
        })
    }
}

fn parse_or<G, T>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let settings = settings_from(&[("DATABASE_URL", "postgres://localhost/control")]).unwrap();

        assert_eq!(settings.tenant_database_url, "postgres://localhost/control");
        assert_eq!(settings.catalog_schema, "control");
        assert_eq!(settings.tenant.max_connections, 5);
        assert_eq!(settings.tenant.connect_timeout, Duration::from_secs(5));
        assert!(settings.backup.create_command.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(matches!(settings_from(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn malformed_numbers_are_rejected_not_defaulted() {
        let result = settings_from(&[
            ("DATABASE_URL", "postgres://localhost/control"),
            ("TENANT_CONNECT_TIMEOUT_SECS", "soon"),
        ]);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "TENANT_CONNECT_TIMEOUT_SECS", .. })
        ));
    }

    #[test]
    fn catalog_schema_must_be_an_identifier() {
        let result = settings_from(&[
            ("DATABASE_URL", "postgres://localhost/control"),
            ("CATALOG_SCHEMA", "control; drop"),
        ]);

        assert!(matches!(result, Err(ConfigError::Invalid { name: "CATALOG_SCHEMA", .. })));
    }
}
