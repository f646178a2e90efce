//! CLI configuration management.
//!
//! Command-line flags take precedence over environment variables (and `.env`).

use swiss_tournament::db::{ConfigError as DbConfigError, DatabaseConfig};
use thiserror::Error;

/// Where tournament data lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// PostgreSQL at the configured URL
    Postgres(DatabaseConfig),
    /// Process-local store, discarded on exit
    Memory,
}

/// Complete CLI configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub backend: Backend,
    /// Print results as JSON instead of text
    pub json: bool,
    /// Apply schema migrations before running the command
    pub migrate: bool,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No database configured\nHint: set DATABASE_URL, pass --db-url, or use --memory")]
    MissingDatabase,

    #[error("Invalid configuration: {0}")]
    Database(#[from] DbConfigError),

    #[error("--memory and --db-url cannot be combined")]
    ConflictingBackends,
}

impl CliConfig {
    /// Resolve configuration from flags and the process environment
    pub fn load(
        database_url_override: Option<String>,
        memory: bool,
        json: bool,
        migrate: bool,
    ) -> Result<Self, ConfigError> {
        Self::resolve(
            database_url_override,
            memory,
            json,
            migrate,
            |var| std::env::var(var).ok(),
        )
    }

    /// Resolve configuration from flags and an arbitrary variable lookup
    pub fn resolve(
        database_url_override: Option<String>,
        memory: bool,
        json: bool,
        migrate: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let backend = match (memory, database_url_override) {
            (true, Some(_)) => return Err(ConfigError::ConflictingBackends),
            (true, None) => Backend::Memory,
            (false, url) => {
                let url = url
                    .or_else(|| lookup("DATABASE_URL"))
                    .ok_or(ConfigError::MissingDatabase)?;
                Backend::Postgres(DatabaseConfig::from_lookup(url, lookup)?)
            }
        };

        Ok(Self {
            backend,
            json,
            migrate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_environment() {
        let config = CliConfig::resolve(Some("postgres://flag".to_string()), false, true, false, |var| {
            (var == "DATABASE_URL").then(|| "postgres://env".to_string())
        })
        .unwrap();

        match config.backend {
            Backend::Postgres(db) => assert_eq!(db.database_url, "postgres://flag"),
            Backend::Memory => panic!("expected postgres backend"),
        }
        assert!(config.json);
    }

    #[test]
    fn test_environment_url_is_used() {
        let config = CliConfig::resolve(None, false, false, true, |var| match var {
            "DATABASE_URL" => Some("postgres://env".to_string()),
            "DB_MAX_CONNECTIONS" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(
            config.backend,
            Backend::Postgres(DatabaseConfig {
                database_url: "postgres://env".to_string(),
                max_connections: 3,
                ..DatabaseConfig::development()
            })
        );
        assert!(config.migrate);
    }

    #[test]
    fn test_memory_backend() {
        let config = CliConfig::resolve(None, true, false, false, |_| None).unwrap();
        assert_eq!(config.backend, Backend::Memory);
    }

    #[test]
    fn test_missing_and_conflicting_backends() {
        assert!(matches!(
            CliConfig::resolve(None, false, false, false, |_| None),
            Err(ConfigError::MissingDatabase)
        ));
        assert!(matches!(
            CliConfig::resolve(Some("postgres://x".to_string()), true, false, false, |_| None),
            Err(ConfigError::ConflictingBackends)
        ));
    }

    #[test]
    fn test_invalid_pool_setting() {
        let result = CliConfig::resolve(None, false, false, false, |var| match var {
            "DATABASE_URL" => Some("postgres://env".to_string()),
            "DB_MIN_CONNECTIONS" => Some("many".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(ConfigError::Database(_))));
    }
}
