//! Configuration for a migration run
//!
//! [`MigrateConfig::load`] reads `config/any-migrate.toml` (optional) and
//! environment variables prefixed with `ANY_MIGRATE`, e.g.
//! `ANY_MIGRATE__REPOSITORY__URL=file://ledger.json`.

use crate::migration::MigrationError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/any-migrate.toml";
pub const ENV_PREFIX: &str = "ANY_MIGRATE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateConfig {
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default)]
    pub repository: RepositoryConfig,
    /// Per-extension driver settings, keyed by filename extension
    #[serde(default)]
    pub drivers: BTreeMap<String, DriverConfig>,
}

/// Where the ledger lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_repository_url")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Connection URL handed to the driver's `initialize`
    pub url: String,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_scheme() -> String {
    "file".to_string()
}

fn default_repository_url() -> String {
    "file://.any-migrate/ledger.json".to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            url: default_repository_url(),
        }
    }
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            repository: RepositoryConfig::default(),
            drivers: BTreeMap::new(),
        }
    }
}

impl MigrateConfig {
    /// Configuration for the repository at `scheme` / `url`, everything else default
    pub fn for_repository(scheme: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            repository: RepositoryConfig {
                scheme: scheme.into(),
                url: url.into(),
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_driver_url(mut self, extension: impl Into<String>, url: impl Into<String>) -> Self {
        self.drivers
            .insert(extension.into(), DriverConfig { url: url.into() });
        self
    }

    #[must_use]
    pub fn with_migrations_dir(mut self, migrations_dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = migrations_dir.into();
        self
    }

    /// URL for the driver handling `extension`, falling back to the repository URL
    #[must_use]
    pub fn driver_url(&self, extension: &str) -> &str {
        self.drivers
            .get(extension)
            .map_or(self.repository.url.as_str(), |driver| driver.url.as_str())
    }

    /// Load from `config/any-migrate.toml`, falling back to env vars
    pub fn load() -> Result<Self, MigrationError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path` (optional) overlaid with `ANY_MIGRATE__*` env vars
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Config` if a source cannot be read or the
    /// settings do not describe a `MigrateConfig`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| {
                MigrationError::Config(format!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(settings.try_deserialize::<MigrateConfig>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("any-migrate.toml");
        fs::write(
            &path,
            r#"
migrations_dir = "db/migrations"

[repository]
scheme = "memory"
url = "mem://"

[drivers.sh]
url = "postgres://localhost/app"
"#,
        )
        .expect("write");

        let config = MigrateConfig::load_from(&path).expect("Should load");
        assert_eq!(config.migrations_dir, PathBuf::from("db/migrations"));
        assert_eq!(config.repository.scheme, "memory");
        assert_eq!(config.driver_url("sh"), "postgres://localhost/app");
        assert_eq!(config.driver_url("sql"), "mem://");
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config =
            MigrateConfig::load_from(dir.path().join("absent.toml")).expect("Should load");
        assert_eq!(config.repository, RepositoryConfig::default());
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("any-migrate.toml");
        fs::write(&path, "[repository\nscheme = ").expect("write");

        match MigrateConfig::load_from(&path) {
            Err(MigrationError::Config(msg)) => assert!(msg.contains("any-migrate.toml")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_wrong_type_is_config_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("any-migrate.toml");
        fs::write(&path, "repository = 5\n").expect("write");

        assert!(matches!(
            MigrateConfig::load_from(&path),
            Err(MigrationError::Config(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = MigrateConfig::for_repository("memory", "mem://")
            .with_driver_url("sql", "postgres://db")
            .with_migrations_dir("m");
        assert_eq!(config.driver_url("sql"), "postgres://db");
        assert_eq!(config.migrations_dir, PathBuf::from("m"));
    }
}
