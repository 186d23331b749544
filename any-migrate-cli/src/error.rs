//! CLI error types

use any_migrate::MigrationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid migration name '{0}': use letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("Invalid filename extension '{0}'")]
    InvalidExtension(String),

    #[error("No index follows {0}; the lineage cannot grow past it")]
    IndexOverflow(i64),

    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}
