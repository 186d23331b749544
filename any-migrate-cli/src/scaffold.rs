//! Scaffolding for new migrations and configuration files

use crate::CliError;
use any_migrate::config::MigrateConfig;
use any_migrate::migration::{discover_migrations, MigrationArtifact};
use std::fs;
use std::path::{Path, PathBuf};

/// Index the next migration in `migrations_dir` should get
///
/// A missing directory starts a new lineage at 0.
pub fn next_index(migrations_dir: &Path) -> Result<i64, CliError> {
    if !migrations_dir.exists() {
        return Ok(0);
    }

    let artifacts = discover_migrations(migrations_dir)?;
    match artifacts.last() {
        None => Ok(0),
        Some(last) => last
            .index
            .checked_add(1)
            .ok_or(CliError::IndexOverflow(last.index)),
    }
}

/// Create the next migration artifact named `name` with extension `extension`
///
/// # Returns
///
/// Returns the path of the new file.
pub fn create_migration(
    migrations_dir: &Path,
    name: &str,
    extension: &str,
) -> Result<PathBuf, CliError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CliError::InvalidName(name.to_string()));
    }
    let extension = extension.trim_start_matches('.');
    if extension.is_empty()
        || !extension
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'))
    {
        return Err(CliError::InvalidExtension(extension.to_string()));
    }

    let index = next_index(migrations_dir)?;
    let body = template(index, name, extension);
    let artifact = MigrationArtifact::from_bytes(index, name, extension, body.as_bytes());
    let path = migrations_dir.join(artifact.file_name());

    fs::create_dir_all(migrations_dir).map_err(|source| CliError::Write {
        path: migrations_dir.to_path_buf(),
        source,
    })?;
    write_new(&path, &body)?;

    log::info!("Created migration {} at {}", index, path.display());
    Ok(path)
}

/// Write `config` as TOML to `path`, refusing to overwrite an existing file
pub fn init_config(path: &Path, config: &MigrateConfig) -> Result<(), CliError> {
    let body = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CliError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    write_new(path, &body)
}

fn write_new(path: &Path, body: &str) -> Result<(), CliError> {
    if path.exists() {
        return Err(CliError::AlreadyExists(path.to_path_buf()));
    }
    fs::write(path, body).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn template(index: i64, name: &str, extension: &str) -> String {
    match extension {
        "sh" => format!(
            r#"#!/bin/sh
# Migration {index}: {name}
#
# Run as `sh -s -- <phase>`; the connection URL is in $ANY_MIGRATE_URL.
# Exit 78 from a phase that does not apply to this migration.
set -e

case "$1" in
  up)
    ;;
  down)
    ;;
  *)
    exit 78
    ;;
esac
"#
        ),
        _ => String::new(),
    }
}
