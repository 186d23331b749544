//! Migration artifact discovery

use crate::migration::MigrationError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// One migration in a lineage: its position, a human-readable name, the
/// extension that selects its driver, and its opaque content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationArtifact {
    /// Position in the lineage
    pub index: i64,

    /// Human-readable migration name
    pub name: String,

    /// Filename extension without the dot; selects the driver
    pub extension: String,

    content: Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl MigrationArtifact {
    /// Artifact whose content is read from `path` when needed
    pub fn from_path(
        index: i64,
        name: impl Into<String>,
        extension: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            extension: extension.into(),
            content: Content::File(path.into()),
        }
    }

    /// Artifact with in-memory content
    pub fn from_bytes(
        index: i64,
        name: impl Into<String>,
        extension: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            extension: extension.into(),
            content: Content::Bytes(content.into()),
        }
    }

    /// Path of the backing file, for artifacts discovered on disk
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            Content::File(path) => Some(path),
            Content::Bytes(_) => None,
        }
    }

    /// Read the whole content
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::FileNotFound` if the backing file cannot be read.
    pub fn read_content(&self) -> Result<Vec<u8>, MigrationError> {
        match &self.content {
            Content::File(path) => fs::read(path).map_err(|e| {
                MigrationError::FileNotFound(format!("{}: {}", path.display(), e))
            }),
            Content::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Conventional file name for this artifact: `{index:04}_{name}.{extension}`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{:04}_{}.{}", self.index, self.name, self.extension)
    }

    /// Parse a migration file name into index, name and extension
    ///
    /// Expected format: `{index}_{name}.{extension}`
    ///
    /// # Example
    /// - `0003_add_users.sql` → index: 3, name: "add_users", extension: "sql"
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidFormat` if the name does not match.
    pub fn parse_filename(filename: &str) -> Result<(i64, String, String), MigrationError> {
        parse_with(&filename_pattern()?, filename)
    }
}

fn filename_pattern() -> Result<Regex, MigrationError> {
    Regex::new(r"^(\d+)_([^.]+)\.([A-Za-z0-9_+-]+)$")
        .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {e}")))
}

fn parse_with(pattern: &Regex, filename: &str) -> Result<(i64, String, String), MigrationError> {
    let invalid = || {
        MigrationError::InvalidFormat(format!(
            "Migration file name '{filename}' does not match expected pattern: {{index}}_{{name}}.{{extension}}"
        ))
    };

    let caps = pattern.captures(filename).ok_or_else(invalid)?;
    let (Some(index), Some(name), Some(extension)) = (caps.get(1), caps.get(2), caps.get(3)) else {
        return Err(invalid());
    };

    let index = index.as_str().parse::<i64>().map_err(|e| {
        MigrationError::InvalidFormat(format!("Invalid index in '{filename}': {e}"))
    })?;

    Ok((index, name.as_str().to_string(), extension.as_str().to_string()))
}

/// Supplies the ordered artifacts of a lineage
pub trait MigrationSource {
    /// All artifacts, sorted by index ascending
    fn artifacts(&self) -> Result<Vec<MigrationArtifact>, MigrationError>;
}

/// Migration files in one directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    migrations_dir: PathBuf,
}

impl DirectorySource {
    pub fn new(migrations_dir: impl AsRef<Path>) -> Self {
        Self {
            migrations_dir: migrations_dir.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }
}

impl MigrationSource for DirectorySource {
    /// Scan the directory for `{index}_{name}.{extension}` files.
    ///
    /// Hidden files and names that do not match the pattern are ignored.
    fn artifacts(&self) -> Result<Vec<MigrationArtifact>, MigrationError> {
        discover_migrations(&self.migrations_dir)
    }
}

/// Discover all migration files in a directory, sorted by index
///
/// # Errors
///
/// Returns errors if:
/// - The directory doesn't exist or can't be read
/// - A migration file has an invalid name
/// - Two files share an index
pub fn discover_migrations(migrations_dir: &Path) -> Result<Vec<MigrationArtifact>, MigrationError> {
    if !migrations_dir.exists() {
        return Err(MigrationError::FileNotFound(
            migrations_dir.to_string_lossy().to_string(),
        ));
    }

    if !migrations_dir.is_dir() {
        return Err(MigrationError::InvalidFormat(format!(
            "Path is not a directory: {}",
            migrations_dir.display()
        )));
    }

    let pattern = filename_pattern()?;
    let mut migrations = Vec::new();

    let entries = fs::read_dir(migrations_dir).map_err(|e| {
        MigrationError::FileNotFound(format!(
            "Failed to read migrations directory {}: {}",
            migrations_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            MigrationError::FileNotFound(format!("Failed to read directory entry: {e}"))
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            log::debug!("Skipping non UTF-8 file name {}", path.display());
            continue;
        };

        if !pattern.is_match(filename) {
            log::debug!("Skipping {}: not a migration file", filename);
            continue;
        }

        let (index, name, extension) = parse_with(&pattern, filename)?;
        migrations.push(MigrationArtifact::from_path(index, name, extension, path.clone()));
    }

    sort_artifacts(&mut migrations)?;
    Ok(migrations)
}

/// Sort by index and reject duplicate indices
fn sort_artifacts(artifacts: &mut [MigrationArtifact]) -> Result<(), MigrationError> {
    artifacts.sort_by_key(|artifact| artifact.index);
    if let Some(pair) = artifacts.windows(2).find(|pair| pair[0].index == pair[1].index) {
        return Err(MigrationError::DuplicateArtifact {
            index: pair[0].index,
        });
    }
    Ok(())
}

/// Artifacts held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    artifacts: Vec<MigrationArtifact>,
}

impl MemorySource {
    pub fn new(artifacts: Vec<MigrationArtifact>) -> Self {
        Self { artifacts }
    }

    pub fn push(&mut self, artifact: MigrationArtifact) {
        self.artifacts.push(artifact);
    }
}

impl MigrationSource for MemorySource {
    fn artifacts(&self) -> Result<Vec<MigrationArtifact>, MigrationError> {
        let mut artifacts = self.artifacts.clone();
        sort_artifacts(&mut artifacts)?;
        Ok(artifacts)
    }
}
