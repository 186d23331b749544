//! Ledger stored as a JSON document on the local filesystem

use crate::migration::{LedgerEntry, Repository, RepositoryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const FILE_SCHEME: &str = "file";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    migrations: Vec<LedgerEntry>,
}

/// Repository persisting the ledger to a single JSON file.
///
/// [`initialize`](Repository::initialize) takes `file://path` or a bare path.
/// A missing file reads as an empty ledger. Every update rewrites the whole
/// document through a sibling temporary file and a rename, so a crash leaves
/// either the old or the new ledger on disk.
#[derive(Debug, Default)]
pub struct JsonFileRepository {
    path: Mutex<Option<PathBuf>>,
}

impl JsonFileRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository already bound to `path`
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Mutex::new(Some(path.into())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<PathBuf>>, RepositoryError> {
        self.path
            .lock()
            .map_err(|e| RepositoryError::Storage(format!("Failed to lock ledger path: {e}")))
    }

    fn bound_path(guard: &Option<PathBuf>) -> Result<&Path, RepositoryError> {
        guard
            .as_deref()
            .ok_or_else(|| RepositoryError::Uninitialized(FILE_SCHEME.to_string()))
    }

    fn read(path: &Path) -> Result<BTreeMap<i64, LedgerEntry>, RepositoryError> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        let document: LedgerDocument = serde_json::from_slice(&raw)?;
        Ok(document
            .migrations
            .into_iter()
            .map(|entry| (entry.index, entry))
            .collect())
    }

    fn write(path: &Path, entries: &BTreeMap<i64, LedgerEntry>) -> Result<(), RepositoryError> {
        let document = LedgerDocument {
            migrations: entries.values().copied().collect(),
        };
        let json = serde_json::to_vec_pretty(&document)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl Repository for JsonFileRepository {
    fn scheme(&self) -> &str {
        FILE_SCHEME
    }

    fn initialize(&self, url: &str) -> Result<(), RepositoryError> {
        let location = url.strip_prefix("file://").unwrap_or(url);
        if location.is_empty() {
            return Err(RepositoryError::Storage(format!(
                "Invalid ledger location '{url}'"
            )));
        }

        let path = PathBuf::from(location);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        log::debug!("Using ledger file {}", path.display());
        *self.lock()? = Some(path);
        Ok(())
    }

    fn update(&self, entry: LedgerEntry) -> Result<(), RepositoryError> {
        let guard = self.lock()?;
        let path = Self::bound_path(&guard)?;

        let mut entries = Self::read(path)?;
        entries.insert(entry.index, entry);
        Self::write(path, &entries)
    }

    fn get_all(&self) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let guard = self.lock()?;
        let path = Self::bound_path(&guard)?;
        Ok(Self::read(path)?.into_values().collect())
    }
}
