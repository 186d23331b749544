//! In-process ledger

use crate::migration::{LedgerEntry, MigrationState, Repository, RepositoryError};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

pub const MEMORY_SCHEME: &str = "memory";

#[derive(Debug, Default)]
struct Ledger {
    entries: BTreeMap<i64, MigrationState>,
    updates: Vec<LedgerEntry>,
}

/// Ledger kept in memory for the life of the process.
///
/// Besides the current entries it keeps every update it received, in order,
/// which makes the sequence of persisted transitions observable.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    ledger: Mutex<Ledger>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `entries`; later duplicates overwrite earlier ones
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        let ledger = Ledger {
            entries: entries.into_iter().map(|e| (e.index, e.state)).collect(),
            updates: Vec::new(),
        };
        Self {
            ledger: Mutex::new(ledger),
        }
    }

    /// Recorded state of `index`, if it has an entry
    #[must_use]
    pub fn state(&self, index: i64) -> Option<MigrationState> {
        self.lock().ok()?.entries.get(&index).copied()
    }

    /// Every state persisted for `index`, oldest first
    #[must_use]
    pub fn history(&self, index: i64) -> Vec<MigrationState> {
        self.lock()
            .map(|ledger| {
                ledger
                    .updates
                    .iter()
                    .filter(|entry| entry.index == index)
                    .map(|entry| entry.state)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Indices in the order they were first updated
    #[must_use]
    pub fn touched(&self) -> Vec<i64> {
        let mut seen = Vec::new();
        if let Ok(ledger) = self.lock() {
            for entry in &ledger.updates {
                if !seen.contains(&entry.index) {
                    seen.push(entry.index);
                }
            }
        }
        seen
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, RepositoryError> {
        self.ledger
            .lock()
            .map_err(|e| RepositoryError::Storage(format!("Failed to lock ledger: {e}")))
    }
}

impl Repository for MemoryRepository {
    fn scheme(&self) -> &str {
        MEMORY_SCHEME
    }

    fn update(&self, entry: LedgerEntry) -> Result<(), RepositoryError> {
        let mut ledger = self.lock()?;
        ledger.entries.insert(entry.index, entry.state);
        ledger.updates.push(entry);
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let ledger = self.lock()?;
        Ok(ledger
            .entries
            .iter()
            .map(|(&index, &state)| LedgerEntry::new(index, state))
            .collect())
    }
}
