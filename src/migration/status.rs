//! Migration status tracking

use crate::migration::MigrationState;
use std::path::PathBuf;

/// One artifact together with its recorded state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    /// Position in the lineage
    pub index: i64,

    /// Migration name
    pub name: String,

    /// Filename extension selecting the driver
    pub extension: String,

    /// Backing file, for artifacts discovered on disk
    pub path: Option<PathBuf>,

    /// Recorded state (`New` when the ledger has no entry)
    pub state: MigrationState,
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Every artifact, in lineage order
    pub migrations: Vec<MigrationInfo>,

    /// Total number of migrations
    pub total: usize,

    /// Number of migrations in `MigrationSucceeded`
    pub applied_count: usize,

    /// Number of migrations in `New`
    pub pending_count: usize,

    /// Number of migrations in a `*_FAILED` state
    pub failed_count: usize,
}

impl MigrationStatus {
    /// Create a new `MigrationStatus`
    #[must_use]
    pub fn new(migrations: Vec<MigrationInfo>) -> Self {
        let count = |f: fn(MigrationState) -> bool| {
            migrations.iter().filter(|m| f(m.state)).count()
        };
        let applied_count = count(MigrationState::is_succeeded);
        let pending_count = count(|s| s == MigrationState::New);
        let failed_count = count(MigrationState::is_failed);

        Self {
            total: migrations.len(),
            migrations,
            applied_count,
            pending_count,
            failed_count,
        }
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.applied_count == self.total
    }

    /// Migrations that need operator attention: failed or interrupted
    pub fn needs_attention(&self) -> impl Iterator<Item = &MigrationInfo> {
        self.migrations
            .iter()
            .filter(|m| m.state.is_failed() || m.state.is_in_progress())
    }

    /// Get the latest applied migration index
    #[must_use]
    pub fn latest_applied_index(&self) -> Option<i64> {
        self.migrations
            .iter()
            .filter(|m| m.state.is_succeeded())
            .map(|m| m.index)
            .max()
    }

    /// Get the next migration an upgrade would start with
    #[must_use]
    pub fn next_pending_index(&self) -> Option<i64> {
        self.migrations
            .iter()
            .find(|m| !m.state.is_succeeded())
            .map(|m| m.index)
    }
}
