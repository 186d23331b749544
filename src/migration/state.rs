//! Migration states and the transitions allowed between them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recorded state of a single migration in the ledger.
///
/// The success path is `New → Testing → Migrating → Verifying → MigrationSucceeded`.
/// `Testing` and `Verifying` are only visited when the driver registered the
/// matching verification capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    /// Never touched. Also the state of an index with no ledger entry.
    #[default]
    New,
    /// Pre-verification in progress
    Testing,
    /// Pre-verification rejected the migration; nothing was applied
    TestingFailed,
    /// Applying (or undoing) the migration
    Migrating,
    /// The apply or undo operation failed
    MigrationFailed,
    /// Post-verification in progress
    Verifying,
    /// Applied, but post-verification rejected the result
    VerificationFailed,
    /// Applied and verified
    MigrationSucceeded,
}

impl MigrationState {
    /// All states, in declaration order
    pub const ALL: [MigrationState; 8] = [
        MigrationState::New,
        MigrationState::Testing,
        MigrationState::TestingFailed,
        MigrationState::Migrating,
        MigrationState::MigrationFailed,
        MigrationState::Verifying,
        MigrationState::VerificationFailed,
        MigrationState::MigrationSucceeded,
    ];

    /// Whether this is one of the three `*_FAILED` states
    #[must_use]
    pub fn is_failed(self) -> bool {
        matches!(
            self,
            MigrationState::TestingFailed
                | MigrationState::MigrationFailed
                | MigrationState::VerificationFailed
        )
    }

    /// Whether a run was working on this migration when it stopped.
    ///
    /// A ledger entry left in one of these states means the process died
    /// between two persisted transitions.
    #[must_use]
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            MigrationState::Testing | MigrationState::Migrating | MigrationState::Verifying
        )
    }

    #[must_use]
    pub fn is_succeeded(self) -> bool {
        self == MigrationState::MigrationSucceeded
    }

    /// Whether the state machine may move from `self` to `next` during a run.
    ///
    /// Failure states have no outgoing transitions; only an operator override
    /// (`Migrator::force`) moves an entry out of them.
    #[must_use]
    pub fn can_transition_to(self, next: MigrationState) -> bool {
        use MigrationState::*;
        matches!(
            (self, next),
            (New, Testing)
                | (New, Migrating)
                | (Testing, TestingFailed)
                | (Testing, Migrating)
                | (Migrating, MigrationFailed)
                | (Migrating, Verifying)
                | (Migrating, MigrationSucceeded)
                | (Migrating, New)
                | (Verifying, VerificationFailed)
                | (Verifying, MigrationSucceeded)
                | (MigrationSucceeded, Migrating)
        )
    }

    /// Upper-case ledger name, e.g. `MIGRATION_SUCCEEDED`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationState::New => "NEW",
            MigrationState::Testing => "TESTING",
            MigrationState::TestingFailed => "TESTING_FAILED",
            MigrationState::Migrating => "MIGRATING",
            MigrationState::MigrationFailed => "MIGRATION_FAILED",
            MigrationState::Verifying => "VERIFYING",
            MigrationState::VerificationFailed => "VERIFICATION_FAILED",
            MigrationState::MigrationSucceeded => "MIGRATION_SUCCEEDED",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown state name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown migration state '{}'", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl FromStr for MigrationState {
    type Err = UnknownState;

    /// Accepts the ledger name in any case, with `-` or `_` separators
    /// (`migration_succeeded`, `MIGRATION-SUCCEEDED`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        MigrationState::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}
