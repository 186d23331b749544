//! `LedgerEntry` - one row of a repository's migration ledger

use crate::migration::MigrationState;
use serde::{Deserialize, Serialize};

/// Recorded status of one migration in a lineage.
///
/// Uniqueness and contiguity of `index` across a repository is not enforced
/// here; see [`check_consistency`](crate::migration::check_consistency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position of the migration in the lineage
    pub index: i64,

    /// Current state of the migration
    #[serde(default)]
    pub state: MigrationState,
}

impl LedgerEntry {
    /// Create a new `LedgerEntry`
    #[must_use]
    pub fn new(index: i64, state: MigrationState) -> Self {
        Self { index, state }
    }

    /// Entry for an index that has never been touched
    #[must_use]
    pub fn untouched(index: i64) -> Self {
        Self::new(index, MigrationState::New)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_missing_state_deserializes_as_new() {
        let entry: LedgerEntry = serde_json::from_str(r#"{"index": 4}"#).expect("deserialize");
        assert_eq!(entry, LedgerEntry::untouched(4));
    }
}
