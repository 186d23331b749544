//! Lineage consistency checks

use crate::migration::{LedgerEntry, MigrationError};

/// Check that `entries` form a valid lineage.
///
/// Sorts `entries` by index, then requires the first index to be 0 or 1 and
/// every following index to be exactly one more than its predecessor.
/// An empty ledger is valid.
///
/// # Errors
///
/// Returns `MigrationError::IncorrectStartIndex` or
/// `MigrationError::GapInMigrationIndex`. Duplicate indices are reported as a gap.
pub fn check_consistency(entries: &mut [LedgerEntry]) -> Result<(), MigrationError> {
    entries.sort_by_key(|entry| entry.index);
    check_index_sequence(entries.iter().map(|entry| entry.index))
}

/// Same rules as [`check_consistency`] over indices that are already sorted
pub fn check_index_sequence<I>(indices: I) -> Result<(), MigrationError>
where
    I: IntoIterator<Item = i64>,
{
    let mut indices = indices.into_iter();

    let Some(first) = indices.next() else {
        return Ok(());
    };
    if first != 0 && first != 1 {
        return Err(MigrationError::IncorrectStartIndex { found: first });
    }

    let mut previous = first;
    for index in indices {
        // Must be monotonically increasing by one
        if previous.checked_add(1) != Some(index) {
            return Err(MigrationError::GapInMigrationIndex {
                previous,
                found: index,
            });
        }
        previous = index;
    }

    Ok(())
}
