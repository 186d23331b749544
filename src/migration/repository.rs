//! Repository trait definition

use crate::migration::{LedgerEntry, RepositoryError};

/// Durable store of one lineage's migration ledger.
///
/// The migrator keeps no copy of the ledger between calls: every decision is
/// made from a fresh [`get_all`](Repository::get_all), and every state change
/// goes through [`update`](Repository::update) before the next step runs.
pub trait Repository: Send + Sync {
    /// Short identifier of the backend technology, used for registry lookup
    fn scheme(&self) -> &str;

    /// Prepare the repository for use with the given location.
    ///
    /// Repositories that need no setup can rely on the default.
    fn initialize(&self, _url: &str) -> Result<(), RepositoryError> {
        Ok(())
    }

    /// Insert or replace the entry with `entry.index`
    fn update(&self, entry: LedgerEntry) -> Result<(), RepositoryError>;

    /// All recorded entries, in no particular order
    fn get_all(&self) -> Result<Vec<LedgerEntry>, RepositoryError>;
}
