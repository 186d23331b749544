//! # any-migrate
//!
//! Backend-agnostic migration orchestration. Drivers apply opaque migration
//! artifacts to some backend, a repository records each migration's state in
//! a ledger, and the [`Migrator`](migration::Migrator) moves a lineage of
//! migrations up or down one state transition at a time.

pub mod config;
pub mod drivers;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod migration;
pub mod repositories;

#[cfg(test)]
mod tests_cfg;

pub use config::MigrateConfig;
pub use migration::{
    Capability, Driver, DriverError, DriverRegistry, LedgerEntry, MigrationError,
    MigrationState, Migrator, Repository, RepositoryError, RepositoryRegistry,
};
