//! Migration orchestration
//!
//! This module provides the pieces of a migration run:
//! - [`Driver`] and [`Repository`] traits for backends and ledger storage
//! - Registries mapping filename extensions and schemes to implementations
//! - Ledger consistency checks and the per-migration state machine
//! - [`Migrator`], which drives a lineage up or down
//!
//! # Example
//!
//! ```rust,no_run
//! use any_migrate::config::MigrateConfig;
//! use any_migrate::drivers::ShellDriver;
//! use any_migrate::migration::{
//!     Capability, DirectorySource, DriverRegistry, Migrator, RepositoryRegistry,
//!     RunToCompletion,
//! };
//! use any_migrate::repositories::JsonFileRepository;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut drivers = DriverRegistry::new();
//! drivers.register_all(&Capability::ALL, Arc::new(ShellDriver::new()))?;
//!
//! let mut repositories = RepositoryRegistry::new();
//! repositories.register(Arc::new(JsonFileRepository::new()))?;
//!
//! let config = MigrateConfig::load()?;
//! let source = DirectorySource::new(&config.migrations_dir);
//!
//! let migrator = Migrator::new(&drivers, &repositories, &config);
//! let applied = migrator.upgrade(&source, &mut RunToCompletion)?;
//! println!("Applied {applied} migration(s)");
//! # Ok(())
//! # }
//! ```

pub mod consistency;
pub mod driver;
pub mod error;
pub mod file;
mod machine;
pub mod migrator;
pub mod record;
pub mod registry;
pub mod repository;
pub mod state;
pub mod status;
pub mod stop;

pub use consistency::{check_consistency, check_index_sequence};
pub use driver::{Capability, Driver};
pub use error::{DriverError, MigrationError, RegistryError, RepositoryError};
pub use file::{discover_migrations, DirectorySource, MemorySource, MigrationArtifact, MigrationSource};
pub use machine::MigrationDirection;
pub use migrator::Migrator;
pub use record::LedgerEntry;
pub use registry::{DriverRegistry, RepositoryRegistry};
pub use repository::Repository;
pub use state::{MigrationState, UnknownState};
pub use status::{MigrationInfo, MigrationStatus};
pub use stop::{MaxSteps, RunToCompletion, StopPolicy};
