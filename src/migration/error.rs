//! Migration-specific error types

use crate::migration::{Capability, MigrationState};
use std::fmt;
use std::io;

/// Error reported by a [`Driver`](crate::migration::Driver) operation
#[derive(Debug)]
pub enum DriverError {
    /// The driver does not support the requested operation.
    ///
    /// Optional steps (pre- and post-verification) treat this as "skip";
    /// it is never recorded as a failure for them.
    NotImplemented,
    /// Opening or validating the backend connection failed
    Connection(String),
    /// The backend rejected the migration content
    Execution(String),
    /// I/O error while talking to the backend or reading content
    Io(io::Error),
}

impl DriverError {
    /// Whether this is the "not implemented" marker rather than a real failure
    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, DriverError::NotImplemented)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::NotImplemented => {
                write!(f, "The feature is not implemented by this driver")
            }
            DriverError::Connection(msg) => write!(f, "Connection error: {msg}"),
            DriverError::Execution(msg) => write!(f, "Execution error: {msg}"),
            DriverError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DriverError {
    fn from(error: io::Error) -> Self {
        DriverError::Io(error)
    }
}

/// Error reported by a [`Repository`](crate::migration::Repository)
#[derive(Debug)]
pub enum RepositoryError {
    /// The repository was used before `initialize` succeeded
    Uninitialized(String),
    /// The backing store rejected the operation
    Storage(String),
    /// I/O error
    Io(io::Error),
    /// The stored ledger could not be encoded or decoded
    Serialization(serde_json::Error),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::Uninitialized(scheme) => {
                write!(f, "Repository '{scheme}' has not been initialized")
            }
            RepositoryError::Storage(msg) => write!(f, "Storage error: {msg}"),
            RepositoryError::Io(e) => write!(f, "I/O error: {e}"),
            RepositoryError::Serialization(e) => write!(f, "Ledger serialization error: {e}"),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::Io(e) => Some(e),
            RepositoryError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RepositoryError {
    fn from(error: io::Error) -> Self {
        RepositoryError::Io(error)
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        RepositoryError::Serialization(error)
    }
}

/// Configuration errors raised while populating or querying the registries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A driver reported an empty filename extension
    EmptyExtension,
    /// A driver reported an extension starting with a path separator or dot
    LeadingSeparator { extension: String },
    /// A different driver instance already owns the extension
    ConflictingDriver { extension: String },
    /// The capability is already registered for the extension
    AlreadyRegistered {
        capability: Capability,
        extension: String,
    },
    /// Nothing is registered for the extension and capability
    NoDriverForExtension {
        capability: Capability,
        extension: String,
    },
    /// A repository already owns the scheme
    SchemeAlreadyRegistered { scheme: String },
    /// No repository is registered for the scheme
    NoRepositoryForScheme { scheme: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::EmptyExtension => {
                write!(f, "Filename extension must not be an empty string")
            }
            RegistryError::LeadingSeparator { extension } => {
                write!(
                    f,
                    "Filename extension '{extension}' must not begin with a separator"
                )
            }
            RegistryError::ConflictingDriver { extension } => {
                write!(
                    f,
                    "A different driver has already been registered for extension '{extension}'"
                )
            }
            RegistryError::AlreadyRegistered {
                capability,
                extension,
            } => {
                write!(
                    f,
                    "{capability} for extension '{extension}' is already registered"
                )
            }
            RegistryError::NoDriverForExtension {
                capability,
                extension,
            } => {
                write!(
                    f,
                    "No {capability} registered for extension '{extension}'"
                )
            }
            RegistryError::SchemeAlreadyRegistered { scheme } => {
                write!(f, "Repository with scheme '{scheme}' already registered")
            }
            RegistryError::NoRepositoryForScheme { scheme } => {
                write!(f, "No repository registered for scheme '{scheme}'")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors surfaced by the [`Migrator`](crate::migration::Migrator)
#[derive(Debug)]
pub enum MigrationError {
    /// Registry lookup or registration failed
    Registry(RegistryError),
    /// Repository I/O failed
    Repository(RepositoryError),
    /// A driver could not be initialized; no migration was attempted
    DriverInitialization {
        extension: String,
        error: DriverError,
    },
    /// The repository could not be initialized; no migration was attempted
    RepositoryInitialization {
        scheme: String,
        error: RepositoryError,
    },
    /// Closing a driver after the run failed
    DriverClose {
        extension: String,
        error: DriverError,
    },
    /// The lowest index of a lineage is neither 0 nor 1
    IncorrectStartIndex { found: i64 },
    /// Two consecutive indices differ by something other than one
    GapInMigrationIndex { previous: i64, found: i64 },
    /// Two migration artifacts share an index
    DuplicateArtifact { index: i64 },
    /// The ledger records a migration that has no artifact
    MissingArtifact { index: i64 },
    /// An entry past the starting point is not in the state the run expects
    OutOfOrder { index: i64, state: MigrationState },
    /// An earlier run left a migration in a failed state
    UnresolvedFailure { index: i64, state: MigrationState },
    /// An earlier run stopped in the middle of a migration
    Interrupted { index: i64, state: MigrationState },
    /// The state machine was asked for a transition it does not allow
    IllegalTransition {
        index: i64,
        from: MigrationState,
        to: MigrationState,
    },
    /// A migration failed during this run; the state is already persisted
    Failed {
        index: i64,
        name: String,
        state: MigrationState,
        error: DriverError,
    },
    /// A migration failed and its failure state could not be persisted.
    ///
    /// The ledger still shows the in-progress state the migration was in.
    FailureNotRecorded {
        index: i64,
        state: MigrationState,
        error: DriverError,
        record_error: RepositoryError,
    },
    /// Invalid migration source or artifact
    InvalidFormat(String),
    /// Migration directory or artifact not found
    FileNotFound(String),
    /// Configuration could not be loaded
    Config(String),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::Registry(e) => write!(f, "Registry error: {e}"),
            MigrationError::Repository(e) => write!(f, "Repository error: {e}"),
            MigrationError::DriverInitialization { extension, error } => {
                write!(
                    f,
                    "Failed to initialize driver for '{extension}' migrations: {error}"
                )
            }
            MigrationError::RepositoryInitialization { scheme, error } => {
                write!(f, "Failed to initialize repository '{scheme}': {error}")
            }
            MigrationError::DriverClose { extension, error } => {
                write!(f, "Failed to close driver for '{extension}' migrations: {error}")
            }
            MigrationError::IncorrectStartIndex { found } => {
                write!(
                    f,
                    "First migration index must either be 0 or 1, found {found}"
                )
            }
            MigrationError::GapInMigrationIndex { previous, found } => {
                write!(
                    f,
                    "There was a gap in migrations between index {previous} and {found}. Was one missing?"
                )
            }
            MigrationError::DuplicateArtifact { index } => {
                write!(f, "More than one migration artifact has index {index}")
            }
            MigrationError::MissingArtifact { index } => {
                write!(
                    f,
                    "Migration {index} is recorded in the ledger but no artifact was found.\n\
                     Suggestion: Ensure all migration files are present in the migrations directory"
                )
            }
            MigrationError::OutOfOrder { index, state } => {
                write!(
                    f,
                    "Migration {index} is {state}, out of order with the rest of the lineage"
                )
            }
            MigrationError::UnresolvedFailure { index, state } => {
                write!(
                    f,
                    "Migration {index} is in state {state} from a previous run.\n\
                     Fix the cause and reset it with `force` before running again"
                )
            }
            MigrationError::Interrupted { index, state } => {
                write!(
                    f,
                    "Migration {index} was left in state {state}; a previous run was interrupted.\n\
                     Inspect the backend and record the real outcome with `force`"
                )
            }
            MigrationError::IllegalTransition { index, from, to } => {
                write!(f, "Migration {index} cannot move from {from} to {to}")
            }
            MigrationError::Failed {
                index,
                name,
                state,
                error,
            } => {
                write!(f, "Migration {index} '{name}' ended in {state}: {error}")
            }
            MigrationError::FailureNotRecorded {
                index,
                state,
                error,
                record_error,
            } => {
                write!(
                    f,
                    "Migration {index} failed: {error}\n\
                     Recording {state} also failed: {record_error}"
                )
            }
            MigrationError::InvalidFormat(msg) => write!(f, "Invalid migration format: {msg}"),
            MigrationError::FileNotFound(path) => write!(f, "Migration file not found: {path}"),
            MigrationError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Registry(e) => Some(e),
            MigrationError::Repository(e) => Some(e),
            MigrationError::DriverInitialization { error, .. }
            | MigrationError::DriverClose { error, .. }
            | MigrationError::Failed { error, .. }
            | MigrationError::FailureNotRecorded { error, .. } => Some(error),
            MigrationError::RepositoryInitialization { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<RegistryError> for MigrationError {
    fn from(error: RegistryError) -> Self {
        MigrationError::Registry(error)
    }
}

impl From<RepositoryError> for MigrationError {
    fn from(error: RepositoryError) -> Self {
        MigrationError::Repository(error)
    }
}

impl From<config::ConfigError> for MigrationError {
    fn from(error: config::ConfigError) -> Self {
        MigrationError::Config(error.to_string())
    }
}
