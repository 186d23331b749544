//! Driver trait definition

use crate::migration::DriverError;
use std::fmt;
use std::io::Read;

/// Operation a driver can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Apply a migration
    Upgrade,
    /// Undo a migration
    Downgrade,
    /// Check that a migration will apply cleanly, before applying it
    PreVerify,
    /// Check that a migration was applied cleanly
    PostVerify,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Upgrade,
        Capability::Downgrade,
        Capability::PreVerify,
        Capability::PostVerify,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Upgrade => write!(f, "Upgrader"),
            Capability::Downgrade => write!(f, "Downgrader"),
            Capability::PreVerify => write!(f, "PreVerifyer"),
            Capability::PostVerify => write!(f, "PostVerifyer"),
        }
    }
}

/// Backend-specific executor for one kind of migration artifact.
///
/// A driver handles every artifact whose filename ends in
/// [`filename_extension`](Driver::filename_extension). The four content
/// operations are optional: the default bodies return
/// [`DriverError::NotImplemented`], and which of them a driver offers is
/// declared when it is registered with a
/// [`DriverRegistry`](crate::migration::DriverRegistry).
///
/// Drivers are shared behind `Arc` and called from one run at a time, so
/// every method takes `&self`; keep connection state behind a lock.
pub trait Driver: Send + Sync {
    /// Called once before any content operation.
    ///
    /// Check the URL, then open and verify any connection the driver needs.
    fn initialize(&self, url: &str) -> Result<(), DriverError>;

    /// Called once after the last content operation. Close open connections here.
    fn close(&self) -> Result<(), DriverError>;

    /// Extension of the migration files this driver handles, without the
    /// leading dot (`"sql"`, not `".sql"`).
    fn filename_extension(&self) -> &str;

    /// Apply a migration.
    fn upgrade(&self, _content: &mut dyn Read) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented)
    }

    /// Undo a migration.
    fn downgrade(&self, _content: &mut dyn Read) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented)
    }

    /// Test whether the migration looks like it will apply cleanly.
    fn pre_verify(&self, _content: &mut dyn Read) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented)
    }

    /// Verify that the migration was applied cleanly.
    fn post_verify(&self, _content: &mut dyn Read) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented)
    }

    /// Dispatch to the operation for `capability`
    fn run(&self, capability: Capability, content: &mut dyn Read) -> Result<(), DriverError> {
        match capability {
            Capability::Upgrade => self.upgrade(content),
            Capability::Downgrade => self.downgrade(content),
            Capability::PreVerify => self.pre_verify(content),
            Capability::PostVerify => self.post_verify(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareDriver;

    impl Driver for BareDriver {
        fn initialize(&self, _url: &str) -> Result<(), DriverError> {
            Ok(())
        }

        fn close(&self) -> Result<(), DriverError> {
            Ok(())
        }

        fn filename_extension(&self) -> &str {
            "bare"
        }
    }

    #[test]
    fn test_optional_operations_default_to_not_implemented() {
        let driver = BareDriver;
        for capability in Capability::ALL {
            let result = driver.run(capability, &mut &b"content"[..]);
            assert!(
                matches!(result, Err(DriverError::NotImplemented)),
                "{capability} should default to NotImplemented"
            );
        }
    }
}
