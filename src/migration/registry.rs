//! Driver and repository registries
//!
//! Both registries are plain values built once at startup and then lent to a
//! [`Migrator`](crate::migration::Migrator). Registration takes `&mut self`, so
//! nothing can be registered while a migrator holds a borrow.

use crate::migration::{Capability, Driver, RegistryError, Repository};
use std::collections::HashMap;
use std::fmt;
use std::path::is_separator;
use std::sync::Arc;

/// Drivers indexed by filename extension, per [`Capability`]
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
    capabilities: HashMap<(Capability, String), Arc<dyn Driver>>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` as the owner of its filename extension.
    ///
    /// Registering the same instance again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::EmptyExtension` or `RegistryError::LeadingSeparator`
    /// for an invalid extension, and `RegistryError::ConflictingDriver` if a
    /// different instance already owns the extension.
    pub fn register_driver(&mut self, driver: Arc<dyn Driver>) -> Result<(), RegistryError> {
        let extension = validate_extension(driver.filename_extension())?;

        if let Some(existing) = self.drivers.get(&extension) {
            if !Arc::ptr_eq(existing, &driver) {
                return Err(RegistryError::ConflictingDriver { extension });
            }
            return Ok(());
        }

        log::debug!("Registered driver for '.{}' migrations", extension);
        self.drivers.insert(extension, driver);
        Ok(())
    }

    /// Register `driver` for one capability, claiming its extension first.
    ///
    /// # Errors
    ///
    /// Everything [`register_driver`](Self::register_driver) returns, plus
    /// `RegistryError::AlreadyRegistered` when the capability is already taken
    /// for the extension, even by the same driver.
    pub fn register(
        &mut self,
        capability: Capability,
        driver: Arc<dyn Driver>,
    ) -> Result<(), RegistryError> {
        self.register_driver(Arc::clone(&driver))?;

        let key = (capability, driver.filename_extension().to_string());
        if self.capabilities.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered {
                capability,
                extension: key.1,
            });
        }

        self.capabilities.insert(key, driver);
        Ok(())
    }

    /// Register `driver` for every capability in `capabilities`
    pub fn register_all(
        &mut self,
        capabilities: &[Capability],
        driver: Arc<dyn Driver>,
    ) -> Result<(), RegistryError> {
        for &capability in capabilities {
            self.register(capability, Arc::clone(&driver))?;
        }
        Ok(())
    }

    pub fn register_upgrader(&mut self, driver: Arc<dyn Driver>) -> Result<(), RegistryError> {
        self.register(Capability::Upgrade, driver)
    }

    pub fn register_downgrader(&mut self, driver: Arc<dyn Driver>) -> Result<(), RegistryError> {
        self.register(Capability::Downgrade, driver)
    }

    pub fn register_pre_verifyer(&mut self, driver: Arc<dyn Driver>) -> Result<(), RegistryError> {
        self.register(Capability::PreVerify, driver)
    }

    pub fn register_post_verifyer(&mut self, driver: Arc<dyn Driver>) -> Result<(), RegistryError> {
        self.register(Capability::PostVerify, driver)
    }

    /// The driver owning `extension`, regardless of capability
    #[must_use]
    pub fn driver(&self, extension: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(extension).cloned()
    }

    /// The driver registered for `capability` on `extension`, if any
    #[must_use]
    pub fn find(&self, capability: Capability, extension: &str) -> Option<Arc<dyn Driver>> {
        self.capabilities
            .get(&(capability, extension.to_string()))
            .cloned()
    }

    /// The driver registered for `capability` on `extension`
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NoDriverForExtension` if none is registered.
    pub fn get(
        &self,
        capability: Capability,
        extension: &str,
    ) -> Result<Arc<dyn Driver>, RegistryError> {
        self.find(capability, extension)
            .ok_or_else(|| RegistryError::NoDriverForExtension {
                capability,
                extension: extension.to_string(),
            })
    }

    /// Whether `capability` is registered for `extension`
    #[must_use]
    pub fn supports(&self, capability: Capability, extension: &str) -> bool {
        self.capabilities
            .contains_key(&(capability, extension.to_string()))
    }

    /// Registered extensions, sorted
    #[must_use]
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities: Vec<_> = self.capabilities.keys().collect();
        capabilities.sort();
        f.debug_struct("DriverRegistry")
            .field("extensions", &self.extensions())
            .field("capabilities", &capabilities)
            .finish()
    }
}

fn validate_extension(extension: &str) -> Result<String, RegistryError> {
    match extension.chars().next() {
        None => Err(RegistryError::EmptyExtension),
        Some(first) if first == '.' || is_separator(first) => {
            Err(RegistryError::LeadingSeparator {
                extension: extension.to_string(),
            })
        }
        Some(_) => Ok(extension.to_string()),
    }
}

/// Repositories indexed by scheme
#[derive(Default)]
pub struct RepositoryRegistry {
    repositories: HashMap<String, Arc<dyn Repository>>,
}

impl RepositoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `repository` under its scheme.
    ///
    /// Registering the same instance again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::SchemeAlreadyRegistered` if a different
    /// repository already owns the scheme.
    pub fn register(&mut self, repository: Arc<dyn Repository>) -> Result<(), RegistryError> {
        let scheme = repository.scheme().to_string();

        if let Some(existing) = self.repositories.get(&scheme) {
            if Arc::ptr_eq(existing, &repository) {
                return Ok(());
            }
            return Err(RegistryError::SchemeAlreadyRegistered { scheme });
        }

        log::debug!("Registered repository for scheme '{}'", scheme);
        self.repositories.insert(scheme, repository);
        Ok(())
    }

    /// The repository registered for `scheme`
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NoRepositoryForScheme` if none is registered.
    pub fn get(&self, scheme: &str) -> Result<Arc<dyn Repository>, RegistryError> {
        self.repositories
            .get(scheme)
            .cloned()
            .ok_or_else(|| RegistryError::NoRepositoryForScheme {
                scheme: scheme.to_string(),
            })
    }

    /// Registered schemes, sorted
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.repositories.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl fmt::Debug for RepositoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
