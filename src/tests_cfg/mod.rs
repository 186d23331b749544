//! Shared fixtures for unit tests
//!
//! [`ScriptedDriver`] records every content operation it receives and fails
//! the ones it was told to fail, keyed by capability and artifact content.

use crate::migration::{Capability, Driver, DriverError};
use std::collections::HashSet;
use std::io::Read;
use std::sync::Mutex;

#[derive(Default)]
struct Log {
    calls: Vec<(Capability, String)>,
    initialized: Vec<String>,
    closed: usize,
}

pub struct ScriptedDriver {
    extension: String,
    missing: HashSet<Capability>,
    failures: HashSet<(Capability, String)>,
    fail_initialize: bool,
    log: Mutex<Log>,
}

impl ScriptedDriver {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            missing: HashSet::new(),
            failures: HashSet::new(),
            fail_initialize: false,
            log: Mutex::new(Log::default()),
        }
    }

    /// Answer `NotImplemented` for `capability`
    pub fn without(mut self, capability: Capability) -> Self {
        self.missing.insert(capability);
        self
    }

    /// Fail `capability` when the artifact content equals `content`
    pub fn fail_on(mut self, capability: Capability, content: &str) -> Self {
        self.failures.insert((capability, content.to_string()));
        self
    }

    pub fn fail_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Content operations received so far, in order
    #[allow(clippy::unwrap_used)] // Test code - unwrap is acceptable
    pub fn calls(&self) -> Vec<(Capability, String)> {
        self.log.lock().unwrap().calls.clone()
    }

    /// Content of the `capability` operations received so far, in order
    pub fn calls_for(&self, capability: Capability) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(c, _)| *c == capability)
            .map(|(_, content)| content)
            .collect()
    }

    #[allow(clippy::unwrap_used)] // Test code - unwrap is acceptable
    pub fn initialized_with(&self) -> Vec<String> {
        self.log.lock().unwrap().initialized.clone()
    }

    #[allow(clippy::unwrap_used)] // Test code - unwrap is acceptable
    pub fn close_count(&self) -> usize {
        self.log.lock().unwrap().closed
    }

    #[allow(clippy::unwrap_used)] // Test code - unwrap is acceptable
    fn perform(&self, capability: Capability, content: &mut dyn Read) -> Result<(), DriverError> {
        if self.missing.contains(&capability) {
            return Err(DriverError::NotImplemented);
        }

        let mut body = String::new();
        content.read_to_string(&mut body)?;
        self.log.lock().unwrap().calls.push((capability, body.clone()));

        if self.failures.contains(&(capability, body.clone())) {
            return Err(DriverError::Execution(format!("{capability} rejected '{body}'")));
        }
        Ok(())
    }
}

impl Driver for ScriptedDriver {
    #[allow(clippy::unwrap_used)] // Test code - unwrap is acceptable
    fn initialize(&self, url: &str) -> Result<(), DriverError> {
        if self.fail_initialize {
            return Err(DriverError::Connection(format!("cannot reach {url}")));
        }
        self.log.lock().unwrap().initialized.push(url.to_string());
        Ok(())
    }

    #[allow(clippy::unwrap_used)] // Test code - unwrap is acceptable
    fn close(&self) -> Result<(), DriverError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }

    fn filename_extension(&self) -> &str {
        &self.extension
    }

    fn upgrade(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.perform(Capability::Upgrade, content)
    }

    fn downgrade(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.perform(Capability::Downgrade, content)
    }

    fn pre_verify(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.perform(Capability::PreVerify, content)
    }

    fn post_verify(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.perform(Capability::PostVerify, content)
    }
}
