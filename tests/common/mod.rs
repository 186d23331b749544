//! Shared fixtures for integration tests

#![allow(dead_code)]

use any_migrate::migration::{Capability, DriverRegistry, RepositoryRegistry};
use any_migrate::repositories::JsonFileRepository;
use any_migrate::{Driver, DriverError, MigrateConfig};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Driver for `.txt` artifacts that records what it applied.
///
/// Content containing `FAIL` makes the upgrade fail.
#[derive(Default)]
pub struct RecordingDriver {
    pub applied: Mutex<Vec<String>>,
    pub undone: Mutex<Vec<String>>,
}

impl RecordingDriver {
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn undone(&self) -> Vec<String> {
        self.undone.lock().unwrap().clone()
    }
}

fn read(content: &mut dyn Read) -> Result<String, DriverError> {
    let mut body = String::new();
    content.read_to_string(&mut body)?;
    Ok(body.trim().to_string())
}

impl Driver for RecordingDriver {
    fn initialize(&self, _url: &str) -> Result<(), DriverError> {
        Ok(())
    }

    fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn filename_extension(&self) -> &str {
        "txt"
    }

    fn upgrade(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        let body = read(content)?;
        if body.contains("FAIL") {
            return Err(DriverError::Execution(format!("refused '{body}'")));
        }
        self.applied.lock().unwrap().push(body);
        Ok(())
    }

    fn downgrade(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        let body = read(content)?;
        self.undone.lock().unwrap().push(body);
        Ok(())
    }
}

/// Write `files` (name, content) into `dir`
pub fn write_migrations(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

pub fn registries(driver: Arc<RecordingDriver>) -> (DriverRegistry, RepositoryRegistry) {
    let mut drivers = DriverRegistry::new();
    drivers
        .register_all(&[Capability::Upgrade, Capability::Downgrade], driver)
        .unwrap();

    let mut repositories = RepositoryRegistry::new();
    repositories
        .register(Arc::new(JsonFileRepository::new()))
        .unwrap();

    (drivers, repositories)
}

/// Configuration with the ledger at `dir/ledger.json` and migrations in `dir/migrations`
pub fn config(dir: &Path) -> MigrateConfig {
    MigrateConfig::for_repository(
        "file",
        format!("file://{}", dir.join("ledger.json").display()),
    )
    .with_migrations_dir(dir.join("migrations"))
}
