//! Migrator - Core migration orchestration engine

use crate::config::MigrateConfig;
use crate::migration::machine::{MigrationMachine, Outcome, Phases};
use crate::migration::{
    check_consistency, check_index_sequence, Capability, Driver, DriverRegistry, LedgerEntry,
    MigrationArtifact, MigrationDirection, MigrationError, MigrationInfo, MigrationSource,
    MigrationState, MigrationStatus, RegistryError, Repository, RepositoryRegistry, StopPolicy,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

type Ledger = BTreeMap<i64, MigrationState>;

/// Core migration execution engine
///
/// The `Migrator` reads the ledger from the configured repository, checks it
/// against the artifacts of a [`MigrationSource`], and drives pending
/// migrations one at a time through their states using the drivers
/// registered for each artifact's extension.
///
/// Nothing is cached between calls: every operation starts from a fresh read
/// of the ledger.
pub struct Migrator<'a> {
    drivers: &'a DriverRegistry,
    repositories: &'a RepositoryRegistry,
    config: &'a MigrateConfig,
}

impl<'a> Migrator<'a> {
    pub fn new(
        drivers: &'a DriverRegistry,
        repositories: &'a RepositoryRegistry,
        config: &'a MigrateConfig,
    ) -> Self {
        Self {
            drivers,
            repositories,
            config,
        }
    }

    /// Resolve the configured repository and initialize it
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Registry` if no repository is registered for the
    /// configured scheme, or `MigrationError::RepositoryInitialization`.
    pub fn repository(&self) -> Result<Arc<dyn Repository>, MigrationError> {
        let scheme = &self.config.repository.scheme;
        let repository = self.repositories.get(scheme)?;
        repository
            .initialize(&self.config.repository.url)
            .map_err(|error| MigrationError::RepositoryInitialization {
                scheme: scheme.clone(),
                error,
            })?;
        Ok(repository)
    }

    /// Get migration status: every artifact with its recorded state
    ///
    /// Unlike [`upgrade`](Self::upgrade), this reports failed and interrupted
    /// migrations instead of refusing to run.
    pub fn status(&self, source: &dyn MigrationSource) -> Result<MigrationStatus, MigrationError> {
        let repository = self.repository()?;
        let ledger = read_ledger(repository.as_ref())?;
        let artifacts = read_artifacts(source, &ledger)?;

        let migrations = artifacts
            .into_iter()
            .map(|artifact| {
                let path = artifact.path().map(Path::to_path_buf);
                MigrationInfo {
                    index: artifact.index,
                    state: state_of(&ledger, artifact.index),
                    name: artifact.name,
                    extension: artifact.extension,
                    path,
                }
            })
            .collect();

        Ok(MigrationStatus::new(migrations))
    }

    /// Apply pending migrations
    ///
    /// Starts at the lowest index not in `MigrationSucceeded` and applies
    /// migrations in ascending order until `policy` is done, a migration
    /// fails, or the artifacts run out.
    ///
    /// # Returns
    ///
    /// Returns the number of migrations applied.
    ///
    /// # Errors
    ///
    /// Configuration, consistency and start-point errors are returned before any
    /// migration runs. A failing migration is persisted in its `*_FAILED` state
    /// and returned as `MigrationError::Failed`.
    pub fn upgrade(
        &self,
        source: &dyn MigrationSource,
        policy: &mut dyn StopPolicy,
    ) -> Result<usize, MigrationError> {
        let repository = self.repository()?;
        let ledger = read_ledger(repository.as_ref())?;
        let artifacts = read_artifacts(source, &ledger)?;

        let Some(start) = upgrade_start(&artifacts, &ledger)? else {
            log::info!("No pending migrations to apply");
            return Ok(0);
        };

        let pending: Vec<&MigrationArtifact> = artifacts[start..].iter().collect();
        log::info!(
            "Upgrading from migration {} ({} pending)",
            pending[0].index,
            pending.len()
        );
        self.run(
            MigrationDirection::Up,
            repository.as_ref(),
            &pending,
            &ledger,
            policy,
        )
    }

    /// Undo applied migrations
    ///
    /// Starts at the highest index in `MigrationSucceeded` and undoes
    /// migrations in descending order, returning each to `New`, until `policy`
    /// is done, a migration fails, or none are left.
    ///
    /// # Returns
    ///
    /// Returns the number of migrations undone.
    pub fn downgrade(
        &self,
        source: &dyn MigrationSource,
        policy: &mut dyn StopPolicy,
    ) -> Result<usize, MigrationError> {
        let repository = self.repository()?;
        let ledger = read_ledger(repository.as_ref())?;
        let artifacts = read_artifacts(source, &ledger)?;

        let Some(start) = downgrade_start(&artifacts, &ledger)? else {
            log::info!("No applied migrations to undo");
            return Ok(0);
        };

        let pending: Vec<&MigrationArtifact> = artifacts[..=start].iter().rev().collect();
        log::info!(
            "Downgrading from migration {} ({} applied)",
            pending[0].index,
            pending.len()
        );
        self.run(
            MigrationDirection::Down,
            repository.as_ref(),
            &pending,
            &ledger,
            policy,
        )
    }

    /// Overwrite the recorded state of one migration.
    ///
    /// This is the remediation path after a failed or interrupted run: once
    /// the backend has been repaired by hand, record what is actually true.
    ///
    /// # Errors
    ///
    /// Refuses to write an entry that would leave the ledger inconsistent.
    pub fn force(&self, index: i64, state: MigrationState) -> Result<(), MigrationError> {
        let repository = self.repository()?;

        let mut entries = repository.get_all()?;
        entries.retain(|entry| entry.index != index);
        entries.push(LedgerEntry::new(index, state));
        check_consistency(&mut entries)?;

        log::warn!("Forcing migration {} to {}", index, state);
        repository.update(LedgerEntry::new(index, state))?;
        Ok(())
    }

    fn run(
        &self,
        direction: MigrationDirection,
        repository: &dyn Repository,
        pending: &[&MigrationArtifact],
        ledger: &Ledger,
        policy: &mut dyn StopPolicy,
    ) -> Result<usize, MigrationError> {
        let phases = self.resolve(direction, pending)?;
        let sessions = self.initialize_drivers(&phases)?;

        let result = drive(direction, repository, pending, ledger, &phases, policy);
        let closed = close_drivers(&sessions);

        let count = result?;
        closed?;
        Ok(count)
    }

    /// Look up the drivers for every extension in `pending` before anything runs
    fn resolve(
        &self,
        direction: MigrationDirection,
        pending: &[&MigrationArtifact],
    ) -> Result<BTreeMap<String, Phases>, MigrationError> {
        let mut resolved = BTreeMap::new();

        for artifact in pending {
            let extension = artifact.extension.as_str();
            if resolved.contains_key(extension) {
                continue;
            }

            let phases = match direction {
                MigrationDirection::Up => Phases {
                    pre_verify: self.drivers.find(Capability::PreVerify, extension),
                    main: self.drivers.get(Capability::Upgrade, extension)?,
                    post_verify: self.drivers.find(Capability::PostVerify, extension),
                },
                MigrationDirection::Down => Phases {
                    pre_verify: None,
                    main: self.drivers.get(Capability::Downgrade, extension)?,
                    post_verify: None,
                },
            };
            resolved.insert(artifact.extension.clone(), phases);
        }

        Ok(resolved)
    }

    fn initialize_drivers(
        &self,
        phases: &BTreeMap<String, Phases>,
    ) -> Result<Vec<(String, Arc<dyn Driver>)>, MigrationError> {
        let mut sessions: Vec<(String, Arc<dyn Driver>)> = Vec::new();

        for (extension, phase) in phases {
            // One driver instance owns each extension, whatever the capability
            let driver = self
                .drivers
                .driver(extension)
                .unwrap_or_else(|| Arc::clone(&phase.main));

            log::debug!("Initializing driver for '.{}' migrations", extension);
            if let Err(error) = driver.initialize(self.config.driver_url(extension)) {
                let _ = close_drivers(&sessions);
                return Err(MigrationError::DriverInitialization {
                    extension: extension.clone(),
                    error,
                });
            }
            sessions.push((extension.clone(), driver));
        }

        Ok(sessions)
    }
}

fn drive(
    direction: MigrationDirection,
    repository: &dyn Repository,
    pending: &[&MigrationArtifact],
    ledger: &Ledger,
    phases: &BTreeMap<String, Phases>,
    policy: &mut dyn StopPolicy,
) -> Result<usize, MigrationError> {
    let mut completed = 0;

    for artifact in pending {
        let phase = phases.get(&artifact.extension).ok_or_else(|| {
            let capability = match direction {
                MigrationDirection::Up => Capability::Upgrade,
                MigrationDirection::Down => Capability::Downgrade,
            };
            RegistryError::NoDriverForExtension {
                capability,
                extension: artifact.extension.clone(),
            }
        })?;

        // Read before the first transition so an unreadable artifact leaves the ledger untouched
        let content = artifact.read_content()?;

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "migration",
            index = artifact.index,
            direction = direction.as_str()
        )
        .entered();

        let verb = match direction {
            MigrationDirection::Up => "Applying",
            MigrationDirection::Down => "Undoing",
        };
        log::info!("{} migration {} ({})", verb, artifact.index, artifact.name);

        let started = Instant::now();
        let mut machine =
            MigrationMachine::new(repository, artifact.index, state_of(ledger, artifact.index));
        let outcome = match direction {
            MigrationDirection::Up => machine.upgrade(phase, &content)?,
            MigrationDirection::Down => machine.downgrade(phase, &content)?,
        };
        let elapsed = started.elapsed();

        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_migration(
            direction,
            match &outcome {
                Outcome::Completed => "completed",
                Outcome::Failed(_) => machine.state().as_str(),
            },
            elapsed,
        );

        match outcome {
            Outcome::Completed => {
                completed += 1;
                log::info!(
                    "Migration {} reached {} in {}ms",
                    artifact.index,
                    machine.state(),
                    elapsed.as_millis()
                );
            }
            Outcome::Failed(error) => {
                log::error!(
                    "Migration {} ({}) ended in {}: {}",
                    artifact.index,
                    artifact.name,
                    machine.state(),
                    error
                );
                return Err(MigrationError::Failed {
                    index: artifact.index,
                    name: artifact.name.clone(),
                    state: machine.state(),
                    error,
                });
            }
        }

        if policy.done(repository) {
            log::info!("Stop policy satisfied after migration {}", artifact.index);
            break;
        }
    }

    log::info!("Completed {} migration(s)", completed);
    Ok(completed)
}

/// Close every driver, returning the first failure
fn close_drivers(sessions: &[(String, Arc<dyn Driver>)]) -> Result<(), MigrationError> {
    let mut first_error = None;

    for (extension, driver) in sessions {
        if let Err(error) = driver.close() {
            log::warn!("Failed to close driver for '.{}': {}", extension, error);
            first_error.get_or_insert(MigrationError::DriverClose {
                extension: extension.clone(),
                error,
            });
        }
    }

    first_error.map_or(Ok(()), Err)
}

fn read_ledger(repository: &dyn Repository) -> Result<Ledger, MigrationError> {
    let mut entries = repository.get_all()?;
    check_consistency(&mut entries)?;
    Ok(entries.into_iter().map(|e| (e.index, e.state)).collect())
}

/// Artifacts sorted by index, checked as a lineage and against the ledger
fn read_artifacts(
    source: &dyn MigrationSource,
    ledger: &Ledger,
) -> Result<Vec<MigrationArtifact>, MigrationError> {
    let mut artifacts = source.artifacts()?;
    artifacts.sort_by_key(|artifact| artifact.index);
    check_index_sequence(artifacts.iter().map(|artifact| artifact.index))?;

    if let Some(&index) = ledger
        .keys()
        .find(|&&index| artifacts.binary_search_by_key(&index, |a| a.index).is_err())
    {
        return Err(MigrationError::MissingArtifact { index });
    }

    Ok(artifacts)
}

fn state_of(ledger: &Ledger, index: i64) -> MigrationState {
    ledger.get(&index).copied().unwrap_or_default()
}

/// Error for an entry whose state stops a run from starting
fn blocked(index: i64, state: MigrationState) -> MigrationError {
    if state.is_failed() {
        MigrationError::UnresolvedFailure { index, state }
    } else if state.is_in_progress() {
        MigrationError::Interrupted { index, state }
    } else {
        MigrationError::OutOfOrder { index, state }
    }
}

/// Position of the first unapplied artifact; everything from there on must be `New`
fn upgrade_start(
    artifacts: &[MigrationArtifact],
    ledger: &Ledger,
) -> Result<Option<usize>, MigrationError> {
    let Some(start) = artifacts
        .iter()
        .position(|a| !state_of(ledger, a.index).is_succeeded())
    else {
        return Ok(None);
    };

    for artifact in &artifacts[start..] {
        let state = state_of(ledger, artifact.index);
        if state != MigrationState::New {
            return Err(blocked(artifact.index, state));
        }
    }

    Ok(Some(start))
}

/// Position of the last touched artifact; everything up to it must be applied
fn downgrade_start(
    artifacts: &[MigrationArtifact],
    ledger: &Ledger,
) -> Result<Option<usize>, MigrationError> {
    let Some(start) = artifacts
        .iter()
        .rposition(|a| state_of(ledger, a.index) != MigrationState::New)
    else {
        return Ok(None);
    };

    for artifact in &artifacts[..=start] {
        let state = state_of(ledger, artifact.index);
        if !state.is_succeeded() {
            return Err(blocked(artifact.index, state));
        }
    }

    Ok(Some(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{MaxSteps, MemorySource, RunToCompletion};
    use crate::repositories::MemoryRepository;
    use crate::tests_cfg::ScriptedDriver;
    use crate::migration::MigrationState::*;

    struct Fixture {
        drivers: DriverRegistry,
        repositories: RepositoryRegistry,
        config: MigrateConfig,
        repository: Arc<MemoryRepository>,
        driver: Arc<ScriptedDriver>,
    }

    impl Fixture {
        #[allow(clippy::expect_used)] // Test code - expect is acceptable
        fn new(entries: &[(i64, MigrationState)], driver: ScriptedDriver, capabilities: &[Capability]) -> Self {
            let driver = Arc::new(driver);
            let repository = Arc::new(MemoryRepository::with_entries(
                entries.iter().map(|&(index, state)| LedgerEntry::new(index, state)),
            ));

            let mut drivers = DriverRegistry::new();
            drivers
                .register_all(capabilities, Arc::clone(&driver) as Arc<dyn Driver>)
                .expect("Should register driver");
            let mut repositories = RepositoryRegistry::new();
            repositories
                .register(Arc::clone(&repository) as Arc<dyn Repository>)
                .expect("Should register repository");

            Self {
                drivers,
                repositories,
                config: MigrateConfig::for_repository("memory", "mem://test"),
                repository,
                driver,
            }
        }

        fn all(entries: &[(i64, MigrationState)]) -> Self {
            Self::new(entries, ScriptedDriver::new("sql"), &Capability::ALL)
        }

        fn migrator(&self) -> Migrator<'_> {
            Migrator::new(&self.drivers, &self.repositories, &self.config)
        }

        fn states(&self, indices: std::ops::Range<i64>) -> Vec<Option<MigrationState>> {
            indices.map(|i| self.repository.state(i)).collect()
        }
    }

    /// Artifacts `first..first + count` with content `m{index}`
    fn lineage(first: i64, count: i64) -> MemorySource {
        MemorySource::new(
            (first..first + count)
                .map(|i| MigrationArtifact::from_bytes(i, format!("step_{i}"), "sql", format!("m{i}")))
                .collect(),
        )
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_fresh_lineage_applies_in_order() {
        let fx = Fixture::all(&[(0, New), (1, New), (2, New)]);

        let applied = fx
            .migrator()
            .upgrade(&lineage(0, 3), &mut RunToCompletion)
            .expect("Upgrade should succeed");

        assert_eq!(applied, 3);
        assert_eq!(fx.driver.calls_for(Capability::Upgrade), vec!["m0", "m1", "m2"]);
        assert_eq!(fx.repository.touched(), vec![0, 1, 2]);
        assert_eq!(fx.states(0..3), vec![Some(MigrationSucceeded); 3]);
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_resumes_after_applied_migrations() {
        let fx = Fixture::all(&[(0, MigrationSucceeded), (1, New), (2, New)]);

        let applied = fx
            .migrator()
            .upgrade(&lineage(0, 3), &mut RunToCompletion)
            .expect("Upgrade should succeed");

        assert_eq!(applied, 2);
        assert_eq!(fx.driver.calls_for(Capability::Upgrade), vec!["m1", "m2"]);
        assert!(fx.repository.history(0).is_empty());
    }

    #[test]
    fn test_apply_failure_halts_run() {
        let fx = Fixture::new(
            &[(0, New), (1, New), (2, New)],
            ScriptedDriver::new("sql").fail_on(Capability::Upgrade, "m1"),
            &Capability::ALL,
        );

        let result = fx.migrator().upgrade(&lineage(0, 3), &mut RunToCompletion);

        match result {
            Err(MigrationError::Failed { index, state, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(state, MigrationFailed);
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
        assert_eq!(
            fx.states(0..3),
            vec![Some(MigrationSucceeded), Some(MigrationFailed), Some(New)]
        );
        assert!(fx.repository.history(2).is_empty());
        assert!(!fx.driver.calls().iter().any(|(_, content)| content == "m2"));
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_stop_policy_after_first_migration() {
        let fx = Fixture::all(&[(0, New), (1, New), (2, New)]);

        let applied = fx
            .migrator()
            .upgrade(&lineage(0, 3), &mut |_: &dyn Repository| true)
            .expect("Upgrade should succeed");

        assert_eq!(applied, 1);
        assert_eq!(fx.states(0..3), vec![Some(MigrationSucceeded), Some(New), Some(New)]);
        assert_eq!(fx.repository.touched(), vec![0]);
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_stop_policy_observes_persisted_state() {
        let fx = Fixture::all(&[]);

        let applied = fx
            .migrator()
            .upgrade(&lineage(1, 5), &mut |repo: &dyn Repository| {
                repo.get_all()
                    .map(|entries| entries.iter().any(|e| e.index == 3 && e.state.is_succeeded()))
                    .unwrap_or(true)
            })
            .expect("Upgrade should succeed");

        assert_eq!(applied, 3);
        assert_eq!(fx.repository.state(4), None);
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_missing_post_verify_goes_straight_to_success() {
        let fx = Fixture::new(
            &[],
            ScriptedDriver::new("sql"),
            &[Capability::Upgrade],
        );

        fx.migrator()
            .upgrade(&lineage(0, 1), &mut RunToCompletion)
            .expect("Upgrade should succeed");

        assert_eq!(fx.repository.history(0), vec![Migrating, MigrationSucceeded]);
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_upgrade_then_downgrade_round_trip() {
        let fx = Fixture::all(&[(0, New), (1, New), (2, New)]);
        let source = lineage(0, 3);

        fx.migrator()
            .upgrade(&source, &mut RunToCompletion)
            .expect("Upgrade should succeed");
        let undone = fx
            .migrator()
            .downgrade(&source, &mut RunToCompletion)
            .expect("Downgrade should succeed");

        assert_eq!(undone, 3);
        assert_eq!(fx.driver.calls_for(Capability::Downgrade), vec!["m2", "m1", "m0"]);
        assert_eq!(fx.states(0..3), vec![Some(New); 3]);
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_downgrade_one_step() {
        let fx = Fixture::all(&[(1, MigrationSucceeded), (2, MigrationSucceeded)]);

        let undone = fx
            .migrator()
            .downgrade(&lineage(1, 3), &mut MaxSteps::new(1))
            .expect("Downgrade should succeed");

        assert_eq!(undone, 1);
        assert_eq!(fx.driver.calls_for(Capability::Downgrade), vec!["m2"]);
        assert_eq!(fx.repository.state(1), Some(MigrationSucceeded));
        assert_eq!(fx.repository.state(2), Some(New));
    }

    #[test]
    fn test_inconsistent_ledger_aborts_before_any_side_effect() {
        let fx = Fixture::all(&[(0, MigrationSucceeded), (2, New)]);

        let result = fx.migrator().upgrade(&lineage(0, 3), &mut RunToCompletion);

        assert!(matches!(
            result,
            Err(MigrationError::GapInMigrationIndex { previous: 0, found: 2 })
        ));
        assert!(fx.driver.initialized_with().is_empty());
        assert!(fx.repository.touched().is_empty());
    }

    #[test]
    fn test_inconsistent_artifacts_abort() {
        let fx = Fixture::all(&[]);
        let result = fx.migrator().upgrade(&lineage(2, 2), &mut RunToCompletion);
        assert!(matches!(
            result,
            Err(MigrationError::IncorrectStartIndex { found: 2 })
        ));
    }

    #[test]
    fn test_previous_failure_blocks_upgrade() {
        let fx = Fixture::all(&[(0, MigrationSucceeded), (1, VerificationFailed)]);
        let result = fx.migrator().upgrade(&lineage(0, 3), &mut RunToCompletion);
        assert!(matches!(
            result,
            Err(MigrationError::UnresolvedFailure { index: 1, state: VerificationFailed })
        ));
        assert!(fx.driver.calls().is_empty());
    }

    #[test]
    fn test_interrupted_migration_blocks_upgrade() {
        let fx = Fixture::all(&[(0, Migrating)]);
        let result = fx.migrator().upgrade(&lineage(0, 2), &mut RunToCompletion);
        assert!(matches!(
            result,
            Err(MigrationError::Interrupted { index: 0, state: Migrating })
        ));
    }

    #[test]
    fn test_applied_entry_after_pending_is_out_of_order() {
        let fx = Fixture::all(&[(0, New), (1, MigrationSucceeded)]);
        let result = fx.migrator().upgrade(&lineage(0, 2), &mut RunToCompletion);
        assert!(matches!(
            result,
            Err(MigrationError::OutOfOrder { index: 1, state: MigrationSucceeded })
        ));
    }

    #[test]
    fn test_ledger_entry_without_artifact() {
        let fx = Fixture::all(&[(0, MigrationSucceeded), (1, MigrationSucceeded)]);
        let result = fx.migrator().upgrade(&lineage(0, 1), &mut RunToCompletion);
        assert!(matches!(
            result,
            Err(MigrationError::MissingArtifact { index: 1 })
        ));
    }

    #[test]
    fn test_missing_upgrader_is_a_registry_error() {
        let fx = Fixture::new(&[], ScriptedDriver::new("sql"), &[Capability::Downgrade]);

        let result = fx.migrator().upgrade(&lineage(0, 2), &mut RunToCompletion);

        assert!(matches!(
            result,
            Err(MigrationError::Registry(RegistryError::NoDriverForExtension {
                capability: Capability::Upgrade,
                ..
            }))
        ));
        assert!(fx.repository.touched().is_empty());
    }

    #[test]
    fn test_driver_initialization_failure_runs_nothing() {
        let fx = Fixture::new(
            &[],
            ScriptedDriver::new("sql").fail_initialize(),
            &Capability::ALL,
        );

        let result = fx.migrator().upgrade(&lineage(0, 2), &mut RunToCompletion);

        assert!(matches!(
            result,
            Err(MigrationError::DriverInitialization { .. })
        ));
        assert!(fx.repository.touched().is_empty());
        assert!(fx.driver.calls().is_empty());
    }

    #[test]
    fn test_drivers_initialized_once_and_closed_after_failure() {
        let mut fx = Fixture::new(
            &[],
            ScriptedDriver::new("sql").fail_on(Capability::PostVerify, "m1"),
            &Capability::ALL,
        );
        fx.config = MigrateConfig::for_repository("memory", "mem://test")
            .with_driver_url("sql", "postgres://db");

        let result = fx.migrator().upgrade(&lineage(0, 3), &mut RunToCompletion);

        assert!(matches!(
            result,
            Err(MigrationError::Failed { index: 1, state: VerificationFailed, .. })
        ));
        assert_eq!(fx.driver.initialized_with(), vec!["postgres://db".to_string()]);
        assert_eq!(fx.driver.close_count(), 1);
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_nothing_to_do() {
        let applied = Fixture::all(&[(0, MigrationSucceeded)]);
        assert_eq!(
            applied
                .migrator()
                .upgrade(&lineage(0, 1), &mut RunToCompletion)
                .expect("Upgrade should succeed"),
            0
        );

        let fresh = Fixture::all(&[]);
        assert_eq!(
            fresh
                .migrator()
                .downgrade(&lineage(0, 2), &mut RunToCompletion)
                .expect("Downgrade should succeed"),
            0
        );

        assert!(applied.driver.initialized_with().is_empty());
        assert!(fresh.driver.initialized_with().is_empty());
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_force_resets_failed_migration() {
        let fx = Fixture::all(&[(0, MigrationSucceeded), (1, MigrationFailed)]);
        let migrator = fx.migrator();

        migrator.force(1, New).expect("Force should succeed");
        let applied = migrator
            .upgrade(&lineage(0, 2), &mut RunToCompletion)
            .expect("Upgrade should succeed");

        assert_eq!(applied, 1);
        assert_eq!(fx.repository.state(1), Some(MigrationSucceeded));
    }

    #[test]
    fn test_force_refuses_to_open_a_gap() {
        let fx = Fixture::all(&[(0, MigrationSucceeded)]);
        let result = fx.migrator().force(5, MigrationSucceeded);
        assert!(matches!(
            result,
            Err(MigrationError::GapInMigrationIndex { .. })
        ));
        assert_eq!(fx.repository.state(5), None);
    }

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_status_reports_every_artifact() {
        let fx = Fixture::all(&[(0, MigrationSucceeded), (1, TestingFailed)]);

        let status = fx.migrator().status(&lineage(0, 3)).expect("Status should succeed");

        assert_eq!(status.total, 3);
        assert_eq!(status.applied_count, 1);
        assert_eq!(status.failed_count, 1);
        assert_eq!(status.pending_count, 1);
        assert_eq!(status.next_pending_index(), Some(1));
        assert_eq!(status.migrations[2].name, "step_2");
    }

    #[test]
    fn test_unknown_scheme() {
        let mut fx = Fixture::all(&[]);
        fx.config = MigrateConfig::for_repository("postgres", "postgres://db");
        assert!(matches!(
            fx.migrator().status(&lineage(0, 1)),
            Err(MigrationError::Registry(RegistryError::NoRepositoryForScheme { .. }))
        ));
    }
}
