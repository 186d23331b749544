//! Per-migration state machine
//!
//! A [`MigrationMachine`] walks one ledger entry through its states, calling
//! the resolved driver at each phase and persisting every state change before
//! starting the next phase.

use crate::migration::{
    Capability, Driver, DriverError, LedgerEntry, MigrationError, MigrationState, Repository,
};
use std::fmt;
use std::sync::Arc;

/// Direction for migration execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (up)
    Up,
    /// Undo the migration (down)
    Down,
}

impl MigrationDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationDirection::Up => "up",
            MigrationDirection::Down => "down",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drivers resolved for one artifact extension and direction.
///
/// `main` applies (up) or undoes (down) the migration. The verifiers are only
/// present when registered for the extension, and are only used going up.
#[derive(Clone)]
pub(crate) struct Phases {
    pub pre_verify: Option<Arc<dyn Driver>>,
    pub main: Arc<dyn Driver>,
    pub post_verify: Option<Arc<dyn Driver>>,
}

/// How a single migration ended
#[derive(Debug)]
pub(crate) enum Outcome {
    /// Reached its target state (`MigrationSucceeded` up, `New` down)
    Completed,
    /// Stopped in a `*_FAILED` state; the driver error that caused it
    Failed(DriverError),
}

pub(crate) struct MigrationMachine<'a> {
    repository: &'a dyn Repository,
    index: i64,
    state: MigrationState,
}

impl<'a> MigrationMachine<'a> {
    pub fn new(repository: &'a dyn Repository, index: i64, state: MigrationState) -> Self {
        Self {
            repository,
            index,
            state,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Persist `next` as the entry's state
    fn transition(&mut self, next: MigrationState) -> Result<(), MigrationError> {
        if !self.state.can_transition_to(next) {
            return Err(MigrationError::IllegalTransition {
                index: self.index,
                from: self.state,
                to: next,
            });
        }

        self.repository.update(LedgerEntry::new(self.index, next))?;
        log::debug!("Migration {}: {} -> {}", self.index, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Drive a `New` entry to `MigrationSucceeded` or a failure state.
    ///
    /// `Testing` is visited only with a pre-verifier and `Verifying` only with
    /// a post-verifier. A verifier answering `NotImplemented` counts as passed.
    pub fn upgrade(&mut self, phases: &Phases, content: &[u8]) -> Result<Outcome, MigrationError> {
        if let Some(verifier) = &phases.pre_verify {
            self.transition(MigrationState::Testing)?;
            if let Err(error) = self.verify(verifier.as_ref(), Capability::PreVerify, content) {
                return self.fail(MigrationState::TestingFailed, error);
            }
        }

        self.transition(MigrationState::Migrating)?;
        if let Err(error) = phases.main.run(Capability::Upgrade, &mut &content[..]) {
            return self.fail(MigrationState::MigrationFailed, error);
        }

        if let Some(verifier) = &phases.post_verify {
            self.transition(MigrationState::Verifying)?;
            if let Err(error) = self.verify(verifier.as_ref(), Capability::PostVerify, content) {
                return self.fail(MigrationState::VerificationFailed, error);
            }
        }

        self.transition(MigrationState::MigrationSucceeded)?;
        Ok(Outcome::Completed)
    }

    /// Undo a `MigrationSucceeded` entry, returning it to `New`
    pub fn downgrade(&mut self, phases: &Phases, content: &[u8]) -> Result<Outcome, MigrationError> {
        self.transition(MigrationState::Migrating)?;
        if let Err(error) = phases.main.run(Capability::Downgrade, &mut &content[..]) {
            return self.fail(MigrationState::MigrationFailed, error);
        }

        self.transition(MigrationState::New)?;
        Ok(Outcome::Completed)
    }

    fn verify(
        &self,
        verifier: &dyn Driver,
        capability: Capability,
        content: &[u8],
    ) -> Result<(), DriverError> {
        match verifier.run(capability, &mut &content[..]) {
            Err(error) if error.is_not_implemented() => {
                log::debug!("Migration {}: {} not implemented, skipping", self.index, capability);
                Ok(())
            }
            result => result,
        }
    }

    /// Persist `failed` after `error`; if that write fails too, report both
    fn fail(&mut self, failed: MigrationState, error: DriverError) -> Result<Outcome, MigrationError> {
        match self.transition(failed) {
            Ok(()) => Ok(Outcome::Failed(error)),
            Err(MigrationError::Repository(record_error)) => {
                log::error!(
                    "Migration {} failed ({}) and {} could not be recorded: {}",
                    self.index,
                    error,
                    failed,
                    record_error
                );
                Err(MigrationError::FailureNotRecorded {
                    index: self.index,
                    state: failed,
                    error,
                    record_error,
                })
            }
            Err(other) => {
                log::error!("Migration {} failed: {}", self.index, error);
                Err(other)
            }
        }
    }
}
