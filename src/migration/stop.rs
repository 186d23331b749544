//! Stop policies consulted between migrations

use crate::migration::Repository;

/// Decides whether a run should halt after a migration completes.
///
/// The migrator asks only between migrations, never in the middle of one,
/// and only after the completed migration's state has been persisted, so the
/// policy observes the up-to-date ledger through `repository`.
pub trait StopPolicy {
    fn done(&mut self, repository: &dyn Repository) -> bool;
}

impl<F> StopPolicy for F
where
    F: FnMut(&dyn Repository) -> bool,
{
    fn done(&mut self, repository: &dyn Repository) -> bool {
        self(repository)
    }
}

/// Never stops early; the run ends when the artifacts are exhausted
#[derive(Debug, Clone, Copy, Default)]
pub struct RunToCompletion;

impl StopPolicy for RunToCompletion {
    fn done(&mut self, _repository: &dyn Repository) -> bool {
        false
    }
}

/// Stops after a fixed number of completed migrations.
///
/// The policy is consulted only after a migration completes, so at least one
/// migration runs even with a limit of zero.
#[derive(Debug, Clone, Copy)]
pub struct MaxSteps {
    limit: usize,
    completed: usize,
}

impl MaxSteps {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit, completed: 0 }
    }
}

impl StopPolicy for MaxSteps {
    fn done(&mut self, _repository: &dyn Repository) -> bool {
        self.completed += 1;
        self.completed >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryRepository;

    #[test]
    fn test_max_steps_counts_completions() {
        let repository = MemoryRepository::new();
        let mut policy = MaxSteps::new(2);
        assert!(!policy.done(&repository));
        assert!(policy.done(&repository));
    }

    #[test]
    fn test_closure_observes_repository() {
        let repository = MemoryRepository::new();
        let mut policy = |repo: &dyn Repository| repo.get_all().map(|e| e.is_empty()).unwrap_or(true);
        assert!(policy.done(&repository));
        assert!(!RunToCompletion.done(&repository));
    }
}
