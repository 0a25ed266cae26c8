//! Pipeline orchestration.

mod pipeline;

pub use pipeline::{Orchestrator, RunOverrides, RunReport, StageFailure};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution state of one stage within one invocation.
///
/// `Missing`, `Cached` and `Stale` are planning states derived from the
/// artifact store; `Running` covers an in-flight runner; `Done` and
/// `Failed` are terminal. A forced override plans the stage as
/// `Missing` regardless of what is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// No usable cached artifact exists.
    Missing,
    /// A valid, fingerprint-matching artifact exists; execution skipped.
    Cached,
    /// A cached artifact exists but its fingerprint no longer matches.
    Stale,
    /// The stage runner is executing.
    Running,
    /// The stage completed in this or an earlier invocation.
    Done,
    /// The stage failed; dependents are blocked.
    Failed,
}

impl StageState {
    /// Whether this state means the stage must execute.
    #[must_use]
    pub fn needs_run(self) -> bool {
        matches!(self, Self::Missing | Self::Stale)
    }

    /// Whether this state is terminal for the invocation.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cached | Self::Done | Self::Failed)
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Missing => "missing",
            Self::Cached => "cached",
            Self::Stale => "stale",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Plans a stage from its cache lookup: `cached` is `None` when no
/// artifact exists, otherwise whether the artifact's fingerprint matches
/// the current inputs.
pub(crate) fn classify(cached: Option<bool>, force: bool) -> StageState {
    match cached {
        _ if force => StageState::Missing,
        None => StageState::Missing,
        Some(true) => StageState::Cached,
        Some(false) => StageState::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_transitions() {
        assert_eq!(classify(None, false), StageState::Missing);
        assert_eq!(classify(Some(true), false), StageState::Cached);
        assert_eq!(classify(Some(false), false), StageState::Stale);
    }

    #[test]
    fn test_force_overrides_any_cache_state() {
        assert_eq!(classify(None, true), StageState::Missing);
        assert_eq!(classify(Some(true), true), StageState::Missing);
        assert_eq!(classify(Some(false), true), StageState::Missing);
    }

    #[test]
    fn test_needs_run() {
        assert!(StageState::Missing.needs_run());
        assert!(StageState::Stale.needs_run());
        assert!(!StageState::Cached.needs_run());
        assert!(!StageState::Done.needs_run());
    }

    #[test]
    fn test_terminal_states() {
        for state in [StageState::Cached, StageState::Done, StageState::Failed] {
            assert!(state.is_terminal());
        }
        for state in [StageState::Missing, StageState::Stale, StageState::Running] {
            assert!(!state.is_terminal());
        }
    }
}
