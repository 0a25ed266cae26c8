//! Error taxonomy for pipeline execution.
//!
//! The taxonomy drives recovery policy: transient errors are retried by
//! the retry controller, unavailable or failed backends trigger tier
//! fallback in the runners, and everything else propagates to the
//! orchestrator which marks the stage failed.

use crate::backend::Capability;
use thiserror::Error;

/// An error raised while executing a single stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// Bad or missing input (empty script, absent upstream artifact).
    /// Never retried; surfaced immediately.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No backend tier for the capability passed its availability check.
    /// Triggers fallback to the next tier, never a retry.
    #[error("no '{capability}' backend available")]
    BackendUnavailable {
        /// The capability that could not be serviced.
        capability: Capability,
    },

    /// A transient remote failure (network, rate limit, poll still
    /// pending past a single attempt). Retried per the retry policy.
    #[error("transient remote error: {0}")]
    TransientRemote(String),

    /// The backend explicitly reported that generation failed.
    /// Not retried; triggers fallback when the caller permits it.
    #[error("backend '{backend}' reported failure: {reason}")]
    RemoteGenerationFailed {
        /// Identifier of the backend that failed.
        backend: String,
        /// The failure reason reported by the backend.
        reason: String,
    },

    /// The retry budget was exhausted while the remote job was still
    /// incomplete.
    #[error("remote operation timed out after {attempts} attempt(s) ({elapsed_ms} ms)")]
    TimedOut {
        /// Poll attempts made before giving up.
        attempts: u32,
        /// Wall-clock time spent, in milliseconds.
        elapsed_ms: u64,
    },

    /// The enclosing run was cancelled.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Artifact store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StageError {
    /// Whether the retry controller may retry after this error.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransientRemote(_))
    }

    /// Whether a runner should fall back to the next backend tier.
    #[must_use]
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. }
                | Self::RemoteGenerationFailed { .. }
                | Self::TimedOut { .. }
        )
    }
}

/// An error raised by the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while reading or writing a record or media file.
    #[error("io error at '{path}': {source}")]
    Io {
        /// The path involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Wraps an io error with the path it occurred at.
    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
