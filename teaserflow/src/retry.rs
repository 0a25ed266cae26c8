//! Bounded retry-with-backoff for asynchronous remote operations.
//!
//! Remote generation is a two-phase protocol: *submit* starts a job (or
//! returns an immediate result), *poll* checks on it. Only the poll
//! phase is retried; a submit that fails outright is a stage-level
//! error. Backoff is exponential, capped by the remaining time budget,
//! and every sleep races the run's cancellation token.

use crate::cancellation::CancelToken;
use crate::config::RetrySettings;
use crate::errors::StageError;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Handle to a remote job returned by a submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Backend-scoped job identifier.
    pub id: String,
}

impl JobHandle {
    /// Creates a job handle.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Outcome of the submit phase.
#[derive(Debug)]
pub enum Submission<R> {
    /// The backend answered synchronously.
    Ready(R),
    /// The backend accepted a job to be polled.
    Job(JobHandle),
}

/// Outcome of one poll.
#[derive(Debug)]
pub enum PollOutcome<R> {
    /// The job is still running.
    Pending,
    /// The job finished and its result was retrieved.
    Ready(R),
    /// The job failed.
    Failed {
        /// Reason reported by the backend.
        reason: String,
        /// Whether polling again may succeed (e.g. a flaky download).
        retriable: bool,
    },
}

/// A two-phase remote operation: submit, then poll until done.
#[async_trait]
pub trait RemoteOperation: Send + Sync {
    /// The result produced on completion.
    type Output: Send;

    /// A short identifier for logs and error messages.
    fn describe(&self) -> &str;

    /// Starts the operation.
    async fn submit(&self) -> Result<Submission<Self::Output>, StageError>;

    /// Checks on a previously submitted job.
    async fn poll(&self, job: &JobHandle) -> Result<PollOutcome<Self::Output>, StageError>;
}

/// Retry tuning for the controller.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay before the second poll.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each poll.
    pub multiplier: f64,
    /// Hard ceiling on poll attempts.
    pub max_attempts: u32,
    /// Hard wall-clock ceiling for the whole operation.
    pub max_elapsed: Duration,
    /// Whether to add bounded jitter on top of each delay. Jitter adds
    /// at most a quarter of the current delay, which keeps the jittered
    /// sequence non-decreasing for multipliers of 1.25 and above.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_attempts: 30,
            max_elapsed: Duration::from_secs(300),
            jitter: false,
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            initial_delay: Duration::from_secs_f64(settings.initial_delay_secs.max(0.0)),
            multiplier: settings.backoff_factor.max(1.0),
            max_attempts: settings.max_attempts.max(1),
            max_elapsed: Duration::from_secs(settings.max_total_secs),
            jitter: settings.jitter,
        }
    }
}

/// Drives a [`RemoteOperation`] to completion under a retry budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    /// Creates a controller with the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The controller's policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs the operation: one submit, then polls with exponential
    /// backoff until ready, failed, cancelled, or out of budget.
    ///
    /// # Errors
    ///
    /// - `TimedOut` once elapsed time reaches the wall-clock ceiling or
    ///   attempts reach the attempt ceiling, whichever comes first.
    /// - `RemoteGenerationFailed` when the backend reports a
    ///   non-retriable failure.
    /// - `Cancelled` as soon as the token fires, including mid-sleep.
    /// - Any non-transient error from submit or poll, unretried.
    pub async fn run<O: RemoteOperation>(
        &self,
        operation: &O,
        cancel: &CancelToken,
    ) -> Result<O::Output, StageError> {
        let started = Instant::now();

        let job = match operation.submit().await? {
            Submission::Ready(result) => return Ok(result),
            Submission::Job(job) => job,
        };
        debug!(operation = operation.describe(), job = %job.id, "remote job submitted");

        let mut attempts: u32 = 0;
        let mut delay = self.policy.initial_delay;

        loop {
            if cancel.is_cancelled() {
                return Err(StageError::Cancelled(cancel.reason_or_default()));
            }

            attempts += 1;
            match operation.poll(&job).await {
                Ok(PollOutcome::Ready(result)) => return Ok(result),
                Ok(PollOutcome::Failed { reason, retriable }) if !retriable => {
                    return Err(StageError::RemoteGenerationFailed {
                        backend: operation.describe().to_string(),
                        reason,
                    });
                }
                Ok(PollOutcome::Pending) => {
                    debug!(operation = operation.describe(), attempts, "job pending");
                }
                Ok(PollOutcome::Failed { reason, .. }) => {
                    warn!(operation = operation.describe(), attempts, %reason, "retriable poll failure");
                }
                Err(err) if err.is_retriable() => {
                    warn!(operation = operation.describe(), attempts, %err, "transient poll error");
                }
                Err(err) => return Err(err),
            }

            let elapsed = started.elapsed();
            if elapsed >= self.policy.max_elapsed || attempts >= self.policy.max_attempts {
                return Err(StageError::TimedOut {
                    attempts,
                    elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
            }

            let remaining = self.policy.max_elapsed - elapsed;
            let sleep_for = self.jittered(delay).min(remaining);
            tokio::select! {
                () = tokio::time::sleep(sleep_for) => {}
                () = cancel.cancelled() => {
                    return Err(StageError::Cancelled(cancel.reason_or_default()));
                }
            }
            delay = delay.mul_f64(self.policy.multiplier).min(remaining);
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.policy.jitter || delay.is_zero() {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=0.25);
        delay + delay.mul_f64(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedOperation {
        polls: AtomicU32,
        outcome: fn(u32) -> Result<PollOutcome<String>, StageError>,
    }

    impl ScriptedOperation {
        fn new(outcome: fn(u32) -> Result<PollOutcome<String>, StageError>) -> Self {
            Self {
                polls: AtomicU32::new(0),
                outcome,
            }
        }

        fn poll_count(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteOperation for ScriptedOperation {
        type Output = String;

        fn describe(&self) -> &str {
            "scripted"
        }

        async fn submit(&self) -> Result<Submission<String>, StageError> {
            Ok(Submission::Job(JobHandle::new("job-1")))
        }

        async fn poll(&self, _job: &JobHandle) -> Result<PollOutcome<String>, StageError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            (self.outcome)(n)
        }
    }

    fn policy_10s() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_attempts: 100,
            max_elapsed: Duration::from_secs(10),
            jitter: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_pending_times_out_within_budget() {
        let controller = RetryController::new(policy_10s());
        let op = ScriptedOperation::new(|_| Ok(PollOutcome::Pending));
        let started = Instant::now();

        let err = controller.run(&op, &CancelToken::new()).await.unwrap_err();

        // Delays run 1, 2, 4 then get capped by the remaining budget, so
        // the deadline is hit at exactly 10s after a fixed attempt count.
        assert!(started.elapsed() <= Duration::from_secs(10));
        match err {
            StageError::TimedOut { attempts, .. } => {
                assert_eq!(attempts, 5);
                assert_eq!(op.poll_count(), 5);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_pending_returns_result() {
        let controller = RetryController::new(policy_10s());
        let op = ScriptedOperation::new(|n| {
            if n < 3 {
                Ok(PollOutcome::Pending)
            } else {
                Ok(PollOutcome::Ready("done".to_string()))
            }
        });

        let result = controller.run(&op, &CancelToken::new()).await.unwrap();
        assert_eq!(result, "done");
        assert_eq!(op.poll_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retriable_failure_is_immediate() {
        let controller = RetryController::new(policy_10s());
        let op = ScriptedOperation::new(|_| {
            Ok(PollOutcome::Failed {
                reason: "model rejected the prompt".to_string(),
                retriable: false,
            })
        });

        let err = controller.run(&op, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, StageError::RemoteGenerationFailed { .. }));
        assert_eq!(op.poll_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let controller = RetryController::new(policy_10s());
        let op = ScriptedOperation::new(|n| {
            if n == 1 {
                Err(StageError::TransientRemote("connection reset".to_string()))
            } else {
                Ok(PollOutcome::Ready("recovered".to_string()))
            }
        });

        let result = controller.run(&op, &CancelToken::new()).await.unwrap();
        assert_eq!(result, "recovered");
        assert_eq!(op.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_ceiling_applies() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..policy_10s()
        };
        let controller = RetryController::new(policy);
        let op = ScriptedOperation::new(|_| Ok(PollOutcome::Pending));

        let err = controller.run(&op, &CancelToken::new()).await.unwrap_err();
        match err {
            StageError::TimedOut { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_submission_skips_polling() {
        struct Immediate;

        #[async_trait]
        impl RemoteOperation for Immediate {
            type Output = u32;

            fn describe(&self) -> &str {
                "immediate"
            }

            async fn submit(&self) -> Result<Submission<u32>, StageError> {
                Ok(Submission::Ready(42))
            }

            async fn poll(&self, _job: &JobHandle) -> Result<PollOutcome<u32>, StageError> {
                Ok(PollOutcome::Pending)
            }
        }

        let controller = RetryController::new(policy_10s());
        let result = controller.run(&Immediate, &CancelToken::new()).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_sleep_promptly() {
        let controller = RetryController::new(RetryPolicy {
            initial_delay: Duration::from_secs(3600),
            ..policy_10s()
        });
        let op = ScriptedOperation::new(|_| Ok(PollOutcome::Pending));
        let cancel = CancelToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel("user aborted");
        });

        let err = controller.run(&op, &cancel).await.unwrap_err();
        assert!(matches!(err, StageError::Cancelled(_)));
    }

    #[test]
    fn test_policy_from_settings_sanitizes_bounds() {
        let policy = RetryPolicy::from(RetrySettings {
            initial_delay_secs: -1.0,
            backoff_factor: 0.5,
            max_attempts: 0,
            max_total_secs: 60,
            jitter: true,
        });
        assert_eq!(policy.initial_delay, Duration::ZERO);
        assert!((policy.multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(policy.max_attempts, 1);
    }
}
