//! Process-wide backend availability cache.

use super::Backend;
use dashmap::DashMap;

/// Caches backend availability answers so credentials are not re-checked
/// on every stage invocation.
///
/// The cache is read-mostly shared state: entries are populated on first
/// use and kept until explicitly invalidated. Staleness is tolerated by
/// design; re-resolution is cheap and idempotent.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    entries: DashMap<String, bool>,
}

impl AvailabilityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached availability for a backend, consulting the
    /// backend's predicate on first use.
    pub fn check(&self, backend: &dyn Backend) -> bool {
        if let Some(entry) = self.entries.get(backend.id()) {
            return *entry;
        }
        let available = backend.is_available();
        self.entries.insert(backend.id().to_string(), available);
        available
    }

    /// Drops the cached answer for one backend so the next check
    /// re-runs its predicate.
    pub fn invalidate(&self, backend_id: &str) {
        self.entries.remove(backend_id);
    }

    /// Drops every cached answer.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendTier, Capability, GenerationRequest, GenerationResult};
    use crate::errors::StageError;
    use crate::retry::{JobHandle, PollOutcome, Submission};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Default)]
    struct CountingBackend {
        checks: AtomicU32,
    }

    #[async_trait]
    impl crate::backend::Backend for CountingBackend {
        fn id(&self) -> &str {
            "counting"
        }

        fn tier(&self) -> BackendTier {
            BackendTier::Specialized
        }

        fn capability(&self) -> Capability {
            Capability::Content
        }

        fn is_available(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            true
        }

        async fn submit(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Submission<GenerationResult>, StageError> {
            Err(StageError::InvalidInput("not under test".into()))
        }

        async fn poll(
            &self,
            _request: &GenerationRequest,
            _job: &JobHandle,
        ) -> Result<PollOutcome<GenerationResult>, StageError> {
            Ok(PollOutcome::Pending)
        }
    }

    #[test]
    fn test_predicate_runs_once_until_invalidated() {
        let cache = AvailabilityCache::new();
        let backend = CountingBackend::default();

        assert!(cache.check(&backend));
        assert!(cache.check(&backend));
        assert_eq!(backend.checks.load(Ordering::SeqCst), 1);

        cache.invalidate("counting");
        assert!(cache.check(&backend));
        assert_eq!(backend.checks.load(Ordering::SeqCst), 2);
    }
}
