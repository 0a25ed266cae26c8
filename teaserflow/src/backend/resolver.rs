//! Priority-ordered backend resolution.

use super::{
    AvailabilityCache, Backend, BackendTier, Capability, PlaceholderBackend, RemoteJobBackend,
};
use crate::config::Settings;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves the backend servicing a capability.
///
/// Tiers are walked in the fixed priority order of
/// [`BackendTier::ORDER`]; the first backend whose availability predicate
/// passes wins. A placeholder backend is registered for every capability
/// at construction, so resolution is total and never fails.
pub struct BackendResolver {
    backends: Vec<Arc<dyn Backend>>,
    availability: Arc<AvailabilityCache>,
}

impl BackendResolver {
    /// Creates a resolver over the given backends, adding the
    /// deterministic placeholder for every capability.
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Self {
        Self::with_availability(backends, Arc::new(AvailabilityCache::new()))
    }

    /// Creates a resolver sharing an existing availability cache.
    #[must_use]
    pub fn with_availability(
        mut backends: Vec<Arc<dyn Backend>>,
        availability: Arc<AvailabilityCache>,
    ) -> Self {
        for capability in Capability::ALL {
            backends.push(Arc::new(PlaceholderBackend::new(capability)));
        }
        Self {
            backends,
            availability,
        }
    }

    /// Builds the resolver for the configured remote tiers.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut backends: Vec<Arc<dyn Backend>> = Vec::new();
        for capability in Capability::ALL {
            let tiers = settings.backends(capability);
            for tier in [
                BackendTier::Specialized,
                BackendTier::ManagedCloud,
                BackendTier::DirectApi,
            ] {
                if let Some(tier_settings) = tiers.tier(tier) {
                    if tier_settings.enabled {
                        backends.push(Arc::new(RemoteJobBackend::new(
                            capability,
                            tier,
                            tier_settings.clone(),
                        )));
                    }
                }
            }
        }
        Self::new(backends)
    }

    /// The shared availability cache.
    #[must_use]
    pub fn availability(&self) -> &Arc<AvailabilityCache> {
        &self.availability
    }

    /// Resolves the highest-priority available backend for a capability.
    #[must_use]
    pub fn resolve(&self, capability: Capability) -> Arc<dyn Backend> {
        self.resolve_from(capability, None)
    }

    /// Resolves starting strictly below `failed`, so a tier that just
    /// failed is not retried within the same fallback chain.
    #[must_use]
    pub fn resolve_below(&self, capability: Capability, failed: BackendTier) -> Arc<dyn Backend> {
        self.resolve_from(capability, Some(failed))
    }

    /// Resolves a specific tier, for callers that pinned one. Returns
    /// `None` when the tier has no available backend for the capability.
    #[must_use]
    pub fn resolve_tier(
        &self,
        capability: Capability,
        tier: BackendTier,
    ) -> Option<Arc<dyn Backend>> {
        let backend = self
            .backends
            .iter()
            .find(|b| b.capability() == capability && b.tier() == tier)?;
        if self.availability.check(backend.as_ref()) {
            Some(Arc::clone(backend))
        } else {
            None
        }
    }

    fn resolve_from(
        &self,
        capability: Capability,
        below: Option<BackendTier>,
    ) -> Arc<dyn Backend> {
        for tier in BackendTier::ORDER {
            if below.is_some_and(|floor| tier <= floor) {
                continue;
            }
            if let Some(backend) = self.resolve_tier(capability, tier) {
                info!(capability = %capability, tier = %tier, backend = backend.id(), "resolved backend");
                return backend;
            }
            debug!(capability = %capability, tier = %tier, "tier unavailable");
        }
        // Unreachable: the placeholder tier is always registered and
        // always available.
        #[allow(clippy::expect_used)]
        self.backends
            .iter()
            .find(|b| b.capability() == capability && b.tier() == BackendTier::Placeholder)
            .cloned()
            .expect("placeholder backend registered for every capability")
    }
}
