//! Stage runners.
//!
//! A runner turns validated inputs plus a resolved backend into one
//! typed artifact. Remote generation goes through the retry controller;
//! when a tier is exhausted the runner re-resolves strictly below it,
//! down to the guaranteed placeholder, unless the caller pinned a tier.

mod audio;
mod compose;
mod content;
mod prompt;
mod video;

pub use audio::AudioRunner;
pub use compose::{ComposeRunner, Compositor, ManifestCompositor};
pub use content::ContentRunner;
pub use video::VideoRunner;

use crate::backend::{Backend, BackendResolver, BackendTier, GenerationRequest, GenerationResult};
use crate::cancellation::CancelToken;
use crate::config::Settings;
use crate::errors::StageError;
use crate::fingerprint::Fingerprint;
use crate::model::{Artifact, Project, Stage, TeaserContent};
use crate::retry::{JobHandle, PollOutcome, RemoteOperation, RetryController, Submission};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Longest script excerpt forwarded to backends.
const EXCERPT_CHARS: usize = 2_000;

/// Everything a runner needs for one stage invocation.
pub struct StageJob<'a> {
    /// The project being processed.
    pub project: &'a Project,
    /// Application settings.
    pub settings: &'a Settings,
    /// Cancellation token for the enclosing run.
    pub cancel: &'a CancelToken,
    /// When set, only this tier is used and fallback is disabled.
    pub pinned_tier: Option<BackendTier>,
}

/// Produces one stage's artifact from validated inputs.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// The stage this runner services.
    fn stage(&self) -> Stage;

    /// Fingerprint of the stage's current inputs, used for cache
    /// validity. Fails with `InvalidInput` when upstream artifacts the
    /// stage depends on are missing from the project.
    fn fingerprint(
        &self,
        project: &Project,
        settings: &Settings,
    ) -> Result<Fingerprint, StageError>;

    /// Runs the stage to completion.
    async fn run(&self, job: &StageJob<'_>) -> Result<Artifact, StageError>;
}

/// Shared generation path: resolve, invoke under retry, fall back.
pub(crate) struct GenerationDriver {
    resolver: Arc<BackendResolver>,
    retry: RetryController,
}

impl GenerationDriver {
    pub(crate) fn new(resolver: Arc<BackendResolver>, retry: RetryController) -> Self {
        Self { resolver, retry }
    }

    /// Generates a result, walking the tier chain on fallback-eligible
    /// failures. Returns the result and the id of the backend that
    /// produced it.
    pub(crate) async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancelToken,
        pinned_tier: Option<BackendTier>,
    ) -> Result<(GenerationResult, String), StageError> {
        if let Some(tier) = pinned_tier {
            let backend = self
                .resolver
                .resolve_tier(request.capability, tier)
                .ok_or(StageError::BackendUnavailable {
                    capability: request.capability,
                })?;
            let result = self.invoke(backend.as_ref(), request, cancel).await?;
            return Ok((result, backend.id().to_string()));
        }

        let mut backend = self.resolver.resolve(request.capability);
        loop {
            match self.invoke(backend.as_ref(), request, cancel).await {
                Ok(result) => return Ok((result, backend.id().to_string())),
                Err(err)
                    if err.triggers_fallback() && backend.tier() != BackendTier::Placeholder =>
                {
                    warn!(
                        backend = backend.id(),
                        tier = %backend.tier(),
                        %err,
                        "backend exhausted, falling back to next tier"
                    );
                    backend = self
                        .resolver
                        .resolve_below(request.capability, backend.tier());
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn invoke(
        &self,
        backend: &dyn Backend,
        request: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<GenerationResult, StageError> {
        let operation = BackendOperation { backend, request };
        self.retry.run(&operation, cancel).await
    }
}

/// Adapts a backend invocation to the retry controller's protocol.
struct BackendOperation<'a> {
    backend: &'a dyn Backend,
    request: &'a GenerationRequest,
}

#[async_trait]
impl RemoteOperation for BackendOperation<'_> {
    type Output = GenerationResult;

    fn describe(&self) -> &str {
        self.backend.id()
    }

    async fn submit(&self) -> Result<Submission<GenerationResult>, StageError> {
        self.backend.submit(self.request).await
    }

    async fn poll(&self, job: &JobHandle) -> Result<PollOutcome<GenerationResult>, StageError> {
        self.backend.poll(self.request, job).await
    }
}

/// The content artifact a downstream stage depends on.
pub(crate) fn require_content<'a>(
    project: &'a Project,
    dependent: Stage,
) -> Result<(&'a Artifact, &'a TeaserContent), StageError> {
    let artifact = project
        .artifact(Stage::Content)
        .ok_or_else(|| missing_dependency(dependent, Stage::Content))?;
    let content = artifact
        .content()
        .ok_or_else(|| missing_dependency(dependent, Stage::Content))?;
    Ok((artifact, content))
}

pub(crate) fn missing_dependency(dependent: Stage, missing: Stage) -> StageError {
    StageError::InvalidInput(format!(
        "stage '{dependent}' requires a '{missing}' artifact"
    ))
}

/// The source excerpt forwarded to backends, truncated on a char
/// boundary.
pub(crate) fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}
