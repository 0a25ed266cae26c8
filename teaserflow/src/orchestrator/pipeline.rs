//! The pipeline orchestrator.

use super::{classify, StageState};
use crate::backend::{BackendResolver, BackendTier};
use crate::cancellation::CancelToken;
use crate::config::Settings;
use crate::errors::StageError;
use crate::events::{EventSink, NoOpEventSink};
use crate::model::{Artifact, Project, Stage};
use crate::retry::{RetryController, RetryPolicy};
use crate::runner::{
    AudioRunner, ComposeRunner, Compositor, ContentRunner, ManifestCompositor, StageJob,
    StageRunner, VideoRunner,
};
use crate::store::ArtifactStore;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Per-stage force overrides and backend pinning for one invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOverrides {
    /// Regenerate content even if validly cached.
    pub force_content: bool,
    /// Regenerate audio even if validly cached.
    pub force_audio: bool,
    /// Regenerate video even if validly cached.
    pub force_video: bool,
    /// Recompose the final teaser even if validly cached.
    pub force_compose: bool,
    /// Pin one stage to a specific backend tier, disabling fallback for
    /// that stage.
    pub pinned: Option<(Stage, BackendTier)>,
}

impl RunOverrides {
    /// No overrides: every stage honors its cache.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Forces regeneration of one stage.
    #[must_use]
    pub fn with_force(mut self, stage: Stage) -> Self {
        match stage {
            Stage::Content => self.force_content = true,
            Stage::Audio => self.force_audio = true,
            Stage::Video => self.force_video = true,
            Stage::Compose => self.force_compose = true,
        }
        self
    }

    /// Pins a stage to a backend tier, disabling its fallback chain.
    #[must_use]
    pub fn with_pinned_tier(mut self, stage: Stage, tier: BackendTier) -> Self {
        self.pinned = Some((stage, tier));
        self
    }

    /// Whether a stage is forced to regenerate.
    #[must_use]
    pub fn forces(&self, stage: Stage) -> bool {
        match stage {
            Stage::Content => self.force_content,
            Stage::Audio => self.force_audio,
            Stage::Video => self.force_video,
            Stage::Compose => self.force_compose,
        }
    }

    fn pin_for(&self, stage: Stage) -> Option<BackendTier> {
        self.pinned
            .and_then(|(pinned_stage, tier)| (pinned_stage == stage).then_some(tier))
    }
}

/// The stage that ended a run, and why.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {error}")]
pub struct StageFailure {
    /// The stage that failed.
    pub stage: Stage,
    /// The error that failed it.
    pub error: StageError,
}

/// The outcome of a pipeline invocation: the updated project, the
/// terminal state each attempted stage reached, and the failure that
/// halted the run, if any. Stages blocked by an upstream failure do not
/// appear in `outcomes`.
#[derive(Debug)]
pub struct RunReport {
    /// The project with every completed stage's artifact recorded.
    pub project: Project,
    /// Terminal state per attempted stage.
    pub outcomes: BTreeMap<Stage, StageState>,
    /// The first failure, when the run did not complete.
    pub failure: Option<StageFailure>,
}

impl RunReport {
    fn new(project: Project) -> Self {
        Self {
            project,
            outcomes: BTreeMap::new(),
            failure: None,
        }
    }

    /// Whether every attempted stage completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The terminal state a stage reached, if it was attempted.
    #[must_use]
    pub fn state(&self, stage: Stage) -> Option<StageState> {
        self.outcomes.get(&stage).copied()
    }
}

/// Sequences the four pipeline stages, consulting the artifact store
/// before invoking a runner and persisting each artifact as it lands.
///
/// The orchestrator holds no per-project state; multiple projects may
/// run concurrently on one instance.
pub struct Orchestrator {
    settings: Arc<Settings>,
    store: Arc<dyn ArtifactStore>,
    runners: BTreeMap<Stage, Arc<dyn StageRunner>>,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Creates an orchestrator with backends resolved from settings and
    /// the manifest compositor.
    #[must_use]
    pub fn new(settings: Settings, store: Arc<dyn ArtifactStore>) -> Self {
        let resolver = Arc::new(BackendResolver::from_settings(&settings));
        Self::with_components(settings, store, resolver, Arc::new(ManifestCompositor))
    }

    /// Creates an orchestrator around an explicit resolver and
    /// compositor.
    #[must_use]
    pub fn with_components(
        settings: Settings,
        store: Arc<dyn ArtifactStore>,
        resolver: Arc<BackendResolver>,
        compositor: Arc<dyn Compositor>,
    ) -> Self {
        let retry = RetryController::new(RetryPolicy::from(settings.retry));
        let mut runners: BTreeMap<Stage, Arc<dyn StageRunner>> = BTreeMap::new();
        runners.insert(
            Stage::Content,
            Arc::new(ContentRunner::new(Arc::clone(&resolver), retry)),
        );
        runners.insert(
            Stage::Audio,
            Arc::new(AudioRunner::new(Arc::clone(&resolver), retry)),
        );
        runners.insert(
            Stage::Video,
            Arc::new(VideoRunner::new(Arc::clone(&resolver), retry)),
        );
        runners.insert(Stage::Compose, Arc::new(ComposeRunner::new(compositor)));

        Self {
            settings: Arc::new(settings),
            store,
            runners,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Drives the whole pipeline: content, then audio and video
    /// concurrently, then compose. Already-valid cached stages are
    /// skipped; a failure halts dependent stages while leaving completed
    /// stages cached for a later resumed run.
    pub async fn run_full(
        &self,
        project: Project,
        overrides: &RunOverrides,
        cancel: &CancelToken,
    ) -> RunReport {
        info!(project = %project.id, "starting pipeline run");
        let mut report = RunReport::new(project);

        if !self.advance(&mut report, Stage::Content, overrides, cancel).await {
            return report;
        }

        // Audio and video have no dependency on each other once content
        // exists, so they run as concurrent tasks.
        let (audio, video) = tokio::join!(
            self.execute(&report.project, Stage::Audio, overrides, cancel),
            self.execute(&report.project, Stage::Video, overrides, cancel),
        );
        let mut blocked = false;
        for (stage, outcome) in [(Stage::Audio, audio), (Stage::Video, video)] {
            match outcome {
                Ok((state, artifact)) => {
                    if !self.settle(&mut report, stage, state, artifact) {
                        blocked = true;
                    }
                }
                Err(error) => {
                    self.mark_failed(&mut report, stage, error);
                    blocked = true;
                }
            }
        }
        if blocked {
            return report;
        }

        self.advance(&mut report, Stage::Compose, overrides, cancel)
            .await;
        report
    }

    /// Runs a single stage, first bringing its dependency chain up to
    /// date (unforced). `force` regenerates the target stage even when
    /// a valid cached artifact exists.
    pub async fn run_stage(
        &self,
        project: Project,
        stage: Stage,
        force: bool,
        cancel: &CancelToken,
    ) -> RunReport {
        let overrides = if force {
            RunOverrides::none().with_force(stage)
        } else {
            RunOverrides::none()
        };

        let mut report = RunReport::new(project);
        for step in Self::dependency_chain(stage) {
            if !self.advance(&mut report, step, &overrides, cancel).await {
                break;
            }
        }
        report
    }

    /// The target stage and its transitive dependencies, in execution
    /// order.
    fn dependency_chain(target: Stage) -> Vec<Stage> {
        let mut needed = BTreeSet::new();
        let mut pending = vec![target];
        while let Some(stage) = pending.pop() {
            if needed.insert(stage) {
                pending.extend(stage.dependencies());
            }
        }
        Stage::ALL.into_iter().filter(|s| needed.contains(s)).collect()
    }

    /// Executes one stage and folds the outcome into the report.
    /// Returns whether the run may continue to dependents.
    async fn advance(
        &self,
        report: &mut RunReport,
        stage: Stage,
        overrides: &RunOverrides,
        cancel: &CancelToken,
    ) -> bool {
        match self.execute(&report.project, stage, overrides, cancel).await {
            Ok((state, artifact)) => self.settle(report, stage, state, artifact),
            Err(error) => {
                self.mark_failed(report, stage, error);
                false
            }
        }
    }

    fn settle(
        &self,
        report: &mut RunReport,
        stage: Stage,
        state: StageState,
        artifact: Artifact,
    ) -> bool {
        if let Err(error) = report.project.record(artifact) {
            self.mark_failed(report, stage, error);
            return false;
        }
        report.outcomes.insert(stage, state);
        true
    }

    fn mark_failed(&self, report: &mut RunReport, stage: Stage, error: StageError) {
        let event = if matches!(error, StageError::Cancelled(_)) {
            "stage.cancelled"
        } else {
            "stage.failed"
        };
        self.sink.emit(
            event,
            Some(json!({
                "project": report.project.id,
                "stage": stage.name(),
                "error": error.to_string(),
            })),
        );
        error!(project = %report.project.id, %stage, %error, "stage failed");
        report.outcomes.insert(stage, StageState::Failed);
        if report.failure.is_none() {
            report.failure = Some(StageFailure { stage, error });
        }
    }

    /// Runs one stage: asserts its dependencies, plans against the
    /// cache, and either reuses the cached artifact or invokes the
    /// runner and persists the new one.
    async fn execute(
        &self,
        project: &Project,
        stage: Stage,
        overrides: &RunOverrides,
        cancel: &CancelToken,
    ) -> Result<(StageState, Artifact), StageError> {
        for dep in stage.dependencies() {
            if project.artifact(*dep).is_none() {
                return Err(StageError::InvalidInput(format!(
                    "stage '{stage}' requires '{dep}' to be done first"
                )));
            }
        }
        if cancel.is_cancelled() {
            return Err(StageError::Cancelled(cancel.reason_or_default()));
        }

        let runner = self.runners.get(&stage).ok_or_else(|| {
            StageError::InvalidInput(format!("no runner registered for stage '{stage}'"))
        })?;
        let fingerprint = runner.fingerprint(project, &self.settings)?;
        let existing = self.store.get(&project.id, stage).await?;
        let cached = existing
            .as_ref()
            .map(|artifact| self.store.fingerprint_matches(artifact, &fingerprint));
        let planned = classify(cached, overrides.forces(stage));

        if let (StageState::Cached, Some(artifact)) = (planned, existing) {
            info!(project = %project.id, %stage, "reusing cached artifact");
            self.sink.emit(
                "stage.skipped",
                Some(json!({
                    "project": project.id,
                    "stage": stage.name(),
                    "reason": "cached",
                })),
            );
            return Ok((StageState::Cached, artifact));
        }

        info!(project = %project.id, %stage, from = %planned, "running stage");
        self.sink.emit(
            "stage.started",
            Some(json!({
                "project": project.id,
                "stage": stage.name(),
                "from": planned.to_string(),
            })),
        );

        let job = StageJob {
            project,
            settings: &self.settings,
            cancel,
            pinned_tier: overrides.pin_for(stage),
        };
        let artifact = runner.run(&job).await?;
        self.store.put(&project.id, stage, &artifact).await?;

        self.sink.emit(
            "stage.completed",
            Some(json!({
                "project": project.id,
                "stage": stage.name(),
                "backend": artifact.backend,
            })),
        );
        Ok((StageState::Done, artifact))
    }
}
