//! Narration audio synthesis stage runner.

use super::{require_content, GenerationDriver, StageJob, StageRunner};
use crate::backend::{BackendResolver, Capability, GenerationRequest, GenerationResult};
use crate::config::Settings;
use crate::errors::StageError;
use crate::fingerprint::Fingerprint;
use crate::model::{Artifact, ArtifactPayload, Project, Stage};
use crate::retry::RetryController;
use async_trait::async_trait;
use std::sync::Arc;

/// Synthesizes the teaser narration into an audio track.
pub struct AudioRunner {
    driver: GenerationDriver,
}

impl AudioRunner {
    /// Creates the runner.
    #[must_use]
    pub fn new(resolver: Arc<BackendResolver>, retry: RetryController) -> Self {
        Self {
            driver: GenerationDriver::new(resolver, retry),
        }
    }
}

#[async_trait]
impl StageRunner for AudioRunner {
    fn stage(&self) -> Stage {
        Stage::Audio
    }

    fn fingerprint(
        &self,
        project: &Project,
        settings: &Settings,
    ) -> Result<Fingerprint, StageError> {
        let (artifact, content) = require_content(project, Stage::Audio)?;
        let content_json = serde_json::to_string(content)
            .map_err(|e| StageError::InvalidInput(format!("unencodable content artifact: {e}")))?;
        Ok(Fingerprint::of_parts([
            "audio",
            artifact.fingerprint.as_str(),
            content_json.as_str(),
            settings.language.as_str(),
            settings.voice.as_deref().unwrap_or_default(),
            settings.audio_format.as_str(),
        ]))
    }

    async fn run(&self, job: &StageJob<'_>) -> Result<Artifact, StageError> {
        let (_, content) = require_content(job.project, Stage::Audio)?;

        let request = GenerationRequest {
            capability: Capability::Audio,
            project_id: job.project.id.clone(),
            title: job.project.script.title.clone(),
            // TTS input is the narration itself.
            prompt: content.narration.clone(),
            source_excerpt: String::new(),
            duration_seconds: content.duration_seconds,
            language: job.settings.language.clone(),
            output_format: job.settings.audio_format.clone(),
            output_path: job
                .settings
                .project_dir(&job.project.id)
                .join(format!("audio.{}", job.settings.audio_format)),
            voice: job.settings.voice.clone(),
            aspect_ratio: None,
        };

        let (result, backend) = self
            .driver
            .generate(&request, job.cancel, job.pinned_tier)
            .await?;

        let (path, duration_seconds) = match result {
            GenerationResult::Media {
                path,
                duration_seconds,
            } => (path, duration_seconds),
            GenerationResult::Content(_) => {
                return Err(StageError::RemoteGenerationFailed {
                    backend,
                    reason: "audio backend returned structured content".into(),
                })
            }
        };

        Ok(Artifact::new(
            Stage::Audio,
            backend,
            self.fingerprint(job.project, job.settings)?,
            ArtifactPayload::Media {
                path,
                duration_seconds,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelToken;
    use crate::model::{PodcastScript, TeaserContent};
    use crate::retry::RetryPolicy;

    fn runner() -> AudioRunner {
        AudioRunner::new(
            Arc::new(BackendResolver::new(Vec::new())),
            RetryController::new(RetryPolicy::default()),
        )
    }

    fn project_with_content() -> Project {
        let mut project = Project::resumable(PodcastScript::new("Ep1", "a script"));
        let content = TeaserContent::fallback("Ep1", 15);
        let artifact = Artifact::new(
            Stage::Content,
            "placeholder-content",
            Fingerprint::of_parts(["content", "v1"]),
            ArtifactPayload::Content { content },
        );
        project.record(artifact).unwrap();
        project
    }

    #[tokio::test]
    async fn test_requires_content_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::placeholder_only(dir.path());
        let project = Project::resumable(PodcastScript::new("Ep1", "a script"));
        let cancel = CancelToken::new();

        let err = runner()
            .run(&StageJob {
                project: &project,
                settings: &settings,
                cancel: &cancel,
                pinned_tier: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_placeholder_synthesis_writes_audio() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::placeholder_only(dir.path());
        let project = project_with_content();
        let cancel = CancelToken::new();

        let artifact = runner()
            .run(&StageJob {
                project: &project,
                settings: &settings,
                cancel: &cancel,
                pinned_tier: None,
            })
            .await
            .unwrap();

        assert_eq!(artifact.stage, Stage::Audio);
        let path = artifact.media_path().unwrap();
        assert!(path.ends_with("audio.mp3"));
        assert!(std::path::Path::new(path).exists());
    }

    #[test]
    fn test_fingerprint_tracks_upstream_content() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::placeholder_only(dir.path());
        let runner = runner();

        let project = project_with_content();
        let a = runner.fingerprint(&project, &settings).unwrap();

        let mut changed = project.clone();
        let reworked = Artifact::new(
            Stage::Content,
            "placeholder-content",
            Fingerprint::of_parts(["content", "v2"]),
            ArtifactPayload::Content {
                content: TeaserContent::fallback("Ep1 revisited", 15),
            },
        );
        changed.record(reworked).unwrap();
        let b = runner.fingerprint(&changed, &settings).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_tracks_voice_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::placeholder_only(dir.path());
        let voiced = Settings {
            voice: Some("narrator-2".into()),
            ..settings.clone()
        };
        let project = project_with_content();
        let runner = runner();

        assert_ne!(
            runner.fingerprint(&project, &settings).unwrap(),
            runner.fingerprint(&project, &voiced).unwrap(),
        );
    }
}
