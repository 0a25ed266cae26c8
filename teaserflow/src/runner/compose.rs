//! Final composition stage runner.

use super::{missing_dependency, StageJob, StageRunner};
use crate::config::Settings;
use crate::errors::StageError;
use crate::fingerprint::Fingerprint;
use crate::fsutil::write_atomic;
use crate::model::{Artifact, ArtifactPayload, Project, Stage};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Combines an audio track and a video clip into the final teaser.
///
/// Encoding itself is a black box behind this seam; the runner only
/// validates inputs and records the result.
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Identifier recorded on composed artifacts.
    fn id(&self) -> &str;

    /// Writes the composed teaser to `output`. Implementations must
    /// never leave a partial file at `output`.
    async fn compose(
        &self,
        audio: &Path,
        video: &Path,
        output: &Path,
    ) -> Result<(), StageError>;
}

/// Deterministic compositor used when no encoder is wired in: writes a
/// composition manifest referencing both inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestCompositor;

#[async_trait]
impl Compositor for ManifestCompositor {
    fn id(&self) -> &str {
        "compose-manifest"
    }

    async fn compose(
        &self,
        audio: &Path,
        video: &Path,
        output: &Path,
    ) -> Result<(), StageError> {
        let manifest = format!(
            "# Final teaser composition\n# Audio: {}\n# Video: {}\n",
            audio.display(),
            video.display(),
        );
        write_atomic(output, manifest.as_bytes()).await?;
        Ok(())
    }
}

/// Runs the compose stage.
pub struct ComposeRunner {
    compositor: Arc<dyn Compositor>,
}

impl ComposeRunner {
    /// Creates the runner around a compositor.
    #[must_use]
    pub fn new(compositor: Arc<dyn Compositor>) -> Self {
        Self { compositor }
    }

    fn media_inputs(project: &Project) -> Result<(&Artifact, &Artifact), StageError> {
        let audio = project
            .artifact(Stage::Audio)
            .ok_or_else(|| missing_dependency(Stage::Compose, Stage::Audio))?;
        let video = project
            .artifact(Stage::Video)
            .ok_or_else(|| missing_dependency(Stage::Compose, Stage::Video))?;
        if audio.media_path().is_none() {
            return Err(missing_dependency(Stage::Compose, Stage::Audio));
        }
        if video.media_path().is_none() {
            return Err(missing_dependency(Stage::Compose, Stage::Video));
        }
        Ok((audio, video))
    }
}

#[async_trait]
impl StageRunner for ComposeRunner {
    fn stage(&self) -> Stage {
        Stage::Compose
    }

    fn fingerprint(
        &self,
        project: &Project,
        settings: &Settings,
    ) -> Result<Fingerprint, StageError> {
        let (audio, video) = Self::media_inputs(project)?;
        // The creation timestamps tie the composition to the exact media
        // artifacts it consumed: a forced regeneration produces a new
        // artifact (same input fingerprint, new timestamp) and must
        // invalidate the cached composition.
        Ok(Fingerprint::of_parts([
            "compose",
            audio.fingerprint.as_str(),
            audio.created_at.to_rfc3339().as_str(),
            audio.media_path().unwrap_or_default(),
            video.fingerprint.as_str(),
            video.created_at.to_rfc3339().as_str(),
            video.media_path().unwrap_or_default(),
            settings.video_format.as_str(),
        ]))
    }

    async fn run(&self, job: &StageJob<'_>) -> Result<Artifact, StageError> {
        let (audio, video) = Self::media_inputs(job.project)?;
        let audio_path = audio.media_path().unwrap_or_default();
        let video_path = video.media_path().unwrap_or_default();

        let output = job
            .settings
            .project_dir(&job.project.id)
            .join(format!("final.{}", job.settings.video_format));

        if job.cancel.is_cancelled() {
            return Err(StageError::Cancelled(job.cancel.reason_or_default()));
        }

        self.compositor
            .compose(Path::new(audio_path), Path::new(video_path), &output)
            .await?;
        info!(project = %job.project.id, output = %output.display(), "teaser composed");

        Ok(Artifact::new(
            Stage::Compose,
            self.compositor.id(),
            self.fingerprint(job.project, job.settings)?,
            ArtifactPayload::Teaser {
                path: output.display().to_string(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelToken;
    use crate::model::{PodcastScript, TeaserContent};

    fn project_with_media(dir: &Path) -> Project {
        let mut project = Project::resumable(PodcastScript::new("Ep1", "a script"));
        project
            .record(Artifact::new(
                Stage::Content,
                "placeholder-content",
                Fingerprint::of_parts(["content"]),
                ArtifactPayload::Content {
                    content: TeaserContent::fallback("Ep1", 15),
                },
            ))
            .unwrap();
        for (stage, file) in [(Stage::Audio, "audio.mp3"), (Stage::Video, "video.mp4")] {
            let path = dir.join(file);
            std::fs::write(&path, b"media").unwrap();
            project
                .record(Artifact::new(
                    stage,
                    "placeholder",
                    Fingerprint::of_parts([stage.name()]),
                    ArtifactPayload::Media {
                        path: path.display().to_string(),
                        duration_seconds: Some(15.0),
                    },
                ))
                .unwrap();
        }
        project
    }

    #[tokio::test]
    async fn test_requires_both_media_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::placeholder_only(dir.path());
        let runner = ComposeRunner::new(Arc::new(ManifestCompositor));
        let cancel = CancelToken::new();

        let mut project = Project::resumable(PodcastScript::new("Ep1", "a script"));
        project
            .record(Artifact::new(
                Stage::Content,
                "placeholder-content",
                Fingerprint::of_parts(["content"]),
                ArtifactPayload::Content {
                    content: TeaserContent::fallback("Ep1", 15),
                },
            ))
            .unwrap();

        let err = runner
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
    async fn test_composes_manifest_teaser() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::placeholder_only(dir.path());
        let runner = ComposeRunner::new(Arc::new(ManifestCompositor));
        let cancel = CancelToken::new();
        let project = project_with_media(dir.path());

        let artifact = runner
            .run(&StageJob {
                project: &project,
                settings: &settings,
                cancel: &cancel,
                pinned_tier: None,
            })
            .await
            .unwrap();

        assert_eq!(artifact.stage, Stage::Compose);
        assert_eq!(artifact.backend, "compose-manifest");
        let path = artifact.media_path().unwrap();
        assert!(path.ends_with("final.mp4"));
        let manifest = std::fs::read_to_string(path).unwrap();
        assert!(manifest.contains("audio.mp3"));
        assert!(manifest.contains("video.mp4"));
    }

    #[test]
    fn test_fingerprint_tracks_media_fingerprints() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::placeholder_only(dir.path());
        let runner = ComposeRunner::new(Arc::new(ManifestCompositor));
        let project = project_with_media(dir.path());

        let base = runner.fingerprint(&project, &settings).unwrap();

        let mut changed = project.clone();
        let audio_path = project
            .artifact(Stage::Audio)
            .and_then(Artifact::media_path)
            .unwrap()
            .to_string();
        changed
            .record(Artifact::new(
                Stage::Audio,
                "placeholder",
                Fingerprint::of_parts(["audio", "regenerated"]),
                ArtifactPayload::Media {
                    path: audio_path,
                    duration_seconds: Some(15.0),
                },
            ))
            .unwrap();

        assert_ne!(base, runner.fingerprint(&changed, &settings).unwrap());
    }
}
