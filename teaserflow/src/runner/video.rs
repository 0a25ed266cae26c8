//! Teaser video generation stage runner.

use super::{prompt, require_content, GenerationDriver, StageJob, StageRunner};
use crate::backend::{BackendResolver, Capability, GenerationRequest, GenerationResult};
use crate::config::Settings;
use crate::errors::StageError;
use crate::fingerprint::Fingerprint;
use crate::model::{Artifact, ArtifactPayload, Project, Stage};
use crate::retry::RetryController;
use async_trait::async_trait;
use std::sync::Arc;

/// Generates the teaser video clip from the extracted content.
pub struct VideoRunner {
    driver: GenerationDriver,
}

impl VideoRunner {
    /// Creates the runner.
    #[must_use]
    pub fn new(resolver: Arc<BackendResolver>, retry: RetryController) -> Self {
        Self {
            driver: GenerationDriver::new(resolver, retry),
        }
    }
}

#[async_trait]
impl StageRunner for VideoRunner {
    fn stage(&self) -> Stage {
        Stage::Video
    }

    fn fingerprint(
        &self,
        project: &Project,
        settings: &Settings,
    ) -> Result<Fingerprint, StageError> {
        let (artifact, content) = require_content(project, Stage::Video)?;
        let content_json = serde_json::to_string(content)
            .map_err(|e| StageError::InvalidInput(format!("unencodable content artifact: {e}")))?;
        Ok(Fingerprint::of_parts([
            "video",
            artifact.fingerprint.as_str(),
            content_json.as_str(),
            settings.aspect_ratio.as_str(),
            settings.video_format.as_str(),
        ]))
    }

    async fn run(&self, job: &StageJob<'_>) -> Result<Artifact, StageError> {
        let (_, content) = require_content(job.project, Stage::Video)?;

        let request = GenerationRequest {
            capability: Capability::Video,
            project_id: job.project.id.clone(),
            title: job.project.script.title.clone(),
            prompt: prompt::video_prompt(content),
            source_excerpt: String::new(),
            duration_seconds: content.duration_seconds,
            language: job.settings.language.clone(),
            output_format: job.settings.video_format.clone(),
            output_path: job
                .settings
                .project_dir(&job.project.id)
                .join(format!("video.{}", job.settings.video_format)),
            voice: None,
            aspect_ratio: Some(job.settings.aspect_ratio.clone()),
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
                    reason: "video backend returned structured content".into(),
                })
            }
        };

        Ok(Artifact::new(
            Stage::Video,
            backend,
            self.fingerprint(job.project, job.settings)?,
            ArtifactPayload::Media {
                path,
                duration_seconds,
            },
        ))
    }
}
