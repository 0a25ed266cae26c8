//! Content extraction stage runner.

use super::{excerpt, prompt, GenerationDriver, StageJob, StageRunner};
use crate::backend::{BackendResolver, Capability, GenerationRequest, GenerationResult};
use crate::config::Settings;
use crate::errors::StageError;
use crate::fingerprint::Fingerprint;
use crate::model::{Artifact, ArtifactPayload, Project, Stage};
use crate::retry::RetryController;
use async_trait::async_trait;
use std::sync::Arc;

/// Extracts teaser content (headline, key moments, narration) from the
/// source script.
pub struct ContentRunner {
    driver: GenerationDriver,
}

impl ContentRunner {
    /// Creates the runner.
    #[must_use]
    pub fn new(resolver: Arc<BackendResolver>, retry: RetryController) -> Self {
        Self {
            driver: GenerationDriver::new(resolver, retry),
        }
    }

    fn request(job: &StageJob<'_>) -> GenerationRequest {
        let script = &job.project.script;
        let source_excerpt = excerpt(&script.content);
        GenerationRequest {
            capability: Capability::Content,
            project_id: job.project.id.clone(),
            title: script.title.clone(),
            prompt: prompt::extraction_prompt(
                &script.title,
                &source_excerpt,
                job.settings.max_clip_duration,
                &job.settings.language,
            ),
            source_excerpt,
            duration_seconds: job.settings.max_clip_duration,
            language: job.settings.language.clone(),
            output_format: "json".to_string(),
            output_path: job
                .settings
                .project_dir(&job.project.id)
                .join("content.json"),
            voice: None,
            aspect_ratio: None,
        }
    }
}

#[async_trait]
impl StageRunner for ContentRunner {
    fn stage(&self) -> Stage {
        Stage::Content
    }

    fn fingerprint(
        &self,
        project: &Project,
        settings: &Settings,
    ) -> Result<Fingerprint, StageError> {
        Ok(Fingerprint::of_parts([
            "content",
            project.script.title.as_str(),
            project.script.content.as_str(),
            settings.max_clip_duration.to_string().as_str(),
            settings.language.as_str(),
        ]))
    }

    async fn run(&self, job: &StageJob<'_>) -> Result<Artifact, StageError> {
        if job.project.script.content.trim().is_empty() {
            return Err(StageError::InvalidInput("script text is empty".into()));
        }

        let request = Self::request(job);
        let (result, backend) = self
            .driver
            .generate(&request, job.cancel, job.pinned_tier)
            .await?;

        let content = match result {
            GenerationResult::Content(content) => content.normalized(),
            GenerationResult::Media { .. } => {
                return Err(StageError::RemoteGenerationFailed {
                    backend,
                    reason: "content backend returned a media artifact".into(),
                })
            }
        };
        if !content.is_complete() {
            return Err(StageError::RemoteGenerationFailed {
                backend,
                reason: "extracted content was incomplete".into(),
            });
        }

        Ok(Artifact::new(
            Stage::Content,
            backend,
            self.fingerprint(job.project, job.settings)?,
            ArtifactPayload::Content { content },
        ))
    }
}
