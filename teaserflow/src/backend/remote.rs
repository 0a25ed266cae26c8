//! Job-based remote generation backend.
//!
//! All three remote tiers speak the same shape of protocol: submit a
//! generation job, poll its status, download the result when it
//! completes. Tier differences (endpoint, credentials, model name) live
//! entirely in configuration.

use super::{Backend, BackendTier, Capability, GenerationRequest, GenerationResult};
use crate::config::TierSettings;
use crate::errors::StageError;
use crate::fsutil::write_atomic;
use crate::model::TeaserContent;
use crate::retry::{JobHandle, PollOutcome, Submission};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A remote backend driving a submit/poll/download job API.
pub struct RemoteJobBackend {
    id: String,
    capability: Capability,
    tier: BackendTier,
    settings: TierSettings,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct JobPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    duration_seconds: u32,
    format: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    generations: Vec<Generation>,
    #[serde(default)]
    content: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    duration_seconds: Option<f64>,
}

impl RemoteJobBackend {
    /// Creates a backend for one capability at one tier.
    #[must_use]
    pub fn new(capability: Capability, tier: BackendTier, settings: TierSettings) -> Self {
        Self {
            id: format!("{}-{}", tier.name(), capability.name()),
            capability,
            tier,
            settings,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> Result<&str, StageError> {
        self.settings
            .endpoint
            .as_deref()
            .ok_or(StageError::BackendUnavailable {
                capability: self.capability,
            })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.settings.api_key.as_deref() {
            Some(key) if !key.is_empty() => builder.header("api-key", key),
            _ => builder,
        }
    }

    fn normalize_content(&self, value: &serde_json::Value) -> Option<TeaserContent> {
        match value {
            serde_json::Value::String(text) => TeaserContent::from_model_response(text),
            other => serde_json::from_value::<TeaserContent>(other.clone())
                .ok()
                .map(TeaserContent::normalized)
                .filter(TeaserContent::is_complete),
        }
    }

    async fn download_media(
        &self,
        request: &GenerationRequest,
        job: &JobHandle,
        generation: &Generation,
    ) -> Result<PollOutcome<GenerationResult>, StageError> {
        let endpoint = self.endpoint()?;
        let url = generation
            .url
            .clone()
            .unwrap_or_else(|| format!("{endpoint}/{}/content", job.id));

        debug!(backend = %self.id, %url, "downloading generated media");
        let response = self
            .authorized(self.client.get(&url).timeout(REQUEST_TIMEOUT))
            .send()
            .await
            .map_err(|e| StageError::TransientRemote(format!("media download: {e}")))?;

        if !response.status().is_success() {
            // The job reports complete before the asset is served; keep
            // polling so the download is retried under the same budget.
            warn!(backend = %self.id, status = %response.status(), "media not ready for download");
            return Ok(PollOutcome::Failed {
                reason: format!("download returned HTTP {}", response.status()),
                retriable: true,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::TransientRemote(format!("media download: {e}")))?;
        if bytes.is_empty() {
            return Ok(PollOutcome::Failed {
                reason: "downloaded media was empty".to_string(),
                retriable: true,
            });
        }

        write_atomic(&request.output_path, &bytes).await?;
        info!(backend = %self.id, path = %request.output_path.display(), bytes = bytes.len(), "media downloaded");
        Ok(PollOutcome::Ready(GenerationResult::Media {
            path: request.output_path.display().to_string(),
            duration_seconds: generation
                .duration_seconds
                .or(Some(f64::from(request.duration_seconds))),
        }))
    }

    fn completed(
        &self,
        body: &JobResponse,
    ) -> Option<Result<PollOutcome<GenerationResult>, StageError>> {
        if self.capability != Capability::Content {
            return None;
        }
        let value = body.content.as_ref()?;
        Some(match self.normalize_content(value) {
            Some(content) => Ok(PollOutcome::Ready(GenerationResult::Content(content))),
            None => Ok(PollOutcome::Failed {
                reason: "backend returned unparseable teaser content".to_string(),
                retriable: false,
            }),
        })
    }
}

#[async_trait]
impl Backend for RemoteJobBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn tier(&self) -> BackendTier {
        self.tier
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn is_available(&self) -> bool {
        self.settings.is_configured()
    }

    async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<Submission<GenerationResult>, StageError> {
        let endpoint = self.endpoint()?;
        let payload = JobPayload {
            model: self.settings.model.as_deref(),
            prompt: &request.prompt,
            duration_seconds: request.duration_seconds,
            format: &request.output_format,
            language: &request.language,
            aspect_ratio: request.aspect_ratio.as_deref(),
            voice: request.voice.as_deref(),
        };

        let response = self
            .authorized(self.client.post(endpoint).timeout(REQUEST_TIMEOUT))
            .json(&payload)
            .send()
            .await
            .map_err(|e| StageError::RemoteGenerationFailed {
                backend: self.id.clone(),
                reason: format!("submit failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::RemoteGenerationFailed {
                backend: self.id.clone(),
                reason: format!("submit returned HTTP {status}: {body}"),
            });
        }

        let body: JobResponse =
            response
                .json()
                .await
                .map_err(|e| StageError::RemoteGenerationFailed {
                    backend: self.id.clone(),
                    reason: format!("malformed submit response: {e}"),
                })?;

        // Some content deployments answer synchronously.
        if let Some(result) = self.completed(&body) {
            return result.and_then(|outcome| match outcome {
                PollOutcome::Ready(r) => Ok(Submission::Ready(r)),
                PollOutcome::Failed { reason, .. } => Err(StageError::RemoteGenerationFailed {
                    backend: self.id.clone(),
                    reason,
                }),
                PollOutcome::Pending => Err(StageError::RemoteGenerationFailed {
                    backend: self.id.clone(),
                    reason: "inconsistent submit response".to_string(),
                }),
            });
        }

        match body.id {
            Some(id) => {
                info!(backend = %self.id, job = %id, status = ?body.status, "job submitted");
                Ok(Submission::Job(JobHandle::new(id)))
            }
            None => Err(StageError::RemoteGenerationFailed {
                backend: self.id.clone(),
                reason: "submit response carried no job id".to_string(),
            }),
        }
    }

    async fn poll(
        &self,
        request: &GenerationRequest,
        job: &JobHandle,
    ) -> Result<PollOutcome<GenerationResult>, StageError> {
        let endpoint = self.endpoint()?;
        let url = format!("{endpoint}/{}", job.id);

        let response = self
            .authorized(self.client.get(&url).timeout(REQUEST_TIMEOUT))
            .send()
            .await
            .map_err(|e| StageError::TransientRemote(format!("status poll: {e}")))?;

        if !response.status().is_success() {
            return Err(StageError::TransientRemote(format!(
                "status poll returned HTTP {}",
                response.status()
            )));
        }

        let body: JobResponse = response
            .json()
            .await
            .map_err(|e| StageError::TransientRemote(format!("malformed status response: {e}")))?;

        match body.status.as_deref() {
            Some("completed" | "succeeded") => {
                if let Some(result) = self.completed(&body) {
                    return result;
                }
                match body.generations.first() {
                    Some(generation) => self.download_media(request, job, generation).await,
                    None => Ok(PollOutcome::Failed {
                        reason: "job completed with no generations".to_string(),
                        retriable: false,
                    }),
                }
            }
            Some("failed") => Ok(PollOutcome::Failed {
                reason: body
                    .error
                    .unwrap_or_else(|| "job failed without a reason".to_string()),
                retriable: false,
            }),
            Some("pending" | "queued" | "running" | "preprocessing" | "processing") | None => {
                Ok(PollOutcome::Pending)
            }
            Some(other) => {
                // Unknown statuses are treated as still-running rather
                // than failures, matching the provider's own guidance.
                debug!(backend = %self.id, status = other, "unknown job status");
                Ok(PollOutcome::Pending)
            }
        }
    }
}
