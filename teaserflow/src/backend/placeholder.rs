//! Deterministic placeholder backends.
//!
//! The placeholder tier is the guaranteed-available floor of the
//! fallback chain: it never touches the network and produces the same
//! output for the same request, so a run can always complete offline.

use super::{Backend, BackendTier, Capability, GenerationRequest, GenerationResult};
use crate::errors::StageError;
use crate::fsutil::write_atomic;
use crate::model::TeaserContent;
use crate::retry::{JobHandle, PollOutcome, Submission};
use async_trait::async_trait;
use tracing::debug;

/// Sample rate of placeholder audio, in Hz.
const WAV_SAMPLE_RATE: u32 = 8_000;

/// Local generator servicing one capability without any remote calls.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderBackend {
    capability: Capability,
}

impl PlaceholderBackend {
    /// Creates the placeholder for a capability.
    #[must_use]
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }

    fn generate_content(request: &GenerationRequest) -> TeaserContent {
        let mut content =
            TeaserContent::fallback(&request.title, request.duration_seconds);
        let sentences: Vec<String> = request
            .source_excerpt
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| s.len() > 20)
            .take(3)
            .map(String::from)
            .collect();
        if !sentences.is_empty() {
            content.narration = format!("{}.", sentences[0]);
            content.key_points = sentences;
        }
        content.normalized()
    }

    async fn generate_audio(
        request: &GenerationRequest,
    ) -> Result<GenerationResult, StageError> {
        let seconds = request.duration_seconds;
        let bytes = silent_wav(seconds);
        write_atomic(&request.output_path, &bytes).await?;
        Ok(GenerationResult::Media {
            path: request.output_path.display().to_string(),
            duration_seconds: Some(f64::from(seconds)),
        })
    }

    async fn generate_video(
        request: &GenerationRequest,
    ) -> Result<GenerationResult, StageError> {
        let bytes = stub_mp4();
        write_atomic(&request.output_path, &bytes).await?;
        Ok(GenerationResult::Media {
            path: request.output_path.display().to_string(),
            duration_seconds: Some(f64::from(request.duration_seconds)),
        })
    }
}

#[async_trait]
impl Backend for PlaceholderBackend {
    fn id(&self) -> &str {
        match self.capability {
            Capability::Content => "placeholder-content",
            Capability::Audio => "placeholder-audio",
            Capability::Video => "placeholder-video",
        }
    }

    fn tier(&self) -> BackendTier {
        BackendTier::Placeholder
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<Submission<GenerationResult>, StageError> {
        debug!(capability = %self.capability, project = %request.project_id, "placeholder generation");
        let result = match self.capability {
            Capability::Content => {
                GenerationResult::Content(Self::generate_content(request))
            }
            Capability::Audio => Self::generate_audio(request).await?,
            Capability::Video => Self::generate_video(request).await?,
        };
        Ok(Submission::Ready(result))
    }

    async fn poll(
        &self,
        _request: &GenerationRequest,
        _job: &JobHandle,
    ) -> Result<PollOutcome<GenerationResult>, StageError> {
        // Placeholder submissions always complete synchronously.
        Ok(PollOutcome::Pending)
    }
}

/// A valid mono 16-bit PCM WAV file of silence.
fn silent_wav(seconds: u32) -> Vec<u8> {
    let data_len = WAV_SAMPLE_RATE * 2 * seconds;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&WAV_SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(WAV_SAMPLE_RATE * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    bytes
}

/// A minimal MP4 container stub (ftyp box only).
fn stub_mp4() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(20);
    bytes.extend_from_slice(&20u32.to_be_bytes());
    bytes.extend_from_slice(b"ftyp");
    bytes.extend_from_slice(b"isom");
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(b"isom");
    bytes
}
