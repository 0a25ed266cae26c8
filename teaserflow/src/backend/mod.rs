//! Generation backends.
//!
//! Each pipeline capability (content, audio, video) can be serviced by
//! several backend tiers configured in a fixed priority order; the
//! resolver picks the highest available tier and the deterministic
//! placeholder guarantees resolution never fails.

mod availability;
mod placeholder;
mod remote;
mod resolver;

pub use availability::AvailabilityCache;
pub use placeholder::PlaceholderBackend;
pub use remote::RemoteJobBackend;
pub use resolver::BackendResolver;

use crate::errors::StageError;
use crate::model::TeaserContent;
use crate::retry::{JobHandle, PollOutcome, Submission};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What a backend can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Teaser content extraction.
    Content,
    /// Narration audio synthesis.
    Audio,
    /// Teaser video generation.
    Video,
}

impl Capability {
    /// All capabilities.
    pub const ALL: [Self; 3] = [Self::Content, Self::Audio, Self::Video];

    /// The capability name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One class of backend provider. Resolution walks tiers in declaration
/// order; the placeholder is always last and always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendTier {
    /// Dedicated generation service.
    Specialized,
    /// Managed cloud AI deployment.
    ManagedCloud,
    /// Direct provider API.
    DirectApi,
    /// Local deterministic placeholder.
    Placeholder,
}

impl BackendTier {
    /// Tiers in descending priority order. This ordering is fixed
    /// policy, not negotiated at runtime.
    pub const ORDER: [Self; 4] = [
        Self::Specialized,
        Self::ManagedCloud,
        Self::DirectApi,
        Self::Placeholder,
    ];

    /// The tier name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Specialized => "specialized",
            Self::ManagedCloud => "managed_cloud",
            Self::DirectApi => "direct_api",
            Self::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for BackendTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A generation request handed to a backend.
///
/// The prompt is fully built by the stage runner; backends only carry
/// it to their protocol. Media backends write their output to
/// `output_path` (atomically, never leaving a partial file visible).
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The capability being exercised.
    pub capability: Capability,
    /// Project the generation belongs to.
    pub project_id: String,
    /// Episode title.
    pub title: String,
    /// The generation prompt.
    pub prompt: String,
    /// Truncated source text for backends that build their own context.
    pub source_excerpt: String,
    /// Target duration in seconds.
    pub duration_seconds: u32,
    /// Narration language code.
    pub language: String,
    /// Requested media container format.
    pub output_format: String,
    /// Where media output must land. Unused for content generation.
    pub output_path: PathBuf,
    /// Voice name override for audio synthesis.
    pub voice: Option<String>,
    /// Aspect ratio for video generation.
    pub aspect_ratio: Option<String>,
}

/// The normalized result of a generation.
#[derive(Debug, Clone)]
pub enum GenerationResult {
    /// Structured teaser content.
    Content(TeaserContent),
    /// A media file written to disk.
    Media {
        /// Path of the written file.
        path: String,
        /// Duration in seconds, when known.
        duration_seconds: Option<f64>,
    },
}

/// A generation backend servicing one capability at one tier.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable identifier, recorded on produced artifacts.
    fn id(&self) -> &str;

    /// The tier this backend belongs to.
    fn tier(&self) -> BackendTier;

    /// The capability this backend services.
    fn capability(&self) -> Capability;

    /// Availability predicate (credentials present, endpoint configured).
    /// Must be cheap and idempotent; results are cached process-wide.
    fn is_available(&self) -> bool;

    /// Starts a generation, returning either an immediate result or a
    /// job handle to poll.
    async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<Submission<GenerationResult>, StageError>;

    /// Checks on a previously submitted job and, when it is complete,
    /// retrieves and normalizes the result.
    async fn poll(
        &self,
        request: &GenerationRequest,
        job: &JobHandle,
    ) -> Result<PollOutcome<GenerationResult>, StageError>;
}
