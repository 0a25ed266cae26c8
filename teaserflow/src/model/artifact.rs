//! Typed stage artifacts.

use super::{Stage, TeaserContent};
use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The typed result of a completed stage.
///
/// Every artifact records the stage that produced it, the backend that
/// serviced the generation and a fingerprint of the inputs it was
/// produced from; the fingerprint is what cache-validity checks compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// The stage that produced this artifact.
    pub stage: Stage,
    /// Identifier of the backend that produced it.
    pub backend: String,
    /// Fingerprint of the inputs the artifact was produced from.
    pub fingerprint: Fingerprint,
    /// When the artifact was produced.
    pub created_at: DateTime<Utc>,
    /// The stage-specific payload.
    #[serde(flatten)]
    pub payload: ArtifactPayload,
}

/// Stage-specific artifact payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactPayload {
    /// Structured teaser content (content stage).
    Content {
        /// The extracted teaser content.
        content: TeaserContent,
    },
    /// A generated media file (audio and video stages).
    Media {
        /// Path of the media file.
        path: String,
        /// Media duration in seconds, when the backend reported one.
        duration_seconds: Option<f64>,
    },
    /// The final composed teaser (compose stage).
    Teaser {
        /// Path of the composed teaser file.
        path: String,
    },
}

impl Artifact {
    /// Creates an artifact stamped with the current time.
    #[must_use]
    pub fn new(
        stage: Stage,
        backend: impl Into<String>,
        fingerprint: Fingerprint,
        payload: ArtifactPayload,
    ) -> Self {
        Self {
            stage,
            backend: backend.into(),
            fingerprint,
            created_at: Utc::now(),
            payload,
        }
    }

    /// The teaser content, if this is a content artifact.
    #[must_use]
    pub fn content(&self) -> Option<&TeaserContent> {
        match &self.payload {
            ArtifactPayload::Content { content } => Some(content),
            _ => None,
        }
    }

    /// The referenced media file path, if any.
    #[must_use]
    pub fn media_path(&self) -> Option<&str> {
        match &self.payload {
            ArtifactPayload::Media { path, .. } | ArtifactPayload::Teaser { path } => {
                Some(path.as_str())
            }
            ArtifactPayload::Content { .. } => None,
        }
    }
}
