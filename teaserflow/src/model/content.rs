//! Structured teaser content produced by the content stage.

use serde::{Deserialize, Serialize};

/// Shortest teaser the pipeline will produce, in seconds.
pub const MIN_TEASER_SECONDS: u32 = 5;
/// Longest teaser the pipeline will produce, in seconds.
pub const MAX_TEASER_SECONDS: u32 = 120;

/// The content stage's artifact payload: everything downstream stages
/// need to synthesize narration and visuals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeaserContent {
    /// Attention-grabbing headline for the teaser.
    pub headline: String,
    /// Narration text spoken over the teaser.
    pub narration: String,
    /// The most interesting moments extracted from the episode.
    pub key_points: Vec<String>,
    /// Description of what the video should show.
    pub visual_description: String,
    /// Target teaser length in seconds (also the narration timing cue).
    pub duration_seconds: u32,
}

impl TeaserContent {
    /// Clamps the duration into the supported window and drops empty
    /// key points, returning the normalized payload.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.duration_seconds = self
            .duration_seconds
            .clamp(MIN_TEASER_SECONDS, MAX_TEASER_SECONDS);
        self.key_points.retain(|p| !p.trim().is_empty());
        self
    }

    /// Whether the payload satisfies the content stage's contract:
    /// non-empty headline and narration, at least one key point.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.headline.trim().is_empty()
            && !self.narration.trim().is_empty()
            && self.key_points.iter().any(|p| !p.trim().is_empty())
    }

    /// Deterministic default content used when every generation tier has
    /// been exhausted.
    #[must_use]
    pub fn fallback(title: &str, duration_seconds: u32) -> Self {
        Self {
            headline: format!("Inside: {title}"),
            narration: format!(
                "This episode of {title} is packed with moments you won't want to miss. \
                 Listen to the full story."
            ),
            key_points: vec![
                "A moment worth hearing twice".to_string(),
                "The question everyone is asking".to_string(),
                "Where the conversation lands".to_string(),
            ],
            visual_description: "Moody abstract visuals with drifting light and floating text \
                                 fragments, no human faces"
                .to_string(),
            duration_seconds,
        }
        .normalized()
    }

    /// Extracts teaser content from a model's free-form text reply.
    ///
    /// Model replies often wrap the JSON object in prose; only the
    /// outermost brace-delimited span is parsed.
    #[must_use]
    pub fn from_model_response(text: &str) -> Option<Self> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end < start {
            return None;
        }
        let parsed: Self = serde_json::from_str(&text[start..=end]).ok()?;
        let normalized = parsed.normalized();
        normalized.is_complete().then_some(normalized)
    }
}
