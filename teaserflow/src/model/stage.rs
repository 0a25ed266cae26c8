//! Pipeline stage identifiers and their dependency order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One phase of the teaser pipeline.
///
/// The dependency order is fixed: content runs first, audio and video
/// depend only on content and may run concurrently, compose requires both
/// media stages. The order is encoded here rather than implied by call
/// sites so the orchestrator can assert it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Extract teaser content (headline, key moments, narration) from the script.
    Content,
    /// Synthesize the narration audio track.
    Audio,
    /// Generate the teaser video clip.
    Video,
    /// Combine audio and video into the final teaser.
    Compose,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Self; 4] = [Self::Content, Self::Audio, Self::Video, Self::Compose];

    /// Stages that must be `Done` before this stage may run.
    #[must_use]
    pub fn dependencies(self) -> &'static [Self] {
        match self {
            Self::Content => &[],
            Self::Audio | Self::Video => &[Self::Content],
            Self::Compose => &[Self::Audio, Self::Video],
        }
    }

    /// The stage name as used in records and file names.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Compose => "compose",
        }
    }

    /// Parses a stage name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "content" => Some(Self::Content),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "compose" => Some(Self::Compose),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_order_is_acyclic() {
        // Every dependency must sort strictly before its dependent.
        for stage in Stage::ALL {
            for dep in stage.dependencies() {
                assert!(dep < &stage, "{dep} must precede {stage}");
            }
        }
    }

    #[test]
    fn test_compose_requires_both_media_stages() {
        assert_eq!(Stage::Compose.dependencies(), &[Stage::Audio, Stage::Video]);
    }

    #[test]
    fn test_media_stages_depend_only_on_content() {
        assert_eq!(Stage::Audio.dependencies(), &[Stage::Content]);
        assert_eq!(Stage::Video.dependencies(), &[Stage::Content]);
    }

    #[test]
    fn test_parse_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::parse(stage.name()), Some(stage));
        }
        assert_eq!(Stage::parse("transcode"), None);
    }

    #[test]
    fn test_serialize_as_snake_case() {
        let json = serde_json::to_string(&Stage::Compose).unwrap();
        assert_eq!(json, r#""compose""#);
    }
}
