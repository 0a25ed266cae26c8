//! Application settings.
//!
//! Settings are loaded once from the environment (with `.env` support)
//! and handed to the core as plain values; nothing below this layer
//! reads environment variables.

use crate::backend::{BackendTier, Capability};
use std::env;
use std::path::PathBuf;

/// Configuration for one backend tier of one capability.
#[derive(Debug, Clone, Default)]
pub struct TierSettings {
    /// Whether the tier is enabled at all.
    pub enabled: bool,
    /// Endpoint URL for the tier's job API.
    pub endpoint: Option<String>,
    /// API key, when the tier requires one.
    pub api_key: Option<String>,
    /// Model or deployment name to request.
    pub model: Option<String>,
}

impl TierSettings {
    /// Whether the tier is enabled and carries the credentials it needs.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.enabled && self.endpoint.is_some() && self.api_key.is_some()
    }
}

/// Tier configuration for one capability, in descending priority order.
#[derive(Debug, Clone, Default)]
pub struct BackendSettings {
    /// Dedicated generation service (highest priority).
    pub specialized: TierSettings,
    /// Managed cloud AI deployment.
    pub managed_cloud: TierSettings,
    /// Direct provider API.
    pub direct_api: TierSettings,
}

impl BackendSettings {
    /// The settings for a remote tier. The placeholder tier has no
    /// configuration and returns `None`.
    #[must_use]
    pub fn tier(&self, tier: BackendTier) -> Option<&TierSettings> {
        match tier {
            BackendTier::Specialized => Some(&self.specialized),
            BackendTier::ManagedCloud => Some(&self.managed_cloud),
            BackendTier::DirectApi => Some(&self.direct_api),
            BackendTier::Placeholder => None,
        }
    }
}

/// Retry tuning for asynchronous remote operations.
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    /// First delay between polls, in seconds.
    pub initial_delay_secs: f64,
    /// Multiplier applied to the delay after each poll.
    pub backoff_factor: f64,
    /// Maximum number of poll attempts.
    pub max_attempts: u32,
    /// Wall-clock ceiling for one remote operation, in seconds.
    pub max_total_secs: u64,
    /// Whether to add bounded jitter on top of each delay.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 2.0,
            backoff_factor: 2.0,
            max_attempts: 30,
            max_total_secs: 300,
            jitter: false,
        }
    }
}

/// Application settings consumed by the orchestrator and its runners.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory for project artifacts.
    pub output_dir: PathBuf,
    /// File format for generated audio.
    pub audio_format: String,
    /// File format for generated and composed video.
    pub video_format: String,
    /// Target teaser duration in seconds.
    pub max_clip_duration: u32,
    /// Language code for narration (e.g. "en-US").
    pub language: String,
    /// Optional voice name override for synthesis.
    pub voice: Option<String>,
    /// Aspect ratio requested from video backends.
    pub aspect_ratio: String,
    /// Tier configuration for content extraction.
    pub content: BackendSettings,
    /// Tier configuration for audio synthesis.
    pub audio: BackendSettings,
    /// Tier configuration for video generation.
    pub video: BackendSettings,
    /// Retry tuning for remote generation.
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            audio_format: "mp3".to_string(),
            video_format: "mp4".to_string(),
            max_clip_duration: 15,
            language: "en-US".to_string(),
            voice: None,
            aspect_ratio: "9:16".to_string(),
            content: BackendSettings::default(),
            audio: BackendSettings::default(),
            video: BackendSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the environment, reading a `.env` file first
    /// when one is present.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let cloud_endpoint = env_opt("TEASERFLOW_CLOUD_ENDPOINT");
        let cloud_key = env_opt("TEASERFLOW_CLOUD_API_KEY");
        let provider_endpoint = env_opt("TEASERFLOW_PROVIDER_ENDPOINT");
        let provider_key = env_opt("TEASERFLOW_PROVIDER_API_KEY");
        let service_key = env_opt("TEASERFLOW_SERVICE_API_KEY");

        let backends = |capability: Capability| BackendSettings {
            specialized: {
                let endpoint = env_opt(&format!(
                    "TEASERFLOW_{}_SERVICE_URL",
                    capability.name().to_uppercase()
                ));
                TierSettings {
                    enabled: endpoint.is_some(),
                    endpoint,
                    // A dedicated service may run unauthenticated on a
                    // private network.
                    api_key: service_key.clone().or_else(|| Some(String::new())),
                    model: None,
                }
            },
            managed_cloud: TierSettings {
                enabled: cloud_endpoint.is_some(),
                endpoint: cloud_endpoint.clone(),
                api_key: cloud_key.clone(),
                model: env_opt(&format!(
                    "TEASERFLOW_CLOUD_{}_MODEL",
                    capability.name().to_uppercase()
                )),
            },
            direct_api: TierSettings {
                enabled: provider_key.is_some(),
                endpoint: provider_endpoint.clone(),
                api_key: provider_key.clone(),
                model: env_opt(&format!(
                    "TEASERFLOW_PROVIDER_{}_MODEL",
                    capability.name().to_uppercase()
                )),
            },
        };

        Self {
            output_dir: env_opt("TEASERFLOW_OUTPUT_DIR")
                .map_or(defaults.output_dir, PathBuf::from),
            audio_format: env_or("TEASERFLOW_AUDIO_FORMAT", &defaults.audio_format),
            video_format: env_or("TEASERFLOW_VIDEO_FORMAT", &defaults.video_format),
            max_clip_duration: env_parse(
                "TEASERFLOW_MAX_CLIP_DURATION",
                defaults.max_clip_duration,
            ),
            language: env_or("TEASERFLOW_LANGUAGE", &defaults.language),
            voice: env_opt("TEASERFLOW_VOICE"),
            aspect_ratio: env_or("TEASERFLOW_ASPECT_RATIO", &defaults.aspect_ratio),
            content: backends(Capability::Content),
            audio: backends(Capability::Audio),
            video: backends(Capability::Video),
            retry: RetrySettings {
                initial_delay_secs: env_parse(
                    "TEASERFLOW_RETRY_INITIAL_DELAY_SECS",
                    defaults.retry.initial_delay_secs,
                ),
                backoff_factor: env_parse(
                    "TEASERFLOW_RETRY_BACKOFF_FACTOR",
                    defaults.retry.backoff_factor,
                ),
                max_attempts: env_parse(
                    "TEASERFLOW_RETRY_MAX_ATTEMPTS",
                    defaults.retry.max_attempts,
                ),
                max_total_secs: env_parse(
                    "TEASERFLOW_RETRY_MAX_TOTAL_SECS",
                    defaults.retry.max_total_secs,
                ),
                jitter: env_parse("TEASERFLOW_RETRY_JITTER", defaults.retry.jitter),
            },
        }
    }

    /// Settings with every remote tier disabled, for tests and offline
    /// runs; all stages resolve to the placeholder tier.
    #[must_use]
    pub fn placeholder_only(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// The directory a project's artifacts live under.
    #[must_use]
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.output_dir.join(project_id)
    }

    /// The tier configuration for a capability.
    #[must_use]
    pub fn backends(&self, capability: Capability) -> &BackendSettings {
        match capability {
            Capability::Content => &self.content,
            Capability::Audio => &self.audio,
            Capability::Video => &self.video,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
