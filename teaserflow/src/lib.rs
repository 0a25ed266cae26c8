//! # Teaserflow
//!
//! Turns a podcast script into a short social-media video teaser through
//! a four-stage pipeline (content extraction, voice synthesis, video
//! generation, composition) against pluggable AI backends.
//!
//! The heart of the crate is the resumable [`Orchestrator`]: per-stage
//! results are cached with input fingerprints so expensive remote calls
//! are never repeated, backends are resolved through a fixed priority
//! chain that always bottoms out at a deterministic placeholder, and
//! long-running remote jobs are driven by a bounded
//! retry-with-backoff controller.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teaserflow::prelude::*;
//!
//! # async fn run() {
//! let settings = Settings::from_env();
//! let store = Arc::new(FsArtifactStore::new(settings.output_dir.clone()));
//! let orchestrator = Orchestrator::new(settings, store);
//!
//! let script = PodcastScript::new("Ep1", "full script text...");
//! let project = Project::resumable(script);
//! let report = orchestrator
//!     .run_full(project, &RunOverrides::none(), &CancelToken::new())
//!     .await;
//! assert!(report.is_success());
//! # }
//! ```
//!
//! [`Orchestrator`]: orchestrator::Orchestrator

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod fingerprint;
mod fsutil;
pub mod model;
pub mod orchestrator;
pub mod retry;
pub mod runner;
pub mod store;
pub mod telemetry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backend::{
        Backend, BackendResolver, BackendTier, Capability, GenerationRequest, GenerationResult,
        PlaceholderBackend, RemoteJobBackend,
    };
    pub use crate::cancellation::CancelToken;
    pub use crate::config::Settings;
    pub use crate::errors::{StageError, StoreError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::fingerprint::Fingerprint;
    pub use crate::model::{
        Artifact, ArtifactPayload, PodcastScript, Project, Stage, TeaserContent,
    };
    pub use crate::orchestrator::{
        Orchestrator, RunOverrides, RunReport, StageFailure, StageState,
    };
    pub use crate::retry::{RetryController, RetryPolicy};
    pub use crate::runner::{Compositor, ManifestCompositor, StageRunner};
    pub use crate::store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
}
