//! Artifact stores.
//!
//! A store maps (project, stage) to the cached artifact record for that
//! stage. Records become visible only after the underlying write fully
//! succeeds; a stage is never observable in a half-written state.

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;

use crate::errors::StoreError;
use crate::fingerprint::Fingerprint;
use crate::model::{Artifact, Stage};
use async_trait::async_trait;

/// Stable storage for per-stage artifact records.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// The cached artifact for a stage, or `None` when absent or no
    /// longer backed by its media file.
    async fn get(&self, project_id: &str, stage: Stage) -> Result<Option<Artifact>, StoreError>;

    /// Records a stage artifact, overwriting any earlier record.
    /// Idempotent.
    async fn put(
        &self,
        project_id: &str,
        stage: Stage,
        artifact: &Artifact,
    ) -> Result<(), StoreError>;

    /// Whether a cached artifact is still valid for the current inputs.
    /// A mismatch marks the artifact stale even though its file exists.
    fn fingerprint_matches(&self, artifact: &Artifact, current: &Fingerprint) -> bool {
        artifact.fingerprint == *current
    }
}
