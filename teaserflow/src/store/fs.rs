//! Filesystem-backed artifact store.

use super::ArtifactStore;
use crate::errors::StoreError;
use crate::fsutil::write_atomic;
use crate::model::{Artifact, Stage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists one JSON record per (project, stage) under a root directory:
/// `<root>/<project_id>/<stage>.json`. Media files referenced by records
/// live beside them and are written by the backends; a record whose
/// media file has gone missing is reported as absent so the stage is
/// treated as missing rather than stale.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding a project's records and media.
    #[must_use]
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    fn record_path(&self, project_id: &str, stage: Stage) -> PathBuf {
        self.project_dir(project_id).join(format!("{stage}.json"))
    }

    fn media_backed(artifact: &Artifact) -> bool {
        match artifact.media_path() {
            Some(path) => Path::new(path)
                .metadata()
                .map(|m| m.len() > 0)
                .unwrap_or(false),
            None => true,
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn get(&self, project_id: &str, stage: Stage) -> Result<Option<Artifact>, StoreError> {
        let path = self.record_path(project_id, stage);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path.display().to_string(), e)),
        };
        let artifact: Artifact = serde_json::from_slice(&bytes)?;
        if !Self::media_backed(&artifact) {
            debug!(project = project_id, %stage, "record found but media file missing");
            return Ok(None);
        }
        Ok(Some(artifact))
    }

    async fn put(
        &self,
        project_id: &str,
        stage: Stage,
        artifact: &Artifact,
    ) -> Result<(), StoreError> {
        let path = self.record_path(project_id, stage);
        let bytes = serde_json::to_vec_pretty(artifact)?;
        write_atomic(&path, &bytes).await?;
        debug!(project = project_id, %stage, record = %path.display(), "artifact recorded");
        Ok(())
    }
}
