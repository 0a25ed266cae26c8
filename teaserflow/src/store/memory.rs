//! In-memory artifact store for tests and embedding.

use super::ArtifactStore;
use crate::errors::StoreError;
use crate::model::{Artifact, Stage};
use async_trait::async_trait;
use dashmap::DashMap;

/// Keeps artifact records in process memory. Unlike the filesystem
/// store it does not verify media files, so records survive regardless
/// of what is on disk.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: DashMap<(String, Stage), Artifact>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn get(&self, project_id: &str, stage: Stage) -> Result<Option<Artifact>, StoreError> {
        Ok(self
            .entries
            .get(&(project_id.to_string(), stage))
            .map(|e| e.clone()))
    }

    async fn put(
        &self,
        project_id: &str,
        stage: Stage,
        artifact: &Artifact,
    ) -> Result<(), StoreError> {
        self.entries
            .insert((project_id.to_string(), stage), artifact.clone());
        Ok(())
    }
}
