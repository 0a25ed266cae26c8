//! Projects and their source scripts.

use super::{Artifact, Stage};
use crate::errors::StageError;
use crate::fingerprint::stable_project_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A podcast episode script submitted for teaser generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastScript {
    /// Episode title.
    pub title: String,
    /// Full script text.
    pub content: String,
}

impl PodcastScript {
    /// Creates a script.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A teaser generation project: one script plus the artifacts produced
/// for it so far.
///
/// The orchestrator owns the project for the duration of a run and
/// records artifacts as stages complete; the per-stage records are
/// persisted incrementally through the artifact store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier.
    pub id: String,
    /// The source script.
    pub script: PodcastScript,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
    /// Artifacts recorded per stage.
    pub artifacts: BTreeMap<Stage, Artifact>,
}

impl Project {
    /// Creates a project with a stable, content-derived identifier so a
    /// resubmitted script resumes its earlier artifacts.
    #[must_use]
    pub fn resumable(script: PodcastScript) -> Self {
        let id = stable_project_id(&script.title, &script.content);
        Self::with_id(id, script)
    }

    /// Creates a project with a random identifier for one-shot runs.
    #[must_use]
    pub fn ephemeral(script: PodcastScript) -> Self {
        Self::with_id(uuid::Uuid::new_v4().simple().to_string(), script)
    }

    fn with_id(id: String, script: PodcastScript) -> Self {
        Self {
            id,
            script,
            created_at: Utc::now(),
            artifacts: BTreeMap::new(),
        }
    }

    /// The artifact recorded for a stage, if any.
    #[must_use]
    pub fn artifact(&self, stage: Stage) -> Option<&Artifact> {
        self.artifacts.get(&stage)
    }

    /// Records a stage artifact, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Rejects an artifact whose dependencies are not yet recorded; the
    /// stage map never holds a compose artifact without both media
    /// artifacts present.
    pub fn record(&mut self, artifact: Artifact) -> Result<(), StageError> {
        for dep in artifact.stage.dependencies() {
            if !self.artifacts.contains_key(dep) {
                return Err(StageError::InvalidInput(format!(
                    "cannot record '{}' artifact before '{dep}' exists",
                    artifact.stage
                )));
            }
        }
        self.artifacts.insert(artifact.stage, artifact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use crate::model::ArtifactPayload;

    fn artifact(stage: Stage) -> Artifact {
        Artifact::new(
            stage,
            "test-backend",
            Fingerprint::of_parts([stage.name()]),
            ArtifactPayload::Media {
                path: format!("/tmp/{stage}.bin"),
                duration_seconds: None,
            },
        )
    }

    #[test]
    fn test_resumable_projects_share_an_id() {
        let a = Project::resumable(PodcastScript::new("Ep1", "script"));
        let b = Project::resumable(PodcastScript::new("Ep1", "script"));
        assert_eq!(a.id, b.id);

        let c = Project::resumable(PodcastScript::new("Ep1", "different script"));
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_ephemeral_projects_get_unique_ids() {
        let script = PodcastScript::new("Ep1", "script");
        let a = Project::ephemeral(script.clone());
        let b = Project::ephemeral(script);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_record_rejects_compose_without_media() {
        let mut project = Project::resumable(PodcastScript::new("Ep1", "script"));
        let err = project.record(artifact(Stage::Compose)).unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));

        project.record(artifact(Stage::Content)).unwrap();
        project.record(artifact(Stage::Audio)).unwrap();
        assert!(project.record(artifact(Stage::Compose)).is_err());

        project.record(artifact(Stage::Video)).unwrap();
        project.record(artifact(Stage::Compose)).unwrap();
        assert!(project.artifact(Stage::Compose).is_some());
    }

    #[test]
    fn test_record_overwrites_existing_stage() {
        let mut project = Project::resumable(PodcastScript::new("Ep1", "script"));
        project.record(artifact(Stage::Content)).unwrap();
        let replacement = artifact(Stage::Content);
        let replacement_fp = replacement.fingerprint.clone();
        project.record(replacement).unwrap();
        assert_eq!(project.artifacts.len(), 1);
        assert_eq!(
            project.artifact(Stage::Content).unwrap().fingerprint,
            replacement_fp
        );
    }
}
