//! Atomic file-write helpers.
//!
//! Generated media and store records become visible only through an
//! atomic rename of a `.part` staging file, so no reader ever observes a
//! partially written artifact.

use crate::errors::StoreError;
use std::path::Path;

/// Extension appended to staging files.
const PART_SUFFIX: &str = ".part";

/// Writes `bytes` to `path` via a `.part` staging file and an atomic
/// rename, creating parent directories as needed.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent.display().to_string(), e))?;
    }
    let part = part_path(path);
    tokio::fs::write(&part, bytes)
        .await
        .map_err(|e| StoreError::io(part.display().to_string(), e))?;
    tokio::fs::rename(&part, path)
        .await
        .map_err(|e| StoreError::io(path.display().to_string(), e))
}

fn part_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    std::path::PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/media/audio.mp3");

        write_atomic(&target, b"bytes").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"bytes");
        assert!(!part_path(&target).exists());
    }

    #[tokio::test]
    async fn test_write_atomic_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("record.json");

        write_atomic(&target, b"one").await.unwrap();
        write_atomic(&target, b"two").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"two");
    }
}
