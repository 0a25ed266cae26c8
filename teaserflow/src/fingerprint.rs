//! Input fingerprints for cache-staleness detection.
//!
//! A fingerprint is a SHA-256 digest over a stage's inputs. A cached
//! artifact is valid only while its recorded fingerprint matches the
//! fingerprint recomputed from the current inputs; a mismatch marks the
//! artifact stale even if its file still exists.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the truncated digest used for stable project identifiers.
const PROJECT_ID_LEN: usize = 12;

/// A hex-encoded SHA-256 digest over a stage's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digests an ordered sequence of input parts.
    ///
    /// Parts are length-prefixed before hashing so that shifting a
    /// boundary between adjacent parts cannot produce a collision.
    #[must_use]
    pub fn of_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            let bytes = part.as_ref();
            hasher.update(u64::try_from(bytes.len()).unwrap_or(u64::MAX).to_be_bytes());
            hasher.update(bytes);
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the stable project identifier for a script.
///
/// The id is a truncated digest of title and script text, so resubmitting
/// the same script resumes the same project directory.
#[must_use]
pub fn stable_project_id(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(content.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..PROJECT_ID_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::of_parts(["content", "Ep1", "script text"]);
        let b = Fingerprint::of_parts(["content", "Ep1", "script text"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_any_part() {
        let base = Fingerprint::of_parts(["content", "Ep1", "script text"]);
        let other = Fingerprint::of_parts(["content", "Ep1", "script text edited"]);
        assert_ne!(base, other);
    }

    #[test]
    fn test_fingerprint_resists_boundary_shifts() {
        let a = Fingerprint::of_parts(["ab", "c"]);
        let b = Fingerprint::of_parts(["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_stable_project_id_shape() {
        let id = stable_project_id("Ep1", "five hundred words of script");
        assert_eq!(id.len(), PROJECT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, stable_project_id("Ep1", "five hundred words of script"));
    }

    #[test]
    fn test_stable_project_id_varies_with_title() {
        assert_ne!(
            stable_project_id("Ep1", "same script"),
            stable_project_id("Ep2", "same script"),
        );
    }
}
