//! Stage artifact type for recording produced files.

use serde::{Deserialize, Serialize};

/// What kind of filesystem entry an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A regular file.
    File,
    /// A directory produced as a whole (sub-build output).
    Directory,
}

/// A file or directory produced by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageArtifact {
    /// Path relative to the project root, `/`-separated.
    pub path: String,

    /// The kind of entry.
    pub kind: ArtifactKind,

    /// Size in bytes (zero for directories).
    pub bytes: u64,

    /// Hex SHA-256 of the content (files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl StageArtifact {
    /// Creates a file artifact.
    #[must_use]
    pub fn file(path: impl Into<String>, bytes: u64, sha256: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::File,
            bytes,
            sha256: Some(sha256.into()),
        }
    }

    /// Creates a directory artifact.
    #[must_use]
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Directory,
            bytes: 0,
            sha256: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_artifact() {
        let artifact = StageArtifact::file("../webapp/css/app.min.css", 42, "ab12");

        assert_eq!(artifact.kind, ArtifactKind::File);
        assert_eq!(artifact.bytes, 42);
        assert_eq!(artifact.sha256.as_deref(), Some("ab12"));
    }

    #[test]
    fn test_directory_artifact_serialization() {
        let artifact = StageArtifact::directory("vendors/bootstrap/dist");
        let json = serde_json::to_value(&artifact).unwrap();

        assert_eq!(json["kind"], "directory");
        assert!(json.get("sha256").is_none());
    }
}
