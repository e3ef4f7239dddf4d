//! Content listing of the output directory.
//!
//! Two builds are equivalent when their manifests are equal, which is how
//! rebuilds and build/dev runs are compared from the command line.

use crate::errors::AssetflowError;
use crate::pipeline::ProjectLayout;
use crate::utils::{expand, file_digest, to_slash};
use crate::utils::paths::relative_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::ErrorKind;

/// Size and digest of one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Size in bytes.
    pub bytes: u64,
    /// Hex SHA-256 of the content.
    pub sha256: String,
}

/// Every regular file under the output directory, keyed by relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Output directory relative to the project root.
    pub output_dir: String,
    /// Entries sorted by `/`-separated path below the output directory.
    pub files: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Hashes every file under the layout's output directory.
    ///
    /// A missing output directory yields an empty manifest.
    pub async fn collect(layout: &ProjectLayout) -> Result<Self, AssetflowError> {
        let output = layout.output_path();
        let mut manifest = Self {
            output_dir: to_slash(layout.output_dir()),
            files: BTreeMap::new(),
        };
        match tokio::fs::metadata(&output).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Ok(manifest),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(manifest),
            Err(err) => return Err(AssetflowError::fs(&output, err)),
        }

        let pattern = format!("{}/**/*", manifest.output_dir);
        for path in expand(layout.root(), &pattern)? {
            let (bytes, sha256) = file_digest(&path)
                .await
                .map_err(|err| AssetflowError::fs(&path, err))?;
            manifest
                .files
                .insert(to_slash(&relative_to(&path, &output)), ManifestEntry { bytes, sha256 });
        }
        Ok(manifest)
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the output directory holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths present in exactly one of the two manifests or differing in content.
    #[must_use]
    pub fn diff<'a>(&'a self, other: &'a Self) -> Vec<&'a str> {
        let mut changed: Vec<&str> = self
            .files
            .iter()
            .filter(|(path, entry)| other.files.get(*path) != Some(entry))
            .map(|(path, _)| path.as_str())
            .collect();
        changed.extend(
            other
                .files
                .keys()
                .filter(|path| !self.files.contains_key(*path))
                .map(String::as_str),
        );
        changed.sort_unstable();
        changed
    }

    /// `sha256  path` lines, like `sha256sum` prints them.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (path, entry) in &self.files {
            let _ = writeln!(out, "{}  {path}", entry.sha256);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ProjectFixture;
    use crate::utils::sha256_hex;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_collect_sorted_entries() {
        let fixture = ProjectFixture::new();
        fixture.write("../webapp/js/app.js", "js");
        fixture.write("../webapp/css/app.css", "css");
        fixture.write("../webapp/css/app.css.gz", "gz");
        fixture.write("build/ignored.css", "scratch");

        let manifest = Manifest::collect(&fixture.layout()).await.unwrap();

        assert_eq!(manifest.output_dir, "../webapp");
        assert_eq!(
            manifest.files.keys().collect::<Vec<_>>(),
            vec!["css/app.css", "css/app.css.gz", "js/app.js"]
        );
        assert_eq!(manifest.files["js/app.js"].bytes, 2);
        assert_eq!(manifest.files["js/app.js"].sha256, sha256_hex(b"js"));
        assert_eq!(
            manifest.render().lines().last(),
            Some(format!("{}  js/app.js", sha256_hex(b"js")).as_str())
        );
    }

    #[tokio::test]
    async fn test_missing_output_directory_is_empty() {
        let fixture = ProjectFixture::new();
        let manifest = Manifest::collect(&fixture.layout()).await.unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.render(), "");
    }

    #[tokio::test]
    async fn test_diff_reports_changed_added_and_removed() {
        let fixture = ProjectFixture::new();
        fixture.write("../webapp/a.css", "a");
        fixture.write("../webapp/b.css", "b");
        let before = Manifest::collect(&fixture.layout()).await.unwrap();

        fixture.write("../webapp/a.css", "changed");
        fixture.remove("../webapp/b.css");
        fixture.write("../webapp/c.css", "c");
        let after = Manifest::collect(&fixture.layout()).await.unwrap();

        assert_eq!(before.diff(&after), vec!["a.css", "b.css", "c.css"]);
        assert!(after.diff(&after).is_empty());
        assert_eq!(after.len(), 2);
    }
}
