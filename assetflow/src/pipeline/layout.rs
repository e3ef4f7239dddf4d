//! Project directory layout and the clean step.

use crate::errors::AssetflowError;
use crate::utils::paths::{normalize, relative_to, to_slash};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a pipeline reads from and writes to.
///
/// The scratch and output directories are stored relative to the root in
/// lexical normal form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    scratch_dir: PathBuf,
    output_dir: PathBuf,
}

impl ProjectLayout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, scratch_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
            scratch_dir: normalize(scratch_dir.as_ref()),
            output_dir: normalize(output_dir.as_ref()),
        }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The scratch directory, relative to the root.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// The output directory, relative to the root.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The scratch directory, resolved.
    #[must_use]
    pub fn scratch_path(&self) -> PathBuf {
        self.resolve(&self.scratch_dir)
    }

    /// The output directory, resolved.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Resolves a root-relative path.
    #[must_use]
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        normalize(&self.root.join(relative))
    }

    /// Renders a resolved path relative to the root, `/`-separated.
    #[must_use]
    pub fn display(&self, path: &Path) -> String {
        to_slash(&relative_to(path, &self.root))
    }

    /// Deletes previous output.
    ///
    /// With no targets every entry of the output directory is removed;
    /// otherwise only the named subdirectories (or files) are. The output
    /// directory itself always exists afterwards. Returns what was removed.
    pub async fn clean(&self, targets: &[String]) -> Result<Vec<PathBuf>, AssetflowError> {
        let output = self.output_path();
        let mut removed = Vec::new();

        if targets.is_empty() {
            match tokio::fs::read_dir(&output).await {
                Ok(mut entries) => {
                    while let Some(entry) = entries
                        .next_entry()
                        .await
                        .map_err(|err| AssetflowError::fs(&output, err))?
                    {
                        let path = entry.path();
                        if remove_path(&path).await? {
                            removed.push(path);
                        }
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(AssetflowError::fs(&output, err)),
            }
        } else {
            for target in targets {
                let path = normalize(&output.join(target));
                if remove_path(&path).await? {
                    removed.push(path);
                }
            }
        }

        tokio::fs::create_dir_all(&output)
            .await
            .map_err(|err| AssetflowError::fs(&output, err))?;
        removed.sort();
        debug!(output = %output.display(), removed = removed.len(), "Cleaned output directory");
        Ok(removed)
    }

    /// Deletes the scratch directory. Returns false if it did not exist.
    pub async fn remove_scratch(&self) -> Result<bool, AssetflowError> {
        remove_path(&self.scratch_path()).await
    }
}

/// Removes a file or directory tree. Returns false if nothing was there.
async fn remove_path(path: &Path) -> Result<bool, AssetflowError> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(AssetflowError::fs(path, err)),
    };
    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    result.map_err(|err| AssetflowError::fs(path, err))?;
    Ok(true)
}
