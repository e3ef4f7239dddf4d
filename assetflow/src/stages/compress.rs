//! Gzip siblings for text assets.

use super::Transform;
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::AssetflowError;
use async_trait::async_trait;
use flate2::{Compression, GzBuilder};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `<file><suffix>` next to every matched file with a listed extension.
///
/// Files with other extensions, and files already carrying the suffix, are
/// left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressTransform;

#[async_trait]
impl Transform for CompressTransform {
    fn kind(&self) -> StageKind {
        StageKind::Compress
    }

    async fn apply(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, AssetflowError> {
        let extensions = ctx.stage.options.extensions();
        let suffix = ctx.stage.options.suffix();

        let mut written = Vec::new();
        for file in ctx.input_files() {
            if !has_extension(&file, &extensions) || file.to_string_lossy().ends_with(suffix) {
                continue;
            }
            let bytes = tokio::fs::read(&file)
                .await
                .map_err(|err| AssetflowError::fs(&file, err))?;
            let compressed = gzip(&bytes).map_err(|err| AssetflowError::fs(&file, err))?;

            let sibling = sibling_path(&file, suffix);
            tokio::fs::write(&sibling, compressed)
                .await
                .map_err(|err| AssetflowError::fs(&sibling, err))?;
            written.push(sibling);
        }
        Ok(written)
    }
}

/// Gzips bytes at maximum compression with a zero timestamp and no file name.
pub fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::with_capacity(bytes.len() / 2), Compression::best());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| extensions.iter().any(|wanted| *wanted == ext))
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
