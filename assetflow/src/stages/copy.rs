//! Copying static assets into the output tree.

use super::Transform;
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::AssetflowError;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Copies every matched regular file into the output directory.
///
/// Files are flattened to their names unless the stage sets
/// `flatten = false`, in which case they keep their path below the
/// pattern's literal prefix. When two flattened files share a name the
/// later one wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransform;

#[async_trait]
impl Transform for CopyTransform {
    fn kind(&self) -> StageKind {
        StageKind::Copy
    }

    async fn apply(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, AssetflowError> {
        let target = ctx.output_path()?;
        tokio::fs::create_dir_all(target)
            .await
            .map_err(|err| AssetflowError::fs(target, err))?;

        let mut written = BTreeSet::new();
        for input in &ctx.inputs {
            for file in &input.files {
                let dest = destination(target, &input.base, file, ctx.stage.options.flatten);
                if !written.insert(dest.clone()) {
                    warn!(
                        stage = %ctx.stage_name(),
                        path = %ctx.display(&dest),
                        source = %ctx.display(file),
                        "Copy overwrites a file written earlier in the same stage"
                    );
                }
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|err| AssetflowError::fs(parent, err))?;
                }
                tokio::fs::copy(file, &dest)
                    .await
                    .map_err(|err| AssetflowError::fs(file, err))?;
            }
        }

        Ok(written.into_iter().collect())
    }
}

fn destination(target: &Path, base: &Path, file: &Path, flatten: bool) -> PathBuf {
    let name = || file.file_name().map_or_else(|| file.to_path_buf(), PathBuf::from);
    if flatten {
        return target.join(name());
    }
    match file.strip_prefix(base) {
        Ok(relative) if !relative.as_os_str().is_empty() => target.join(relative),
        _ => target.join(name()),
    }
}
