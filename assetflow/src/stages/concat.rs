//! Concatenation of inputs into one file.

use super::Transform;
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::AssetflowError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Joins inputs in declared order with the stage's separator.
///
/// Matches of a single pattern are taken in lexicographic order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatTransform;

#[async_trait]
impl Transform for ConcatTransform {
    fn kind(&self) -> StageKind {
        StageKind::Concat
    }

    async fn apply(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, AssetflowError> {
        let output = ctx.output_path()?;
        let separator = ctx.stage.options.separator().as_bytes();

        let mut joined = Vec::new();
        for (index, file) in ctx.input_files().iter().enumerate() {
            if index > 0 {
                joined.extend_from_slice(separator);
            }
            let bytes = tokio::fs::read(file)
                .await
                .map_err(|err| AssetflowError::fs(file, err))?;
            joined.extend_from_slice(&bytes);
        }

        tokio::fs::write(output, &joined)
            .await
            .map_err(|err| AssetflowError::fs(output, err))?;
        Ok(vec![output.to_path_buf()])
    }
}
