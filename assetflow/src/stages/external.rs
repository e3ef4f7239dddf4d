//! Stages that delegate to an external program.

use super::Transform;
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::{AssetflowError, CompileError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Runs the stage's resolved tool.
///
/// Used for style and script compilation, script minification and
/// sub-builds. A non-zero exit becomes a [`CompileError`] carrying the tool's
/// own diagnostic.
#[derive(Debug, Clone, Copy)]
pub struct ExternalTransform {
    kind: StageKind,
}

impl ExternalTransform {
    /// Creates an external transform for the given kind.
    #[must_use]
    pub fn new(kind: StageKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Transform for ExternalTransform {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn apply(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, AssetflowError> {
        run_tool(ctx).await
    }
}

/// Invokes the stage's tool and returns the declared output.
pub async fn run_tool(ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, AssetflowError> {
    let invocation = ctx.invocation()?;
    let captured = ctx.tools.run(&invocation).await?;

    if !captured.success {
        return Err(CompileError::new(
            ctx.stage_name(),
            &invocation.program,
            captured.exit_code,
            captured.diagnostic(),
        )
        .into());
    }
    debug!(
        stage = %ctx.stage_name(),
        program = %invocation.program,
        stdout_bytes = captured.stdout.len(),
        "Tool finished"
    );

    if ctx.tool.is_some_and(|tool| tool.capture_stdout) {
        let output = ctx.output_path()?;
        tokio::fs::write(output, &captured.stdout)
            .await
            .map_err(|err| AssetflowError::fs(output, err))?;
    }

    Ok(ctx.output.iter().cloned().collect())
}
