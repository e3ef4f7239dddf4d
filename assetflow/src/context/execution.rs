//! Contexts handed to the runner and to each stage transform.

use super::RunIdentity;
use crate::core::BuildMode;
use crate::errors::{codes, AssetflowError, PipelineValidationError};
use crate::events::EventSink;
use crate::pipeline::{ProjectLayout, StageSpec};
use crate::tools::{ToolInvocation, ToolRunner, ToolSpec};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State shared by every stage of one run.
pub struct RunContext {
    identity: RunIdentity,
    pipeline: String,
    mode: BuildMode,
    event_sink: Arc<dyn EventSink>,
}

impl RunContext {
    /// Creates a new run context.
    #[must_use]
    pub fn new(
        identity: RunIdentity,
        pipeline: impl Into<String>,
        mode: BuildMode,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            identity,
            pipeline: pipeline.into(),
            mode,
            event_sink,
        }
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the build mode.
    #[must_use]
    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Emits an event enriched with the run ID, pipeline name and mode.
    pub async fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.event_sink.emit(event_type, Some(self.enrich(data))).await;
    }

    fn enrich(&self, data: serde_json::Value) -> serde_json::Value {
        let mut enriched = data;
        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert("run_id".to_string(), serde_json::json!(self.identity.run_id_str()));
            map.insert("pipeline".to_string(), serde_json::json!(self.pipeline));
            map.insert("mode".to_string(), serde_json::json!(self.mode.to_string()));
        }
        enriched
    }
}

/// The files one input pattern expanded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    /// The pattern as declared, normalized.
    pub pattern: String,
    /// The pattern's literal directory prefix, resolved against the root.
    pub base: PathBuf,
    /// Matching regular files, sorted.
    pub files: Vec<PathBuf>,
}

/// Everything a transform needs to run one stage.
pub struct StageContext<'a> {
    /// The run this stage belongs to.
    pub run: &'a RunContext,
    /// Directory layout of the project.
    pub layout: &'a ProjectLayout,
    /// The stage definition.
    pub stage: &'a StageSpec,
    /// The external tool for the stage, if it uses one.
    pub tool: Option<&'a ToolSpec>,
    /// Executes external tools.
    pub tools: &'a dyn ToolRunner,
    /// Inputs in declared order, each expanded.
    pub inputs: Vec<ResolvedInput>,
    /// The declared output, resolved against the root.
    pub output: Option<PathBuf>,
}

impl StageContext<'_> {
    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage.name
    }

    /// All input files in declared pattern order.
    #[must_use]
    pub fn input_files(&self) -> Vec<PathBuf> {
        self.inputs
            .iter()
            .flat_map(|input| input.files.iter().cloned())
            .collect()
    }

    /// Returns the resolved output path.
    pub fn output_path(&self) -> Result<&Path, AssetflowError> {
        self.output.as_deref().ok_or_else(|| {
            PipelineValidationError::coded(
                codes::STAGE,
                format!("Stage '{}' has no output path", self.stage.name),
            )
            .with_stages(vec![self.stage.name.clone()])
            .into()
        })
    }

    /// Renders an absolute path relative to the project root.
    #[must_use]
    pub fn display(&self, path: &Path) -> String {
        self.layout.display(path)
    }

    /// Builds the invocation for the stage's external tool.
    pub fn invocation(&self) -> Result<ToolInvocation, AssetflowError> {
        let tool = self.tool.ok_or_else(|| {
            AssetflowError::from(
                PipelineValidationError::coded(
                    codes::TOOL,
                    format!("Stage '{}' has no tool configured", self.stage.name),
                )
                .with_stages(vec![self.stage.name.clone()]),
            )
        })?;
        tool.invocation(
            &self.stage.name,
            self.layout.root(),
            &self.input_files(),
            self.output.as_deref(),
            &self.stage.options.flags,
        )
    }
}
