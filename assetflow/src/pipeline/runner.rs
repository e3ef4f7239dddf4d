//! Sequential pipeline execution.
//!
//! A run cleans the configured output and deletes any scratch directory left
//! by an earlier run, then executes every stage active in the selected mode in
//! declared order, one at a time. Before a stage runs
//! each of its input patterns must match at least one regular file; after it
//! returns its declared output must exist. The first failure stops the run.
//! Nothing is rolled back and the scratch directory is kept for inspection
//! until the next run starts.

use super::{Pipeline, ProjectLayout, StageSpec};
use crate::context::{ResolvedInput, RunContext, RunIdentity, StageContext};
use crate::core::{BuildMode, OutputShape, RunReport, StageArtifact, StageOutput};
use crate::errors::{AssetflowError, MissingInputError, MissingOutputError};
use crate::events::{names, EventSink, NoOpEventSink};
use crate::stages::TransformRegistry;
use crate::tools::{ProcessRunner, ToolRunner};
use crate::utils::paths::{self, literal_prefix};
use crate::utils::file_digest;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

/// Step name reported when the clean pre-step fails.
pub const CLEAN_STEP: &str = "clean";
/// Step name reported when removing the scratch directory fails.
pub const FINALIZE_STEP: &str = "finalize";

/// A failed run: the step that failed, why, and what ran before it.
#[derive(Debug, Error)]
#[error("Pipeline failed at '{stage}': {source}")]
pub struct RunFailure {
    /// The stage (or `clean` / `finalize` step) that failed.
    pub stage: String,
    /// The error.
    #[source]
    pub source: AssetflowError,
    /// The report up to and including the failure.
    pub report: RunReport,
}

/// Executes a [`Pipeline`] against a project directory.
pub struct PipelineRunner {
    pipeline: Pipeline,
    layout: ProjectLayout,
    tool_runner: Arc<dyn ToolRunner>,
    event_sink: Arc<dyn EventSink>,
    registry: TransformRegistry,
}

impl PipelineRunner {
    /// Creates a runner for a pipeline rooted at `root`.
    #[must_use]
    pub fn new(pipeline: Pipeline, root: impl AsRef<Path>) -> Self {
        let layout = ProjectLayout::new(root, pipeline.scratch_dir(), pipeline.output_dir());
        Self {
            pipeline,
            layout,
            tool_runner: Arc::new(ProcessRunner),
            event_sink: Arc::new(NoOpEventSink),
            registry: TransformRegistry::default(),
        }
    }

    /// Sets the tool runner.
    #[must_use]
    pub fn with_tool_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.tool_runner = runner;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the project layout.
    #[must_use]
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Runs only the clean pre-step: the clean targets of the output
    /// directory and the whole scratch directory. Returns what was removed.
    pub async fn clean(&self) -> Result<Vec<PathBuf>, AssetflowError> {
        let mut removed = self.layout.clean(self.pipeline.clean_targets()).await?;
        if self.layout.remove_scratch().await? {
            removed.insert(0, self.layout.scratch_path());
        }
        Ok(removed)
    }

    /// Runs the pipeline in `mode`.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] for the first step that fails.
    pub async fn run(&self, mode: BuildMode) -> Result<RunReport, RunFailure> {
        let identity = RunIdentity::new();
        let span = info_span!(
            "pipeline",
            pipeline = %self.pipeline.name(),
            mode = %mode,
            run_id = %identity.run_id
        );
        self.run_inner(identity, mode).instrument(span).await
    }

    async fn run_inner(&self, identity: RunIdentity, mode: BuildMode) -> Result<RunReport, RunFailure> {
        let started = Instant::now();
        let mut report = RunReport::new(identity.run_id, self.pipeline.name(), mode, identity.started_at);
        let ctx = RunContext::new(identity, self.pipeline.name(), mode, self.event_sink.clone());

        ctx.emit(
            names::PIPELINE_STARTED,
            json!({
                "stages": self.pipeline.stage_count(),
                "active": self.pipeline.stages_for(mode).len(),
                "root": self.layout.root().display().to_string(),
            }),
        )
        .await;
        info!(stages = self.pipeline.stage_count(), "Pipeline started");

        match self.clean().await {
            Ok(removed) => {
                ctx.emit(
                    names::CLEAN_COMPLETED,
                    json!({
                        "removed": removed.iter().map(|p| self.layout.display(p)).collect::<Vec<_>>(),
                    }),
                )
                .await;
            }
            Err(err) => return Err(self.fail(&ctx, report, started, CLEAN_STEP, err).await),
        }

        let release = if self.pipeline.finalize() {
            self.pipeline.scratch_release_index(mode)
        } else {
            None
        };

        for (index, stage) in self.pipeline.stages().iter().enumerate() {
            if !mode.includes(stage.build_only) {
                let reason = format!("build-only stage skipped in {mode} mode");
                ctx.emit(
                    names::STAGE_SKIPPED,
                    json!({"stage": stage.name, "index": index, "reason": reason}),
                )
                .await;
                report.push(&stage.name, stage.kind, StageOutput::skip(reason));
                continue;
            }

            ctx.emit(
                names::STAGE_STARTED,
                json!({"stage": stage.name, "kind": stage.kind, "index": index}),
            )
            .await;
            let stage_started = Instant::now();
            let span = info_span!("stage", stage = %stage.name, kind = %stage.kind);

            match self.execute(&ctx, stage).instrument(span).await {
                Ok(artifacts) => {
                    let duration_ms = elapsed_ms(stage_started);
                    ctx.emit(
                        names::STAGE_COMPLETED,
                        json!({
                            "stage": stage.name,
                            "index": index,
                            "artifacts": artifacts.len(),
                            "duration_ms": duration_ms,
                        }),
                    )
                    .await;
                    info!(stage = %stage.name, artifacts = artifacts.len(), duration_ms, "Stage completed");
                    report.push(
                        &stage.name,
                        stage.kind,
                        StageOutput::ok(artifacts).with_duration_ms(duration_ms),
                    );
                }
                Err(err) => {
                    ctx.emit(
                        names::STAGE_FAILED,
                        json!({
                            "stage": stage.name,
                            "index": index,
                            "error": err.to_string(),
                            "error_kind": err.category(),
                        }),
                    )
                    .await;
                    report.push(
                        &stage.name,
                        stage.kind,
                        StageOutput::fail(err.category(), err.to_string())
                            .with_duration_ms(elapsed_ms(stage_started)),
                    );
                    let name = stage.name.clone();
                    return Err(self.fail(&ctx, report, started, &name, err).await);
                }
            }

            if release == Some(index) {
                if let Err(err) = self.release_scratch(&ctx).await {
                    return Err(self.fail(&ctx, report, started, FINALIZE_STEP, err).await);
                }
            }
        }

        if self.pipeline.finalize() && release.is_none() {
            if let Err(err) = self.release_scratch(&ctx).await {
                return Err(self.fail(&ctx, report, started, FINALIZE_STEP, err).await);
            }
        }

        report.success = true;
        report.duration_ms = elapsed_ms(started);
        ctx.emit(
            names::PIPELINE_COMPLETED,
            json!({"duration_ms": report.duration_ms, "stages": report.stages.len()}),
        )
        .await;
        info!(duration_ms = report.duration_ms, "Pipeline completed");
        Ok(report)
    }

    async fn execute(&self, ctx: &RunContext, stage: &StageSpec) -> Result<Vec<StageArtifact>, AssetflowError> {
        let inputs = resolve_inputs(&self.layout, stage)?;
        let output = prepare_output(&self.layout, stage).await?;
        let transform = self
            .registry
            .get(stage.kind)
            .ok_or(AssetflowError::UnsupportedKind(stage.kind))?;

        let stage_ctx = StageContext {
            run: ctx,
            layout: &self.layout,
            stage,
            tool: self.pipeline.tool_for(stage),
            tools: self.tool_runner.as_ref(),
            inputs,
            output,
        };

        let produced = transform.apply(&stage_ctx).await?;
        check_output(stage, stage_ctx.output.as_deref()).await?;

        let mut artifacts = Vec::with_capacity(produced.len());
        for path in produced {
            artifacts.push(self.artifact(&path).await?);
        }
        Ok(artifacts)
    }

    async fn artifact(&self, path: &Path) -> Result<StageArtifact, AssetflowError> {
        let display = self.layout.display(path);
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| AssetflowError::fs(path, err))?;
        if metadata.is_dir() {
            return Ok(StageArtifact::directory(display));
        }
        let (bytes, sha256) = file_digest(path)
            .await
            .map_err(|err| AssetflowError::fs(path, err))?;
        Ok(StageArtifact::file(display, bytes, sha256))
    }

    async fn release_scratch(&self, ctx: &RunContext) -> Result<(), AssetflowError> {
        if self.layout.remove_scratch().await? {
            let scratch = self.layout.scratch_dir().display().to_string();
            ctx.emit(names::SCRATCH_REMOVED, json!({"path": scratch})).await;
            info!(path = %scratch, "Scratch directory removed");
        }
        Ok(())
    }

    async fn fail(
        &self,
        ctx: &RunContext,
        mut report: RunReport,
        started: Instant,
        step: &str,
        err: AssetflowError,
    ) -> RunFailure {
        report.success = false;
        report.failed_stage = Some(step.to_string());
        report.duration_ms = elapsed_ms(started);
        ctx.emit(
            names::PIPELINE_FAILED,
            json!({
                "stage": step,
                "error": err.to_string(),
                "error_kind": err.category(),
                "duration_ms": report.duration_ms,
            }),
        )
        .await;
        warn!(stage = %step, error_kind = err.category(), "Pipeline failed");
        RunFailure {
            stage: step.to_string(),
            source: err,
            report,
        }
    }
}

/// Expands every input pattern, failing on the first that matches nothing.
pub(crate) fn resolve_inputs(
    layout: &ProjectLayout,
    stage: &StageSpec,
) -> Result<Vec<ResolvedInput>, AssetflowError> {
    stage
        .inputs
        .iter()
        .map(|pattern| {
            let files = paths::expand(layout.root(), pattern)?;
            if files.is_empty() {
                return Err(MissingInputError::new(&stage.name, pattern).into());
            }
            Ok(ResolvedInput {
                pattern: pattern.clone(),
                base: layout.resolve(literal_prefix(pattern)),
                files,
            })
        })
        .collect()
}

/// Resolves the declared output and creates the parent of file outputs.
pub(crate) async fn prepare_output(
    layout: &ProjectLayout,
    stage: &StageSpec,
) -> Result<Option<PathBuf>, AssetflowError> {
    let Some(output) = stage.output.as_deref().map(|output| layout.resolve(output)) else {
        return Ok(None);
    };
    if stage.output_shape() == OutputShape::File {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AssetflowError::fs(parent, err))?;
        }
    }
    Ok(Some(output))
}

async fn check_output(stage: &StageSpec, output: Option<&Path>) -> Result<(), AssetflowError> {
    let Some(output) = output else {
        return Ok(());
    };
    let present = match tokio::fs::metadata(output).await {
        Ok(metadata) => match stage.output_shape() {
            OutputShape::File => metadata.is_file(),
            OutputShape::Tree => metadata.is_dir(),
            OutputShape::Siblings => true,
        },
        Err(_) => false,
    };
    if present {
        Ok(())
    } else {
        Err(MissingOutputError::new(&stage.name, output).into())
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

