//! The validated, immutable pipeline.
//!
//! Stages keep their declared order. Dependency edges point from a stage to
//! the earlier stages whose outputs its inputs match; the builder guarantees
//! every edge points backwards, so declared order is already a topological
//! order and the runner can execute it front to back.

use super::StageSpec;
use crate::core::{BuildMode, StageKind};
use crate::tools::{ToolSpec, Toolchain};
use crate::utils::paths::{is_within, literal_prefix};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A validated pipeline, built by [`super::PipelineBuilder`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub(super) name: String,
    pub(super) scratch_dir: PathBuf,
    pub(super) output_dir: PathBuf,
    pub(super) clean: Vec<String>,
    pub(super) finalize: bool,
    pub(super) toolchain: Toolchain,
    pub(super) stages: Vec<StageSpec>,
    pub(super) dependencies: Vec<Vec<usize>>,
}

/// One row of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Position in declared order.
    pub index: usize,
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Input patterns.
    pub inputs: Vec<String>,
    /// Output path, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Whether the stage only runs in build mode.
    pub build_only: bool,
    /// Whether the stage runs in the planned mode.
    pub active: bool,
    /// Names of the stages this one reads from.
    pub depends_on: Vec<String>,
    /// Program the stage invokes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Whether the scratch directory is removed right after this stage.
    pub releases_scratch: bool,
}

impl Pipeline {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scratch directory, relative to the project root.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Returns the output directory, relative to the project root.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output subdirectories removed by the clean step; empty means all of it.
    #[must_use]
    pub fn clean_targets(&self) -> &[String] {
        &self.clean
    }

    /// Whether the scratch directory is removed once no stage needs it.
    #[must_use]
    pub fn finalize(&self) -> bool {
        self.finalize
    }

    /// Returns the default toolchain.
    #[must_use]
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Stages in declared order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// The tool a stage runs: its own, or the toolchain default for its kind.
    #[must_use]
    pub fn tool_for<'a>(&'a self, stage: &'a StageSpec) -> Option<&'a ToolSpec> {
        if !stage.kind.accepts_tool() {
            return None;
        }
        self.toolchain.resolve(stage.kind, stage.tool.as_ref())
    }

    /// Indices of the stages the stage at `index` reads from.
    #[must_use]
    pub fn dependencies_of(&self, index: usize) -> &[usize] {
        self.dependencies.get(index).map_or(&[], Vec::as_slice)
    }

    /// Names of the stages the stage at `index` reads from.
    #[must_use]
    pub fn dependency_names(&self, index: usize) -> Vec<&str> {
        self.dependencies_of(index)
            .iter()
            .map(|&dep| self.stages[dep].name.as_str())
            .collect()
    }

    /// Stages that run in `mode`, with their declared index.
    #[must_use]
    pub fn stages_for(&self, mode: BuildMode) -> Vec<(usize, &StageSpec)> {
        self.stages
            .iter()
            .enumerate()
            .filter(|(_, stage)| mode.includes(stage.build_only))
            .collect()
    }

    /// Returns true if the stage reads from or writes to the scratch directory.
    #[must_use]
    pub fn touches_scratch(&self, stage: &StageSpec) -> bool {
        let output_in_scratch = stage
            .output
            .as_deref()
            .is_some_and(|output| is_within(Path::new(output), &self.scratch_dir));
        output_in_scratch
            || stage
                .inputs
                .iter()
                .any(|pattern| is_within(&literal_prefix(pattern), &self.scratch_dir))
    }

    /// Index of the last stage active in `mode` that touches scratch.
    ///
    /// The runner removes the scratch directory right after that stage, or
    /// at the end of the run when this is `None`.
    #[must_use]
    pub fn scratch_release_index(&self, mode: BuildMode) -> Option<usize> {
        self.stages_for(mode)
            .into_iter()
            .filter(|(_, stage)| self.touches_scratch(stage))
            .map(|(index, _)| index)
            .last()
    }

    /// Describes what a run in `mode` would do.
    #[must_use]
    pub fn plan(&self, mode: BuildMode) -> Vec<PlanEntry> {
        let release = if self.finalize {
            self.scratch_release_index(mode)
        } else {
            None
        };
        self.stages
            .iter()
            .enumerate()
            .map(|(index, stage)| PlanEntry {
                index,
                name: stage.name.clone(),
                kind: stage.kind,
                inputs: stage.inputs.clone(),
                output: stage.output.clone(),
                build_only: stage.build_only,
                active: mode.includes(stage.build_only),
                depends_on: self
                    .dependency_names(index)
                    .into_iter()
                    .map(ToString::to_string)
                    .collect(),
                program: self.tool_for(stage).map(|tool| tool.program.clone()),
                releases_scratch: release == Some(index),
            })
            .collect()
    }
}
