//! Pipeline builder with validation.

use super::{Pipeline, StageSpec};
use crate::core::{OutputShape, StageKind};
use crate::errors::{codes, PipelineValidationError};
use crate::tools::{ToolSpec, Toolchain, INPUT, OUTPUT};
use crate::utils::paths::{has_glob, is_within, literal_prefix, normalize, pattern_matches, to_slash};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Default scratch directory.
pub const DEFAULT_SCRATCH_DIR: &str = "build";
/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Builder for creating validated pipelines.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    scratch_dir: String,
    output_dir: String,
    clean: Vec<String>,
    finalize: bool,
    toolchain: Toolchain,
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scratch_dir: DEFAULT_SCRATCH_DIR.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            clean: Vec::new(),
            finalize: true,
            toolchain: Toolchain::new(),
            stages: Vec::new(),
        }
    }

    /// Sets the scratch directory.
    #[must_use]
    pub fn scratch_dir(mut self, dir: impl Into<String>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Restricts the clean step to these output subdirectories.
    #[must_use]
    pub fn clean<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clean = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether the scratch directory is removed after use.
    #[must_use]
    pub fn finalize(mut self, finalize: bool) -> Self {
        self.finalize = finalize;
        self
    }

    /// Sets the default toolchain.
    #[must_use]
    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Registers a default tool for a kind.
    #[must_use]
    pub fn tool(mut self, kind: StageKind, tool: ToolSpec) -> Self {
        self.toolchain.insert(kind, tool);
        self
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, spec: StageSpec) -> Self {
        self.stages.push(spec);
        self
    }

    /// Appends a stage in place.
    pub fn add_stage(&mut self, spec: StageSpec) {
        self.stages.push(spec);
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Validates the definition and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first rule the definition breaks.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(PipelineValidationError::coded(
                codes::NAME,
                "Pipeline name cannot be empty or whitespace-only",
            ));
        }
        if self.stages.is_empty() {
            return Err(PipelineValidationError::coded(
                codes::EMPTY,
                format!("Pipeline '{name}' has no stages"),
            ));
        }

        let scratch_dir = normalize(Path::new(self.scratch_dir.trim()));
        let output_dir = normalize(Path::new(self.output_dir.trim()));
        check_layout(&scratch_dir, &output_dir)?;
        let clean = check_clean_targets(&self.clean)?;

        let stages: Vec<StageSpec> = self.stages.iter().map(StageSpec::normalized).collect();
        let mut seen = HashSet::new();
        for stage in &stages {
            stage.validate()?;
            if !seen.insert(stage.name.as_str()) {
                return Err(PipelineValidationError::coded(
                    codes::DUPLICATE,
                    format!("Stage name '{}' is used more than once", stage.name),
                )
                .with_stages(vec![stage.name.clone()]));
            }
            check_tool(stage, &self.toolchain)?;
            if stage.kind == StageKind::Compress {
                check_compress_inputs(stage, &output_dir)?;
            }
        }
        check_file_outputs(&stages)?;
        check_output_locations(&stages, &scratch_dir, &output_dir)?;
        check_clean_coverage(&stages, &output_dir, &clean)?;

        let dependencies = derive_dependencies(&stages, &scratch_dir)?;
        check_scratch_consumption(&stages, &dependencies, &scratch_dir)?;
        check_modes(&stages, &dependencies)?;

        Ok(Pipeline {
            name,
            scratch_dir,
            output_dir,
            clean,
            finalize: self.finalize,
            toolchain: self.toolchain,
            stages,
            dependencies,
        })
    }
}

fn check_layout(scratch_dir: &Path, output_dir: &Path) -> Result<(), PipelineValidationError> {
    if is_within(scratch_dir, output_dir) || is_within(output_dir, scratch_dir) {
        return Err(PipelineValidationError::coded(
            codes::LAYOUT,
            format!(
                "Scratch directory '{}' and output directory '{}' must be disjoint",
                to_slash(scratch_dir),
                to_slash(output_dir)
            ),
        ));
    }
    Ok(())
}

fn check_clean_targets(targets: &[String]) -> Result<Vec<String>, PipelineValidationError> {
    targets
        .iter()
        .map(|target| {
            let path = normalize(Path::new(target.trim()));
            let escapes = path.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_) | Component::CurDir
                )
            });
            if escapes {
                return Err(PipelineValidationError::coded(
                    codes::LAYOUT,
                    format!("Clean target '{target}' must name a subdirectory of the output directory"),
                ));
            }
            Ok(to_slash(&path))
        })
        .collect()
}

fn check_tool(stage: &StageSpec, toolchain: &Toolchain) -> Result<(), PipelineValidationError> {
    if stage.tool.is_some() && !stage.kind.accepts_tool() {
        return Err(stage_error(
            codes::STAGE,
            stage,
            format!("Stage '{}': {} stages do not run external tools", stage.name, stage.kind),
        ));
    }

    let tool = if stage.kind.accepts_tool() {
        toolchain.resolve(stage.kind, stage.tool.as_ref())
    } else {
        None
    };

    let Some(tool) = tool else {
        if stage.kind.requires_tool() {
            return Err(stage_error(
                codes::TOOL,
                stage,
                format!("Stage '{}' ({}) has no tool and the toolchain has none for its kind", stage.name, stage.kind),
            ));
        }
        if let Some(flag) = stage.options.flags.keys().next() {
            return Err(stage_error(
                codes::STAGE,
                stage,
                format!("Stage '{}' sets option '{flag}' but runs no tool", stage.name),
            ));
        }
        return Ok(());
    };

    if tool.program.trim().is_empty() {
        return Err(stage_error(
            codes::TOOL,
            stage,
            format!("Stage '{}': tool program is empty", stage.name),
        ));
    }
    if let Some(flag) = stage.options.flags.keys().find(|flag| !tool.options.contains_key(*flag)) {
        return Err(stage_error(
            codes::STAGE,
            stage,
            format!("Stage '{}' sets option '{flag}' which `{}` does not declare", stage.name, tool.program),
        ));
    }
    if tool.capture_stdout && stage.output_shape() != OutputShape::File {
        return Err(stage_error(
            codes::TOOL,
            stage,
            format!("Stage '{}': capture_stdout needs a file output", stage.name),
        ));
    }
    if tool.uses(INPUT) && stage.inputs.len() > 1 {
        return Err(stage_error(
            codes::TOOL,
            stage,
            format!(
                "Stage '{}': `{}` takes a single {INPUT} but {} patterns are declared",
                stage.name,
                tool.program,
                stage.inputs.len()
            ),
        ));
    }
    if stage.kind.output_shape() == OutputShape::File && !tool.capture_stdout && !tool.uses(OUTPUT) {
        return Err(stage_error(
            codes::TOOL,
            stage,
            format!(
                "Stage '{}': `{}` never receives {OUTPUT}; add it to the arguments or set capture_stdout",
                stage.name, tool.program
            ),
        ));
    }
    Ok(())
}

fn check_compress_inputs(stage: &StageSpec, output_dir: &Path) -> Result<(), PipelineValidationError> {
    for pattern in &stage.inputs {
        if !is_within(&literal_prefix(pattern), output_dir) {
            return Err(stage_error(
                codes::STAGE,
                stage,
                format!(
                    "Stage '{}': compress input '{pattern}' lies outside the output directory '{}'",
                    stage.name,
                    to_slash(output_dir)
                ),
            ));
        }
    }
    Ok(())
}

fn check_file_outputs(stages: &[StageSpec]) -> Result<(), PipelineValidationError> {
    let mut seen: Vec<(&str, &str)> = Vec::new();
    for stage in stages {
        if stage.output_shape() != OutputShape::File {
            continue;
        }
        let Some(output) = stage.output.as_deref() else {
            continue;
        };
        if let Some((other, _)) = seen.iter().find(|(_, path)| *path == output) {
            return Err(PipelineValidationError::coded(
                codes::DUPLICATE,
                format!("Stages '{other}' and '{}' both write '{output}'", stage.name),
            )
            .with_stages(vec![(*other).to_string(), stage.name.clone()]));
        }
        seen.push((stage.name.as_str(), output));
    }
    Ok(())
}

fn check_output_locations(
    stages: &[StageSpec],
    scratch_dir: &Path,
    output_dir: &Path,
) -> Result<(), PipelineValidationError> {
    for stage in stages {
        if stage.kind == StageKind::SubBuild {
            continue;
        }
        let Some(output) = stage.output.as_deref() else {
            continue;
        };
        let path = Path::new(output);
        if !is_within(path, scratch_dir) && !is_within(path, output_dir) {
            return Err(stage_error(
                codes::OUTSIDE,
                stage,
                format!(
                    "Stage '{}' writes '{output}' outside the scratch directory '{}' and the output directory '{}'",
                    stage.name,
                    to_slash(scratch_dir),
                    to_slash(output_dir)
                ),
            ));
        }
    }
    Ok(())
}

/// With explicit clean targets, everything written below the output
/// directory must be removed again by the next clean.
fn check_clean_coverage(
    stages: &[StageSpec],
    output_dir: &Path,
    clean: &[String],
) -> Result<(), PipelineValidationError> {
    if clean.is_empty() {
        return Ok(());
    }
    let targets: Vec<PathBuf> = clean.iter().map(|target| normalize(&output_dir.join(target))).collect();

    for stage in stages {
        let written: Vec<PathBuf> = match stage.output_shape() {
            OutputShape::Siblings => stage.inputs.iter().map(|pattern| literal_prefix(pattern)).collect(),
            OutputShape::File | OutputShape::Tree => stage
                .output
                .iter()
                .map(PathBuf::from)
                .filter(|output| is_within(output, output_dir))
                .collect(),
        };
        if let Some(path) = written
            .iter()
            .find(|path| !targets.iter().any(|target| is_within(path, target)))
        {
            return Err(stage_error(
                codes::UNCLEANED,
                stage,
                format!(
                    "Stage '{}' writes to '{}', which no clean target covers ({})",
                    stage.name,
                    to_slash(path),
                    clean.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

/// Returns true if files matched by `pattern` may have been written by `producer`.
fn produces(producer: &StageSpec, pattern: &str) -> bool {
    let Some(output) = producer.output.as_deref() else {
        return false;
    };
    let output = Path::new(output);
    match producer.output_shape() {
        OutputShape::File => pattern_matches(pattern, output),
        OutputShape::Tree => {
            let prefix = literal_prefix(pattern);
            is_within(&prefix, output) || (has_glob(pattern) && is_within(output, &prefix))
        }
        OutputShape::Siblings => false,
    }
}

fn derive_dependencies(
    stages: &[StageSpec],
    scratch_dir: &Path,
) -> Result<Vec<Vec<usize>>, PipelineValidationError> {
    let mut dependencies = Vec::with_capacity(stages.len());

    for (index, stage) in stages.iter().enumerate() {
        let mut deps: Vec<usize> = Vec::new();
        for pattern in &stage.inputs {
            let producers: Vec<usize> = stages
                .iter()
                .enumerate()
                .filter(|(other, producer)| *other != index && produces(producer, pattern))
                .map(|(other, _)| other)
                .collect();

            if let Some(&later) = producers.iter().find(|&&other| other > index) {
                return Err(PipelineValidationError::coded(
                    codes::ORDER,
                    format!(
                        "Stage '{}' reads '{pattern}', which is produced by the later stage '{}'",
                        stage.name, stages[later].name
                    ),
                )
                .with_stages(vec![stages[later].name.clone(), stage.name.clone()]));
            }

            if producers.is_empty() && is_within(&literal_prefix(pattern), scratch_dir) {
                return Err(stage_error(
                    codes::DANGLING,
                    stage,
                    format!(
                        "Stage '{}' reads '{pattern}' from the scratch directory but no earlier stage writes it",
                        stage.name
                    ),
                ));
            }
            deps.extend(producers);
        }
        deps.sort_unstable();
        deps.dedup();
        dependencies.push(deps);
    }

    Ok(dependencies)
}

fn check_scratch_consumption(
    stages: &[StageSpec],
    dependencies: &[Vec<usize>],
    scratch_dir: &Path,
) -> Result<(), PipelineValidationError> {
    for (index, stage) in stages.iter().enumerate() {
        let in_scratch = stage
            .output
            .as_deref()
            .is_some_and(|output| is_within(Path::new(output), scratch_dir));
        if !in_scratch {
            continue;
        }

        let consumers: Vec<&str> = dependencies
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.contains(&index))
            .map(|(consumer, _)| stages[consumer].name.as_str())
            .collect();

        match consumers.len() {
            0 => {
                return Err(stage_error(
                    codes::UNCONSUMED,
                    stage,
                    format!(
                        "Stage '{}' writes the intermediate '{}' but no later stage reads it",
                        stage.name,
                        stage.output.as_deref().unwrap_or_default()
                    ),
                ));
            }
            1 => {}
            _ => {
                let mut involved = vec![stage.name.clone()];
                involved.extend(consumers.iter().map(ToString::to_string));
                return Err(PipelineValidationError::coded(
                    codes::FANOUT,
                    format!(
                        "The intermediate written by '{}' is read by {} stages: {}",
                        stage.name,
                        consumers.len(),
                        consumers.join(", ")
                    ),
                )
                .with_stages(involved));
            }
        }
    }
    Ok(())
}

fn check_modes(stages: &[StageSpec], dependencies: &[Vec<usize>]) -> Result<(), PipelineValidationError> {
    for (index, stage) in stages.iter().enumerate() {
        if stage.build_only {
            continue;
        }
        if let Some(&dep) = dependencies[index].iter().find(|&&dep| stages[dep].build_only) {
            return Err(PipelineValidationError::coded(
                codes::MODE,
                format!(
                    "Stage '{}' runs in dev mode but depends on the build-only stage '{}'",
                    stage.name, stages[dep].name
                ),
            )
            .with_stages(vec![stages[dep].name.clone(), stage.name.clone()]));
        }
    }
    Ok(())
}

fn stage_error(code: &str, stage: &StageSpec, message: String) -> PipelineValidationError {
    PipelineValidationError::coded(code, message).with_stages(vec![stage.name.clone()])
}
