//! Stage specifications.

use crate::core::{OutputShape, StageKind};
use crate::errors::{codes, PipelineValidationError};
use crate::tools::ToolSpec;
use crate::utils::paths::{self, normalize, to_slash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default separator placed between concatenated inputs.
pub const DEFAULT_SEPARATOR: &str = "\n";
/// Default extensions a compress stage acts on.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["css", "js"];
/// Default suffix appended to compressed siblings.
pub const DEFAULT_SUFFIX: &str = ".gz";

/// Per-stage options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOptions {
    /// Named boolean options forwarded to the stage's tool.
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    /// Copy: drop directory structure and keep only file names.
    #[serde(default = "default_flatten")]
    pub flatten: bool,
    /// Concat: text placed between inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// Compress: extensions to act on, without the leading dot.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Compress: suffix appended to the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

fn default_flatten() -> bool {
    true
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            flags: BTreeMap::new(),
            flatten: true,
            separator: None,
            extensions: Vec::new(),
            suffix: None,
        }
    }
}

impl StageOptions {
    /// The concat separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)
    }

    /// The compress extensions, lowercased and without leading dots.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        if self.extensions.is_empty() {
            return DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect();
        }
        self.extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect()
    }

    /// The compress suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX)
    }
}

/// Specification for a single stage in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// What the stage does.
    pub kind: StageKind,
    /// Input patterns relative to the project root, in declared order.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output path relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Whether the stage only runs in build mode.
    #[serde(default)]
    pub build_only: bool,
    /// Inline tool, overriding the toolchain entry for the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolSpec>,
    /// Stage options.
    #[serde(default)]
    pub options: StageOptions,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            output: None,
            build_only: false,
            tool: None,
            options: StageOptions::default(),
        }
    }

    /// Appends an input pattern.
    #[must_use]
    pub fn with_input(mut self, pattern: impl Into<String>) -> Self {
        self.inputs.push(pattern.into());
        self
    }

    /// Appends several input patterns.
    #[must_use]
    pub fn with_inputs<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the output path.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Marks the stage as build-only.
    #[must_use]
    pub fn build_only(mut self) -> Self {
        self.build_only = true;
        self
    }

    /// Sets an inline tool.
    #[must_use]
    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tool = Some(tool);
        self
    }

    /// Sets a named boolean option.
    #[must_use]
    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.options.flags.insert(name.into(), value);
        self
    }

    /// Sets whether copied files are flattened.
    #[must_use]
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.options.flatten = flatten;
        self
    }

    /// Sets the concat separator.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.options.separator = Some(separator.into());
        self
    }

    /// Sets the compress extensions.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the compress suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.options.suffix = Some(suffix.into());
        self
    }

    /// Returns how the output path is interpreted.
    #[must_use]
    pub fn output_shape(&self) -> OutputShape {
        self.kind.output_shape()
    }

    /// Returns a copy with every path in lexical normal form.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut spec = self.clone();
        spec.name = spec.name.trim().to_string();
        spec.inputs = self.inputs.iter().map(|p| normalize_str(p)).collect();
        spec.output = self.output.as_deref().map(normalize_str);
        spec
    }

    /// Validates the stage's own shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, inputs are missing, the output
    /// does not fit the kind, or a pattern does not compile.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::coded(
                codes::NAME,
                format!("A {} stage has an empty name", self.kind),
            ));
        }

        if self.inputs.is_empty() && !self.kind.inputs_optional() {
            return Err(self.shape_error(format!(
                "Stage '{}' declares no inputs",
                self.name
            )));
        }

        for pattern in &self.inputs {
            if pattern.trim().is_empty() {
                return Err(self.shape_error(format!("Stage '{}' has an empty input pattern", self.name)));
            }
            if let Err(err) = paths::check_pattern(pattern) {
                return Err(self.shape_error(format!(
                    "Stage '{}': invalid input pattern '{pattern}': {err}",
                    self.name
                )));
            }
        }

        match (self.output_shape(), &self.output) {
            (OutputShape::Siblings, Some(output)) => {
                return Err(self.shape_error(format!(
                    "Stage '{}': {} stages write next to their inputs and take no output (got '{output}')",
                    self.name, self.kind
                )));
            }
            (OutputShape::File | OutputShape::Tree, None) => {
                return Err(self.shape_error(format!(
                    "Stage '{}' declares no output",
                    self.name
                )));
            }
            (OutputShape::File | OutputShape::Tree, Some(output)) if paths::has_glob(output) => {
                return Err(self.shape_error(format!(
                    "Stage '{}': output '{output}' must be a plain path, not a pattern",
                    self.name
                )));
            }
            _ => {}
        }

        if self.kind == StageKind::Compress && self.options.suffix().is_empty() {
            return Err(self.shape_error(format!(
                "Stage '{}': compress suffix must not be empty",
                self.name
            )));
        }

        Ok(())
    }

    fn shape_error(&self, message: String) -> PipelineValidationError {
        PipelineValidationError::coded(codes::STAGE, message).with_stages(vec![self.name.clone()])
    }
}

fn normalize_str(path: &str) -> String {
    to_slash(&normalize(Path::new(path.trim())))
}
