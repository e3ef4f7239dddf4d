//! Error types for the assetflow pipeline runner.
//!
//! Every failure is fatal for the run that produced it. The taxonomy mirrors
//! how a build goes wrong: the definition is invalid, an input is missing, an
//! external tool rejects a source file, the filesystem refuses an operation,
//! or a stage claims success without producing its declared output.

use crate::core::StageKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for assetflow operations.
#[derive(Debug, Error)]
pub enum AssetflowError {
    /// The pipeline definition is invalid.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A declared input matched no file.
    #[error("{0}")]
    MissingInput(#[from] MissingInputError),

    /// An external tool rejected its input or could not be started.
    #[error("{0}")]
    Compile(#[from] CompileError),

    /// A stage finished without producing its declared output.
    #[error("{0}")]
    MissingOutput(#[from] MissingOutputError),

    /// A filesystem operation failed.
    #[error("Filesystem error at '{}': {source}", path.display())]
    Filesystem {
        /// The path the operation was applied to.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The pipeline configuration file could not be loaded.
    #[error("Configuration error in '{}': {message}", path.display())]
    Config {
        /// The configuration file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// No transform is registered for a stage kind.
    #[error("No transform registered for stage kind '{0}'")]
    UnsupportedKind(StageKind),
}

impl AssetflowError {
    /// Wraps an IO error with the path it happened on.
    #[must_use]
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Short category name used in reports and events.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::MissingInput(_) => "missing_input",
            Self::Compile(_) => "compile",
            Self::MissingOutput(_) => "missing_output",
            Self::Filesystem { .. } => "filesystem",
            Self::Config { .. } => "config",
            Self::UnsupportedKind(_) => "unsupported_kind",
        }
    }
}

/// Metadata about a validation error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "PIPELINE-ORDER").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline definition fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional error info.
    pub error_info: Option<ErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Creates an error carrying a code and its default fix hint.
    #[must_use]
    pub fn coded(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut info = ErrorInfo::new(code, message.clone());
        if let Some(hint) = ValidationSuggestions::get(code) {
            info = info.with_fix_hint(hint);
        }
        Self::new(message).with_error_info(info)
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when an input pattern matches no regular file.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}': input '{pattern}' matched no file")]
pub struct MissingInputError {
    /// The stage that declared the input.
    pub stage: String,
    /// The unmatched pattern.
    pub pattern: String,
}

impl MissingInputError {
    /// Creates a new missing input error.
    #[must_use]
    pub fn new(stage: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            pattern: pattern.into(),
        }
    }
}

/// Error raised when an external tool fails.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}': `{program}` {}\n{diagnostic}", describe_exit(*exit_code))]
pub struct CompileError {
    /// The stage that ran the tool.
    pub stage: String,
    /// The program that was invoked.
    pub program: String,
    /// Exit code, or `None` when the process never started or was killed.
    pub exit_code: Option<i32>,
    /// The tool's own diagnostic output, verbatim.
    pub diagnostic: String,
}

impl CompileError {
    /// Creates a new compile error.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        program: impl Into<String>,
        exit_code: Option<i32>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            program: program.into(),
            exit_code,
            diagnostic: diagnostic.into(),
        }
    }
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exited with status {code}"),
        None => "did not run to completion".to_string(),
    }
}

/// Error raised when a declared output is absent after its stage ran.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' completed but its output '{}' does not exist", path.display())]
pub struct MissingOutputError {
    /// The stage that declared the output.
    pub stage: String,
    /// The missing path.
    pub path: PathBuf,
}

impl MissingOutputError {
    /// Creates a new missing output error.
    #[must_use]
    pub fn new(stage: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            stage: stage.into(),
            path: path.into(),
        }
    }
}

/// Validation error codes.
pub mod codes {
    /// Pipeline has no stages.
    pub const EMPTY: &str = "PIPELINE-EMPTY";
    /// Pipeline or stage name is blank.
    pub const NAME: &str = "PIPELINE-NAME";
    /// Two stages share a name.
    pub const DUPLICATE: &str = "PIPELINE-DUPLICATE";
    /// Scratch and output directories overlap.
    pub const LAYOUT: &str = "PIPELINE-LAYOUT";
    /// A stage's own shape is invalid (inputs, output, pattern syntax).
    pub const STAGE: &str = "PIPELINE-STAGE";
    /// An input is produced by a later stage.
    pub const ORDER: &str = "PIPELINE-ORDER";
    /// A scratch input has no earlier producer.
    pub const DANGLING: &str = "PIPELINE-DANGLING";
    /// A scratch output is never consumed.
    pub const UNCONSUMED: &str = "PIPELINE-UNCONSUMED";
    /// A scratch output is consumed by more than one stage.
    pub const FANOUT: &str = "PIPELINE-FANOUT";
    /// A dev-mode stage depends on a build-only stage.
    pub const MODE: &str = "PIPELINE-MODE";
    /// An external stage has no tool.
    pub const TOOL: &str = "PIPELINE-TOOL";
    /// A stage writes outside the scratch and output directories.
    pub const OUTSIDE: &str = "PIPELINE-OUTSIDE";
    /// A stage writes into the output directory outside every clean target.
    pub const UNCLEANED: &str = "PIPELINE-UNCLEANED";
}

/// Provides default suggestions for validation error codes.
pub struct ValidationSuggestions;

impl ValidationSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            codes::EMPTY => Some("Add at least one [[stages]] entry to the pipeline."),
            codes::DUPLICATE => Some("Give every stage a unique name."),
            codes::LAYOUT => Some(
                "Point scratch_dir and output_dir at two separate directories, \
                 neither nested inside the other.",
            ),
            codes::ORDER => Some(
                "Move the producing stage before the stage that reads its output.",
            ),
            codes::DANGLING => Some(
                "Scratch files are only valid when an earlier stage writes them. \
                 Add the producing stage or read the file from its source location.",
            ),
            codes::UNCONSUMED => Some(
                "Either consume the intermediate in a later stage or write it to the output directory.",
            ),
            codes::FANOUT => Some(
                "Write a separate intermediate for each consumer, or move the shared file out of scratch.",
            ),
            codes::MODE => Some(
                "Mark the dependent stage build_only as well, or drop build_only from its producer.",
            ),
            codes::TOOL => Some(
                "Add an inline [stages.tool] table or a [toolchain.<kind>] entry for this stage kind.",
            ),
            codes::OUTSIDE => Some(
                "Write to the scratch or output directory. Only sub-build stages may write elsewhere.",
            ),
            codes::UNCLEANED => Some(
                "Add the directory the stage writes to the clean list, or clear the list to clean the \
                 whole output directory.",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_creation() {
        let info = ErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("stage", "sass-app");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.summary, "Test error");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("stage"), Some(&"sass-app".to_string()));
    }

    #[test]
    fn test_coded_validation_error_carries_hint() {
        let err = PipelineValidationError::coded(codes::ORDER, "out of order")
            .with_stages(vec!["concat".to_string(), "sass".to_string()]);

        assert_eq!(err.code(), Some(codes::ORDER));
        assert!(err.error_info.unwrap().fix_hint.is_some());
        assert_eq!(err.stages.len(), 2);
    }

    #[test]
    fn test_compile_error_keeps_diagnostic_verbatim() {
        let err = CompileError::new("sass-app", "sass", Some(65), "Error: expected \"}\".\n  line 3");
        let text = err.to_string();

        assert!(text.contains("`sass` exited with status 65"));
        assert!(text.ends_with("Error: expected \"}\".\n  line 3"));
    }

    #[test]
    fn test_compile_error_without_exit_code() {
        let err = CompileError::new("coffee", "coffee", None, "No such file or directory");
        assert!(err.to_string().contains("did not run to completion"));
    }

    #[test]
    fn test_categories() {
        let err: AssetflowError = MissingInputError::new("copy-fonts", "vendors/fonts/*").into();
        assert_eq!(err.category(), "missing_input");
        assert!(err.to_string().contains("vendors/fonts/*"));

        let err = AssetflowError::fs(
            "out/css",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.category(), "filesystem");
        assert!(err.to_string().contains("out/css"));
    }

    #[test]
    fn test_suggestions() {
        assert!(ValidationSuggestions::get(codes::DANGLING).is_some());
        assert!(ValidationSuggestions::get(codes::OUTSIDE).is_some());
        assert!(ValidationSuggestions::get(codes::UNCLEANED).is_some());
        assert!(ValidationSuggestions::get("UNKNOWN").is_none());
    }
}
