//! Stage status and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The transformation a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// Compile a style language (sass, scss) to CSS with an external tool.
    CompileStyle,
    /// Compile a script dialect (coffee) to JavaScript with an external tool.
    CompileScript,
    /// Concatenate inputs in declared order.
    Concat,
    /// Minify stylesheets.
    MinifyStyle,
    /// Minify scripts with an external tool.
    MinifyScript,
    /// Copy a set of files into a directory.
    Copy,
    /// Write gzip siblings of matched files.
    Compress,
    /// Run a vendored sub-project's own build as a black box.
    SubBuild,
}

/// How a stage's `output` path is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// A single file.
    File,
    /// A directory whose contents the stage populates.
    Tree,
    /// No output path; the stage writes next to its inputs.
    Siblings,
}

impl StageKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::CompileStyle,
        Self::CompileScript,
        Self::Concat,
        Self::MinifyStyle,
        Self::MinifyScript,
        Self::Copy,
        Self::Compress,
        Self::SubBuild,
    ];

    /// Returns the config name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompileStyle => "compile-style",
            Self::CompileScript => "compile-script",
            Self::Concat => "concat",
            Self::MinifyStyle => "minify-style",
            Self::MinifyScript => "minify-script",
            Self::Copy => "copy",
            Self::Compress => "compress",
            Self::SubBuild => "sub-build",
        }
    }

    /// Returns true if the kind always needs an external tool.
    #[must_use]
    pub fn requires_tool(&self) -> bool {
        matches!(
            self,
            Self::CompileStyle | Self::CompileScript | Self::MinifyScript | Self::SubBuild
        )
    }

    /// Returns true if the kind may delegate to an external tool.
    #[must_use]
    pub fn accepts_tool(&self) -> bool {
        self.requires_tool() || matches!(self, Self::MinifyStyle)
    }

    /// Returns how the stage's output path is interpreted.
    #[must_use]
    pub fn output_shape(&self) -> OutputShape {
        match self {
            Self::Copy | Self::SubBuild => OutputShape::Tree,
            Self::Compress => OutputShape::Siblings,
            _ => OutputShape::File,
        }
    }

    /// Returns true if the stage may declare no inputs.
    #[must_use]
    pub fn inputs_optional(&self) -> bool {
        matches!(self, Self::SubBuild)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown stage kind '{s}'"))
    }
}

/// The execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage completed successfully.
    Ok,
    /// Stage was not part of the selected mode.
    Skip,
    /// Stage failed.
    Fail,
    /// Stage is pending execution.
    #[default]
    Pending,
    /// Stage is currently running.
    Running,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip | Self::Fail)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail)
    }
}
