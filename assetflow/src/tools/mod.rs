//! External tools used by compile, minify and sub-build stages.
//!
//! This module provides:
//! - Tool definitions with argument templates and named options
//! - The per-kind default toolchain
//! - The [`ToolRunner`] seam and its child-process implementation

mod definitions;
mod executor;

pub use definitions::{OptionArgs, ToolSpec, Toolchain, INPUT, INPUTS, OUTPUT};
pub use executor::{CapturedOutput, ProcessRunner, ToolInvocation, ToolRunner};
