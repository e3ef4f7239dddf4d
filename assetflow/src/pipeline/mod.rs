//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage specifications
//! - Pipeline builder with validation
//! - The validated pipeline and its execution plan
//! - Project layout and the clean step
//! - The sequential runner

mod builder;
mod dag;
mod layout;
mod runner;
mod spec;


pub use builder::{PipelineBuilder, DEFAULT_OUTPUT_DIR, DEFAULT_SCRATCH_DIR};
pub use dag::{Pipeline, PlanEntry};
pub use layout::ProjectLayout;
pub use runner::{PipelineRunner, RunFailure, CLEAN_STEP, FINALIZE_STEP};
pub use spec::{StageOptions, StageSpec, DEFAULT_EXTENSIONS, DEFAULT_SEPARATOR, DEFAULT_SUFFIX};

pub(crate) use runner::{prepare_output, resolve_inputs};
