//! # Assetflow
//!
//! A declarative runner for static asset build pipelines.
//!
//! A pipeline is an ordered list of named stages, each turning input files
//! into an output: compiling a style language or a script dialect, joining
//! files, minifying, copying fonts and media, gzipping, or running a vendored
//! sub-project's own build. Assetflow provides:
//!
//! - **Validated definitions**: ordering, scratch usage and tool wiring are
//!   checked before any file is touched
//! - **Sequential execution**: each stage's inputs are checked before it
//!   runs and its output after, and the first failure stops the run
//! - **Two modes**: `build` runs everything, `dev` skips build-only stages
//! - **Lifecycle events**: every step is reported through an [`events::EventSink`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use assetflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("site")
//!     .scratch_dir("build")
//!     .output_dir("dist")
//!     .tool(StageKind::CompileStyle, ToolSpec::new("sass").with_args(["{input}", "{output}"]))
//!     .stage(
//!         StageSpec::new("sass", StageKind::CompileStyle)
//!             .with_input("sass/app.scss")
//!             .with_output("build/app.css"),
//!     )
//!     .stage(
//!         StageSpec::new("cssmin", StageKind::MinifyStyle)
//!             .with_input("build/app.css")
//!             .with_output("dist/css/app.min.css"),
//!     )
//!     .build()?;
//!
//! let report = PipelineRunner::new(pipeline, ".").run(BuildMode::Build).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod manifest;
pub mod pipeline;
pub mod stages;
pub mod tools;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{load_pipeline, PipelineConfig, DEFAULT_CONFIG_FILE};
    pub use crate::context::{RunContext, RunIdentity, StageContext};
    pub use crate::core::{
        BuildMode, RunReport, StageArtifact, StageKind, StageOutput, StageStatus,
    };
    pub use crate::errors::{
        AssetflowError, CompileError, ErrorInfo, MissingInputError, MissingOutputError,
        PipelineValidationError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::manifest::Manifest;
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, PipelineRunner, PlanEntry, ProjectLayout, RunFailure,
        StageSpec,
    };
    pub use crate::stages::{Transform, TransformRegistry};
    pub use crate::tools::{OptionArgs, ProcessRunner, ToolRunner, ToolSpec, Toolchain};
}
