//! Run events.
//!
//! The runner reports progress through an [`EventSink`] handed to it at
//! construction. Events are named `<subject>.<verb>` and carry a JSON payload.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event names emitted by the runner.
pub mod names {
    /// A run began.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// Every active stage succeeded.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A step failed and the run stopped.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    /// The configured output subdirectories were cleaned.
    pub const CLEAN_COMPLETED: &str = "clean.completed";
    /// A stage began.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage produced its output.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage is not part of the selected mode.
    pub const STAGE_SKIPPED: &str = "stage.skipped";
    /// A stage failed.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// The scratch directory was deleted.
    pub const SCRATCH_REMOVED: &str = "scratch.removed";
}
