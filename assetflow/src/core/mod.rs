//! Core domain model types for assetflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage status, kind and mode enums
//! - Stage output type with factory methods
//! - Produced artifacts and the run report

mod artifact;
mod mode;
mod output;
mod report;
mod status;

pub use artifact::{ArtifactKind, StageArtifact};
pub use mode::BuildMode;
pub use output::StageOutput;
pub use report::{RunReport, StageRecord};
pub use status::{OutputShape, StageKind, StageStatus};
