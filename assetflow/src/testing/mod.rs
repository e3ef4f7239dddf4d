//! Testing utilities.
//!
//! This module provides:
//! - A recording [`MockToolRunner`] standing in for external programs
//! - Temporary project trees
//! - A harness that runs a single transform

mod fixtures;
mod mocks;

pub use fixtures::{apply_transform, ProjectFixture};
pub use mocks::{MockBehavior, MockToolRunner};
