//! Stage output type with factory methods.

use super::{StageArtifact, StageStatus};
use serde::{Deserialize, Serialize};

/// The outcome of one stage within a run.
///
/// `StageOutput` is immutable once created and provides factory methods
/// for creating outputs with different statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// Files the stage produced, in production order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<StageArtifact>,

    /// Error message (for failed executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Error category (for failed executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// Wall-clock duration in milliseconds.
    #[serde(default)]
    pub duration_ms: f64,
}

impl StageOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn ok(artifacts: Vec<StageArtifact>) -> Self {
        Self {
            status: StageStatus::Ok,
            artifacts,
            error: None,
            error_kind: None,
            skip_reason: None,
            duration_ms: 0.0,
        }
    }

    /// Creates a skip output with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skip,
            artifacts: Vec::new(),
            error: None,
            error_kind: None,
            skip_reason: Some(reason.into()),
            duration_ms: 0.0,
        }
    }

    /// Creates a failure output.
    #[must_use]
    pub fn fail(kind: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Fail,
            artifacts: Vec::new(),
            error: Some(error.into()),
            error_kind: Some(kind.into()),
            skip_reason: None,
            duration_ms: 0.0,
        }
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the output indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the output indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}
