//! Run report returned by the pipeline runner.

use super::{BuildMode, StageKind, StageOutput, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stage's entry in a run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub kind: StageKind,
    /// What happened.
    #[serde(flatten)]
    pub output: StageOutput,
}

/// The result of running a pipeline, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// Mode the pipeline ran in.
    pub mode: BuildMode,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Whether every stage finished without failing.
    pub success: bool,
    /// Name of the step that failed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    /// Stage records in execution order.
    pub stages: Vec<StageRecord>,
}

impl RunReport {
    /// Creates an empty report for a starting run.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        pipeline: impl Into<String>,
        mode: BuildMode,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            pipeline: pipeline.into(),
            mode,
            started_at,
            duration_ms: 0.0,
            success: false,
            failed_stage: None,
            stages: Vec::new(),
        }
    }

    /// Appends a stage record.
    pub fn push(&mut self, name: impl Into<String>, kind: StageKind, output: StageOutput) {
        self.stages.push(StageRecord {
            name: name.into(),
            kind,
            output,
        });
    }

    /// Looks up a stage record by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.name == name)
    }

    /// Names of stages with the given status, in order.
    #[must_use]
    pub fn stages_with_status(&self, status: StageStatus) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|record| record.output.status == status)
            .map(|record| record.name.as_str())
            .collect()
    }

    /// Every artifact path produced during the run.
    #[must_use]
    pub fn produced_paths(&self) -> Vec<&str> {
        self.stages
            .iter()
            .flat_map(|record| record.output.artifacts.iter())
            .map(|artifact| artifact.path.as_str())
            .collect()
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let ok = self.stages_with_status(StageStatus::Ok).len();
        let skipped = self.stages_with_status(StageStatus::Skip).len();
        match &self.failed_stage {
            None => format!(
                "{} ({}) finished: {ok} stage(s) ok, {skipped} skipped in {:.0} ms",
                self.pipeline, self.mode, self.duration_ms
            ),
            Some(stage) => format!(
                "{} ({}) failed at '{stage}' after {ok} stage(s) in {:.0} ms",
                self.pipeline, self.mode, self.duration_ms
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageArtifact;

    fn report() -> RunReport {
        let mut report = RunReport::new(Uuid::new_v4(), "exmatrikulator", BuildMode::Dev, Utc::now());
        report.push(
            "concat-css",
            StageKind::Concat,
            StageOutput::ok(vec![StageArtifact::file("build/vendors.css", 10, "aa")]),
        );
        report.push("gzip", StageKind::Compress, StageOutput::skip("build-only stage"));
        report.success = true;
        report
    }

    #[test]
    fn test_lookup_and_status_filters() {
        let report = report();
        assert_eq!(report.stage("gzip").unwrap().kind, StageKind::Compress);
        assert_eq!(report.stages_with_status(StageStatus::Ok), vec!["concat-css"]);
        assert_eq!(report.stages_with_status(StageStatus::Skip), vec!["gzip"]);
        assert_eq!(report.produced_paths(), vec!["build/vendors.css"]);
    }

    #[test]
    fn test_summary() {
        let mut report = report();
        assert!(report.summary().contains("1 stage(s) ok, 1 skipped"));

        report.failed_stage = Some("concat-css".to_string());
        assert!(report.summary().contains("failed at 'concat-css'"));
    }

    #[test]
    fn test_record_flattens_output() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["mode"], "dev");
        assert_eq!(json["stages"][0]["name"], "concat-css");
        assert_eq!(json["stages"][0]["status"], "ok");
        assert_eq!(json["stages"][1]["skip_reason"], "build-only stage");
    }
}
