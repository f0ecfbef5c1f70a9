//! Pipeline states, timing and outcome

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::{ErrorKind, ExtractError};

/// Where a job currently is. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Browsing,
    Locating,
    Extracting,
    Transforming,
    Writing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(&self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            PipelineState::Failed => true,
            _ => next > *self,
        }
    }
}

/// A timed stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Browse,
    Locate,
    Extract,
    Transform,
    Write,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Browse,
        Stage::Locate,
        Stage::Extract,
        Stage::Transform,
        Stage::Write,
    ];

    /// State the pipeline is in while this stage runs
    pub fn state(&self) -> PipelineState {
        match self {
            Stage::Browse => PipelineState::Browsing,
            Stage::Locate => PipelineState::Locating,
            Stage::Extract => PipelineState::Extracting,
            Stage::Transform => PipelineState::Transforming,
            Stage::Write => PipelineState::Writing,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Browse => "browse",
            Stage::Locate => "locate",
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Write => "write",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-stage durations in milliseconds.
///
/// Stages that never completed stay at zero. `total` is measured around the
/// whole job (cleanup included), so it is never below the sum of the stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineTiming {
    pub browse: u64,
    pub locate: u64,
    pub extract: u64,
    pub transform: u64,
    pub write: u64,
    pub total: u64,
}

impl PipelineTiming {
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        match stage {
            Stage::Browse => self.browse = ms,
            Stage::Locate => self.locate = ms,
            Stage::Extract => self.extract = ms,
            Stage::Transform => self.transform = ms,
            Stage::Write => self.write = ms,
        }
    }

    pub fn get(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Browse => self.browse,
            Stage::Locate => self.locate,
            Stage::Extract => self.extract,
            Stage::Transform => self.transform,
            Stage::Write => self.write,
        }
    }

    pub fn stage_sum(&self) -> u64 {
        Stage::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// Set `total`, never letting it fall below the stage sum
    pub fn finish(&mut self, elapsed: Duration) {
        self.total = (elapsed.as_millis() as u64).max(self.stage_sum());
    }
}

/// What a successful job produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub component_name: String,
    pub selector: String,
    pub files: Vec<PathBuf>,
    pub import_path: String,
    pub downloaded_assets: Vec<PathBuf>,
}

/// Result of one pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    Success {
        output: PipelineOutput,
        timing: PipelineTiming,
    },
    Failure {
        error: ExtractError,
        /// Stage that failed
        stage: Option<Stage>,
        timing: PipelineTiming,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn timing(&self) -> &PipelineTiming {
        match self {
            PipelineOutcome::Success { timing, .. } | PipelineOutcome::Failure { timing, .. } => {
                timing
            }
        }
    }

    pub fn output(&self) -> Option<&PipelineOutput> {
        match self {
            PipelineOutcome::Success { output, .. } => Some(output),
            PipelineOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ExtractError> {
        match self {
            PipelineOutcome::Success { .. } => None,
            PipelineOutcome::Failure { error, .. } => Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(ExtractError::kind)
    }

    pub fn final_state(&self) -> PipelineState {
        if self.is_success() {
            PipelineState::Done
        } else {
            PipelineState::Failed
        }
    }

    /// Serialisable report, used for `--json` output
    pub fn report(&self) -> OutcomeReport {
        match self {
            PipelineOutcome::Success { output, timing } => OutcomeReport {
                success: true,
                output: Some(output.clone()),
                error: None,
                error_kind: None,
                failed_stage: None,
                timing: *timing,
            },
            PipelineOutcome::Failure {
                error,
                stage,
                timing,
            } => OutcomeReport {
                success: false,
                output: None,
                error: Some(error.to_string()),
                error_kind: Some(error.kind()),
                failed_stage: *stage,
                timing: *timing,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PipelineOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    pub timing: PipelineTiming,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_only_move_forward() {
        assert!(PipelineState::Idle.can_advance_to(PipelineState::Browsing));
        assert!(PipelineState::Browsing.can_advance_to(PipelineState::Writing));
        assert!(!PipelineState::Extracting.can_advance_to(PipelineState::Locating));
        assert!(PipelineState::Locating.can_advance_to(PipelineState::Failed));
        assert!(!PipelineState::Done.can_advance_to(PipelineState::Failed));
        assert!(!PipelineState::Failed.can_advance_to(PipelineState::Done));
    }

    #[test]
    fn test_total_never_below_stage_sum() {
        let mut timing = PipelineTiming::default();
        timing.record(Stage::Browse, Duration::from_millis(40));
        timing.record(Stage::Locate, Duration::from_millis(25));
        timing.finish(Duration::from_millis(10));
        assert_eq!(timing.stage_sum(), 65);
        assert_eq!(timing.total, 65);

        timing.finish(Duration::from_millis(90));
        assert_eq!(timing.total, 90);
    }

    #[test]
    fn test_failure_report() {
        let outcome = PipelineOutcome::Failure {
            error: ExtractError::not_found("#x"),
            stage: Some(Stage::Extract),
            timing: PipelineTiming::default(),
        };
        let report = outcome.report();
        assert!(!report.success);
        assert_eq!(report.error_kind, Some(ErrorKind::ElementNotFound));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["errorKind"], "element_not_found");
        assert_eq!(json["failedStage"], "extract");
        assert!(json.get("output").is_none());
    }
}
