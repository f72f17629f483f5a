//! Job run result types.

use serde::Serialize;

/// Terminal status of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step ran to completion.
    Completed,
    /// A step failed; later steps never ran.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Per-step progress for one run.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step_id: String,
    pub step_type: String,
    /// Records queued on the input when the step started. `None` for pure sources.
    pub records_in: Option<usize>,
    pub records_out: u64,
    pub duration_secs: f64,
    pub succeeded: bool,
}

/// The step that stopped the run and why.
#[derive(Debug, Clone, Serialize)]
pub struct StepFailureReport {
    pub step_id: String,
    /// `false` for an explicit step error, `true` for anything else.
    pub unexpected: bool,
    pub message: String,
}

/// Result of [`Job::run`](crate::job::Job::run).
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_id: String,
    pub status: RunStatus,
    /// Steps that were started, in job order.
    pub steps: Vec<StepReport>,
    pub failure: Option<StepFailureReport>,
    /// Steps never started because an earlier one failed.
    pub skipped: Vec<String>,
    pub duration_secs: f64,
}

impl JobResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    #[must_use]
    pub fn step(&self, step_id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}
