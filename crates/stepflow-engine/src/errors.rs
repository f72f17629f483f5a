//! Failure model for step lifecycle calls.

use stepflow_types::{NoRecordsAvailable, RecordError, StepError};

// ---------------------------------------------------------------------------
// StepFailure — what a running step can report
// ---------------------------------------------------------------------------

/// Failure returned from `initialise`, `execute` or `cleanup`.
///
/// `Step` wraps an expected operational failure the step chose to report.
/// `Unexpected` wraps anything else, including contract violations such as
/// dequeuing from an empty connector. Both end the job run the same way; the
/// split only changes how much detail is logged.
#[derive(Debug)]
pub enum StepFailure {
    /// Expected-category failure raised by the step.
    Step(StepError),
    /// Any other error.
    Unexpected(anyhow::Error),
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(e) => write!(f, "{e}"),
            Self::Unexpected(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for StepFailure {}

impl From<anyhow::Error> for StepFailure {
    fn from(e: anyhow::Error) -> Self {
        Self::Unexpected(e)
    }
}

impl From<StepError> for StepFailure {
    fn from(e: StepError) -> Self {
        Self::Step(e)
    }
}

impl From<RecordError> for StepFailure {
    fn from(e: RecordError) -> Self {
        Self::Step(e.into())
    }
}

impl From<NoRecordsAvailable> for StepFailure {
    fn from(e: NoRecordsAvailable) -> Self {
        Self::Unexpected(
            anyhow::Error::new(e).context("connector dequeued without checking availability"),
        )
    }
}

impl StepFailure {
    /// `true` for anything that is not an explicit [`StepError`].
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }

    #[must_use]
    pub fn as_step_error(&self) -> Option<&StepError> {
        match self {
            Self::Step(e) => Some(e),
            Self::Unexpected(_) => None,
        }
    }
}
