//! The step contract every pipeline unit implements.
//!
//! Lifecycle per job run, strictly in job order:
//! `validate` (all steps, before anything runs) then, one step at a time,
//! `initialise` -> `execute` -> `cleanup`. `cleanup` runs even when
//! `initialise` or `execute` failed and must tolerate being called again.

use std::fmt;

use stepflow_types::{ConfigError, NoRecordsAvailable, Record};

use crate::connector::Connector;
use crate::errors::StepFailure;
use crate::multicast::OutputWriter;

/// Which ends of the pipe a step type exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Produces records; has an output only.
    Source,
    /// Consumes records; has an input only.
    Sink,
    /// Both an input and an output.
    Process,
}

impl Capability {
    #[must_use]
    pub fn is_source(self) -> bool {
        matches!(self, Self::Source | Self::Process)
    }

    #[must_use]
    pub fn is_sink(self) -> bool {
        matches!(self, Self::Sink | Self::Process)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Source => "Source",
            Self::Sink => "Sink",
            Self::Process => "Source+Sink",
        };
        f.write_str(s)
    }
}

/// A unit of work in a job.
///
/// Only [`Step::capability`] and [`Step::execute`] are mandatory. A step
/// never parses configuration itself: its settings are bound from the
/// document through its [`Schema`](crate::config::schema::Schema) before the
/// job is assembled.
pub trait Step {
    fn capability(&self) -> Capability;

    /// Check the bound configuration. Must not touch external resources.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the invalid combination.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Acquire whatever `execute` needs (connections, scratch state).
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the job run.
    fn initialise(&mut self) -> Result<(), StepFailure> {
        Ok(())
    }

    /// Do the work. Sinks drain their input until it is empty; sources emit
    /// without reading. Every upstream step has fully finished by the time
    /// this is called.
    ///
    /// # Errors
    ///
    /// Returns [`StepFailure`] to stop the job.
    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure>;

    /// Release resources. Must be idempotent.
    ///
    /// # Errors
    ///
    /// A failing cleanup after a successful execute fails the step.
    fn cleanup(&mut self) -> Result<(), StepFailure> {
        Ok(())
    }
}

/// Input and output of one step for the duration of its `execute` call.
pub struct StepContext<'a> {
    job_id: &'a str,
    step_id: &'a str,
    input: Option<&'a mut Connector>,
    output: Option<OutputWriter<'a>>,
}

impl<'a> StepContext<'a> {
    #[must_use]
    pub fn new(
        job_id: &'a str,
        step_id: &'a str,
        input: Option<&'a mut Connector>,
        output: Option<OutputWriter<'a>>,
    ) -> Self {
        Self {
            job_id,
            step_id,
            input,
            output,
        }
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        self.job_id
    }

    #[must_use]
    pub fn step_id(&self) -> &str {
        self.step_id
    }

    /// `true` while the input connector still holds records. Always `false`
    /// for steps without an input.
    #[must_use]
    pub fn has_available(&self) -> bool {
        self.input.as_ref().is_some_and(|c| c.has_available())
    }

    /// Records still queued on the input.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.input.as_ref().map_or(0, |c| c.count())
    }

    /// Take the next input record.
    ///
    /// # Errors
    ///
    /// Returns [`NoRecordsAvailable`] if the input is empty or the step has
    /// no input at all.
    pub fn dequeue(&mut self) -> Result<Record, NoRecordsAvailable> {
        match self.input.as_mut() {
            Some(connector) => connector.dequeue(),
            None => Err(NoRecordsAvailable),
        }
    }

    /// Send a record to every consumer of this step.
    ///
    /// # Errors
    ///
    /// Fails with [`StepFailure::Unexpected`] if the step has no output.
    pub fn emit(&mut self, record: Record) -> Result<(), StepFailure> {
        match self.output.as_mut() {
            Some(writer) => {
                writer.emit(record);
                Ok(())
            }
            None => Err(anyhow::anyhow!("step {} has no output to emit into", self.step_id).into()),
        }
    }

    /// Records emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.output.as_ref().map_or(0, OutputWriter::emitted)
    }
}
