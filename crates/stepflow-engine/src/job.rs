//! Job assembly (wiring steps together) and the sequential run loop.

use std::fmt;
use std::time::Instant;

use stepflow_types::ConfigError;

use crate::connector::{Connector, ConnectorId};
use crate::errors::StepFailure;
use crate::multicast::{ConnectorArena, OutputId, OutputWriter};
use crate::result::{JobResult, RunStatus, StepFailureReport, StepReport};
use crate::step::{Capability, Step, StepContext};

/// A step instance placed in a job, with its identity and wiring.
pub struct JobStep {
    id: String,
    type_name: String,
    capability: Capability,
    step: Box<dyn Step>,
    input: Option<ConnectorId>,
    output: Option<OutputId>,
}

impl JobStep {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>, step: Box<dyn Step>) -> Self {
        let capability = step.capability();
        Self {
            id: id.into(),
            type_name: type_name.into(),
            capability,
            step,
            input: None,
            output: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }
}

impl fmt::Debug for JobStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobStep")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("capability", &self.capability)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// An ordered chain of steps and the connectors between them.
#[derive(Debug)]
pub struct Job {
    id: String,
    description: Option<String>,
    steps: Vec<JobStep>,
    pipes: ConnectorArena,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            steps: Vec::new(),
            pipes: ConnectorArena::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = &JobStep> {
        self.steps.iter()
    }

    /// Append a step. A sink-capable step reads from the step added just
    /// before it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTopology`] if the step needs an input and the
    /// previous step has no output (or there is no previous step);
    /// [`ConfigError::DuplicateStepId`] if the id is taken.
    pub fn add_step(&mut self, step: JobStep) -> Result<(), ConfigError> {
        self.ensure_unique(&step.id)?;
        let source = if step.capability.is_sink() {
            let Some(previous) = self.steps.last() else {
                return Err(ConfigError::InvalidTopology(format!(
                    "step {} needs a data source but it is the first step in job {}",
                    step.id, self.id
                )));
            };
            if !previous.capability.is_source() {
                return Err(ConfigError::InvalidTopology(format!(
                    "step {} must be a data source to be connected to {}",
                    previous.id, step.id
                )));
            }
            Some(self.steps.len() - 1)
        } else {
            None
        };
        self.connect_and_push(step, source);
        Ok(())
    }

    /// Append a step that reads from the earlier step `source_id` instead of
    /// the previous one. Several steps may read from the same source; each
    /// gets its own branch.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownSourceStep`], [`ConfigError::NotASource`] or
    /// [`ConfigError::NotASink`] when the reference cannot be wired.
    pub fn add_step_from(&mut self, step: JobStep, source_id: &str) -> Result<(), ConfigError> {
        self.ensure_unique(&step.id)?;
        let index = self
            .steps
            .iter()
            .position(|s| s.id == source_id)
            .ok_or_else(|| ConfigError::UnknownSourceStep(source_id.to_string()))?;
        if !self.steps[index].capability.is_source() {
            return Err(ConfigError::NotASource(source_id.to_string()));
        }
        if !step.capability.is_sink() {
            return Err(ConfigError::NotASink(step.id));
        }
        self.connect_and_push(step, Some(index));
        Ok(())
    }

    fn ensure_unique(&self, id: &str) -> Result<(), ConfigError> {
        if self.steps.iter().any(|s| s.id == id) {
            return Err(ConfigError::DuplicateStepId(id.to_string()));
        }
        Ok(())
    }

    fn connect_and_push(&mut self, mut step: JobStep, source: Option<usize>) {
        if let Some(index) = source {
            if let Some(output) = self.steps[index].output {
                step.input = Some(self.pipes.add_branch(output));
            }
        }
        if step.capability.is_source() {
            step.output = Some(self.pipes.add_output());
        }
        self.steps.push(step);
    }

    /// Run every step once, in order.
    ///
    /// Structural problems and `validate()` failures are returned as `Err`
    /// before any step initialises. A failing step stops the run and is
    /// reported in the returned [`JobResult`]; records already written by
    /// earlier steps stay written.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyJob`] for a job without steps, or the first
    /// step's validation error wrapped with job and step context.
    pub fn run(mut self) -> Result<JobResult, ConfigError> {
        let started = Instant::now();
        tracing::info!(job = %self.id, steps = self.steps.len(), "Running job");

        self.prepare()?;

        let mut reports = Vec::with_capacity(self.steps.len());
        let mut failure = None;
        let mut skipped = Vec::new();

        for step in &mut self.steps {
            if failure.is_some() {
                skipped.push(step.id.clone());
                continue;
            }
            let (report, outcome) = run_step(&self.id, step, &mut self.pipes);
            reports.push(report);
            if let Err(err) = outcome {
                if err.is_unexpected() {
                    tracing::error!(
                        job = %self.id,
                        step = %step.id,
                        error = ?err,
                        "Unexpected error while running step"
                    );
                } else {
                    tracing::error!(
                        job = %self.id,
                        step = %step.id,
                        error = %err,
                        "Error while running step"
                    );
                }
                failure = Some(StepFailureReport {
                    step_id: step.id.clone(),
                    unexpected: err.is_unexpected(),
                    message: err.to_string(),
                });
            }
        }

        let duration_secs = started.elapsed().as_secs_f64();
        let status = if failure.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        tracing::info!(job = %self.id, %status, duration_secs, "Job finished");

        Ok(JobResult {
            job_id: self.id,
            status,
            steps: reports,
            failure,
            skipped,
            duration_secs,
        })
    }

    /// Terminate dangling outputs and validate every step.
    fn prepare(&mut self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptyJob(self.id.clone()));
        }

        let last = self.steps.len() - 1;
        for (index, step) in self.steps.iter().enumerate() {
            let Some(output) = step.output else {
                continue;
            };
            if self.pipes.output(output).is_consumed() {
                continue;
            }
            if index == last {
                tracing::debug!(job = %self.id, step = %step.id, "Attaching discard sink to last step");
            } else {
                tracing::warn!(
                    job = %self.id,
                    step = %step.id,
                    "Output is never consumed; records will be discarded"
                );
            }
            self.pipes.attach_discard(output);
        }

        for step in &self.steps {
            if let Err(err) = step.step.validate() {
                tracing::error!(job = %self.id, step = %step.id, error = %err, "Validation failed");
                return Err(err.in_step(&self.id, &step.id));
            }
        }
        Ok(())
    }
}

/// initialise -> execute -> cleanup for one step. Cleanup runs regardless of
/// how the first two went.
fn run_step(
    job_id: &str,
    step: &mut JobStep,
    pipes: &mut ConnectorArena,
) -> (StepReport, Result<(), StepFailure>) {
    let started = Instant::now();
    let mut input: Option<Connector> = step.input.map(|id| pipes.take(id));
    let records_in = input.as_ref().map(Connector::count);

    match records_in {
        Some(count) => tracing::info!(
            job = job_id,
            step = %step.id,
            step_type = %step.type_name,
            records = count,
            "Running step"
        ),
        None => tracing::info!(
            job = job_id,
            step = %step.id,
            step_type = %step.type_name,
            "Running step"
        ),
    }

    tracing::debug!(step = %step.id, "Initialising");
    let mut outcome = step.step.initialise();
    let mut records_out = 0;
    if outcome.is_ok() {
        tracing::debug!(step = %step.id, "Executing");
        let writer = match step.output {
            Some(output) => Some(OutputWriter::new(&mut *pipes, output)),
            None => None,
        };
        let mut ctx = StepContext::new(job_id, &step.id, input.as_mut(), writer);
        outcome = step.step.execute(&mut ctx);
        records_out = ctx.emitted();
    }

    tracing::debug!(step = %step.id, "Cleaning up");
    let cleanup = step.step.cleanup();
    if let (Some(id), Some(connector)) = (step.input, input) {
        pipes.restore(id, connector);
    }

    let outcome = match (outcome, cleanup) {
        (Err(err), Err(cleanup_err)) => {
            tracing::warn!(step = %step.id, error = %cleanup_err, "Cleanup failed after step error");
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
        (Ok(()), cleanup) => cleanup,
    };

    let report = StepReport {
        step_id: step.id.clone(),
        step_type: step.type_name.clone(),
        records_in,
        records_out,
        duration_secs: started.elapsed().as_secs_f64(),
        succeeded: outcome.is_ok(),
    };
    (report, outcome)
}
