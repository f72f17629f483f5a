//! Error taxonomy shared by the engine and step implementations.
//!
//! - [`ConfigError`]: anything wrong with the document, the registry or the
//!   job topology. Always raised before the first step initialises.
//! - [`StepError`]: an expected operational failure reported by a step
//!   (unreachable backend, malformed record, ...).
//! - [`NoRecordsAvailable`]: dequeue on an empty connector. A caller bug, not
//!   a data problem.

use std::error::Error as StdError;

use crate::record::RecordError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Configuration, registry and topology errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed or lacks a mandatory section.
    #[error("malformed configuration document: {0}")]
    Document(String),

    /// `${VAR}` references to unset environment variables.
    #[error("missing environment variable(s): {}", .0.join(", "))]
    MissingEnvVar(Vec<String>),

    /// A structural attribute (`id`, `type`, `name`) is absent or empty.
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("{0} is not a valid step type")]
    UnknownStepType(String),

    #[error("step type {0} is already registered")]
    DuplicateStepType(String),

    #[error("extension catalog {0} is not available")]
    UnknownCatalog(String),

    #[error("job {0} is defined more than once")]
    DuplicateJob(String),

    #[error("step id {0} is used more than once in the job")]
    DuplicateStepId(String),

    /// A sink was added with no source-capable step to read from.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("data source step {0} doesn't exist")]
    UnknownSourceStep(String),

    #[error("data source step {0} is not a data source")]
    NotASource(String),

    #[error("step {0} is not a data sink")]
    NotASink(String),

    #[error("job {0} has no steps")]
    EmptyJob(String),

    #[error("required property {0} is missing")]
    MissingProperty(String),

    /// A connection reference is absent or names an undefined connection string.
    #[error("required connection property {0} is missing or no connection string defined")]
    MissingConnection(String),

    #[error("cannot convert '{value}' for property {property}: {reason}")]
    InvalidValue {
        property: String,
        value: String,
        reason: String,
    },

    /// Free-form failure raised by a step's `validate()`.
    #[error("{0}")]
    Invalid(String),

    /// Any of the above, attributed to one step of one job.
    #[error("invalid configuration for '{step}' step in job '{job}': {source}")]
    Step {
        job: String,
        step: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Attach job and step context.
    #[must_use]
    pub fn in_step(self, job: impl Into<String>, step: impl Into<String>) -> Self {
        Self::Step {
            job: job.into(),
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with any job/step wrappers removed.
    #[must_use]
    pub fn root(&self) -> &ConfigError {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Expected-category operational failure raised by a step.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StepError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<RecordError> for StepError {
    fn from(err: RecordError) -> Self {
        Self::with_source(format!("malformed record: {err}"), err)
    }
}

/// Dequeue was called on an empty connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no records available")]
pub struct NoRecordsAvailable;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_context_wraps_message() {
        let err = ConfigError::MissingProperty("keyField".into()).in_step("import", "dedupe");
        let msg = err.to_string();
        assert!(msg.contains("'dedupe' step in job 'import'"), "got: {msg}");
        assert!(msg.contains("keyField"), "got: {msg}");
        assert!(matches!(err.root(), ConfigError::MissingProperty(_)));
    }

    #[test]
    fn missing_env_vars_all_listed() {
        let err = ConfigError::MissingEnvVar(vec!["A".into(), "B".into()]);
        assert_eq!(err.to_string(), "missing environment variable(s): A, B");
    }

    #[test]
    fn empty_job_names_the_job() {
        assert_eq!(ConfigError::EmptyJob("nightly".into()).to_string(), "job nightly has no steps");
    }

    #[test]
    fn step_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StepError::with_source("backend unreachable", io);
        assert_eq!(err.to_string(), "backend unreachable");
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn record_error_becomes_step_error() {
        let err: StepError = RecordError::KeyNotFound("id".into()).into();
        assert!(err.message().contains("key not found: id"));
    }
}
