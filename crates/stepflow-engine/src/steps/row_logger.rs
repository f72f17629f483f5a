use std::fmt;
use std::str::FromStr;

use crate::config::schema::{Bindable, Property, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};

/// Severity a [`RowLogger`] writes records at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" | "verbose" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" | "information" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown log level '{other}' (expected trace, debug, info, warn or error)"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Logs every record with a running counter and passes it on unchanged.
#[derive(Debug, Clone, Default)]
pub struct RowLogger {
    level: LogLevel,
}

impl RowLogger {
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Bindable for RowLogger {
    fn schema() -> Schema<Self> {
        Schema::new().property(Property::label("LogLevel", |s: &mut Self, v| s.level = v))
    }
}

impl Step for RowLogger {
    fn capability(&self) -> Capability {
        Capability::Process
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        let mut counter = 0u64;
        while ctx.has_available() {
            let record = ctx.dequeue()?;
            counter += 1;
            let step = ctx.step_id();
            match self.level {
                LogLevel::Trace => tracing::trace!(step, counter, %record, "Record"),
                LogLevel::Debug => tracing::debug!(step, counter, %record, "Record"),
                LogLevel::Info => tracing::info!(step, counter, %record, "Record"),
                LogLevel::Warn => tracing::warn!(step, counter, %record, "Record"),
                LogLevel::Error => tracing::error!(step, counter, %record, "Record"),
            }
            ctx.emit(record)?;
        }
        Ok(())
    }
}
