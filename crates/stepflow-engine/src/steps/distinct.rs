use std::collections::HashSet;

use stepflow_types::{ConfigError, StepError};

use crate::config::schema::{Bindable, Property, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};

/// Passes the first record seen for each value of `keyField` and drops the
/// rest.
#[derive(Debug, Clone, Default)]
pub struct Distinct {
    key_field: String,
    seen: HashSet<String>,
}

impl Distinct {
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            seen: HashSet::new(),
        }
    }
}

impl Bindable for Distinct {
    fn schema() -> Schema<Self> {
        Schema::new().property(Property::string("KeyField", |s: &mut Self, v| s.key_field = v).required())
    }
}

impl Step for Distinct {
    fn capability(&self) -> Capability {
        Capability::Process
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.key_field.trim().is_empty() {
            return Err(ConfigError::invalid("keyField must not be empty"));
        }
        Ok(())
    }

    fn initialise(&mut self) -> Result<(), StepFailure> {
        self.seen.clear();
        Ok(())
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        let mut dropped = 0u64;
        while ctx.has_available() {
            let record = ctx.dequeue()?;
            // Canonical encoding keeps 1 and "1" apart.
            let key = match record.get(&self.key_field) {
                Ok(value) if !value.is_null() => value.to_json().to_string(),
                _ => {
                    return Err(StepError::new(format!(
                        "key field {} must not be null",
                        self.key_field
                    ))
                    .into())
                }
            };
            if self.seen.insert(key) {
                ctx.emit(record)?;
            } else {
                dropped += 1;
            }
        }
        tracing::debug!(step = ctx.step_id(), kept = ctx.emitted(), dropped, "Distinct finished");
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), StepFailure> {
        self.seen.clear();
        Ok(())
    }
}
