use stepflow_types::ConfigError;

use crate::config::schema::{Bindable, Property, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};

/// Passes at most `top` records; the remainder is drained and dropped.
#[derive(Debug, Clone, Default)]
pub struct LimitRecords {
    top: i64,
}

impl LimitRecords {
    #[must_use]
    pub fn new(top: i64) -> Self {
        Self { top }
    }
}

impl Bindable for LimitRecords {
    fn schema() -> Schema<Self> {
        Schema::new().property(Property::integer("Top", |s: &mut Self, v| s.top = v).required())
    }
}

impl Step for LimitRecords {
    fn capability(&self) -> Capability {
        Capability::Process
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.top < 0 {
            return Err(ConfigError::invalid(format!("top must not be negative, got {}", self.top)));
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        let limit = u64::try_from(self.top).unwrap_or(0);
        while ctx.has_available() {
            let record = ctx.dequeue()?;
            if ctx.emitted() < limit {
                ctx.emit(record)?;
            }
        }
        Ok(())
    }
}
