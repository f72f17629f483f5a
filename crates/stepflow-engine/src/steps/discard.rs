use crate::config::schema::{Bindable, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};

/// Drains its input and drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Bindable for Discard {
    fn schema() -> Schema<Self> {
        Schema::new()
    }
}

impl Step for Discard {
    fn capability(&self) -> Capability {
        Capability::Sink
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        let mut dropped = 0u64;
        while ctx.has_available() {
            ctx.dequeue()?;
            dropped += 1;
        }
        tracing::debug!(step = ctx.step_id(), dropped, "Discarded records");
        Ok(())
    }
}
