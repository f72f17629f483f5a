//! Step types that every registry starts with.

mod discard;
mod distinct;
mod limit_records;
mod map_field_values;
mod mapping;
mod object_source;
mod rename_fields;
mod row_logger;
mod transform_fields;

pub use discard::Discard;
pub use distinct::Distinct;
pub use limit_records::LimitRecords;
pub use map_field_values::{ColumnMapping, MapFieldValues, TargetType};
pub use mapping::{FieldAdd, FieldRename};
pub use object_source::ObjectSource;
pub use rename_fields::RenameFieldNames;
pub use row_logger::{LogLevel, RowLogger};
pub use transform_fields::TransformFields;

use crate::registry::{StepCatalog, StepDescriptor};

/// The built-in step types, registered by [`StepRegistry::new`](crate::registry::StepRegistry::new).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl StepCatalog for BuiltinCatalog {
    fn name(&self) -> &str {
        "builtin"
    }

    fn steps(&self) -> Vec<StepDescriptor> {
        vec![
            StepDescriptor::of::<ObjectSource>("ObjectSource"),
            StepDescriptor::of::<Distinct>("Distinct"),
            StepDescriptor::of::<LimitRecords>("LimitRecords"),
            StepDescriptor::of::<RowLogger>("RowLogger"),
            StepDescriptor::of::<RenameFieldNames>("RenameFieldNames").with_alias("Field Renamer"),
            StepDescriptor::of::<TransformFields>("TransformFields"),
            StepDescriptor::of::<MapFieldValues>("MapFieldValues").with_alias("Field Value Mapper"),
            StepDescriptor::of::<Discard>("Discard"),
        ]
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use stepflow_types::Record;

    use crate::connector::Connector;
    use crate::errors::StepFailure;
    use crate::multicast::{ConnectorArena, OutputWriter};
    use crate::step::{Step, StepContext};

    /// Run one step's full lifecycle over `input` and collect what it emits.
    pub(crate) fn run_step(step: &mut dyn Step, input: Vec<Record>) -> Result<Vec<Record>, StepFailure> {
        let capability = step.capability();
        let mut arena = ConnectorArena::new();
        let output = arena.add_output();
        let branch = arena.add_branch(output);
        let mut connector = Connector::new();
        connector.enqueue_all(input);

        step.initialise()?;
        let outcome = {
            let writer = capability
                .is_source()
                .then(|| OutputWriter::new(&mut arena, output));
            let input = capability.is_sink().then_some(&mut connector);
            let mut ctx = StepContext::new("test", "step", input, writer);
            step.execute(&mut ctx)
        };
        step.cleanup()?;
        outcome?;

        let mut emitted = Vec::new();
        let out = arena.connector_mut(branch);
        while out.has_available() {
            emitted.push(out.dequeue()?);
        }
        Ok(emitted)
    }
}
