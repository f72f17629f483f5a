use crate::config::schema::{Bindable, Property, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};
use crate::steps::mapping::FieldRename;

/// Renames fields by exact key match, applying each `<rename>` in order.
#[derive(Debug, Clone, Default)]
pub struct RenameFieldNames {
    renames: Vec<FieldRename>,
}

impl RenameFieldNames {
    pub fn new(renames: impl IntoIterator<Item = FieldRename>) -> Self {
        Self {
            renames: renames.into_iter().collect(),
        }
    }
}

impl Bindable for RenameFieldNames {
    fn schema() -> Schema<Self> {
        Schema::new().property(Property::nested("Rename", |s: &mut Self, v| s.renames.push(v)).repeated())
    }
}

impl Step for RenameFieldNames {
    fn capability(&self) -> Capability {
        Capability::Process
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        while ctx.has_available() {
            let mut record = ctx.dequeue()?;
            for rename in &self.renames {
                if let Some(value) = record.remove(&rename.from) {
                    record.set(rename.to.as_str(), value);
                }
            }
            ctx.emit(record)?;
        }
        Ok(())
    }
}
