use stepflow_types::{Record, StepError};

use crate::config::schema::{Bindable, Property, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};

/// Emits the records written literally in the configuration, one per
/// `<jsonObject>` element, in document order.
#[derive(Debug, Clone, Default)]
pub struct ObjectSource {
    objects: Vec<String>,
}

impl ObjectSource {
    pub fn new(objects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            objects: objects.into_iter().map(Into::into).collect(),
        }
    }
}

impl Bindable for ObjectSource {
    fn schema() -> Schema<Self> {
        Schema::new().property(
            Property::string("JsonObject", |s: &mut Self, v| s.objects.push(v)).repeated(),
        )
    }
}

impl Step for ObjectSource {
    fn capability(&self) -> Capability {
        Capability::Source
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        for (index, text) in self.objects.iter().enumerate() {
            let record = Record::decode(text).map_err(|e| {
                StepError::with_source(format!("jsonObject #{} is not a valid record", index + 1), e)
            })?;
            ctx.emit(record)?;
        }
        Ok(())
    }
}
