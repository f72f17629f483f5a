use stepflow_types::Record;

use crate::config::schema::{Bindable, Property, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};
use crate::steps::mapping::{FieldAdd, FieldRename};

/// Reshapes each record: rename (case-insensitive), remove, then add.
///
/// Fields that are neither renamed nor removed pass through. Adds run last
/// and overwrite anything already present under the same key.
#[derive(Debug, Clone, Default)]
pub struct TransformFields {
    renames: Vec<FieldRename>,
    remove: Vec<String>,
    add: Vec<FieldAdd>,
}

impl TransformFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.push(FieldRename::new(from, to));
        self
    }

    #[must_use]
    pub fn remove(mut self, field: impl Into<String>) -> Self {
        self.remove.push(field.into());
        self
    }

    #[must_use]
    pub fn add(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.add.push(FieldAdd::new(field, value));
        self
    }

    fn transform(&self, record: Record) -> Record {
        let mut out = Record::new();
        for (key, value) in record {
            if let Some(rename) = self.renames.iter().find(|r| r.from.eq_ignore_ascii_case(&key)) {
                out.set(rename.to.as_str(), value);
            } else if !self.remove.contains(&key) {
                out.set(key, value);
            }
        }
        for add in &self.add {
            out.set(add.field.as_str(), add.resolve());
        }
        out
    }
}

impl Bindable for TransformFields {
    fn schema() -> Schema<Self> {
        Schema::new()
            .property(Property::nested("Rename", |s: &mut Self, v| s.renames.push(v)).repeated())
            .property(Property::string("Remove", |s: &mut Self, v| s.remove.push(v.trim().to_string())).repeated())
            .property(Property::nested("Add", |s: &mut Self, v| s.add.push(v)).repeated())
    }
}

impl Step for TransformFields {
    fn capability(&self) -> Capability {
        Capability::Process
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        while ctx.has_available() {
            let record = ctx.dequeue()?;
            ctx.emit(self.transform(record))?;
        }
        Ok(())
    }
}
