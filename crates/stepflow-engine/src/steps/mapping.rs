use chrono::Utc;
use stepflow_types::Value;

use crate::config::schema::{Bindable, Property, Schema};

const NOW_FORMULA: &str = "=now()";

/// `<rename from=".." to=".."/>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRename {
    pub from: String,
    pub to: String,
}

impl FieldRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Bindable for FieldRename {
    fn schema() -> Schema<Self> {
        Schema::new()
            .property(Property::string("From", |m: &mut Self, v| m.from = v).inline().required())
            .property(Property::string("To", |m: &mut Self, v| m.to = v).inline().required())
    }
}

/// `<add field=".." value=".."/>`. The value `=now()` stands for the time
/// the record passes through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAdd {
    pub field: String,
    pub value: String,
}

impl FieldAdd {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn resolve(&self) -> Value {
        if self.value.eq_ignore_ascii_case(NOW_FORMULA) {
            Value::DateTime(Utc::now())
        } else {
            Value::String(self.value.clone())
        }
    }
}

impl Bindable for FieldAdd {
    fn schema() -> Schema<Self> {
        Schema::new()
            .property(Property::string("Field", |m: &mut Self, v| m.field = v).inline().required())
            .property(Property::string("Value", |m: &mut Self, v| m.value = v).inline().required())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepflow_types::ValueKind;

    #[test]
    fn now_formula_is_case_insensitive() {
        assert_eq!(FieldAdd::new("at", "=NOW()").resolve().kind(), ValueKind::DateTime);
        assert_eq!(FieldAdd::new("src", "crm").resolve(), Value::from("crm"));
    }
}
