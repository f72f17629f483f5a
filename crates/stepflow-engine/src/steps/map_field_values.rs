use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use stepflow_types::{ConfigError, StepError, Value};

use crate::config::schema::{Bindable, Property, Schema};
use crate::errors::StepFailure;
use crate::step::{Capability, Step, StepContext};
use crate::steps::mapping::FieldRename;

/// Type the mapped-to values of a column are converted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetType {
    #[default]
    String,
    Bool,
    Int,
    Long,
    Double,
}

impl TargetType {
    fn convert(self, text: &str) -> Result<Value, String> {
        let trimmed = text.trim();
        match self {
            Self::String => Ok(Value::String(text.to_string())),
            Self::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err("expected true or false".to_string()),
            },
            Self::Int => trimmed
                .parse::<i32>()
                .map(|v| Value::Integer(i64::from(v)))
                .map_err(|e| e.to_string()),
            Self::Long => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| e.to_string()),
            Self::Double => trimmed
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|e| e.to_string()),
        }
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "bool" | "boolean" => Ok(Self::Bool),
            "int" => Ok(Self::Int),
            "long" => Ok(Self::Long),
            "double" => Ok(Self::Double),
            other => Err(format!("{other} is not a valid type")),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
        })
    }
}

/// Value mappings for one column.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    pub column: String,
    pub target_type: TargetType,
    pub mappings: Vec<FieldRename>,
}

impl ColumnMapping {
    pub fn new(column: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            column: column.into(),
            target_type,
            mappings: Vec::new(),
        }
    }

    #[must_use]
    pub fn map(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mappings.push(FieldRename::new(from, to));
        self
    }
}

impl Bindable for ColumnMapping {
    fn schema() -> Schema<Self> {
        Schema::new()
            .property(Property::string("Column", |m: &mut Self, v| m.column = v).inline().required())
            .property(Property::label("TargetType", |m: &mut Self, v| m.target_type = v).inline())
            .property(Property::nested("Mapping", |m: &mut Self, v| m.mappings.push(v)).repeated())
    }
}

/// Replaces column values through a lookup table. A value with no entry
/// (null included) removes the field.
#[derive(Debug, Clone, Default)]
pub struct MapFieldValues {
    columns: Vec<ColumnMapping>,
    lookup: Vec<(String, HashMap<String, Value>)>,
}

impl MapFieldValues {
    pub fn new(columns: impl IntoIterator<Item = ColumnMapping>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            lookup: Vec::new(),
        }
    }
}

impl Bindable for MapFieldValues {
    fn schema() -> Schema<Self> {
        Schema::new().property(Property::nested("Mappings", |s: &mut Self, v| s.columns.push(v)).repeated())
    }
}

impl Step for MapFieldValues {
    fn capability(&self) -> Capability {
        Capability::Process
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut columns = HashSet::new();
        for column in &self.columns {
            if !columns.insert(column.column.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "column {} is mapped more than once",
                    column.column
                )));
            }
            let mut sources = HashSet::new();
            for mapping in &column.mappings {
                if !sources.insert(mapping.from.as_str()) {
                    return Err(ConfigError::invalid(format!(
                        "value {} of column {} is mapped more than once",
                        mapping.from, column.column
                    )));
                }
            }
        }
        Ok(())
    }

    fn initialise(&mut self) -> Result<(), StepFailure> {
        self.lookup.clear();
        for column in &self.columns {
            let mut values = HashMap::with_capacity(column.mappings.len());
            for mapping in &column.mappings {
                let value = column.target_type.convert(&mapping.to).map_err(|reason| {
                    StepError::new(format!(
                        "cannot convert {} to {} for column {}: {reason}",
                        mapping.to, column.target_type, column.column
                    ))
                })?;
                values.insert(mapping.from.clone(), value);
            }
            self.lookup.push((column.column.clone(), values));
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        while ctx.has_available() {
            let mut record = ctx.dequeue()?;
            for (column, values) in &self.lookup {
                let Some(original) = record.remove(column) else {
                    continue;
                };
                if original.is_null() {
                    continue;
                }
                if let Some(mapped) = values.get(&original.to_string()) {
                    record.set(column.as_str(), mapped.clone());
                }
            }
            ctx.emit(record)?;
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), StepFailure> {
        self.lookup.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::testing::run_step;
    use stepflow_types::Record;

    fn status_mapper() -> MapFieldValues {
        MapFieldValues::new([ColumnMapping::new("status", TargetType::Int)
            .map("active", "1")
            .map("inactive", "2")])
    }

    #[test]
    fn maps_known_values_and_drops_the_rest() {
        let mut step = status_mapper();
        let out = run_step(
            &mut step,
            vec![
                Record::new().with("status", "active").with("id", 1),
                Record::new().with("status", "unknown").with("id", 2),
                Record::new().with("status", Value::Null).with("id", 3),
                Record::new().with("id", 4),
            ],
        )
        .unwrap();
        assert_eq!(out[0], Record::new().with("status", 1).with("id", 1));
        assert_eq!(out[1], Record::new().with("id", 2));
        assert_eq!(out[2], Record::new().with("id", 3));
        assert_eq!(out[3], Record::new().with("id", 4));
    }

    #[test]
    fn non_string_values_match_by_text() {
        let mut step = MapFieldValues::new([ColumnMapping::new("flag", TargetType::Bool).map("1", "true")]);
        let out = run_step(&mut step, vec![Record::new().with("flag", 1)]).unwrap();
        assert_eq!(out[0].get("flag").unwrap(), &Value::Bool(true));
    }

    #[test]
    fn unconvertible_target_fails_initialise() {
        let mut step = MapFieldValues::new([ColumnMapping::new("n", TargetType::Int).map("a", "lots")]);
        let err = run_step(&mut step, Vec::new()).unwrap_err();
        assert!(!err.is_unexpected());
        assert!(err.to_string().contains("lots"), "got: {err}");
    }

    #[test]
    fn duplicate_source_value_fails_validation() {
        let step = MapFieldValues::new([ColumnMapping::new("n", TargetType::String).map("a", "x").map("a", "y")]);
        assert!(step.validate().is_err());
        assert!(status_mapper().validate().is_ok());
    }

    #[test]
    fn cleanup_releases_lookup_and_is_repeatable() {
        let mut step = status_mapper();
        step.initialise().unwrap();
        assert_eq!(step.lookup.len(), 1);
        step.cleanup().unwrap();
        assert!(step.lookup.is_empty());
        step.cleanup().unwrap();
        assert!(step.lookup.is_empty());
    }

    #[test]
    fn target_type_labels() {
        assert_eq!("Boolean".parse::<TargetType>().unwrap(), TargetType::Bool);
        assert!("decimal".parse::<TargetType>().is_err());
    }
}
