//! Step type registry and extension catalogs.

use std::collections::BTreeMap;
use std::fmt;

use stepflow_types::ConfigError;

use crate::config::document::Element;
use crate::config::schema::{bind, BindContext, Bindable, PropertyInfo};
use crate::step::{Capability, Step};
use crate::steps::BuiltinCatalog;

type Factory = fn(&Element, &BindContext<'_>) -> Result<Box<dyn Step>, ConfigError>;

/// How to build and bind one step type.
#[derive(Clone)]
pub struct StepDescriptor {
    implementation: &'static str,
    alias: Option<&'static str>,
    capability: Capability,
    properties: Vec<PropertyInfo>,
    factory: Factory,
}

impl StepDescriptor {
    /// Describe step type `S`, registered under `implementation` unless an
    /// alias is set.
    #[must_use]
    pub fn of<S: Step + Bindable>(implementation: &'static str) -> Self {
        Self {
            implementation,
            alias: None,
            capability: S::default().capability(),
            properties: S::schema().info(),
            factory: build::<S>,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    /// The name the document refers to this type by.
    #[must_use]
    pub fn registered_name(&self) -> &'static str {
        self.alias.unwrap_or(self.implementation)
    }

    #[must_use]
    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Construct a default instance and bind it from a `<step>` element.
    ///
    /// # Errors
    ///
    /// Returns the binding error for the first property that fails.
    pub fn create(&self, node: &Element, ctx: &BindContext<'_>) -> Result<Box<dyn Step>, ConfigError> {
        (self.factory)(node, ctx)
    }
}

impl fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("implementation", &self.implementation)
            .field("alias", &self.alias)
            .field("capability", &self.capability)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

fn build<S: Step + Bindable>(node: &Element, ctx: &BindContext<'_>) -> Result<Box<dyn Step>, ConfigError> {
    let mut step = S::default();
    bind(&mut step, node, ctx)?;
    Ok(Box::new(step))
}

/// A named bundle of step types that a document can opt into with
/// `<extensions><catalog name=".."/></extensions>`.
pub trait StepCatalog {
    fn name(&self) -> &str;

    fn steps(&self) -> Vec<StepDescriptor>;
}

/// Type name to descriptor. Names are matched exactly, case-sensitively.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    descriptors: BTreeMap<&'static str, StepDescriptor>,
}

impl StepRegistry {
    /// A registry holding the built-in step types.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for descriptor in BuiltinCatalog.steps() {
            registry.insert(descriptor);
        }
        registry
    }

    /// A registry with nothing in it, not even the built-ins.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    fn insert(&mut self, descriptor: StepDescriptor) -> bool {
        let name = descriptor.registered_name();
        if self.descriptors.contains_key(name) {
            return false;
        }
        self.descriptors.insert(name, descriptor);
        true
    }

    /// # Errors
    ///
    /// [`ConfigError::DuplicateStepType`] if the name is taken.
    pub fn register(&mut self, descriptor: StepDescriptor) -> Result<(), ConfigError> {
        let name = descriptor.registered_name();
        if !self.insert(descriptor) {
            return Err(ConfigError::DuplicateStepType(name.to_string()));
        }
        tracing::debug!(step_type = name, "Registered step type");
        Ok(())
    }

    /// Register every step type of a catalog.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateStepType`] on the first collision. Types
    /// registered before the collision stay registered.
    pub fn merge(&mut self, catalog: &dyn StepCatalog) -> Result<(), ConfigError> {
        let steps = catalog.steps();
        tracing::info!(catalog = catalog.name(), step_types = steps.len(), "Loading extension catalog");
        for descriptor in steps {
            self.register(descriptor)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`ConfigError::UnknownStepType`] if nothing is registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&StepDescriptor, ConfigError> {
        self.descriptors
            .get(name)
            .ok_or_else(|| ConfigError::UnknownStepType(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Descriptors sorted by registered name.
    pub fn descriptors(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.descriptors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
