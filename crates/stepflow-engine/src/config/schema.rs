//! Declarative property schemas and the generic binder.
//!
//! A step type never reads the document itself. It publishes a [`Schema`]
//! listing its properties, each with a setter closure, and [`bind`] walks a
//! `<step>` element applying the resolution rules:
//!
//! - connection references come from `<connection name="..">KEY</connection>`
//!   children, looked up in the connection-string table;
//! - collections take every same-named child, in document order;
//! - scalars come from an attribute (inline) or the first same-named child;
//! - nested objects are bound recursively from the child's own children.

use std::fmt;
use std::str::FromStr;

use stepflow_types::ConfigError;

use crate::config::document::Element;
use crate::config::loader::ConnectionStrings;

/// A type whose fields can be populated from a configuration element.
pub trait Bindable: Default + 'static {
    fn schema() -> Schema<Self>;
}

/// What the loader needs besides the element being bound.
#[derive(Debug, Clone, Copy)]
pub struct BindContext<'a> {
    connections: &'a ConnectionStrings,
}

impl<'a> BindContext<'a> {
    #[must_use]
    pub fn new(connections: &'a ConnectionStrings) -> Self {
        Self { connections }
    }

    #[must_use]
    pub fn connections(&self) -> &'a ConnectionStrings {
        self.connections
    }
}

/// Declared scalar kind of a property, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Boolean,
    Integer,
    Label,
    Object,
    Connection,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Label => "label",
            Self::Object => "object",
            Self::Connection => "connection",
        })
    }
}

/// Read-only view of one declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub kind: PropertyKind,
    pub required: bool,
    pub inline: bool,
    pub collection: bool,
}

type TextSetter<T> = Box<dyn Fn(&mut T, &str) -> Result<(), String>>;
type NestedSetter<T> = Box<dyn Fn(&mut T, &Element, &BindContext<'_>) -> Result<(), ConfigError>>;
type ConnectionSetter<T> = Box<dyn Fn(&mut T, String)>;

enum Binder<T> {
    Text(TextSetter<T>),
    Nested(NestedSetter<T>),
    Connection(ConnectionSetter<T>),
}

/// One bindable property of `T`.
pub struct Property<T> {
    exposed: String,
    kind: PropertyKind,
    required: bool,
    inline: bool,
    collection: bool,
    binder: Binder<T>,
}

impl<T: 'static> Property<T> {
    fn with_binder(name: &str, kind: PropertyKind, binder: Binder<T>) -> Self {
        Self {
            exposed: lower_first(name),
            kind,
            required: false,
            inline: false,
            collection: false,
            binder,
        }
    }

    /// Verbatim element text or attribute value.
    pub fn string(name: &str, set: impl Fn(&mut T, String) + 'static) -> Self {
        Self::with_binder(
            name,
            PropertyKind::String,
            Binder::Text(Box::new(move |target: &mut T, raw: &str| {
                set(target, raw.to_string());
                Ok(())
            })),
        )
    }

    /// `true` / `false`, case-insensitive.
    pub fn boolean(name: &str, set: impl Fn(&mut T, bool) + 'static) -> Self {
        Self::with_binder(
            name,
            PropertyKind::Boolean,
            Binder::Text(Box::new(move |target: &mut T, raw: &str| {
                let value = match raw.trim().to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err("expected true or false".to_string()),
                };
                set(target, value);
                Ok(())
            })),
        )
    }

    pub fn integer(name: &str, set: impl Fn(&mut T, i64) + 'static) -> Self {
        Self::with_binder(
            name,
            PropertyKind::Integer,
            Binder::Text(Box::new(move |target: &mut T, raw: &str| {
                let value = raw.trim().parse::<i64>().map_err(|e| e.to_string())?;
                set(target, value);
                Ok(())
            })),
        )
    }

    /// An enumerated label parsed with [`FromStr`].
    pub fn label<L>(name: &str, set: impl Fn(&mut T, L) + 'static) -> Self
    where
        L: FromStr,
        L::Err: fmt::Display,
    {
        Self::with_binder(
            name,
            PropertyKind::Label,
            Binder::Text(Box::new(move |target: &mut T, raw: &str| {
                let value = raw.trim().parse::<L>().map_err(|e| e.to_string())?;
                set(target, value);
                Ok(())
            })),
        )
    }

    /// A nested object bound from the matching child's own children and
    /// attributes.
    pub fn nested<U: Bindable>(name: &str, set: impl Fn(&mut T, U) + 'static) -> Self {
        Self::with_binder(
            name,
            PropertyKind::Object,
            Binder::Nested(Box::new(move |target: &mut T, node: &Element, ctx: &BindContext<'_>| {
                let mut value = U::default();
                bind(&mut value, node, ctx)?;
                set(target, value);
                Ok(())
            })),
        )
    }

    /// A connection string resolved through the table.
    pub fn connection(name: &str, set: impl Fn(&mut T, String) + 'static) -> Self {
        Self::with_binder(
            name,
            PropertyKind::Connection,
            Binder::Connection(Box::new(set)),
        )
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Read from an attribute of the current element instead of a child.
    #[must_use]
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Bind every same-named child; the setter is called once per child.
    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Override the exposed (document) name.
    #[must_use]
    pub fn exposed_as(mut self, name: &str) -> Self {
        self.exposed = name.to_string();
        self
    }

    #[must_use]
    pub fn info(&self) -> PropertyInfo {
        PropertyInfo {
            name: self.exposed.clone(),
            kind: self.kind,
            required: self.required,
            inline: self.inline,
            collection: self.collection,
        }
    }

    fn bind(&self, target: &mut T, node: &Element, ctx: &BindContext<'_>) -> Result<(), ConfigError> {
        match &self.binder {
            Binder::Connection(set) => self.bind_connection(set, target, node, ctx),
            _ if self.collection => {
                let mut found = 0usize;
                for child in node.children_named(&self.exposed) {
                    self.bind_one(target, child.text(), child, ctx)?;
                    found += 1;
                }
                if found == 0 && self.required {
                    return Err(ConfigError::MissingProperty(self.exposed.clone()));
                }
                Ok(())
            }
            _ => {
                let located = if self.inline {
                    node.attribute(&self.exposed).map(|value| (value, node))
                } else {
                    node.child(&self.exposed).map(|child| (child.text(), child))
                };
                match located {
                    Some((raw, element)) => self.bind_one(target, raw, element, ctx),
                    None if self.required => {
                        Err(ConfigError::MissingProperty(self.exposed.clone()))
                    }
                    None => Ok(()),
                }
            }
        }
    }

    fn bind_one(
        &self,
        target: &mut T,
        raw: &str,
        element: &Element,
        ctx: &BindContext<'_>,
    ) -> Result<(), ConfigError> {
        match &self.binder {
            Binder::Text(set) => set(target, raw).map_err(|reason| ConfigError::InvalidValue {
                property: self.exposed.clone(),
                value: raw.to_string(),
                reason,
            }),
            Binder::Nested(set) => set(target, element, ctx),
            Binder::Connection(set) => self.bind_connection(set, target, element, ctx),
        }
    }

    fn bind_connection(
        &self,
        set: &ConnectionSetter<T>,
        target: &mut T,
        node: &Element,
        ctx: &BindContext<'_>,
    ) -> Result<(), ConfigError> {
        let resolved = node
            .children_named("connection")
            .find(|c| c.attribute("name") == Some(self.exposed.as_str()))
            .and_then(|c| ctx.connections.get(c.text().trim()));
        match resolved {
            Some(value) => {
                set(target, value.to_string());
                Ok(())
            }
            None if self.required => Err(ConfigError::MissingConnection(self.exposed.clone())),
            None => Ok(()),
        }
    }
}

/// Ordered property list of a bindable type.
pub struct Schema<T> {
    properties: Vec<Property<T>>,
}

impl<T: 'static> Schema<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn property(mut self, property: Property<T>) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn info(&self) -> Vec<PropertyInfo> {
        self.properties.iter().map(Property::info).collect()
    }
}

impl<T: 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Populate `target` from `node` according to `T::schema()`. Stops at the
/// first property that fails.
///
/// # Errors
///
/// [`ConfigError::MissingProperty`], [`ConfigError::MissingConnection`] or
/// [`ConfigError::InvalidValue`] naming the offending property.
pub fn bind<T: Bindable>(target: &mut T, node: &Element, ctx: &BindContext<'_>) -> Result<(), ConfigError> {
    for property in &T::schema().properties {
        property.bind(target, node, ctx)?;
    }
    Ok(())
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
