//! Owned element tree for the configuration document.
//!
//! `roxmltree` borrows from the source text; binding walks the tree
//! recursively and outlives the parse, so the document is copied into plain
//! [`Element`]s once.

use stepflow_types::ConfigError;

/// One XML element: name, attributes in document order, direct text, children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute that must be present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAttribute`] otherwise.
    pub fn required_attribute(&self, name: &'static str) -> Result<&str, ConfigError> {
        match self.attribute(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingAttribute {
                element: self.name.clone(),
                attribute: name,
            }),
        }
    }

    /// Concatenated direct text content, untrimmed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Rewrite every attribute value and text node in this subtree.
    pub(crate) fn rewrite_values(&mut self, f: &mut impl FnMut(&str) -> String) {
        for (_, value) in &mut self.attributes {
            *value = f(value);
        }
        self.text = f(&self.text);
        for child in &mut self.children {
            child.rewrite_values(f);
        }
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut element = Self::new(node.tag_name().name());
        element.attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
        for child in node.children() {
            if child.is_element() {
                element.children.push(Self::from_node(child));
            } else if child.is_text() {
                if let Some(text) = child.text() {
                    element.text.push_str(text);
                }
            }
        }
        element
    }
}

/// Parse XML text into its root [`Element`].
///
/// # Errors
///
/// Returns [`ConfigError::Document`] if the text is not well-formed XML.
pub fn parse_xml(xml: &str) -> Result<Element, ConfigError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| ConfigError::Document(e.to_string()))?;
    Ok(Element::from_node(doc.root_element()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attributes_text_and_children() {
        let root = parse_xml(
            r#"<step id="s1" type="Distinct"><keyField>id</keyField><note/></step>"#,
        )
        .unwrap();
        assert_eq!(root.name(), "step");
        assert_eq!(root.attribute("id"), Some("s1"));
        assert_eq!(root.attribute("missing"), None);
        assert_eq!(root.child("keyField").unwrap().text(), "id");
        assert_eq!(root.children().count(), 2);
    }

    #[test]
    fn cdata_is_text() {
        let root = parse_xml(r#"<o><![CDATA[{"a":1}]]></o>"#).unwrap();
        assert_eq!(root.text(), r#"{"a":1}"#);
    }

    #[test]
    fn children_named_preserves_order() {
        let root = parse_xml("<r><x>1</x><y/><x>2</x><x>3</x></r>").unwrap();
        let texts: Vec<&str> = root.children_named("x").map(Element::text).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn empty_required_attribute_is_missing() {
        let root = Element::new("job").with_attribute("id", "  ");
        let err = root.required_attribute("id").unwrap_err();
        assert!(matches!(err, ConfigError::MissingAttribute { attribute: "id", .. }));
    }

    #[test]
    fn rewrite_values_reaches_attributes_and_nested_text() {
        let mut root = parse_xml(r#"<r a="x"><c b="y">z</c></r>"#).unwrap();
        root.rewrite_values(&mut |v| v.to_uppercase());
        assert_eq!(root.attribute("a"), Some("X"));
        let child = root.child("c").unwrap();
        assert_eq!(child.attribute("b"), Some("Y"));
        assert_eq!(child.text(), "Z");
        assert_eq!(child.name(), "c");
    }

    #[test]
    fn malformed_xml_is_a_document_error() {
        let err = parse_xml("<unclosed>").unwrap_err();
        assert!(matches!(err, ConfigError::Document(_)));
    }
}
