//! NcML document tree.
//!
//! The aggregation engine produces an [`Element`] tree; turning it into text is
//! left to [`to_xml_string`] or any other serializer.

mod writer;

pub use writer::{to_xml_string, write_xml};

/// Namespace of NcML 2.2 documents.
pub const NCML_NAMESPACE: &str = "http://www.unidata.ucar.edu/namespaces/netcdf/ncml-2.2";

/// A node of the document tree: a tag, ordered attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Tag name.
    pub tag: String,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Child elements.
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element without attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute, replacing any previous value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_replaces_in_place() {
        let mut el = Element::new("aggregation")
            .with_attr("dimName", "time")
            .with_attr("type", "joinExisting");
        el.set_attr("dimName", "depth");
        assert_eq!(
            el.attributes,
            vec![
                ("dimName".to_string(), "depth".to_string()),
                ("type".to_string(), "joinExisting".to_string()),
            ]
        );
        assert_eq!(el.attr("type"), Some("joinExisting"));
        assert_eq!(el.attr("missing"), None);
    }

    #[test]
    fn test_children_lookup() {
        let root = Element::new("netcdf")
            .with_child(Element::new("attribute").with_attr("name", "a"))
            .with_child(Element::new("aggregation"))
            .with_child(Element::new("attribute").with_attr("name", "b"));

        assert!(root.child("aggregation").is_some());
        assert!(root.child("variable").is_none());
        let names: Vec<_> = root.children_named("attribute").filter_map(|c| c.attr("name")).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
