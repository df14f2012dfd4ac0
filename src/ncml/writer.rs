//! XML text output.

use super::Element;
use crate::error::{AggregateError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;

/// Write `root` as an indented XML document with an `<?xml?>` prolog.
pub fn write_xml<W: Write>(root: &Element, inner: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(inner, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)
}

/// Render `root` as an XML string.
pub fn to_xml_string(root: &Element) -> Result<String> {
    let mut buf = Vec::new();
    write_xml(root, &mut buf)?;
    String::from_utf8(buf).map_err(|e| AggregateError::Xml(e.to_string()))
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.tag.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_output() {
        let root = Element::new("parent")
            .with_attr("myattr", "myval")
            .with_child(Element::new("child").with_attr("childattr", "childval"))
            .with_child(Element::new("child"));
        let xml = to_xml_string(&root).unwrap();

        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert_eq!(lines[1], r#"<parent myattr="myval">"#);
        assert_eq!(lines[2], r#"  <child childattr="childval"/>"#);
        assert_eq!(lines[3], "  <child/>");
        assert_eq!(lines[4], "</parent>");
    }

    #[test]
    fn test_attribute_values_escaped() {
        let root = Element::new("attribute").with_attr("value", "a < b & \"c\"");
        let xml = to_xml_string(&root).unwrap();
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;"));
    }
}
