//! XML interchange for human editing.
//!
//! Each node becomes an element named by its tag; the scalar value becomes
//! an attribute named by the document's property name, the wide value an
//! attribute named `unicode`. Leaves become child elements whose text
//! content is the value. A leaf with an empty value is written as a
//! self-closing element carrying `kind="leaf"`, because the flat format
//! distinguishes a zero-length leaf from no leaf and plain XML cannot.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{Bxr, Error, Leaf, Node, Result, DEFAULT_PROPERTY_NAME};

/// Attribute name carrying the wide (UTF-16) value.
const UNICODE_ATTR: &str = "unicode";

/// Marker attribute distinguishing a present-but-empty leaf from an empty
/// terminal node.
const KIND_ATTR: &str = "kind";
const KIND_LEAF: &str = "leaf";

impl Bxr {
    /// Convert to an XML string.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut output = Vec::new();
        self.write_xml(&mut output)?;
        String::from_utf8(output).map_err(|e| Error::Xml(e.to_string()))
    }

    /// Write XML to a writer.
    pub fn write_xml<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);

        xml_writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| Error::Xml(e.to_string()))?;

        // The format permits a forest; write every root in order.
        for root in &self.roots {
            self.write_element(&mut xml_writer, root)?;
        }

        Ok(())
    }

    fn write_element<W: Write>(&self, writer: &mut Writer<W>, node: &Node) -> Result<()> {
        let mut elem = BytesStart::new(node.tag.as_str());

        if let Some(scalar) = &node.scalar {
            elem.push_attribute((self.property_name.as_str(), scalar.as_str()));
        }
        if let Some(wide) = &node.wide {
            elem.push_attribute((UNICODE_ATTR, wide.as_str()));
        }

        if node.leaves.is_empty() && node.children.is_empty() {
            writer
                .write_event(Event::Empty(elem))
                .map_err(|e| Error::Xml(e.to_string()))?;
            return Ok(());
        }

        writer
            .write_event(Event::Start(elem))
            .map_err(|e| Error::Xml(e.to_string()))?;

        // Leaves first, then nested children; ingestion accepts either
        // order but this is the order the original tool emitted.
        for leaf in &node.leaves {
            write_leaf(writer, leaf)?;
        }
        for child in &node.children {
            self.write_element(writer, child)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(node.tag.as_str())))
            .map_err(|e| Error::Xml(e.to_string()))?;

        Ok(())
    }
}

fn write_leaf<W: Write>(writer: &mut Writer<W>, leaf: &Leaf) -> Result<()> {
    if leaf.value.is_empty() {
        let mut elem = BytesStart::new(leaf.tag.as_str());
        elem.push_attribute((KIND_ATTR, KIND_LEAF));
        writer
            .write_event(Event::Empty(elem))
            .map_err(|e| Error::Xml(e.to_string()))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(BytesStart::new(leaf.tag.as_str())))
        .map_err(|e| Error::Xml(e.to_string()))?;
    writer
        .write_event(Event::Text(BytesText::new(&leaf.value)))
        .map_err(|e| Error::Xml(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new(leaf.tag.as_str())))
        .map_err(|e| Error::Xml(e.to_string()))?;

    Ok(())
}

/// An element still being parsed; classified as node or leaf when closed.
struct PendingElement {
    tag: String,
    scalar: Option<String>,
    wide: Option<String>,
    marker: bool,
    text: Option<String>,
    leaves: Vec<Leaf>,
    children: Vec<Node>,
}

impl Bxr {
    /// Parse XML text into a document.
    ///
    /// The property name is discovered from the elements' value attributes
    /// (any attribute other than `unicode` and the leaf marker), the same
    /// way the original tool ingested edited scripts.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut property_name: Option<String> = None;
        let mut stack: Vec<PendingElement> = Vec::new();
        let mut roots: Vec<Node> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let pending = open_element(&e, &mut property_name)?;
                    stack.push(pending);
                }
                Ok(Event::Empty(e)) => {
                    let pending = open_element(&e, &mut property_name)?;
                    close_element(pending, &mut stack, &mut roots)?;
                }
                Ok(Event::End(_)) => {
                    let pending = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    close_element(pending, &mut stack, &mut roots)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                    match stack.last_mut() {
                        Some(top) => top.text = Some(text.into_owned()),
                        None => {
                            return Err(Error::Xml(
                                "text content outside of any element".to_string(),
                            ))
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {} // Ignore declarations, comments, etc.
                Err(e) => return Err(Error::Xml(format!("XML parse error: {}", e))),
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml("unclosed element at end of input".to_string()));
        }
        if roots.is_empty() {
            return Err(Error::Xml("no root element found in XML".to_string()));
        }

        Ok(Bxr {
            property_name: property_name.unwrap_or_else(|| DEFAULT_PROPERTY_NAME.to_string()),
            roots,
            layout: None,
        })
    }
}

fn open_element(
    start: &BytesStart,
    property_name: &mut Option<String>,
) -> Result<PendingElement> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut pending = PendingElement {
        tag,
        scalar: None,
        wide: None,
        marker: false,
        text: None,
        leaves: Vec::new(),
        children: Vec::new(),
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();

        match key.as_str() {
            UNICODE_ATTR => pending.wide = Some(value),
            KIND_ATTR => pending.marker = value == KIND_LEAF,
            _ => {
                // Every remaining attribute is the document-wide value
                // attribute; the last name seen wins, as in the original.
                *property_name = Some(key);
                pending.scalar = Some(value);
            }
        }
    }

    Ok(pending)
}

/// Classify a finished element. A leaf carries only a text value (or the
/// empty-leaf marker); anything with structure is a node.
fn close_element(
    pending: PendingElement,
    stack: &mut Vec<PendingElement>,
    roots: &mut Vec<Node>,
) -> Result<()> {
    let has_structure =
        !pending.leaves.is_empty() || !pending.children.is_empty() || pending.scalar.is_some();

    let is_leaf = pending.marker || (pending.text.is_some() && !has_structure);

    if is_leaf {
        if !pending.leaves.is_empty() || !pending.children.is_empty() {
            return Err(Error::Xml(format!(
                "element <{}> mixes text content with child elements",
                pending.tag
            )));
        }
        let leaf = Leaf {
            tag: pending.tag,
            value: pending.text.unwrap_or_default(),
        };
        match stack.last_mut() {
            Some(parent) => parent.leaves.push(leaf),
            None => {
                return Err(Error::Xml(format!(
                    "text element <{}> cannot be a document root",
                    leaf.tag
                )))
            }
        }
        return Ok(());
    }

    if pending.text.is_some() {
        return Err(Error::Xml(format!(
            "element <{}> mixes text content with child elements",
            pending.tag
        )));
    }

    let node = Node {
        tag: pending.tag,
        scalar: pending.scalar,
        wide: pending.wide,
        leaves: pending.leaves,
        children: pending.children,
    };

    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_doc() -> Bxr {
        Bxr {
            property_name: "sym".into(),
            roots: vec![Node::new("title")
                .scalar("Hello")
                .leaf("line", "A")
                .leaf("line", "B")],
            ..Bxr::default()
        }
    }

    #[test]
    fn test_to_xml() {
        let xml = scenario_doc().to_xml_string().unwrap();

        assert!(xml.contains(r#"<title sym="Hello">"#));
        assert!(xml.contains("<line>A</line>"));
        assert!(xml.contains("<line>B</line>"));
    }

    #[test]
    fn test_from_xml_discovers_property_name() {
        let doc = Bxr::from_xml(
            r#"<title sym="Hello"><line>A</line><line>B</line></title>"#,
        )
        .unwrap();

        assert_eq!(doc.property_name, "sym");
        assert_eq!(doc, scenario_doc());
    }

    #[test]
    fn test_xml_round_trip() {
        let doc = Bxr {
            property_name: "symbol".into(),
            roots: vec![
                Node::new("scene")
                    .scalar("intro")
                    .leaf("bgm", "track01")
                    .leaf("se", "")
                    .child(Node::new("title").wide("春香").leaf("line", "こんにちは")),
                Node::new("credits"),
            ],
            ..Bxr::default()
        };

        let xml = doc.to_xml_string().unwrap();
        let reparsed = Bxr::from_xml(&xml).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_empty_leaf_marker() {
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![Node::new("a").scalar("v").leaf("pause", "")],
            ..Bxr::default()
        };

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains(r#"<pause kind="leaf"/>"#));

        let reparsed = Bxr::from_xml(&xml).unwrap();
        assert_eq!(reparsed.roots[0].leaves[0].value, "");
    }

    #[test]
    fn test_empty_terminal_node_is_not_a_leaf() {
        // A childless element without text or marker stays a node.
        let doc = Bxr::from_xml(r#"<root sym="x"><fade/></root>"#).unwrap();

        assert!(doc.roots[0].leaves.is_empty());
        assert_eq!(doc.roots[0].children.len(), 1);
        assert_eq!(doc.roots[0].children[0].tag, "fade");
    }

    #[test]
    fn test_unicode_attribute() {
        let doc = Bxr::from_xml(r#"<song unicode="歌詞"/>"#).unwrap();

        assert_eq!(doc.roots[0].wide.as_deref(), Some("歌詞"));
        assert_eq!(doc.property_name, DEFAULT_PROPERTY_NAME);
    }

    #[test]
    fn test_mixed_content_rejected() {
        let result = Bxr::from_xml(r#"<a>text<b/></a>"#);
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_attribute_with_text_rejected() {
        // A value attribute makes the element a node, and a node cannot
        // carry bare text: there is nowhere to put both strings.
        let result = Bxr::from_xml(r#"<line sym="x">text</line>"#);
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(Bxr::from_xml(""), Err(Error::Xml(_))));
    }

    #[test]
    fn test_full_pipeline() {
        // bytes -> document -> XML -> document -> bytes, byte-identical.
        let original = scenario_doc().to_bytes().unwrap();

        let decoded = Bxr::parse(&original).unwrap();
        let xml = decoded.to_xml_string().unwrap();
        let reparsed = Bxr::from_xml(&xml).unwrap();

        assert_eq!(reparsed.to_bytes().unwrap(), original);
    }
}
