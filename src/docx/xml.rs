//! A small mutable XML tree for OOXML parts.
//!
//! The styling pass needs to find children, insert properties in schema
//! order and set attributes, then write the part back unchanged elsewhere.
//! Text and attribute values are kept in their escaped form exactly as read,
//! so everything we don't touch round-trips byte for byte (apart from
//! empty elements, which are always written self-closing).

use crate::error::DraftError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Escaped character data.
    Text(String),
    CData(String),
    Comment(String),
    /// Processing instruction content (without `<?` / `?>`).
    Pi(String),
}

/// An element with its attributes in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// `(qualified name, escaped value)` pairs.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A parsed part: optional declaration, nodes before the root, the root.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub declaration: Option<String>,
    pub prolog: Vec<Node>,
    pub root: Element,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Escaped value of attribute `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) an attribute. `value` is escaped here.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let value = escape_attr(value);
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|(k, _)| k != name);
    }

    /// Child elements, skipping text and other nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// Return the child called `name`, creating it if needed.
    ///
    /// A new child is inserted before the first existing child that
    /// `order` ranks after it, which keeps the parent valid against a
    /// schema `xsd:sequence`. Names missing from `order` rank last.
    pub fn ensure_child(&mut self, name: &str, order: &[&str]) -> &mut Element {
        let position = match self.element_index(name) {
            Some(idx) => idx,
            None => {
                let rank = rank_of(name, order);
                let insert_at = self
                    .children
                    .iter()
                    .position(|n| matches!(n, Node::Element(e) if rank_of(&e.name, order) > rank))
                    .unwrap_or(self.children.len());
                self.children
                    .insert(insert_at, Node::Element(Element::new(name)));
                insert_at
            }
        };
        match &mut self.children[position] {
            Node::Element(e) => e,
            _ => unreachable!("index points at an element"),
        }
    }

    fn element_index(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.name == name))
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(v);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl Node {
    fn write(&self, out: &mut String) {
        match self {
            Node::Element(e) => e.write(out),
            Node::Text(t) => out.push_str(t),
            Node::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            Node::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            Node::Pi(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
        }
    }
}

fn rank_of(name: &str, order: &[&str]) -> usize {
    order.iter().position(|n| *n == name).unwrap_or(order.len())
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

// ── Parsing ───────────────────────────────────────────────────────────────

impl XmlDocument {
    /// Parse a part. `part` names it in error messages.
    pub fn parse(part: &str, xml: &[u8]) -> Result<Self, DraftError> {
        let xml_err = |detail: String| DraftError::Xml {
            part: part.to_string(),
            detail,
        };

        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| xml_err(format!("at byte {}: {e}", reader.buffer_position())))?;

            let node = match event {
                Event::Eof => break,
                Event::Decl(e) => {
                    declaration = Some(lossy(e.as_ref()));
                    None
                }
                Event::DocType(_) => None,
                Event::Start(e) => {
                    stack.push(start_element(&e).map_err(xml_err)?);
                    None
                }
                Event::Empty(e) => Some(Node::Element(start_element(&e).map_err(xml_err)?)),
                Event::End(e) => {
                    let finished = stack
                        .pop()
                        .ok_or_else(|| xml_err("unexpected closing tag".into()))?;
                    if finished.name.as_bytes() != e.name().as_ref() {
                        return Err(xml_err(format!(
                            "expected </{}>, found </{}>",
                            finished.name,
                            lossy(e.name().as_ref())
                        )));
                    }
                    Some(Node::Element(finished))
                }
                Event::Text(e) => Some(Node::Text(lossy(e.as_ref()))),
                Event::CData(e) => Some(Node::CData(lossy(e.as_ref()))),
                Event::Comment(e) => Some(Node::Comment(lossy(e.as_ref()))),
                Event::PI(e) => Some(Node::Pi(lossy(e.as_ref()))),
            };

            if let Some(node) = node {
                match (stack.last_mut(), node) {
                    (Some(parent), node) => parent.children.push(node),
                    (None, Node::Element(e)) => {
                        if root.is_some() {
                            return Err(xml_err("more than one root element".into()));
                        }
                        root = Some(e);
                    }
                    // Whitespace or comments outside the root.
                    (None, node @ (Node::Comment(_) | Node::Pi(_))) if root.is_none() => {
                        prolog.push(node)
                    }
                    (None, _) => {}
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(xml_err(format!("unclosed element <{}>", stack[0].name)));
        }
        let root = root.ok_or_else(|| xml_err("no root element".into()))?;

        Ok(Self {
            declaration,
            prolog,
            root,
        })
    }

    /// Serialise back to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        if let Some(decl) = &self.declaration {
            out.push_str("<?");
            out.push_str(decl);
            out.push_str("?>\n");
        }
        for node in &self.prolog {
            node.write(&mut out);
        }
        self.root.write(&mut out);
        out.into_bytes()
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<Element, String> {
    let mut el = Element::new(lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let value = lossy(&attr.value).replace('"', "&quot;");
        el.attributes.push((lossy(attr.key.as_ref()), value));
    }
    Ok(el)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &[&str] = &["w:pStyle", "w:spacing", "w:jc", "w:rPr"];

    #[test]
    fn roundtrip_preserves_text_and_entities() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t xml:space="preserve">a &amp; b &lt; c</w:t></w:r></w:p></w:body></w:document>"#;
        let doc = XmlDocument::parse("doc", xml).unwrap();
        assert_eq!(doc.to_bytes(), xml.to_vec());
    }

    #[test]
    fn empty_elements_are_self_closing() {
        let doc = XmlDocument::parse("x", b"<a><b></b><c/></a>").unwrap();
        assert_eq!(doc.to_bytes(), b"<a><b/><c/></a>".to_vec());
    }

    #[test]
    fn ensure_child_respects_order() {
        let mut el = Element::new("w:pPr");
        el.children.push(Node::Element(Element::new("w:pStyle")));
        el.children.push(Node::Element(Element::new("w:rPr")));
        el.ensure_child("w:jc", ORDER).set_attr("w:val", "both");
        let names: Vec<&str> = el.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["w:pStyle", "w:jc", "w:rPr"]);

        // Existing child is reused, not duplicated.
        el.ensure_child("w:jc", ORDER).set_attr("w:val", "center");
        assert_eq!(el.elements().filter(|e| e.name == "w:jc").count(), 1);
        assert_eq!(el.child("w:jc").unwrap().attr("w:val"), Some("center"));
    }

    #[test]
    fn unknown_names_go_last() {
        let mut el = Element::new("p");
        el.ensure_child("w:rPr", ORDER);
        el.ensure_child("x:ext", ORDER);
        el.ensure_child("w:pStyle", ORDER);
        let names: Vec<&str> = el.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["w:pStyle", "w:rPr", "x:ext"]);
    }

    #[test]
    fn set_attr_escapes_and_replaces() {
        let mut el = Element::new("w:rFonts");
        el.set_attr("w:ascii", "A & B");
        assert_eq!(el.attr("w:ascii"), Some("A &amp; B"));
        el.set_attr("w:ascii", "Times New Roman");
        assert_eq!(el.attributes.len(), 1);
        el.remove_attr("w:ascii");
        assert!(el.attributes.is_empty());
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        let err = XmlDocument::parse("word/document.xml", b"<a><b></a>").unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn missing_root_is_rejected() {
        assert!(XmlDocument::parse("x", b"<?xml version=\"1.0\"?>").is_err());
    }
}
