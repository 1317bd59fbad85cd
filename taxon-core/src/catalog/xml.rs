//! Order-preserving XML element tree with quick-xml reading and pretty writing.
pub mod constants;

use constants::{INDENT_CHAR, INDENT_SIZE, XML_DECLARATION};
use quick_xml::{
    events::{BytesCData, BytesStart, BytesText, Event},
    Reader, Writer,
};
use std::borrow::Cow;
use thiserror::Error;

/// Errors raised while reading or writing markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("element <{name}> is not closed before end of input")]
    Unclosed { name: String },
    #[error("document has no root element")]
    NoRoot,
    #[error("unexpected content after root element <{root}>")]
    TrailingContent { root: String },
    #[error("failed to write XML: {0}")]
    Write(String),
}

/// Child content of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// An element with its attributes and children in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Qualified name as written, e.g. `mtc:Taxon`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value of `key` in place, or append it after the existing
    /// attributes.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.local_name() == local)
    }

    /// Concatenated text and CDATA of the direct children.
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => text.push_str(t),
                _ => {}
            }
        }
        (!text.is_empty()).then_some(text)
    }
}

/// Strip the namespace prefix from a qualified name.
pub fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

/// Parse a complete document into its root element.
///
/// Whitespace-only text is dropped and remaining text is trimmed; the XML
/// declaration, processing instructions and doctype are not retained.
pub fn parse_document(xml: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| XmlError::Malformed {
            position,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(start) => {
                ensure_single_root(&root)?;
                stack.push(element_from_start(&start, position)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&root)?;
                let element = element_from_start(&start, position)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| XmlError::Malformed {
                    position,
                    message: "closing tag without matching opening tag".into(),
                })?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|e| XmlError::Malformed {
                    position,
                    message: e.to_string(),
                })?;
                push_content(&mut stack, &root, Node::Text(value.into_owned()))?;
            }
            Event::CData(cdata) => {
                let value = decode(cdata.into_inner(), position)?;
                push_content(&mut stack, &root, Node::CData(value))?;
            }
            Event::Comment(comment) => {
                let value = decode(comment.into_inner(), position)?;
                // comments outside the root are dropped
                if let Some(parent) = stack.last_mut() {
                    parent.push(Node::Comment(value));
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed { name: open.name });
    }
    root.ok_or(XmlError::NoRoot)
}

fn ensure_single_root(root: &Option<Element>) -> Result<(), XmlError> {
    match root {
        Some(existing) => Err(XmlError::TrailingContent {
            root: existing.name.clone(),
        }),
        None => Ok(()),
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn push_content(
    stack: &mut [Element],
    root: &Option<Element>,
    node: Node,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push(node);
            Ok(())
        }
        None => match root {
            Some(existing) => Err(XmlError::TrailingContent {
                root: existing.name.clone(),
            }),
            None => Err(XmlError::NoRoot),
        },
    }
}

fn element_from_start(start: &BytesStart<'_>, position: u64) -> Result<Element, XmlError> {
    let malformed = |message: String| XmlError::Malformed { position, message };
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| malformed(e.to_string()))?
        .to_string();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| malformed(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn decode(bytes: Cow<'_, [u8]>, position: u64) -> Result<String, XmlError> {
    String::from_utf8(bytes.into_owned()).map_err(|e| XmlError::Malformed {
        position,
        message: e.to_string(),
    })
}

/// Serialize `root` as a standalone document: declaration, two-space
/// indentation, trailing newline.
pub fn to_document_string(root: &Element) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), INDENT_CHAR, INDENT_SIZE);
    write_element(&mut writer, root)?;
    let body = String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))?;

    let mut buffer = String::with_capacity(XML_DECLARATION.len() + body.len() + 2);
    buffer.push_str(XML_DECLARATION);
    buffer.push('\n');
    buffer.push_str(body.trim_start_matches('\n'));
    buffer.push('\n');
    Ok(buffer)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start.borrow()))?;
    for child in &element.children {
        match child {
            Node::Element(inner) => write_element(writer, inner)?,
            Node::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
            Node::CData(text) => write_event(writer, Event::CData(BytesCData::new(text.as_str())))?,
            Node::Comment(text) => {
                write_event(writer, Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
        }
    }
    write_event(writer, Event::End(start.to_end()))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}
