//! Strict element tree for integrated fragments.
//!
//! [`Element::parse`] accepts only well-formed markup. It runs over the
//! output of [`crate::repair::repair`], which guarantees a single
//! well-formed root element; a failure here therefore indicates a defect in
//! the repair step, not bad user input.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::repair::{escape_attr, escape_text, is_void};

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Invalid markup: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Unclosed element at end of input")]
    UnclosedElement,

    #[error("End tag without matching start tag")]
    MismatchedEnd,

    #[error("No root element found")]
    NoRoot,

    #[error("Content after the root element")]
    TrailingContent,
}

/// A well-formed markup element: name, attributes, and child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse `markup` strictly into a single element tree.
    pub fn parse(markup: &str) -> Result<Self, NodeError> {
        let mut reader = Reader::from_str(markup);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(NodeError::TrailingContent);
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None if root.is_none() => root = Some(element),
                        None => return Err(NodeError::TrailingContent),
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(NodeError::MismatchedEnd)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text)),
                        None if text.trim().is_empty() => {}
                        None if root.is_some() => return Err(NodeError::TrailingContent),
                        None => return Err(NodeError::NoRoot),
                    }
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(text));
                    }
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(NodeError::UnclosedElement);
        }
        root.ok_or(NodeError::NoRoot)
    }

    /// Attribute value by name, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of this element and all its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }
}

fn element_from_start(start: &BytesStart) -> Result<Element, NodeError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attrs {
            write!(f, " {}=\"{}\"", key, escape_attr(value))?;
        }
        if self.children.is_empty() && is_void(&self.name) {
            write!(f, "/>")
        } else {
            write!(f, ">")?;
            for child in &self.children {
                write!(f, "{child}")?;
            }
            write!(f, "</{}>", self.name)
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(el) => write!(f, "{el}"),
            Node::Text(text) => write!(f, "{}", escape_text(text)),
        }
    }
}
