//! Lenient markup repair for handler output.
//!
//! Handlers return arbitrary markup text: unclosed tags, stray end tags,
//! bare text, several top-level siblings. [`repair`] parses it forgivingly
//! and re-serializes one well-formed container element that the strict
//! parser in [`crate::node`] is guaranteed to accept.

use std::fmt::Write;

/// HTML elements with no content model; always serialized self-closing.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Repair a markup fragment into a single well-formed element.
///
/// Unclosed tags are auto-closed, stray end tags dropped, comments and
/// doctypes discarded, attributes normalized to double-quoted form. All
/// top-level nodes are joined with a newline and wrapped in one synthetic
/// `<div>` so the result is exactly one element regardless of what the
/// handler produced.
pub fn repair(fragment: &str) -> String {
    let roots = parse_lenient(fragment);
    let mut parts = Vec::with_capacity(roots.len());
    for root in &roots {
        let mut out = String::new();
        serialize_node(root, &mut out);
        parts.push(out);
    }
    format!("<div>{}</div>", parts.join("\n"))
}

#[derive(Debug)]
enum RepairNode {
    Element {
        name: String,
        attrs: Vec<(String, Option<String>)>,
        children: Vec<RepairNode>,
    },
    Text(String),
}

struct OpenElement {
    name: String,
    attrs: Vec<(String, Option<String>)>,
    children: Vec<RepairNode>,
}

impl OpenElement {
    fn root() -> Self {
        Self {
            name: String::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    fn into_node(self) -> RepairNode {
        RepairNode::Element {
            name: self.name,
            attrs: self.attrs,
            children: self.children,
        }
    }
}

enum RawTag {
    Open {
        name: String,
        attrs: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Skip,
}

fn parse_lenient(input: &str) -> Vec<RepairNode> {
    // Index 0 is a sentinel collecting the top-level siblings.
    let mut stack: Vec<OpenElement> = vec![OpenElement::root()];
    let mut pos = 0;

    while pos < input.len() {
        let Some(rel) = input[pos..].find('<') else {
            push_text(&mut stack, &input[pos..]);
            break;
        };
        if rel > 0 {
            push_text(&mut stack, &input[pos..pos + rel]);
            pos += rel;
        }

        match parse_tag(&input[pos..]) {
            Some((
                RawTag::Open {
                    name,
                    attrs,
                    self_closing,
                },
                used,
            )) => {
                if self_closing || is_void(&name) {
                    if let Some(top) = stack.last_mut() {
                        top.children.push(RepairNode::Element {
                            name,
                            attrs,
                            children: Vec::new(),
                        });
                    }
                } else {
                    stack.push(OpenElement {
                        name,
                        attrs,
                        children: Vec::new(),
                    });
                }
                pos += used;
            }
            Some((RawTag::Close { name }, used)) => {
                // Close up to the nearest matching open element, auto-closing
                // anything still open inside it. Unmatched end tags are dropped.
                let target = stack
                    .iter()
                    .skip(1)
                    .rposition(|el| el.name == name)
                    .map(|i| i + 1);
                if let Some(target) = target {
                    while stack.len() > target {
                        fold_top(&mut stack);
                    }
                }
                pos += used;
            }
            Some((RawTag::Skip, used)) => pos += used,
            None => {
                // Not tag-like: a literal '<'
                push_text(&mut stack, "<");
                pos += 1;
            }
        }
    }

    while stack.len() > 1 {
        fold_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn fold_top(stack: &mut Vec<OpenElement>) {
    if let Some(el) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(el.into_node());
        }
    }
}

fn push_text(stack: &mut Vec<OpenElement>, text: &str) {
    if let Some(top) = stack.last_mut() {
        if let Some(RepairNode::Text(prev)) = top.children.last_mut() {
            prev.push_str(text);
        } else {
            top.children.push(RepairNode::Text(text.to_string()));
        }
    }
}

/// Parse a tag at the start of `input` (which begins with `<`). Returns the
/// tag and the number of bytes consumed, or `None` when the `<` is not
/// tag-like and should stay literal text.
fn parse_tag(input: &str) -> Option<(RawTag, usize)> {
    let bytes = input.as_bytes();
    match bytes.get(1)? {
        b'!' | b'?' => {
            // Comments, doctypes, and processing instructions are dropped.
            if input.starts_with("<!--") {
                let end = input.find("-->").map(|i| i + 3).unwrap_or(input.len());
                Some((RawTag::Skip, end))
            } else {
                let end = input.find('>').map(|i| i + 1).unwrap_or(input.len());
                Some((RawTag::Skip, end))
            }
        }
        b'/' => {
            let rest = &input[2..];
            let name_len = tag_name_len(rest);
            if name_len == 0 {
                return None;
            }
            let name = rest[..name_len].to_ascii_lowercase();
            let close = rest[name_len..].find('>')?;
            Some((RawTag::Close { name }, 2 + name_len + close + 1))
        }
        b if b.is_ascii_alphabetic() => {
            let rest = &input[1..];
            let name_len = tag_name_len(rest);
            let name = rest[..name_len].to_ascii_lowercase();
            let (attrs, self_closing, used) = parse_attrs(&rest[name_len..])?;
            Some((
                RawTag::Open {
                    name,
                    attrs,
                    self_closing,
                },
                1 + name_len + used,
            ))
        }
        _ => None,
    }
}

fn tag_name_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
        .count()
}

/// Parse attributes from after the tag name through the closing `>`.
/// Returns `None` when the tag is unterminated, so the caller treats the
/// whole thing as literal text.
fn parse_attrs(input: &str) -> Option<(Vec<(String, Option<String>)>, bool, usize)> {
    let bytes = input.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => return Some((attrs, false, i + 1)),
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return Some((attrs, true, i + 2));
                }
                // stray slash
                i += 1;
            }
            _ => {
                let start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                if i == start {
                    // stray '='
                    i += 1;
                    continue;
                }
                let name = input[start..i].to_ascii_lowercase();

                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let value = if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    match bytes.get(i)? {
                        q @ (b'"' | b'\'') => {
                            let q = *q;
                            i += 1;
                            let vstart = i;
                            while i < bytes.len() && bytes[i] != q {
                                i += 1;
                            }
                            let value = input[vstart..i].to_string();
                            if i < bytes.len() {
                                i += 1; // closing quote
                            }
                            Some(value)
                        }
                        _ => {
                            let vstart = i;
                            while i < bytes.len()
                                && !bytes[i].is_ascii_whitespace()
                                && bytes[i] != b'>'
                            {
                                i += 1;
                            }
                            Some(input[vstart..i].trim_end_matches('/').to_string())
                        }
                    }
                } else {
                    None
                };
                // First occurrence wins; the strict parser rejects
                // duplicate attribute names.
                if !attrs.iter().any(|(existing, _)| *existing == name) {
                    attrs.push((name, value));
                }
            }
        }
    }
}

fn serialize_node(node: &RepairNode, out: &mut String) {
    match node {
        RepairNode::Text(text) => out.push_str(&escape_text(text)),
        RepairNode::Element {
            name,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs {
                let _ = write!(
                    out,
                    " {}=\"{}\"",
                    key,
                    escape_attr(value.as_deref().unwrap_or(""))
                );
            }
            if children.is_empty() && is_void(name) {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in children {
                    serialize_node(child, out);
                }
                let _ = write!(out, "</{name}>");
            }
        }
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    escape_markup(text, false)
}

pub(crate) fn escape_attr(text: &str) -> String {
    escape_markup(text, true)
}

fn escape_markup(text: &str, quote: bool) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => {
                out.push_str("&lt;");
                i += 1;
            }
            b'>' => {
                out.push_str("&gt;");
                i += 1;
            }
            b'"' => {
                out.push_str(if quote { "&quot;" } else { "\"" });
                i += 1;
            }
            b'&' => match entity_len(&text[i..]) {
                Some(len) => {
                    out.push_str(&text[i..i + len]);
                    i += len;
                }
                None => {
                    out.push_str("&amp;");
                    i += 1;
                }
            },
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b'<' | b'>' | b'"' | b'&') {
                    i += 1;
                }
                out.push_str(&text[start..i]);
            }
        }
    }
    out
}

/// Length of a character reference at the start of `s`, limited to the five
/// XML entities and numeric references. Anything else gets its ampersand
/// escaped so the strict parser never sees an entity it cannot resolve.
fn entity_len(s: &str) -> Option<usize> {
    for name in ["&lt;", "&gt;", "&amp;", "&quot;", "&apos;"] {
        if s.starts_with(name) {
            return Some(name.len());
        }
    }
    let rest = s.strip_prefix("&#")?;
    let (digits, prefix_len) = match rest.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 3),
        None => (rest, 2),
    };
    let len = if prefix_len == 3 {
        digits
            .bytes()
            .take_while(|b| b.is_ascii_hexdigit())
            .count()
    } else {
        digits.bytes().take_while(|b| b.is_ascii_digit()).count()
    };
    if len > 0 && digits.as_bytes().get(len) == Some(&b';') {
        Some(prefix_len + len + 1)
    } else {
        None
    }
}
