//! Element index over an XML part, for offset-based edits.
//!
//! [`XmlDoc::parse`] streams the part through a quick-xml reader/writer pair
//! and records, for every element, where it starts and ends in the
//! re-serialised text. Edits are then plain string splices on that text; the
//! caller re-parses after each edit.

use crate::error::AvatarDeckError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::ops::Range;

/// One element of an indexed document.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Qualified name, e.g. `p:sp`.
    pub name: String,
    pub attrs: Vec<(String, String)>,
    /// Nesting level; the root element is 0.
    pub depth: usize,
    /// Offset of the opening `<`.
    pub start: usize,
    /// Offset just past the closing `>`.
    pub end: usize,
    /// Content between the tags; `None` for a self-closing element.
    pub inner: Option<Range<usize>>,
}

impl Node {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, other: &Node) -> bool {
        other.start >= self.start && other.end <= self.end && other.depth > self.depth
    }

    /// Offset where new children can be appended.
    pub fn append_at(&self) -> Option<usize> {
        self.inner.as_ref().map(|r| r.end)
    }
}

/// An XML part plus the positions of all of its elements.
#[derive(Debug, Clone)]
pub(crate) struct XmlDoc {
    pub text: String,
    pub nodes: Vec<Node>,
}

impl XmlDoc {
    /// Index `xml`. `part` names the package part for error messages.
    pub fn parse(part: &str, xml: &str) -> Result<Self, AvatarDeckError> {
        let bad = |e: String| AvatarDeckError::invalid_deck(part, e);

        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Vec::new());
        let mut nodes: Vec<Node> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| bad(e.to_string()))?;
            let before = writer.get_ref().len();
            match event {
                Event::Eof => break,
                Event::Start(e) => {
                    let (name, attrs) = describe(&e).map_err(bad)?;
                    writer
                        .write_event(Event::Start(e))
                        .map_err(|e| bad(e.to_string()))?;
                    let after = writer.get_ref().len();
                    open.push(nodes.len());
                    nodes.push(Node {
                        name,
                        attrs,
                        depth: open.len() - 1,
                        start: before,
                        end: after,
                        inner: Some(after..after),
                    });
                }
                Event::Empty(e) => {
                    let (name, attrs) = describe(&e).map_err(bad)?;
                    writer
                        .write_event(Event::Empty(e))
                        .map_err(|e| bad(e.to_string()))?;
                    nodes.push(Node {
                        name,
                        attrs,
                        depth: open.len(),
                        start: before,
                        end: writer.get_ref().len(),
                        inner: None,
                    });
                }
                Event::End(e) => {
                    writer
                        .write_event(Event::End(e))
                        .map_err(|e| bad(e.to_string()))?;
                    let idx = open
                        .pop()
                        .ok_or_else(|| bad("unbalanced end tag".to_string()))?;
                    let node = &mut nodes[idx];
                    if let Some(inner) = node.inner.as_mut() {
                        inner.end = before;
                    }
                    node.end = writer.get_ref().len();
                }
                other => writer.write_event(other).map_err(|e| bad(e.to_string()))?,
            }
        }

        if !open.is_empty() {
            return Err(bad("unclosed element".to_string()));
        }
        let text = String::from_utf8(writer.into_inner()).map_err(|e| bad(e.to_string()))?;
        Ok(Self { text, nodes })
    }

    pub fn raw(&self, node: &Node) -> &str {
        &self.text[node.start..node.end]
    }

    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.name == name)
    }

    pub fn first(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Direct children of `parent`, in document order.
    pub fn children<'a>(&'a self, parent: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.depth == parent.depth + 1 && parent.contains(n))
    }

    pub fn child<'a>(&'a self, parent: &'a Node, name: &str) -> Option<&'a Node> {
        self.children(parent).find(|n| n.name == name)
    }

    /// Descendants of `parent` named `name`, at any depth.
    pub fn descendants<'a>(
        &'a self,
        parent: &'a Node,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.name == name && parent.contains(n))
    }

    /// Text of the `a:t` runs under `node`, with `a:br` as a newline.
    pub fn text_of(&self, node: &Node) -> String {
        let mut out = String::new();
        for n in self.nodes.iter().filter(|n| node.contains(n)) {
            match n.name.as_str() {
                "a:t" => {
                    if let Some(inner) = &n.inner {
                        let raw = &self.text[inner.clone()];
                        match quick_xml::escape::unescape(raw) {
                            Ok(s) => out.push_str(&s),
                            Err(_) => out.push_str(raw),
                        }
                    }
                }
                "a:br" => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    /// Largest numeric value of `attr` over all elements named `name`.
    pub fn max_attr(&self, name: &str, attr: &str) -> Option<u32> {
        self.find(name)
            .filter_map(|n| n.attr(attr).and_then(|v| v.parse::<u32>().ok()))
            .max()
    }
}

/// Replace `range` of `text` with `replacement`.
pub(crate) fn splice(text: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..range.start]);
    out.push_str(replacement);
    out.push_str(&text[range.end..]);
    out
}

/// Escape text content for inclusion in a generated fragment.
pub(crate) fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

fn describe(e: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>), String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}
