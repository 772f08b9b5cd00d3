//! Lenient HTML tree
//!
//! Fragments arrive from rich-text editors and are rarely well formed, so
//! parsing never fails: mismatched end tags are ignored, unclosed elements
//! are closed at the end of input, and anything after an unrecoverable
//! syntax error is kept as text.
//!
//! Text and attribute values are stored exactly as they appear in the
//! source. Character references are resolved later, once the markup has
//! been rewritten.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Index of a node in its [`Dom`]
pub type NodeId = usize;

/// Elements that never have children or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Arena-backed document tree
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    pub const ROOT: NodeId = 0;

    fn empty() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                children: Vec::new(),
            }],
        }
    }

    /// Parse an HTML fragment, tolerating malformed input
    pub fn parse(html: &str) -> Self {
        let mut dom = Self::empty();
        let mut open: Vec<NodeId> = vec![Self::ROOT];

        let mut reader = Reader::from_str(html);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.check_comments = false;
        config.expand_empty_elements = false;

        loop {
            let offset = reader.buffer_position() as usize;
            let parent = open.last().copied().unwrap_or(Self::ROOT);

            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let (tag, attributes) = element_parts(&e);
                    let void = is_void(&tag);
                    let id = dom.append(parent, NodeKind::Element { tag, attributes });
                    if !void {
                        open.push(id);
                    }
                }
                Ok(Event::Empty(e)) => {
                    let (tag, attributes) = element_parts(&e);
                    dom.append(parent, NodeKind::Element { tag, attributes });
                }
                Ok(Event::End(e)) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    if let Some(pos) = open
                        .iter()
                        .rposition(|&id| id != Self::ROOT && dom.tag(id) == Some(tag.as_str()))
                    {
                        open.truncate(pos);
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    dom.append_text(parent, text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    dom.append_text(parent, text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(offset, error = %err, "unparseable HTML kept as text");
                    if let Some(rest) = html.get(offset..) {
                        dom.append_text(parent, rest.to_string());
                    }
                    break;
                }
            }
        }

        dom
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn append_text(&mut self, parent: NodeId, text: String) {
        if !text.is_empty() {
            self.append(parent, NodeKind::Text(text));
        }
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Lowercased tag name, if `id` is an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Raw value of an attribute, if `id` is an element carrying it
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Every element reachable from the root, in document order
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            if matches!(self.nodes[id].kind, NodeKind::Element { .. }) {
                out.push(id);
            }
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for &child in &self.nodes[id].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Replace a node and its subtree with a single text node
    pub fn replace_with_text(&mut self, id: NodeId, text: String) {
        let node = &mut self.nodes[id];
        node.kind = NodeKind::Text(text);
        node.children.clear();
    }

    /// Write the tree back out as HTML
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write_node(Self::ROOT, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Root => self.write_children(id, out),
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                out.push('>');
                if !is_void(tag) {
                    self.write_children(id, out);
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        for &child in &self.nodes[id].children {
            self.write_node(child, out);
        }
    }
}

fn element_parts(e: &BytesStart<'_>) -> (String, Vec<(String, String)>) {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let attributes = e
        .html_attributes()
        .with_checks(false)
        .filter_map(|attr| attr.ok())
        .map(|attr| {
            (
                String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            )
        })
        .collect();
    (tag, attributes)
}
