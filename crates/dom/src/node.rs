//! Node storage for the document tree.
//!
//! Nodes live in a generational [`arena::Arena`] and refer to each other by
//! [`NodeId`] handles, so the tree needs no `Rc`/`RefCell` and stale handles
//! fail lookup instead of aliasing recycled slots.

use arena::Handle;

/// Handle to a node in a [`crate::Document`] arena.
pub type NodeId = Handle;

// ---------------------------------------------------------------------------
// Element data
// ---------------------------------------------------------------------------

/// Element namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

/// Document compatibility mode, set from the doctype by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatMode {
    NoQuirks,
    Quirks,
    LimitedQuirks,
}

/// A single attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

/// Payload of an element node.
///
/// `id` and `classes` are caches extracted from `attrs` at creation time so
/// selector matching does not re-split the `class` attribute per test.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub namespace: Namespace,
    /// Tag name, stored ASCII-lowercase.
    pub tag_name: String,
    pub attrs: Vec<Attr>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl ElementData {
    /// Value of the first attribute whose name matches ASCII-case-insensitively.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// What kind of node this is, with per-kind payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document {
        compat_mode: CompatMode,
    },
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element(ElementData),
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
}

/// A tree node: payload plus intrusive parent/child/sibling links.
///
/// Links are maintained exclusively by [`crate::Document`]; code outside the
/// tree module reads them but never writes them.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text { .. })
    }

    /// Element payload, if this is an element node.
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }
}
