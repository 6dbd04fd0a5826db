//! Read-only element view and interaction state.
//!
//! [`ElementRef`] is the only surface the selector matcher and cascade see.
//! It exposes lowercase tag names, cached id/class lookups, attribute
//! comparison, and element-only traversal that skips text and comment nodes.
//! Interaction state (`:hover`, `:checked`, ...) is not part of the tree; the
//! host reports it through a [`StateMap`] handed to the matcher.

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;
use css::AttrOp;
use rustc_hash::FxHashMap;

use crate::node::{CompatMode, ElementData, NodeData, NodeId};
use crate::tree::Document;

// ---------------------------------------------------------------------------
// Document mode
// ---------------------------------------------------------------------------

/// Case-sensitivity regime for class and id comparison during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentMode {
    Standards,
    Quirks,
}

// ---------------------------------------------------------------------------
// Interaction state
// ---------------------------------------------------------------------------

bitflags! {
    /// Per-element interaction and form state.
    ///
    /// Enabled/disabled, required/optional and read-only/read-write are
    /// separate bits rather than complements: an element the host never
    /// reported on matches neither side of the pair.
    #[derive(Default)]
    pub struct ElementState: u32 {
        const HOVER = 1 << 0;
        const ACTIVE = 1 << 1;
        const FOCUS = 1 << 2;
        const FOCUS_VISIBLE = 1 << 3;
        const FOCUS_WITHIN = 1 << 4;
        const TARGET = 1 << 5;
        const LINK = 1 << 6;
        const VISITED = 1 << 7;
        const CHECKED = 1 << 8;
        const INDETERMINATE = 1 << 9;
        const DEFAULT = 1 << 10;
        const ENABLED = 1 << 11;
        const DISABLED = 1 << 12;
        const REQUIRED = 1 << 13;
        const OPTIONAL = 1 << 14;
        const READ_ONLY = 1 << 15;
        const READ_WRITE = 1 << 16;
        const PLACEHOLDER_SHOWN = 1 << 17;
    }
}

impl ElementState {
    /// `:any-link` is the union of unvisited and visited links.
    pub fn is_any_link(self) -> bool {
        self.intersects(Self::LINK | Self::VISITED)
    }
}

/// State oracle: per-element [`ElementState`], keyed by node handle.
///
/// The matcher accepts this as an optional input. Elements with no entry
/// report an empty state, so every state pseudo-class evaluates to false
/// when the host supplies no oracle.
#[derive(Debug, Default)]
pub struct StateMap {
    states: FxHashMap<NodeId, ElementState>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the state of `node`.
    pub fn set(&mut self, node: NodeId, state: ElementState) {
        self.states.insert(node, state);
    }

    /// Add flags to the state of `node`.
    pub fn add(&mut self, node: NodeId, state: ElementState) {
        *self.states.entry(node).or_default() |= state;
    }

    /// State of `node`; empty when the host reported none.
    pub fn get(&self, node: NodeId) -> ElementState {
        self.states.get(&node).copied().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// ElementRef
// ---------------------------------------------------------------------------

/// Copyable read-only view of one element in a [`Document`].
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    node: NodeId,
    data: &'a ElementData,
}

impl Document {
    /// Element view of `node`, if it is a live element.
    pub fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        ElementRef::new(self, node)
    }
}

impl<'a> ElementRef<'a> {
    /// View of `node`, if it is a live element node.
    pub fn new(doc: &'a Document, node: NodeId) -> Option<Self> {
        let data = doc.nodes.get(node)?.as_element()?;
        Some(Self { doc, node, data })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Tag name, ASCII-lowercase.
    pub fn tag_name(&self) -> &'a str {
        &self.data.tag_name
    }

    /// `id` attribute, if any.
    pub fn id(&self) -> Option<&'a str> {
        self.data.id.as_deref()
    }

    /// Whether the element carries class `name`, compared per `mode`.
    pub fn has_class(&self, name: &str, mode: DocumentMode) -> bool {
        self.data.classes.iter().any(|c| match mode {
            DocumentMode::Standards => c == name,
            DocumentMode::Quirks => c.eq_ignore_ascii_case(name),
        })
    }

    /// Attribute value; names compare ASCII-case-insensitively.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.data.attr(name)
    }

    /// Evaluate an attribute selector against this element.
    ///
    /// `case_insensitive` is the selector `i` flag and forces
    /// ASCII-case-insensitive value comparison.
    pub fn attr_matches(
        &self,
        name: &str,
        op: AttrOp,
        value: Option<&str>,
        case_insensitive: bool,
    ) -> bool {
        let Some(actual) = self.attr(name) else {
            return false;
        };
        if matches!(op, AttrOp::Exists) {
            return true;
        }
        let Some(expected) = value else {
            return false;
        };
        let ci = case_insensitive;
        match op {
            AttrOp::Exists => true,
            AttrOp::Eq => str_eq(actual, expected, ci),
            AttrOp::Includes => actual.split_whitespace().any(|w| str_eq(w, expected, ci)),
            AttrOp::DashMatch => {
                str_eq(actual, expected, ci)
                    || (actual.len() > expected.len()
                        && str_eq(&actual[..expected.len()], expected, ci)
                        && actual.as_bytes()[expected.len()] == b'-')
            }
            AttrOp::Prefix => {
                !expected.is_empty() && fold_case(actual, ci).starts_with(&*fold_case(expected, ci))
            }
            AttrOp::Suffix => {
                !expected.is_empty() && fold_case(actual, ci).ends_with(&*fold_case(expected, ci))
            }
            AttrOp::Substring => {
                !expected.is_empty() && fold_case(actual, ci).contains(&*fold_case(expected, ci))
            }
        }
    }

    // -- element-only traversal ---------------------------------------------

    /// Parent element. `None` for the root element (its parent is the
    /// document node) and for detached subtree roots.
    pub fn parent(&self) -> Option<ElementRef<'a>> {
        let parent = self.doc.nodes.get(self.node)?.parent?;
        ElementRef::new(self.doc, parent)
    }

    /// Whether this is the document's root element.
    pub fn is_root(&self) -> bool {
        let Some(node) = self.doc.nodes.get(self.node) else {
            return false;
        };
        match node.parent.and_then(|p| self.doc.nodes.get(p)) {
            Some(parent) => matches!(parent.data, NodeData::Document { .. }),
            None => false,
        }
    }

    /// First element child, skipping text and comment nodes.
    pub fn first_child(&self) -> Option<ElementRef<'a>> {
        let mut cursor = self.doc.nodes.get(self.node)?.first_child;
        while let Some(id) = cursor {
            if let Some(el) = ElementRef::new(self.doc, id) {
                return Some(el);
            }
            cursor = self.doc.nodes.get(id)?.next_sibling;
        }
        None
    }

    /// Next element sibling, skipping text and comment nodes.
    pub fn next_sibling(&self) -> Option<ElementRef<'a>> {
        let mut cursor = self.doc.nodes.get(self.node)?.next_sibling;
        while let Some(id) = cursor {
            if let Some(el) = ElementRef::new(self.doc, id) {
                return Some(el);
            }
            cursor = self.doc.nodes.get(id)?.next_sibling;
        }
        None
    }

    /// Previous element sibling, skipping text and comment nodes.
    pub fn previous_sibling(&self) -> Option<ElementRef<'a>> {
        let mut cursor = self.doc.nodes.get(self.node)?.prev_sibling;
        while let Some(id) = cursor {
            if let Some(el) = ElementRef::new(self.doc, id) {
                return Some(el);
            }
            cursor = self.doc.nodes.get(id)?.prev_sibling;
        }
        None
    }

    /// 1-based position among element siblings.
    pub fn child_index(&self) -> usize {
        let mut index = 1;
        let mut cursor = self.previous_sibling();
        while let Some(el) = cursor {
            index += 1;
            cursor = el.previous_sibling();
        }
        index
    }

    /// Whether the element has no child elements and no non-whitespace text.
    /// Comments are ignored.
    pub fn is_empty(&self) -> bool {
        let mut cursor = self.doc.nodes.get(self.node).and_then(|n| n.first_child);
        while let Some(id) = cursor {
            let Some(node) = self.doc.nodes.get(id) else {
                break;
            };
            match &node.data {
                NodeData::Element(_) => return false,
                NodeData::Text { data } if !data.trim().is_empty() => return false,
                _ => {}
            }
            cursor = node.next_sibling;
        }
        true
    }

    /// Nearest `lang` attribute value, on this element or an ancestor.
    pub fn language(&self) -> Option<&'a str> {
        if let Some(lang) = self.attr("lang") {
            return Some(lang);
        }
        let mut cursor = self.doc.nodes.get(self.node).and_then(|n| n.parent);
        while let Some(id) = cursor {
            let node = self.doc.nodes.get(id)?;
            if let Some(el) = node.as_element() {
                if let Some(lang) = el.attr("lang") {
                    return Some(lang);
                }
            }
            cursor = node.parent;
        }
        None
    }

    /// Compatibility mode of the owning document.
    ///
    /// Limited-quirks keeps standards case rules, so it folds to `Standards`.
    /// Detached subtrees have no document node and default to `Standards`.
    pub fn document_mode(&self) -> DocumentMode {
        let mut cursor = Some(self.node);
        while let Some(id) = cursor {
            let Some(node) = self.doc.nodes.get(id) else {
                break;
            };
            if let NodeData::Document { compat_mode } = node.data {
                return match compat_mode {
                    CompatMode::Quirks => DocumentMode::Quirks,
                    CompatMode::NoQuirks | CompatMode::LimitedQuirks => DocumentMode::Standards,
                };
            }
            cursor = node.parent;
        }
        DocumentMode::Standards
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.data.tag_name)?;
        if let Some(id) = &self.data.id {
            write!(f, " id={id:?}")?;
        }
        write!(f, ">")
    }
}

fn str_eq(a: &str, b: &str, ci: bool) -> bool {
    if ci {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

fn fold_case(s: &str, ci: bool) -> Cow<'_, str> {
    if ci {
        Cow::Owned(s.to_ascii_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
