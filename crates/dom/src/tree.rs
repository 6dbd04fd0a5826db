//! Document tree operations.
//!
//! [`Document`] owns an `Arena<Node>` and provides the tree-manipulation
//! methods that keep the intrusive parent/child/sibling links consistent.
//! The style engine only ever reads the tree; mutation happens while the
//! host builds it.

use arena::Arena;

use crate::node::{Attr, CompatMode, ElementData, Namespace, Node, NodeData, NodeId};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The complete document tree.
pub struct Document {
    pub nodes: Arena<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document (no nodes yet).
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
        }
    }

    // =======================================================================
    // Node creation
    // =======================================================================

    /// Create the document node. Starts in no-quirks mode.
    pub fn create_document(&mut self) -> NodeId {
        self.nodes.insert(Node::new(NodeData::Document {
            compat_mode: CompatMode::NoQuirks,
        }))
    }

    /// Create a doctype node.
    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeData::DocumentType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        }))
    }

    /// Create an element node.
    ///
    /// The tag name is stored ASCII-lowercase and the `id` / `classes` caches
    /// are extracted from `attrs` (attribute names compared case-insensitively,
    /// as an HTML parser would have lowercased them).
    pub fn create_element(&mut self, tag_name: &str, namespace: Namespace, attrs: Vec<Attr>) -> NodeId {
        let id = attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case("id"))
            .map(|a| a.value.clone());
        let classes = attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case("class"))
            .map(|a| a.value.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        self.nodes.insert(Node::new(NodeData::Element(ElementData {
            namespace,
            tag_name: tag_name.to_ascii_lowercase(),
            attrs,
            id,
            classes,
        })))
    }

    /// Create an HTML element from `(name, value)` attribute pairs.
    pub fn create_element_with(&mut self, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|&(name, value)| Attr {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect();
        self.create_element(tag_name, Namespace::Html, attrs)
    }

    /// Create an HTML element with no attributes.
    pub fn create_html_element(&mut self, tag_name: &str) -> NodeId {
        self.create_element(tag_name, Namespace::Html, Vec::new())
    }

    /// Create a text node.
    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeData::Text {
            data: data.to_string(),
        }))
    }

    /// Create a comment node.
    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeData::Comment {
            data: data.to_string(),
        }))
    }

    /// Set the compatibility mode on a document node.
    pub fn set_compat_mode(&mut self, document: NodeId, mode: CompatMode) {
        if let Some(node) = self.nodes.get_mut(document) {
            if let NodeData::Document { compat_mode } = &mut node.data {
                *compat_mode = mode;
            }
        }
    }

    // =======================================================================
    // Tree mutation
    // =======================================================================

    /// Append `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is detached from its current
    /// position first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes.get(child).and_then(|n| n.parent).is_some() {
            self.detach(child);
        }

        let old_last = self.nodes.get(parent).and_then(|n| n.last_child);

        if let Some(old_last_id) = old_last {
            if let Some(old_last_node) = self.nodes.get_mut(old_last_id) {
                old_last_node.next_sibling = Some(child);
            }
        }

        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
            child_node.prev_sibling = old_last;
            child_node.next_sibling = None;
        }

        if let Some(parent_node) = self.nodes.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = Some(child);
            }
            parent_node.last_child = Some(child);
        }
    }

    /// Remove `child` from `parent`'s child list, leaving it detached.
    ///
    /// Does nothing if `child` is not currently a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let belongs = self
            .nodes
            .get(child)
            .map(|n| n.parent == Some(parent))
            .unwrap_or(false);
        if belongs {
            self.detach(child);
        }
    }

    /// Insert `child` immediately before `reference` in `parent`'s child list.
    ///
    /// A `None` reference appends.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let Some(reference) = reference else {
            self.append_child(parent, child);
            return;
        };

        if self.nodes.get(child).and_then(|n| n.parent).is_some() {
            self.detach(child);
        }

        let prev_of_ref = self.nodes.get(reference).and_then(|n| n.prev_sibling);

        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
            child_node.prev_sibling = prev_of_ref;
            child_node.next_sibling = Some(reference);
        }

        if let Some(ref_node) = self.nodes.get_mut(reference) {
            ref_node.prev_sibling = Some(child);
        }

        if let Some(prev_id) = prev_of_ref {
            if let Some(prev_node) = self.nodes.get_mut(prev_id) {
                prev_node.next_sibling = Some(child);
            }
        } else if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.first_child = Some(child);
        }
    }

    /// Unlink a node from its parent without deallocating it.
    fn detach(&mut self, node_id: NodeId) {
        let (parent_id, prev, next) = match self.nodes.get(node_id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if let Some(prev_id) = prev {
            if let Some(prev_node) = self.nodes.get_mut(prev_id) {
                prev_node.next_sibling = next;
            }
        }
        if let Some(next_id) = next {
            if let Some(next_node) = self.nodes.get_mut(next_id) {
                next_node.prev_sibling = prev;
            }
        }

        if let Some(pid) = parent_id {
            if let Some(parent_node) = self.nodes.get_mut(pid) {
                if parent_node.first_child == Some(node_id) {
                    parent_node.first_child = next;
                }
                if parent_node.last_child == Some(node_id) {
                    parent_node.last_child = prev;
                }
            }
        }

        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    // =======================================================================
    // Traversal
    // =======================================================================

    /// Immediate children of `parent` in document order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(parent).and_then(|n| n.first_child);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.nodes.get(id).and_then(|n| n.next_sibling);
        }
        out
    }

    /// Ancestor chain of `node`, nearest first, root last.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.nodes.get(id).and_then(|n| n.parent);
        }
        out
    }

    /// All descendants of `root` in pre-order, not including `root` itself.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(root).and_then(|n| n.first_child);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.next_preorder(id, root);
        }
        out
    }

    /// Pre-order successor of `node` within the subtree rooted at `root`.
    fn next_preorder(&self, node: NodeId, root: NodeId) -> Option<NodeId> {
        if let Some(child) = self.nodes.get(node).and_then(|n| n.first_child) {
            return Some(child);
        }
        let mut cursor = node;
        loop {
            if cursor == root {
                return None;
            }
            let n = self.nodes.get(cursor)?;
            if let Some(sibling) = n.next_sibling {
                return Some(sibling);
            }
            cursor = n.parent?;
        }
    }

    /// First element in the subtree rooted at `root` (inclusive) whose `id`
    /// attribute equals `id`, in pre-order.
    pub fn element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|&n| {
                self.nodes
                    .get(n)
                    .and_then(|node| node.as_element())
                    .and_then(|el| el.id.as_deref())
                    == Some(id)
            })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small document and return the interesting handles.
    ///
    /// ```text
    /// document
    /// └── html
    ///     └── body
    ///         ├── div#main
    ///         │   ├── p.intro ("first")
    ///         │   └── p       ("second")
    ///         └── <!-- note -->
    /// ```
    fn sample_tree() -> (Document, NodeId, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();

        let document = doc.create_document();
        let html = doc.create_html_element("html");
        let body = doc.create_html_element("body");
        let div = doc.create_element_with("div", &[("id", "main")]);
        let p1 = doc.create_element_with("p", &[("class", "intro highlight")]);
        let p1_text = doc.create_text("first");
        let p2 = doc.create_html_element("p");
        let p2_text = doc.create_text("second");
        let note = doc.create_comment(" note ");

        doc.append_child(document, html);
        doc.append_child(html, body);
        doc.append_child(body, div);
        doc.append_child(div, p1);
        doc.append_child(p1, p1_text);
        doc.append_child(div, p2);
        doc.append_child(p2, p2_text);
        doc.append_child(body, note);

        (doc, document, html, body, div, p1, p2)
    }

    // -- creation -----------------------------------------------------------

    #[test]
    fn document_starts_in_no_quirks() {
        let mut doc = Document::new();
        let document = doc.create_document();
        assert!(matches!(
            doc.nodes.get(document).unwrap().data,
            NodeData::Document {
                compat_mode: CompatMode::NoQuirks
            }
        ));
    }

    #[test]
    fn set_compat_mode_updates_document() {
        let mut doc = Document::new();
        let document = doc.create_document();
        doc.set_compat_mode(document, CompatMode::Quirks);
        assert!(matches!(
            doc.nodes.get(document).unwrap().data,
            NodeData::Document {
                compat_mode: CompatMode::Quirks
            }
        ));
    }

    #[test]
    fn element_caches_id_and_classes() {
        let mut doc = Document::new();
        let el = doc.create_element_with("div", &[("id", "main"), ("class", "foo bar baz")]);
        let elem = doc.nodes.get(el).unwrap().as_element().unwrap();
        assert_eq!(elem.id.as_deref(), Some("main"));
        assert_eq!(elem.classes, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn tag_name_stored_lowercase() {
        let mut doc = Document::new();
        let el = doc.create_html_element("DIV");
        let elem = doc.nodes.get(el).unwrap().as_element().unwrap();
        assert_eq!(elem.tag_name, "div");
    }

    #[test]
    fn attr_lookup_is_name_case_insensitive() {
        let mut doc = Document::new();
        let el = doc.create_element_with("input", &[("TYPE", "text")]);
        let elem = doc.nodes.get(el).unwrap().as_element().unwrap();
        assert_eq!(elem.attr("type"), Some("text"));
        assert_eq!(elem.attr("Type"), Some("text"));
        assert_eq!(elem.attr("missing"), None);
    }

    // -- append_child -------------------------------------------------------

    #[test]
    fn append_child_sets_links() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("div");
        let c1 = doc.create_html_element("span");
        let c2 = doc.create_text("hi");

        doc.append_child(parent, c1);
        doc.append_child(parent, c2);

        let p = doc.nodes.get(parent).unwrap();
        assert_eq!(p.first_child, Some(c1));
        assert_eq!(p.last_child, Some(c2));

        let n1 = doc.nodes.get(c1).unwrap();
        assert_eq!(n1.parent, Some(parent));
        assert_eq!(n1.prev_sibling, None);
        assert_eq!(n1.next_sibling, Some(c2));

        let n2 = doc.nodes.get(c2).unwrap();
        assert_eq!(n2.parent, Some(parent));
        assert_eq!(n2.prev_sibling, Some(c1));
        assert_eq!(n2.next_sibling, None);
    }

    #[test]
    fn append_child_moves_from_old_parent() {
        let mut doc = Document::new();
        let p1 = doc.create_html_element("div");
        let p2 = doc.create_html_element("section");
        let child = doc.create_html_element("span");

        doc.append_child(p1, child);
        doc.append_child(p2, child);

        assert!(doc.children(p1).is_empty());
        assert_eq!(doc.children(p2), vec![child]);
    }

    // -- remove_child -------------------------------------------------------

    #[test]
    fn remove_middle_child_relinks_siblings() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("ul");
        let a = doc.create_html_element("li");
        let b = doc.create_html_element("li");
        let c = doc.create_html_element("li");

        doc.append_child(parent, a);
        doc.append_child(parent, b);
        doc.append_child(parent, c);
        doc.remove_child(parent, b);

        assert_eq!(doc.children(parent), vec![a, c]);
        assert_eq!(doc.nodes.get(a).unwrap().next_sibling, Some(c));
        assert_eq!(doc.nodes.get(c).unwrap().prev_sibling, Some(a));

        let nb = doc.nodes.get(b).unwrap();
        assert_eq!(nb.parent, None);
        assert_eq!(nb.prev_sibling, None);
        assert_eq!(nb.next_sibling, None);
    }

    #[test]
    fn remove_first_and_last_children() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("ul");
        let a = doc.create_html_element("li");
        let b = doc.create_html_element("li");
        let c = doc.create_html_element("li");

        doc.append_child(parent, a);
        doc.append_child(parent, b);
        doc.append_child(parent, c);

        doc.remove_child(parent, a);
        let p = doc.nodes.get(parent).unwrap();
        assert_eq!(p.first_child, Some(b));

        doc.remove_child(parent, c);
        let p = doc.nodes.get(parent).unwrap();
        assert_eq!(p.first_child, Some(b));
        assert_eq!(p.last_child, Some(b));
    }

    #[test]
    fn remove_only_child_clears_parent_links() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("ul");
        let a = doc.create_html_element("li");

        doc.append_child(parent, a);
        doc.remove_child(parent, a);

        let p = doc.nodes.get(parent).unwrap();
        assert_eq!(p.first_child, None);
        assert_eq!(p.last_child, None);
    }

    #[test]
    fn remove_child_with_wrong_parent_is_noop() {
        let mut doc = Document::new();
        let p1 = doc.create_html_element("div");
        let p2 = doc.create_html_element("section");
        let child = doc.create_html_element("span");

        doc.append_child(p1, child);
        doc.remove_child(p2, child);
        assert_eq!(doc.children(p1), vec![child]);
    }

    // -- insert_before ------------------------------------------------------

    #[test]
    fn insert_before_middle_and_front() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("ul");
        let a = doc.create_html_element("li");
        let b = doc.create_html_element("li");
        let c = doc.create_html_element("li");

        doc.append_child(parent, c);
        doc.insert_before(parent, a, Some(c));
        doc.insert_before(parent, b, Some(c));

        assert_eq!(doc.children(parent), vec![a, b, c]);
        let p = doc.nodes.get(parent).unwrap();
        assert_eq!(p.first_child, Some(a));
        assert_eq!(p.last_child, Some(c));
    }

    #[test]
    fn insert_before_none_appends() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("ul");
        let a = doc.create_html_element("li");
        let b = doc.create_html_element("li");

        doc.append_child(parent, a);
        doc.insert_before(parent, b, None);
        assert_eq!(doc.children(parent), vec![a, b]);
    }

    #[test]
    fn reinsert_after_remove() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("ul");
        let a = doc.create_html_element("li");
        let b = doc.create_html_element("li");
        let c = doc.create_html_element("li");

        doc.append_child(parent, a);
        doc.append_child(parent, b);
        doc.append_child(parent, c);

        doc.remove_child(parent, b);
        doc.insert_before(parent, b, Some(a));
        assert_eq!(doc.children(parent), vec![b, a, c]);
    }

    // -- traversal ----------------------------------------------------------

    #[test]
    fn children_of_leaf_is_empty() {
        let mut doc = Document::new();
        let el = doc.create_html_element("div");
        assert!(doc.children(el).is_empty());
    }

    #[test]
    fn ancestors_chain_nearest_first() {
        let (doc, document, html, body, div, p1, _p2) = sample_tree();
        assert_eq!(doc.ancestors(p1), vec![div, body, html, document]);
        assert!(doc.ancestors(document).is_empty());
    }

    #[test]
    fn descendants_preorder() {
        let (doc, _document, _html, body, div, p1, p2) = sample_tree();

        let desc = doc.descendants(div);
        assert_eq!(desc.len(), 4);
        assert_eq!(desc[0], p1);
        assert!(doc.nodes.get(desc[1]).unwrap().is_text());
        assert_eq!(desc[2], p2);
        assert!(doc.nodes.get(desc[3]).unwrap().is_text());

        // body: div, p1, text, p2, text, comment
        assert_eq!(doc.descendants(body).len(), 6);
    }

    #[test]
    fn descendants_stops_at_subtree_boundary() {
        let (doc, _document, _html, _body, div, p1, _p2) = sample_tree();
        // p1's subtree is just its text child, not p2 (a sibling outside it).
        let desc = doc.descendants(p1);
        assert_eq!(desc.len(), 1);
        assert!(doc.nodes.get(desc[0]).unwrap().is_text());
    }

    #[test]
    fn append_many_children_keeps_order() {
        let mut doc = Document::new();
        let parent = doc.create_html_element("div");
        let mut ids = Vec::new();
        for i in 0..10 {
            let child = doc.create_text(&format!("child {i}"));
            doc.append_child(parent, child);
            ids.push(child);
        }
        assert_eq!(doc.children(parent), ids);
    }

    // -- queries ------------------------------------------------------------

    #[test]
    fn element_by_id_search() {
        let (doc, document, _html, _body, div, _p1, _p2) = sample_tree();
        assert_eq!(doc.element_by_id(document, "main"), Some(div));
        assert_eq!(doc.element_by_id(document, "absent"), None);
        // Inclusive of the search root itself.
        assert_eq!(doc.element_by_id(div, "main"), Some(div));
    }
}
