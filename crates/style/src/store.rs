//! Computed-style storage keyed by node, and whole-tree resolution.
//!
//! `style_tree` walks a subtree in pre-order, so every parent's style is in
//! the store before its children cascade against it.

use css::Stylesheet;
use dom::{Document, NodeId};
use rustc_hash::FxHashMap;

use crate::cascade::{compute, CascadeContext};
use crate::computed::ComputedStyle;

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Computed styles for the elements of one document.
#[derive(Debug, Default)]
pub struct StyleStore {
    styles: FxHashMap<NodeId, ComputedStyle>,
}

impl StyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&ComputedStyle> {
        self.styles.get(&node)
    }

    pub fn insert(&mut self, node: NodeId, style: ComputedStyle) {
        self.styles.insert(node, style);
    }

    pub fn remove(&mut self, node: NodeId) -> Option<ComputedStyle> {
        self.styles.remove(&node)
    }

    pub fn clear(&mut self) {
        self.styles.clear();
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Compute styles for every element in the subtree rooted at `root`.
///
/// Non-element nodes are skipped. Each element's `style` attribute is
/// applied as its inline declaration block.
pub fn style_tree(
    document: &Document,
    root: NodeId,
    stylesheets: &[&Stylesheet],
    ctx: &CascadeContext<'_>,
) -> StyleStore {
    let mut store = StyleStore::new();
    for id in std::iter::once(root).chain(document.descendants(root)) {
        let Some(element) = document.element(id) else {
            continue;
        };
        let style = {
            let parent = element.parent().and_then(|p| store.get(p.node()));
            compute(element, stylesheets, element.attr("style"), parent, ctx)
        };
        store.insert(id, style);
    }
    log::debug!("styled {} elements", store.len());
    store
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use css::{
        parse_stylesheet, parse_value_from_tokens, tokenize, FeatureFlags, Origin,
        PropertyRegistry, Value,
    };

    fn sheet(css: &str, registry: &PropertyRegistry) -> Stylesheet {
        parse_stylesheet(css, Origin::Author, None, registry, FeatureFlags::default())
    }

    fn value(text: &str) -> Value {
        let tokens = tokenize(text);
        let mut diags = Vec::new();
        parse_value_from_tokens(&tokens, text, FeatureFlags::default(), &mut diags)
            .expect("test value should parse")
    }

    #[test]
    fn only_elements_are_styled() {
        let mut doc = Document::new();
        let document = doc.create_document();
        let html = doc.create_html_element("html");
        let body = doc.create_html_element("body");
        let text = doc.create_text("hello");
        let comment = doc.create_comment("note");
        doc.append_child(document, html);
        doc.append_child(html, body);
        doc.append_child(body, text);
        doc.append_child(body, comment);

        let registry = PropertyRegistry::new();
        let env = FxHashMap::default();
        let ctx = CascadeContext {
            registry: &registry,
            flags: FeatureFlags::default(),
            env: &env,
            states: None,
        };
        let store = style_tree(&doc, html, &[], &ctx);
        assert_eq!(store.len(), 2);
        assert!(store.get(html).is_some());
        assert!(store.get(body).is_some());
        assert!(store.get(text).is_none());
        assert!(store.get(comment).is_none());
    }

    #[test]
    fn inheritance_flows_through_the_store() {
        let mut doc = Document::new();
        let document = doc.create_document();
        let html = doc.create_html_element("html");
        let body = doc.create_html_element("body");
        let div = doc.create_html_element("div");
        let p = doc.create_html_element("p");
        doc.append_child(document, html);
        doc.append_child(html, body);
        doc.append_child(body, div);
        doc.append_child(div, p);

        let registry = PropertyRegistry::new();
        let env = FxHashMap::default();
        let ctx = CascadeContext {
            registry: &registry,
            flags: FeatureFlags::default(),
            env: &env,
            states: None,
        };
        let s = sheet(":root { color: green; --accent: #f00 }", &registry);
        let store = style_tree(&doc, html, &[&s], &ctx);

        let color = registry.id("color").unwrap();
        assert_eq!(store.get(p).unwrap().get(color), Some(&value("green")));
        // Custom properties ride the same inheritance path.
        assert_eq!(store.get(p).unwrap().get_custom("--accent"), Some("#f00"));
    }

    #[test]
    fn style_attribute_is_the_inline_block() {
        let mut doc = Document::new();
        let document = doc.create_document();
        let html = doc.create_html_element("html");
        let div = doc.create_element_with("div", &[("style", "color: red")]);
        doc.append_child(document, html);
        doc.append_child(html, div);

        let registry = PropertyRegistry::new();
        let env = FxHashMap::default();
        let ctx = CascadeContext {
            registry: &registry,
            flags: FeatureFlags::default(),
            env: &env,
            states: None,
        };
        let s = sheet("div { color: blue }", &registry);
        let store = style_tree(&doc, html, &[&s], &ctx);

        let color = registry.id("color").unwrap();
        assert_eq!(store.get(div).unwrap().get(color), Some(&value("red")));
    }
}
