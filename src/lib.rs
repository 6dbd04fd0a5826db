//! # CSS Engine
//!
//! CSS parsing, selector matching, and cascade resolution over an HTML-like
//! element tree.
//!
//! The work happens in three subsystem crates, re-exported here: [`css`]
//! (tokenizer and the value, selector, and rule parsers), [`dom`] (arena
//! element tree with the read-only views the matcher consumes), and
//! [`style`] (selector matching, cascade, reference substitution, and the
//! per-document style store). [`engine`] wraps them behind a configured
//! facade.
//!
//! ```
//! use css_engine::{CssEngine, EngineConfig};
//! use dom::Document;
//!
//! let mut doc = Document::new();
//! let root = doc.create_document();
//! let html = doc.create_html_element("html");
//! let p = doc.create_html_element("p");
//! doc.append_child(root, html);
//! doc.append_child(html, p);
//!
//! let mut engine = CssEngine::new(EngineConfig::default());
//! let sheet = engine.parse_stylesheet("p { color: green }", None);
//! let style = engine.compute_style(&doc, p, &[&sheet], None);
//! let color = engine.registry().id("color").unwrap();
//! assert!(style.get(color).is_some());
//! ```

pub mod engine;

pub use engine::{ColorScheme, CssEngine, EngineConfig, EngineStats, Viewport};

pub use css;
pub use dom;
pub use style;
