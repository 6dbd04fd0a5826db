use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use css::{parse_stylesheet, FeatureFlags, Origin, PropertyRegistry};
use dom::{Document, NodeId};
use rustc_hash::FxHashMap;
use style::{style_tree, CascadeContext};

fn generate_css(class_variants: usize) -> String {
    let mut css = String::from(
        r#"
        :root { --pad: 4px; --ink: #222 }
        body { color: #333; font-size: 16px; line-height: 1.4 }
        .container > .item { margin: 4px; padding: var(--pad) }
        .item .label { font-weight: 600; color: var(--ink, black) }
        .item .copy { color: #444 }
        .item:nth-child(2n) .copy { text-decoration: underline }
        .item:nth-child(3n) { background-color: #fafafa }
        .container .item:has(> .label) { border-width: 1px }
    "#,
    );
    for i in 0..class_variants {
        let _ = writeln!(
            css,
            ".c{i} {{ padding: {}px; color: rgb({}, {}, {}) }}",
            (i % 4) + 1,
            (i * 31) % 255,
            (i * 47) % 255,
            (i * 59) % 255,
        );
        let _ = writeln!(css, ".c{i} .copy {{ font-size: {}px }}", 12 + (i % 6));
    }
    css
}

/// body > container > N items, each item holding a label and a copy line.
fn generate_document(nodes: usize, class_variants: usize) -> (Document, NodeId) {
    let mut doc = Document::new();
    let document = doc.create_document();
    let html = doc.create_html_element("html");
    let body = doc.create_html_element("body");
    let container = doc.create_element_with("div", &[("class", "container")]);
    doc.append_child(document, html);
    doc.append_child(html, body);
    doc.append_child(body, container);
    for i in 0..nodes {
        let classes = format!("item c{} c{}", i % class_variants, (i * 3) % class_variants);
        let item = doc.create_element_with("div", &[("class", &classes)]);
        let label = doc.create_element_with("span", &[("class", "label")]);
        let label_text = doc.create_text(&format!("Item {i}"));
        let copy = doc.create_element_with("p", &[("class", "copy")]);
        let copy_text = doc.create_text("Lorem ipsum dolor sit amet");
        doc.append_child(container, item);
        doc.append_child(item, label);
        doc.append_child(label, label_text);
        doc.append_child(item, copy);
        doc.append_child(copy, copy_text);
    }
    (doc, html)
}

fn parse_benchmark(c: &mut Criterion) {
    let registry = PropertyRegistry::new();
    let css = generate_css(24);
    c.bench_function("parse stylesheet 24 class variants", |b| {
        b.iter(|| {
            let sheet = parse_stylesheet(
                black_box(&css),
                Origin::Author,
                None,
                &registry,
                FeatureFlags::default(),
            );
            black_box(sheet);
        });
    });
}

fn cascade_benchmark(c: &mut Criterion) {
    let registry = PropertyRegistry::new();
    let env = FxHashMap::default();
    let css = generate_css(24);
    let sheet = parse_stylesheet(&css, Origin::Author, None, &registry, FeatureFlags::default());
    let (doc, root) = generate_document(400, 24);
    let ctx = CascadeContext {
        registry: &registry,
        flags: FeatureFlags::default(),
        env: &env,
        states: None,
    };
    c.bench_function("style tree 400 items/24 classes", |b| {
        b.iter(|| {
            let store = style_tree(black_box(&doc), root, &[&sheet], &ctx);
            black_box(store);
        });
    });
}

criterion_group!(benches, parse_benchmark, cascade_benchmark);
criterion_main!(benches);
