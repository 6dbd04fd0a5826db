//! End-to-end cascade behavior through the public engine surface, plus the
//! whole-input guarantees of the tokenizer and parsers.

use css::{
    parse_selector_group, parse_value_from_tokens, tokenize, FeatureFlags, PropertyId, Specificity,
    Value,
};
use css_engine::{CssEngine, EngineConfig};
use dom::{Document, NodeId};
use style::{match_group, MatchContext};

fn new_engine() -> CssEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    CssEngine::new(EngineConfig::default())
}

fn value(text: &str) -> Value {
    let tokens = tokenize(text);
    let mut diags = Vec::new();
    parse_value_from_tokens(&tokens, text, FeatureFlags::default(), &mut diags)
        .expect("test value should parse")
}

/// document > html > body, returning (doc, html, body).
fn shell() -> (Document, NodeId, NodeId) {
    let mut doc = Document::new();
    let document = doc.create_document();
    let html = doc.create_html_element("html");
    let body = doc.create_html_element("body");
    doc.append_child(document, html);
    doc.append_child(html, body);
    (doc, html, body)
}

// ─── Cascade scenarios ───────────────────────────────────────────────────────

#[test]
fn specificity_orders_the_cascade() {
    let (mut doc, _, body) = shell();
    let p = doc.create_element_with("p", &[("id", "a"), ("class", "x")]);
    doc.append_child(body, p);

    let mut engine = new_engine();
    let sheet = engine.parse_stylesheet(
        "p { color: red } p.x { color: blue } #a { color: green }",
        None,
    );
    let style = engine.compute_style(&doc, p, &[&sheet], None);
    let color = engine.registry().id("color").unwrap();
    assert_eq!(style.get(color), Some(&value("green")));
}

#[test]
fn important_declarations_compare_by_specificity() {
    let (mut doc, _, body) = shell();
    let p = doc.create_element_with("p", &[("id", "a"), ("class", "x")]);
    doc.append_child(body, p);

    let mut engine = new_engine();
    let sheet = engine.parse_stylesheet(
        "#a { color: red !important } p.x { color: blue !important }",
        None,
    );
    let style = engine.compute_style(&doc, p, &[&sheet], None);
    let color = engine.registry().id("color").unwrap();
    assert_eq!(style.get(color), Some(&value("red")));
}

#[test]
fn grouped_selectors_style_each_listed_element() {
    let (mut doc, _, body) = shell();
    let h1 = doc.create_html_element("h1");
    let h2 = doc.create_html_element("h2");
    let h3 = doc.create_html_element("h3");
    let h4 = doc.create_html_element("h4");
    for h in [h1, h2, h3, h4] {
        doc.append_child(body, h);
    }

    let mut engine = new_engine();
    let sheet = engine.parse_stylesheet("h1, h2, h3 { margin: 0 }", None);
    let margin = engine.registry().id("margin").unwrap();
    for h in [h1, h2, h3] {
        let style = engine.compute_style(&doc, h, &[&sheet], None);
        assert_eq!(style.get(margin), Some(&value("0")));
    }

    // The group lists three headings; the fourth is not a target.
    let rules = sheet.style_rules();
    let ctx = MatchContext::standards();
    assert!(match_group(&rules[0].selectors, doc.element(h3).unwrap(), &ctx).is_some());
    assert!(match_group(&rules[0].selectors, doc.element(h4).unwrap(), &ctx).is_none());
}

#[test]
fn variable_cycle_falls_back_at_the_reference() {
    let (mut doc, _, body) = shell();
    let div = doc.create_element_with("div", &[("class", "x")]);
    doc.append_child(body, div);

    let mut engine = new_engine();
    let sheet = engine.parse_stylesheet(
        ":root { --a: var(--b, 10px); --b: var(--a); } .x { width: var(--a, 20px); }",
        None,
    );
    let style = engine.compute_style(&doc, div, &[&sheet], None);
    let width = engine.registry().id("width").unwrap();
    // Both custom properties sit on the cycle and resolve to nothing; the
    // reference outside the cycle uses its own fallback.
    assert_eq!(style.get(width), Some(&value("20px")));
    assert_eq!(style.get_custom("--a"), None);
    assert_eq!(style.get_custom("--b"), None);
}

#[test]
fn nested_rules_flatten_against_the_parent() {
    let (mut doc, _, body) = shell();
    let card = doc.create_element_with("div", &[("class", "card")]);
    let title = doc.create_element_with("span", &[("class", "title")]);
    doc.append_child(body, card);
    doc.append_child(card, title);

    let mut engine = new_engine();
    let sheet = engine.parse_stylesheet(".card { color: red; & .title { color: blue; } }", None);
    let color = engine.registry().id("color").unwrap();

    let style = engine.compute_style(&doc, card, &[&sheet], None);
    assert_eq!(style.get(color), Some(&value("red")));
    let style = engine.compute_style(&doc, title, &[&sheet], None);
    assert_eq!(style.get(color), Some(&value("blue")));
}

#[test]
fn has_matches_on_contained_children() {
    let (mut doc, _, body) = shell();
    let with_img = doc.create_html_element("article");
    let img = doc.create_html_element("img");
    let with_p = doc.create_html_element("article");
    let p = doc.create_html_element("p");
    doc.append_child(body, with_img);
    doc.append_child(with_img, img);
    doc.append_child(body, with_p);
    doc.append_child(with_p, p);

    let mut engine = new_engine();
    let sheet = engine.parse_stylesheet("article:has(> img) { padding: 10px }", None);
    let padding = engine.registry().id("padding").unwrap();

    let style = engine.compute_style(&doc, with_img, &[&sheet], None);
    assert_eq!(style.get(padding), Some(&value("10px")));
    let style = engine.compute_style(&doc, with_p, &[&sheet], None);
    assert_eq!(style.get(padding), Some(&value("0")));
}

// ─── Whole-input guarantees ──────────────────────────────────────────────────

#[test]
fn token_lengths_cover_the_input() {
    let inputs = [
        "p { color: red; } /* tail */",
        "\"unterminated string",
        "url(missing-paren",
        "@media (min-width: 600px) { a { color: #ff0000 } }",
        "calc(1px + 2%) 3e-2 --custom-ident u+1f600",
        "  \t\n  ",
        "",
    ];
    for input in inputs {
        let tokens = tokenize(input);
        let total: u32 = tokens.iter().map(|t| t.len).sum();
        assert_eq!(total as usize, input.len(), "token coverage for {input:?}");
    }
}

#[test]
fn parsing_never_fails() {
    let mut engine = new_engine();

    // Pure garbage parses to an empty stylesheet with diagnostics.
    let sheet = engine.parse_stylesheet("@@@ }{ %%% ]] ((", None);
    assert_eq!(sheet.rule_count(), 0);
    assert!(!sheet.diagnostics.is_empty());

    // A bad declaration is dropped while both rules survive.
    let sheet = engine.parse_stylesheet("p { color } q { color: blue }", None);
    assert_eq!(sheet.rule_count(), 2);
}

#[test]
fn specificity_addition_is_associative_and_commutative() {
    let a = Specificity::new(0, 1, 2, 3);
    let b = Specificity::new(1, 0, 4, 1);
    let c = Specificity::new(0, 2, 0, 5);
    assert_eq!(a.add(b), b.add(a));
    assert_eq!(a.add(b).add(c), a.add(b.add(c)));
    assert_eq!(a.add(Specificity::zero()), a);
}

#[test]
fn where_contributes_nothing_to_specificity() {
    let src = ":where(#a, .b.c)";
    let tokens = tokenize(src);
    let mut diags = Vec::new();
    let group = parse_selector_group(&tokens, src, false, &mut diags).unwrap();
    assert_eq!(group.selectors[0].specificity, Specificity::zero());

    // The same argument under :is keeps its weight.
    let src = ":is(#a, .b.c)";
    let tokens = tokenize(src);
    let group = parse_selector_group(&tokens, src, false, &mut diags).unwrap();
    assert_eq!(group.selectors[0].specificity, Specificity::new(0, 1, 0, 0));
}

#[test]
fn recomputation_is_deterministic() {
    let (mut doc, _, body) = shell();
    let div = doc.create_element_with("div", &[("class", "x"), ("style", "top: 4px")]);
    doc.append_child(body, div);

    let mut engine = new_engine();
    let sheet = engine.parse_stylesheet(
        ":root { --pad: 6px } .x { padding: var(--pad); color: red !important }",
        None,
    );
    let first = engine.compute_style(&doc, div, &[&sheet], None);
    let second = engine.compute_style(&doc, div, &[&sheet], None);
    assert_eq!(first, second);
}

#[test]
fn untargeted_elements_inherit() {
    let (mut doc, _, body) = shell();
    let p = doc.create_html_element("p");
    doc.append_child(body, p);

    let mut engine = new_engine();
    let inherited: Vec<PropertyId> = engine
        .registry()
        .ids()
        .filter(|&id| engine.registry().is_inherited(id))
        .collect();
    let sheet = engine.parse_stylesheet("body { color: green; font-size: 18px }", None);

    let body_style = engine.compute_style(&doc, body, &[&sheet], None);
    let p_style = engine.compute_style(&doc, p, &[&sheet], None);
    for id in inherited {
        assert_eq!(
            p_style.get(id),
            body_style.get(id),
            "inherited property {}",
            engine.registry().name(id)
        );
    }
}

#[test]
fn nested_calc_collapses() {
    assert_eq!(value("calc(calc(10px + 5px))"), value("calc(10px + 5px)"));
    assert_eq!(value("calc(calc(2 + 1))"), value("calc(2 + 1)"));
}
