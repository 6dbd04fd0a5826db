use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::diagnostics::Diagnostic;
use crate::features::FeatureFlags;
use crate::property::{is_custom_property_name, PropertyId, PropertyRegistry};
use crate::selector::{
    parse_selector_group, Combinator, ComplexSelector, CompoundSelector, SelectorGroup,
    SimpleSelector, Specificity,
};
use crate::token::{Token, TokenKind, Tokenizer};
use crate::value::{parse_value_from_tokens, Value};

/// Stylesheet origin, the outermost cascade sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    UserAgent,
    User,
    Author,
}

/// Target of a declaration: a registered longhand or a custom property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyRef {
    Known(PropertyId),
    /// Custom property name, case preserved (`--Foo` and `--foo` differ).
    Custom(String),
}

/// A parsed declaration (`property: value [!important]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: PropertyRef,
    pub value: Value,
    /// Raw value text, kept when the value contains `var()`/`env()`/`attr()`
    /// references (substitution splices text and re-parses) and always for
    /// custom properties.
    pub raw: Option<String>,
    /// Whether `!important` was specified.
    pub important: bool,
}

/// A style rule: selector group plus declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selectors: SelectorGroup,
    pub declarations: Vec<Declaration>,
    /// Highest specificity in the group, cached at parse time.
    pub max_specificity: Specificity,
}

impl StyleRule {
    pub fn new(selectors: SelectorGroup, declarations: Vec<Declaration>) -> Self {
        let max_specificity = selectors.max_specificity();
        Self { selectors, declarations, max_specificity }
    }
}

/// Recognised at-rule kinds. Anything else is kept as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtRuleKind {
    Media,
    Supports,
    Import,
    Charset,
    Namespace,
    FontFace,
    Keyframes,
    Page,
    Layer,
    Container,
    Scope,
    Property,
    CustomSelector,
    Unknown,
}

impl AtRuleKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "media" => Self::Media,
            "supports" => Self::Supports,
            "import" => Self::Import,
            "charset" => Self::Charset,
            "namespace" => Self::Namespace,
            "font-face" => Self::FontFace,
            "keyframes" => Self::Keyframes,
            "page" => Self::Page,
            "layer" => Self::Layer,
            "container" => Self::Container,
            "scope" => Self::Scope,
            "property" => Self::Property,
            "custom-selector" => Self::CustomSelector,
            _ => Self::Unknown,
        }
    }
}

/// An at-rule record. Grouping kinds (`@media`, `@supports`, and the
/// flag-gated `@layer`/`@container`/`@scope`) carry parsed child rules;
/// everything else keeps its body as opaque text.
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub kind: AtRuleKind,
    /// Keyword as written, lowercased, without the `@`.
    pub name: String,
    /// Raw prelude text between the keyword and `{` or `;`.
    pub prelude: String,
    pub rules: Vec<Rule>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Style(StyleRule),
    At(AtRule),
}

/// Initial capacity of a stylesheet's rule array.
const INITIAL_RULE_CAPACITY: usize = 64;

/// A parsed stylesheet. Immutable once `parse_stylesheet` returns.
#[derive(Debug)]
pub struct Stylesheet {
    /// Rules in source order. Nested style rules are stored flat, expanded
    /// against their parent selectors.
    pub rules: Vec<Rule>,
    pub origin: Origin,
    pub url: Option<String>,
    /// Optional parse paths this sheet actually used.
    pub features_seen: FeatureFlags,
    pub parse_time: Duration,
    pub diagnostics: Vec<Diagnostic>,
}

impl Stylesheet {
    /// Total number of rule records, including those nested in at-rules.
    pub fn rule_count(&self) -> usize {
        count_rules(&self.rules)
    }

    /// All style rules in cascade order (depth-first through grouping
    /// at-rules).
    pub fn style_rules(&self) -> Vec<&StyleRule> {
        let mut out = Vec::new();
        collect_style_rules(&self.rules, &mut out);
        out
    }
}

fn count_rules(rules: &[Rule]) -> usize {
    rules
        .iter()
        .map(|rule| match rule {
            Rule::Style(_) => 1,
            Rule::At(at) => 1 + count_rules(&at.rules),
        })
        .sum()
}

fn collect_style_rules<'a>(rules: &'a [Rule], out: &mut Vec<&'a StyleRule>) {
    for rule in rules {
        match rule {
            Rule::Style(style) => out.push(style),
            Rule::At(at) => collect_style_rules(&at.rules, out),
        }
    }
}

/// Parse a complete stylesheet.
///
/// Never fails: unparseable constructs are dropped with a diagnostic and
/// parsing resumes at the next recovery point.
pub fn parse_stylesheet(
    input: &str,
    origin: Origin,
    url: Option<&str>,
    registry: &PropertyRegistry,
    flags: FeatureFlags,
) -> Stylesheet {
    let started = Instant::now();
    let mut tokenizer = Tokenizer::new(input);
    let tokens = tokenizer.tokenize_all();
    let mut parser = Parser {
        toks: &tokens,
        src: input,
        registry,
        flags,
        seen: FeatureFlags::empty(),
        diags: tokenizer.take_diagnostics(),
    };
    let mut rules = Vec::with_capacity(INITIAL_RULE_CAPACITY);
    parser.parse_rules(0, tokens.len(), &mut rules);
    Stylesheet {
        rules,
        origin,
        url: url.map(str::to_string),
        features_seen: parser.seen,
        parse_time: started.elapsed(),
        diagnostics: parser.diags,
    }
}

/// Parse a bare declaration list, e.g. the contents of a `style` attribute.
pub fn parse_declaration_block(
    input: &str,
    registry: &PropertyRegistry,
    flags: FeatureFlags,
) -> (Vec<Declaration>, Vec<Diagnostic>) {
    let mut tokenizer = Tokenizer::new(input);
    let tokens = tokenizer.tokenize_all();
    let mut parser = Parser {
        toks: &tokens,
        src: input,
        registry,
        flags,
        seen: FeatureFlags::empty(),
        diags: tokenizer.take_diagnostics(),
    };
    let (declarations, _nested) = parser.parse_block_contents(0, tokens.len(), None);
    (declarations, parser.diags)
}

struct Parser<'a> {
    toks: &'a [Token],
    src: &'a str,
    registry: &'a PropertyRegistry,
    flags: FeatureFlags,
    seen: FeatureFlags,
    diags: Vec<Diagnostic>,
}

impl Parser<'_> {
    fn parse_rules(&mut self, lo: usize, hi: usize, out: &mut Vec<Rule>) {
        let mut pos = lo;
        while pos < hi {
            match &self.toks[pos].kind {
                TokenKind::Whitespace
                | TokenKind::Comment
                | TokenKind::Cdo
                | TokenKind::Cdc => pos += 1,
                TokenKind::AtKeyword(name) => {
                    let name = name.clone();
                    pos = self.parse_at_rule(&name, pos, hi, out);
                }
                _ => match self.parse_qualified_rule(pos, hi, out) {
                    Some(next) => pos = next,
                    None => pos = self.skip_to_next_rule(pos, hi),
                },
            }
        }
    }

    /// Parse one at-rule starting at the `@keyword` token. Returns the
    /// position after the rule.
    fn parse_at_rule(&mut self, name: &str, start: usize, hi: usize, out: &mut Vec<Rule>) -> usize {
        let lower = name.to_ascii_lowercase();
        let kind = AtRuleKind::from_name(&lower);
        self.observe_at_rule(kind);

        let mut pos = start + 1;
        let prelude_lo = pos;
        while pos < hi
            && !matches!(self.toks[pos].kind, TokenKind::LBrace | TokenKind::Semicolon)
        {
            pos += 1;
        }
        let prelude = self.text(prelude_lo, pos).trim().to_string();

        if pos >= hi || self.toks[pos].kind == TokenKind::Semicolon {
            if pos < hi {
                pos += 1;
            }
            out.push(Rule::At(AtRule {
                kind,
                name: lower,
                prelude,
                rules: Vec::new(),
                body: None,
            }));
            return pos;
        }

        // Block form.
        let body_lo = pos + 1;
        let body_end = self.find_block_end(pos, hi);
        let grouping = match kind {
            AtRuleKind::Media | AtRuleKind::Supports => true,
            AtRuleKind::Layer => self.flags.contains(FeatureFlags::CASCADE_LAYERS),
            AtRuleKind::Container => self.flags.contains(FeatureFlags::CONTAINER_QUERIES),
            AtRuleKind::Scope => self.flags.contains(FeatureFlags::SCOPE),
            _ => false,
        };
        let (rules, body) = if grouping {
            let mut inner = Vec::new();
            self.parse_rules(body_lo, body_end, &mut inner);
            (inner, None)
        } else {
            (Vec::new(), Some(self.text(body_lo, body_end).trim().to_string()))
        };
        out.push(Rule::At(AtRule { kind, name: lower, prelude, rules, body }));
        if body_end < hi { body_end + 1 } else { hi }
    }

    /// Parse a qualified rule (`selectors { block }`) and any nested rules
    /// it expands to. Returns the position after the rule, or `None` when
    /// the rule is invalid (nothing is emitted and the caller recovers).
    fn parse_qualified_rule(&mut self, lo: usize, hi: usize, out: &mut Vec<Rule>) -> Option<usize> {
        let mut pos = lo;
        let mut depth = 0usize;
        while pos < hi {
            match self.toks[pos].kind {
                TokenKind::Function(_) | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                TokenKind::LBrace if depth == 0 => break,
                _ => {}
            }
            pos += 1;
        }
        if pos >= hi {
            self.diags.push(Diagnostic::warning(
                self.toks[lo].offset,
                "rule prelude without a block",
            ));
            return None;
        }

        let selector_toks = &self.toks[lo..pos];
        let Some(group) = parse_selector_group(selector_toks, self.src, false, &mut self.diags)
        else {
            self.diags.push(Diagnostic::warning(
                self.toks[lo].offset,
                "invalid selector, dropping rule",
            ));
            return None;
        };

        let body_lo = pos + 1;
        let body_end = self.find_block_end(pos, hi);
        let (declarations, nested) = self.parse_block_contents(body_lo, body_end, Some(&group));
        out.push(Rule::Style(StyleRule::new(group, declarations)));
        out.extend(nested);
        Some(if body_end < hi { body_end + 1 } else { hi })
    }

    /// Parse the contents of a `{}` block: declarations and, when a parent
    /// selector context is given, nested style rules (flattened against the
    /// parent at parse time).
    fn parse_block_contents(
        &mut self,
        lo: usize,
        hi: usize,
        parent: Option<&SelectorGroup>,
    ) -> (Vec<Declaration>, Vec<Rule>) {
        let mut declarations = Vec::new();
        let mut nested: Vec<Rule> = Vec::new();
        let mut pos = lo;
        while pos < hi {
            if matches!(
                self.toks[pos].kind,
                TokenKind::Whitespace | TokenKind::Comment | TokenKind::Semicolon
            ) {
                pos += 1;
                continue;
            }

            // Find the item's extent: a `;` ends a declaration, a top-level
            // `{` means a nested rule.
            let item_lo = pos;
            let mut cursor = pos;
            let mut depth = 0usize;
            let mut brace = None;
            let mut semi = None;
            while cursor < hi {
                match self.toks[cursor].kind {
                    TokenKind::Function(_) | TokenKind::LParen | TokenKind::LBracket => {
                        depth += 1
                    }
                    TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                    TokenKind::LBrace if depth == 0 => {
                        brace = Some(cursor);
                        break;
                    }
                    TokenKind::Semicolon if depth == 0 => {
                        semi = Some(cursor);
                        break;
                    }
                    _ => {}
                }
                cursor += 1;
            }

            if let Some(brace_pos) = brace {
                let block_end = self.find_block_end(brace_pos, hi);
                self.parse_nested_rule(item_lo, brace_pos, block_end, parent, &mut nested);
                pos = if block_end < hi { block_end + 1 } else { hi };
                continue;
            }

            let item_hi = semi.unwrap_or(hi);
            if let Some(decl) = self.parse_declaration(item_lo, item_hi) {
                declarations.push(decl);
            }
            pos = if item_hi < hi { item_hi + 1 } else { hi };
        }
        (declarations, nested)
    }

    fn parse_nested_rule(
        &mut self,
        prelude_lo: usize,
        brace_pos: usize,
        block_end: usize,
        parent: Option<&SelectorGroup>,
        out: &mut Vec<Rule>,
    ) {
        let offset = self.toks[prelude_lo].offset;
        let Some(parent_group) = parent else {
            self.diags.push(Diagnostic::warning(
                offset,
                "nested rule outside of a style rule, skipping block",
            ));
            return;
        };
        if !self.flags.contains(FeatureFlags::NESTING) {
            self.diags.push(Diagnostic::warning(
                offset,
                "nesting is disabled, skipping block",
            ));
            return;
        }
        let selector_toks = &self.toks[prelude_lo..brace_pos];
        let Some(inner) = parse_selector_group(selector_toks, self.src, true, &mut self.diags)
        else {
            self.diags.push(Diagnostic::warning(
                offset,
                "invalid nested selector, dropping rule",
            ));
            return;
        };
        self.seen |= FeatureFlags::NESTING;
        let expanded = expand_nested_group(&inner, parent_group);
        let (declarations, deeper) =
            self.parse_block_contents(brace_pos + 1, block_end, Some(&expanded));
        out.push(Rule::Style(StyleRule::new(expanded, declarations)));
        out.extend(deeper);
    }

    /// Parse `name : value [!important]` from `lo..hi`.
    fn parse_declaration(&mut self, lo: usize, hi: usize) -> Option<Declaration> {
        let mut pos = lo;
        self.skip_trivia(&mut pos, hi);
        if pos >= hi {
            return None;
        }
        let (name, name_offset) = match &self.toks[pos].kind {
            TokenKind::Ident(n) => (n.clone(), self.toks[pos].offset),
            _ => {
                self.diags.push(Diagnostic::warning(
                    self.toks[pos].offset,
                    "expected a declaration",
                ));
                return None;
            }
        };
        pos += 1;
        self.skip_trivia(&mut pos, hi);
        if pos >= hi || self.toks[pos].kind != TokenKind::Colon {
            self.diags.push(Diagnostic::warning(
                name_offset,
                format!("expected ':' after '{name}'"),
            ));
            return None;
        }
        pos += 1;

        let mut v_lo = pos;
        let mut v_hi = hi;
        while v_lo < v_hi && self.is_trivia(v_lo) {
            v_lo += 1;
        }
        while v_hi > v_lo && self.is_trivia(v_hi - 1) {
            v_hi -= 1;
        }
        let (mut v_hi, important) = self.check_important(v_lo, v_hi);
        while v_hi > v_lo && self.is_trivia(v_hi - 1) {
            v_hi -= 1;
        }
        if v_lo >= v_hi {
            self.diags.push(Diagnostic::warning(
                name_offset,
                format!("empty value for '{name}'"),
            ));
            return None;
        }

        let value_tokens = &self.toks[v_lo..v_hi];
        let raw_text = self.text(v_lo, v_hi);

        if is_custom_property_name(&name) {
            // Custom property values are raw token text; the parsed form is
            // best-effort.
            let mut scratch = Vec::new();
            let value = parse_value_from_tokens(value_tokens, self.src, self.flags, &mut scratch)
                .unwrap_or_else(|| Value::Keyword(raw_text.clone()));
            return Some(Declaration {
                property: PropertyRef::Custom(name),
                value,
                raw: Some(raw_text),
                important,
            });
        }

        self.observe_value_features(v_lo, v_hi);
        self.observe_property_name(&name);

        let Some(id) = self.registry.id(&name) else {
            self.diags.push(Diagnostic::warning(
                name_offset,
                format!("unknown property '{name}'"),
            ));
            return None;
        };
        let value =
            match parse_value_from_tokens(value_tokens, self.src, self.flags, &mut self.diags) {
                Some(value) => value,
                None => {
                    self.diags.push(Diagnostic::warning(
                        name_offset,
                        format!("dropping declaration '{name}'"),
                    ));
                    return None;
                }
            };
        let raw = value.has_references().then_some(raw_text);
        Some(Declaration { property: PropertyRef::Known(id), value, raw, important })
    }

    /// Backward scan for a trailing `!important`; returns the value end
    /// index with the suffix stripped.
    fn check_important(&self, lo: usize, hi: usize) -> (usize, bool) {
        let mut end = hi;
        while end > lo && self.is_trivia(end - 1) {
            end -= 1;
        }
        if end > lo {
            if let TokenKind::Ident(word) = &self.toks[end - 1].kind {
                if word.eq_ignore_ascii_case("important") {
                    let mut check = end - 1;
                    while check > lo && self.is_trivia(check - 1) {
                        check -= 1;
                    }
                    if check > lo && self.toks[check - 1].kind == TokenKind::Delim('!') {
                        return (check - 1, true);
                    }
                }
            }
        }
        (end, false)
    }

    // --- Feature observation ---

    fn observe_at_rule(&mut self, kind: AtRuleKind) {
        match kind {
            AtRuleKind::Layer => self.seen |= FeatureFlags::CASCADE_LAYERS,
            AtRuleKind::Container => self.seen |= FeatureFlags::CONTAINER_QUERIES,
            AtRuleKind::Scope => self.seen |= FeatureFlags::SCOPE,
            AtRuleKind::CustomSelector => self.seen |= FeatureFlags::CUSTOM_SELECTORS,
            _ => {}
        }
    }

    fn observe_value_features(&mut self, lo: usize, hi: usize) {
        for i in lo..hi {
            match &self.toks[i].kind {
                TokenKind::Function(name) => {
                    if name.eq_ignore_ascii_case("lab")
                        || name.eq_ignore_ascii_case("lch")
                        || name.eq_ignore_ascii_case("oklab")
                        || name.eq_ignore_ascii_case("oklch")
                        || name.eq_ignore_ascii_case("color-mix")
                        || name.eq_ignore_ascii_case("hwb")
                    {
                        self.seen |= FeatureFlags::COLOR_4;
                    } else if name.eq_ignore_ascii_case("anchor")
                        || name.eq_ignore_ascii_case("anchor-size")
                    {
                        self.seen |= FeatureFlags::ANCHOR_POSITIONING;
                    }
                }
                TokenKind::Ident(word) if word.eq_ignore_ascii_case("subgrid") => {
                    self.seen |= FeatureFlags::SUBGRID;
                }
                _ => {}
            }
        }
    }

    fn observe_property_name(&mut self, name: &str) {
        if is_logical_property_name(name) {
            self.seen |= FeatureFlags::LOGICAL_PROPERTIES;
        }
    }

    // --- Token scanning helpers ---

    /// Index of the `}` matching the `{` at `brace_pos`, or `hi` when the
    /// block runs to the end of input.
    fn find_block_end(&self, brace_pos: usize, hi: usize) -> usize {
        let mut depth = 1usize;
        let mut pos = brace_pos + 1;
        while pos < hi {
            match self.toks[pos].kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return pos;
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        hi
    }

    /// Advance past the next `;`, `}`, or balanced block.
    fn skip_to_next_rule(&self, start: usize, hi: usize) -> usize {
        let mut pos = start;
        while pos < hi {
            match self.toks[pos].kind {
                TokenKind::Semicolon | TokenKind::RBrace => return pos + 1,
                TokenKind::LBrace => {
                    let end = self.find_block_end(pos, hi);
                    return if end < hi { end + 1 } else { hi };
                }
                _ => pos += 1,
            }
        }
        hi
    }

    fn is_trivia(&self, i: usize) -> bool {
        matches!(
            self.toks[i].kind,
            TokenKind::Whitespace | TokenKind::Comment
        )
    }

    fn skip_trivia(&self, pos: &mut usize, hi: usize) {
        while *pos < hi && self.is_trivia(*pos) {
            *pos += 1;
        }
    }

    /// Source text spanned by `toks[lo..hi]`.
    fn text(&self, lo: usize, hi: usize) -> String {
        if lo >= hi {
            return String::new();
        }
        let start = self.toks[lo].offset as usize;
        let end = self.toks[hi - 1].end() as usize;
        self.src[start..end].to_string()
    }
}

fn is_logical_property_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("-inline-")
        || lower.contains("-block-")
        || lower.starts_with("inset-")
        || lower == "inline-size"
        || lower == "block-size"
}

/// Resolve a nested selector group against its parent group: the cartesian
/// product of inner and parent selectors, with `&` substituted or an
/// implicit descendant prefix added.
fn expand_nested_group(inner: &SelectorGroup, parent: &SelectorGroup) -> SelectorGroup {
    let mut selectors = Vec::with_capacity(inner.selectors.len() * parent.selectors.len());
    for sel in &inner.selectors {
        for parent_sel in &parent.selectors {
            selectors.push(expand_complex(sel, parent_sel));
        }
    }
    SelectorGroup { selectors }
}

fn expand_complex(inner: &ComplexSelector, parent: &ComplexSelector) -> ComplexSelector {
    if !inner.references_parent() {
        // No `&`: the nested selector is an implicit descendant.
        let mut parts = inner.parts.clone();
        if let Some(last) = parts.last_mut() {
            last.1 = Some(Combinator::Descendant);
        }
        parts.extend(parent.parts.iter().cloned());
        return ComplexSelector::from_parts(parts);
    }

    let mut parts: Vec<(CompoundSelector, Option<Combinator>)> = Vec::new();
    for (compound, comb) in &inner.parts {
        let has_parent_ref = compound
            .simples
            .iter()
            .any(|s| matches!(s, SimpleSelector::NestingParent));
        if !has_parent_ref {
            parts.push((compound.clone(), *comb));
            continue;
        }
        // Merge the parent's subject compound in place of `&`, then splice
        // the parent's ancestor chain to the left.
        let mut merged: SmallVec<[SimpleSelector; 2]> = SmallVec::new();
        for simple in &compound.simples {
            if matches!(simple, SimpleSelector::NestingParent) {
                merged.extend(parent.parts[0].0.simples.iter().cloned());
            } else {
                merged.push(simple.clone());
            }
        }
        let merged = CompoundSelector { simples: merged };
        if parent.parts.len() == 1 {
            parts.push((merged, *comb));
        } else {
            parts.push((merged, parent.parts[0].1));
            for part in &parent.parts[1..parent.parts.len() - 1] {
                parts.push(part.clone());
            }
            let last = &parent.parts[parent.parts.len() - 1];
            parts.push((last.0.clone(), *comb));
        }
    }
    ComplexSelector::from_parts(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, Rgba};
    use crate::selector::PseudoClass;
    use crate::value::Unit;

    fn parse(css: &str) -> Stylesheet {
        parse_stylesheet(
            css,
            Origin::Author,
            None,
            &PropertyRegistry::new(),
            FeatureFlags::default(),
        )
    }

    fn style(rule: &Rule) -> &StyleRule {
        match rule {
            Rule::Style(style) => style,
            Rule::At(at) => panic!("expected style rule, got @{}", at.name),
        }
    }

    fn at(rule: &Rule) -> &AtRule {
        match rule {
            Rule::At(at) => at,
            Rule::Style(_) => panic!("expected at-rule"),
        }
    }

    #[test]
    fn test_parse_simple_stylesheet() {
        let css = r#"
            body {
                color: red;
                margin-top: 10px;
            }
        "#;
        let sheet = parse(css);
        assert_eq!(sheet.rules.len(), 1);

        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.selectors.selectors.len(), 1);
        assert_eq!(rule.declarations.len(), 2);

        let registry = PropertyRegistry::new();
        assert_eq!(
            rule.declarations[0].property,
            PropertyRef::Known(registry.id("color").unwrap())
        );
        assert_eq!(
            rule.declarations[0].value,
            Value::Color(Color::Rgba(Rgba::rgb(255, 0, 0)))
        );
        assert_eq!(
            rule.declarations[1].value,
            Value::Length(10.0, Unit::Px)
        );
        assert!(sheet.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_multiple_selectors() {
        let sheet = parse("h1, h2, h3 { font-weight: bold; }");
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.selectors.selectors.len(), 3);
        assert_eq!(rule.max_specificity, Specificity::new(0, 0, 0, 1));
    }

    #[test]
    fn test_parse_multiple_rules() {
        let css = r#"
            body { color: black; }
            p { font-size: 16px; }
            .highlight { background-color: yellow; }
        "#;
        let sheet = parse(css);
        assert_eq!(sheet.rules.len(), 3);
        assert_eq!(sheet.rule_count(), 3);
    }

    #[test]
    fn test_unknown_property_dropped() {
        let sheet = parse("p { colr: red; color: blue; }");
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 1);
        assert!(sheet
            .diagnostics
            .iter()
            .any(|d| d.message.contains("unknown property")));
    }

    #[test]
    fn test_custom_property_retained() {
        let sheet = parse("p { --main-width: 10px; }");
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(
            rule.declarations[0].property,
            PropertyRef::Custom("--main-width".into())
        );
        assert_eq!(rule.declarations[0].raw.as_deref(), Some("10px"));
    }

    #[test]
    fn test_important_flag() {
        let sheet = parse("p { color: red !important; font-size: 12px; }");
        let rule = style(&sheet.rules[0]);
        assert!(rule.declarations[0].important);
        assert!(!rule.declarations[1].important);
        // The suffix is stripped from the value.
        assert_eq!(
            rule.declarations[0].value,
            Value::Color(Color::Rgba(Rgba::rgb(255, 0, 0)))
        );
    }

    #[test]
    fn test_declaration_recovery() {
        let sheet = parse("p { color: ; margin-top: 1px; font-size }");
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(rule.declarations[0].value, Value::Length(1.0, Unit::Px));
        assert!(sheet.diagnostics.len() >= 2);
    }

    #[test]
    fn test_invalid_selector_drops_rule() {
        let sheet = parse("p:bogus { color: red; } div { color: blue; }");
        assert_eq!(sheet.rules.len(), 1);
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.selectors.selectors.len(), 1);
        assert!(sheet
            .diagnostics
            .iter()
            .any(|d| d.message.contains("invalid selector")));
    }

    #[test]
    fn test_error_recovery_balanced() {
        let sheet = parse("p { color: red; 5% { nested { x: y } } margin-top: 1px; }");
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 2);
    }

    #[test]
    fn test_media_rule_grouping() {
        let css = r#"
            @media screen {
                body { color: blue; }
                p { font-size: 14px; }
            }
        "#;
        let sheet = parse(css);
        assert_eq!(sheet.rules.len(), 1);
        let media = at(&sheet.rules[0]);
        assert_eq!(media.kind, AtRuleKind::Media);
        assert_eq!(media.prelude, "screen");
        assert_eq!(media.rules.len(), 2);
        assert_eq!(sheet.rule_count(), 3);
        assert_eq!(sheet.style_rules().len(), 2);
    }

    #[test]
    fn test_statement_at_rule() {
        let sheet = parse("@import url(\"style.css\"); body { color: red; }");
        assert_eq!(sheet.rules.len(), 2);
        let import = at(&sheet.rules[0]);
        assert_eq!(import.kind, AtRuleKind::Import);
        assert!(import.body.is_none());
    }

    #[test]
    fn test_unknown_at_rule_kept_opaque() {
        let sheet = parse("@wiggle fast { from: 0; to: 1; } p { color: red; }");
        assert_eq!(sheet.rules.len(), 2);
        let wiggle = at(&sheet.rules[0]);
        assert_eq!(wiggle.kind, AtRuleKind::Unknown);
        assert_eq!(wiggle.name, "wiggle");
        assert_eq!(wiggle.prelude, "fast");
        assert_eq!(wiggle.body.as_deref(), Some("from: 0; to: 1;"));
    }

    #[test]
    fn test_font_face_kept_opaque() {
        let sheet = parse("@font-face { font-family: X; src: url(x.woff2); }");
        let rule = at(&sheet.rules[0]);
        assert_eq!(rule.kind, AtRuleKind::FontFace);
        assert!(rule.rules.is_empty());
        assert!(rule.body.is_some());
    }

    #[test]
    fn test_layer_gated_by_flag() {
        let css = "@layer base { p { color: red; } }";
        let sheet = parse(css);
        let layer = at(&sheet.rules[0]);
        assert!(layer.rules.is_empty());
        assert!(layer.body.is_some());
        assert!(sheet.features_seen.contains(FeatureFlags::CASCADE_LAYERS));

        let flags = FeatureFlags::default() | FeatureFlags::CASCADE_LAYERS;
        let sheet =
            parse_stylesheet(css, Origin::Author, None, &PropertyRegistry::new(), flags);
        let layer = at(&sheet.rules[0]);
        assert_eq!(layer.rules.len(), 1);
    }

    #[test]
    fn test_nested_rule_expansion() {
        let sheet = parse(".card { color: red; .title { color: blue; } }");
        assert_eq!(sheet.rules.len(), 2);

        let outer = style(&sheet.rules[0]);
        assert_eq!(outer.declarations.len(), 1);

        let inner = style(&sheet.rules[1]);
        let sel = &inner.selectors.selectors[0];
        assert_eq!(sel.parts.len(), 2);
        assert_eq!(
            sel.parts[0].0.simples[0],
            SimpleSelector::Class("title".into())
        );
        assert_eq!(sel.parts[0].1, Some(Combinator::Descendant));
        assert_eq!(
            sel.parts[1].0.simples[0],
            SimpleSelector::Class("card".into())
        );
        assert_eq!(sel.specificity, Specificity::new(0, 0, 2, 0));
        assert!(sheet.features_seen.contains(FeatureFlags::NESTING));
    }

    #[test]
    fn test_nested_amp_substitution() {
        let sheet = parse(".card { &:hover { color: red; } }");
        assert_eq!(sheet.rules.len(), 2);
        let inner = style(&sheet.rules[1]);
        let sel = &inner.selectors.selectors[0];
        assert_eq!(sel.parts.len(), 1);
        assert_eq!(
            sel.parts[0].0.simples[0],
            SimpleSelector::Class("card".into())
        );
        assert_eq!(
            sel.parts[0].0.simples[1],
            SimpleSelector::PseudoClass(PseudoClass::Hover)
        );
        assert_eq!(sel.specificity, Specificity::new(0, 0, 2, 0));
    }

    #[test]
    fn test_nested_amp_with_complex_parent() {
        let sheet = parse("nav a { & .icon { width: 16px; } }");
        let inner = style(&sheet.rules[1]);
        let sel = &inner.selectors.selectors[0];
        // .icon <- descendant <- a <- descendant <- nav
        assert_eq!(sel.parts.len(), 3);
        assert_eq!(
            sel.parts[0].0.simples[0],
            SimpleSelector::Class("icon".into())
        );
        assert_eq!(sel.parts[1].0.simples[0], SimpleSelector::Type("a".into()));
        assert_eq!(sel.parts[2].0.simples[0], SimpleSelector::Type("nav".into()));
    }

    #[test]
    fn test_nested_group_cartesian() {
        let sheet = parse("h1, h2 { .x, .y { color: red; } }");
        let inner = style(&sheet.rules[1]);
        assert_eq!(inner.selectors.selectors.len(), 4);
    }

    #[test]
    fn test_nesting_disabled() {
        let flags = FeatureFlags::default() - FeatureFlags::NESTING;
        let sheet = parse_stylesheet(
            ".card { color: red; .title { color: blue; } }",
            Origin::Author,
            None,
            &PropertyRegistry::new(),
            flags,
        );
        assert_eq!(sheet.rules.len(), 1);
        assert!(sheet
            .diagnostics
            .iter()
            .any(|d| d.message.contains("nesting is disabled")));
    }

    #[test]
    fn test_comments_and_cdo_cdc() {
        let sheet = parse("<!-- /* lead */ body { color: /* x */ red; } -->");
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(style(&sheet.rules[0]).declarations.len(), 1);
    }

    #[test]
    fn test_empty_and_garbage_stylesheets() {
        assert_eq!(parse("   \n\t  ").rules.len(), 0);

        let sheet = parse("~~ 5% ) {{{ ");
        assert_eq!(sheet.rules.len(), 0);
        assert!(!sheet.diagnostics.is_empty());
    }

    #[test]
    fn test_rule_array_capacity() {
        let sheet = parse("");
        assert!(sheet.rules.capacity() >= INITIAL_RULE_CAPACITY);
    }

    #[test]
    fn test_sheet_metadata() {
        let sheet = parse_stylesheet(
            "p { color: red; }",
            Origin::User,
            Some("https://example.test/site.css"),
            &PropertyRegistry::new(),
            FeatureFlags::default(),
        );
        assert_eq!(sheet.origin, Origin::User);
        assert_eq!(sheet.url.as_deref(), Some("https://example.test/site.css"));
    }

    #[test]
    fn test_features_seen_color_4() {
        let sheet = parse("p { color: oklch(0.6 0.2 30); }");
        assert!(sheet.features_seen.contains(FeatureFlags::COLOR_4));
        let sheet = parse("p { color: red; }");
        assert!(!sheet.features_seen.contains(FeatureFlags::COLOR_4));
    }

    #[test]
    fn test_var_reference_keeps_raw_text() {
        let sheet = parse("p { width: var(--w, 10px); color: red; }");
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.declarations[0].raw.as_deref(), Some("var(--w, 10px)"));
        assert!(rule.declarations[1].raw.is_none());
    }

    #[test]
    fn test_inline_declaration_block() {
        let registry = PropertyRegistry::new();
        let (decls, diags) = parse_declaration_block(
            "color: red; margin-top: 2px",
            &registry,
            FeatureFlags::default(),
        );
        assert_eq!(decls.len(), 2);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unclosed_block_runs_to_end() {
        let sheet = parse("p { color: red; margin-top: 1px");
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 2);
    }
}
