use smallvec::SmallVec;

use crate::diagnostics::Diagnostic;
use crate::token::{Token, TokenKind};

/// Combinator between compound selectors in a complex selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: ancestor descendant
    Descendant,
    /// `>`: parent > child
    Child,
    /// `+`: prev + next
    NextSibling,
    /// `~`: prev ~ subsequent
    SubsequentSibling,
    /// `||`: column || cell
    Column,
}

/// Attribute selector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=val]`
    Eq,
    /// `[attr~=val]`
    Includes,
    /// `[attr|=val]`
    DashMatch,
    /// `[attr^=val]`
    Prefix,
    /// `[attr$=val]`
    Suffix,
    /// `[attr*=val]`
    Substring,
}

/// `An+B` coefficients for the `:nth-*` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i32,
    pub b: i32,
}

impl Nth {
    /// True when a non-negative integer `n` exists with `index = a*n + b`.
    pub fn matches(self, index: i32) -> bool {
        if self.a == 0 {
            return index == self.b;
        }
        let delta = index - self.b;
        delta % self.a == 0 && delta / self.a >= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

/// Pseudo-class selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Hover,
    Active,
    Focus,
    FocusVisible,
    FocusWithin,
    Link,
    Visited,
    AnyLink,
    Target,
    Enabled,
    Disabled,
    Checked,
    Indeterminate,
    Default,
    Required,
    Optional,
    ReadOnly,
    ReadWrite,
    PlaceholderShown,
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    /// `:not(...)`, parsed strictly.
    Not(Vec<ComplexSelector>),
    /// `:is(...)`, parsed forgivingly; an empty list matches nothing.
    Is(Vec<ComplexSelector>),
    /// `:where(...)`, forgiving like `:is` but contributes zero specificity.
    Where(Vec<ComplexSelector>),
    /// `:has(...)`, parsed strictly, evaluated over the element's subtree.
    Has(Vec<ComplexSelector>),
    Lang(Vec<String>),
    Dir(Direction),
}

/// Pseudo-element selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoElement {
    Before,
    After,
    FirstLine,
    FirstLetter,
    Marker,
    Placeholder,
    Selection,
    Backdrop,
}

/// A single simple selector component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// Type selector, e.g. `div`, `p`. Stored lowercased.
    Type(String),
    /// Universal selector `*`.
    Universal,
    /// ID selector `#foo`.
    Id(String),
    /// Class selector `.bar`.
    Class(String),
    /// Attribute selector `[name op value flag?]`.
    Attribute {
        name: String,
        op: AttrOp,
        value: Option<String>,
        case_insensitive: bool,
    },
    PseudoClass(PseudoClass),
    PseudoElement(PseudoElement),
    /// `&`, legal only inside a nested rule; replaced by the parent selector
    /// when the rule is flattened.
    NestingParent,
}

/// A compound selector is a sequence of simple selectors without combinators
/// between them (e.g. `div.foo#bar`). A type or universal selector, when
/// present, is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub simples: SmallVec<[SimpleSelector; 2]>,
}

/// A complex selector is a chain of compound selectors separated by
/// combinators. Stored right-to-left for matching: `parts[0]` is the
/// rightmost (subject) compound.
///
/// Each element is `(compound, optional_combinator_to_the_left)`; the last
/// element's combinator is `None`, except for the relative selectors inside
/// `:has()`, where it records the combinator anchoring the selector to the
/// element under test. The specificity is computed once at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<(CompoundSelector, Option<Combinator>)>,
    pub specificity: Specificity,
}

impl ComplexSelector {
    pub fn from_parts(parts: Vec<(CompoundSelector, Option<Combinator>)>) -> Self {
        let specificity = compute_specificity(&parts);
        Self { parts, specificity }
    }

    /// True when any compound contains `&`.
    pub fn references_parent(&self) -> bool {
        self.parts.iter().any(|(compound, _)| {
            compound
                .simples
                .iter()
                .any(|s| matches!(s, SimpleSelector::NestingParent))
        })
    }
}

/// A comma-separated, non-empty list of complex selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorGroup {
    pub selectors: Vec<ComplexSelector>,
}

impl SelectorGroup {
    /// The highest specificity among the group's selectors.
    pub fn max_specificity(&self) -> Specificity {
        self.selectors
            .iter()
            .map(|s| s.specificity)
            .max()
            .unwrap_or_else(Specificity::zero)
    }
}

/// CSS specificity as `(inline, id, class, type)`:
///   - `inline`: 1 for style-attribute declarations, set by the cascade
///   - `id`: count of ID selectors
///   - `class`: count of class, attribute, and pseudo-class selectors
///   - `ty`: count of type selectors and pseudo-elements
///
/// `!important` is never folded in here; the cascade keys on origin and
/// importance separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Specificity {
    pub inline: u32,
    pub id: u32,
    pub class: u32,
    pub ty: u32,
}

impl Specificity {
    pub fn new(inline: u32, id: u32, class: u32, ty: u32) -> Self {
        Self { inline, id, class, ty }
    }

    pub fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Specificity of an inline `style=""` declaration.
    pub fn inline_style() -> Self {
        Self::new(1, 0, 0, 0)
    }

    /// Add two specificities component-wise.
    pub fn add(self, other: Specificity) -> Specificity {
        Specificity {
            inline: self.inline + other.inline,
            id: self.id + other.id,
            class: self.class + other.class,
            ty: self.ty + other.ty,
        }
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inline
            .cmp(&other.inline)
            .then(self.id.cmp(&other.id))
            .then(self.class.cmp(&other.class))
            .then(self.ty.cmp(&other.ty))
    }
}

/// Compute the specificity of a sequence of compound selectors.
pub fn compute_specificity(parts: &[(CompoundSelector, Option<Combinator>)]) -> Specificity {
    let mut spec = Specificity::zero();
    for (compound, _) in parts {
        spec = spec.add(compound_specificity(compound));
    }
    spec
}

fn compound_specificity(compound: &CompoundSelector) -> Specificity {
    let mut spec = Specificity::zero();
    for simple in &compound.simples {
        spec = spec.add(simple_specificity(simple));
    }
    spec
}

fn simple_specificity(simple: &SimpleSelector) -> Specificity {
    match simple {
        SimpleSelector::Id(_) => Specificity::new(0, 1, 0, 0),
        SimpleSelector::Class(_) | SimpleSelector::Attribute { .. } => {
            Specificity::new(0, 0, 1, 0)
        }
        SimpleSelector::PseudoClass(pc) => match pc {
            // :is/:not/:has take the most specific argument; :where is
            // always zero.
            PseudoClass::Not(list) | PseudoClass::Is(list) | PseudoClass::Has(list) => list
                .iter()
                .map(|s| s.specificity)
                .max()
                .unwrap_or_else(Specificity::zero),
            PseudoClass::Where(_) => Specificity::zero(),
            _ => Specificity::new(0, 0, 1, 0),
        },
        SimpleSelector::Type(_) | SimpleSelector::PseudoElement(_) => {
            Specificity::new(0, 0, 0, 1)
        }
        SimpleSelector::Universal | SimpleSelector::NestingParent => Specificity::zero(),
    }
}

/// Parse a selector group from the tokens of a rule prelude.
///
/// Strict at the top level: any invalid complex selector invalidates the
/// whole group and the caller drops the rule. `nested` permits the `&`
/// nesting-parent selector.
pub fn parse_selector_group(
    tokens: &[Token],
    src: &str,
    nested: bool,
    diags: &mut Vec<Diagnostic>,
) -> Option<SelectorGroup> {
    let mut parser = SelectorParser { toks: tokens, src, nested, diags };
    let selectors = parser.parse_list(0, tokens.len(), false)?;
    if selectors.is_empty() {
        return None;
    }
    Some(SelectorGroup { selectors })
}

struct SelectorParser<'a> {
    toks: &'a [Token],
    src: &'a str,
    nested: bool,
    diags: &'a mut Vec<Diagnostic>,
}

impl SelectorParser<'_> {
    /// Comma-separated list of complex selectors within `lo..hi`. In
    /// forgiving mode invalid entries are dropped; otherwise any failure
    /// poisons the list.
    fn parse_list(
        &mut self,
        lo: usize,
        hi: usize,
        forgiving: bool,
    ) -> Option<Vec<ComplexSelector>> {
        let mut selectors = Vec::new();
        for (seg_lo, seg_hi) in self.split_commas(lo, hi) {
            match self.parse_complex(seg_lo, seg_hi) {
                Some(sel) => selectors.push(sel),
                None if forgiving => {
                    let offset = self.toks.get(seg_lo).map_or(0, |t| t.offset);
                    self.diags.push(Diagnostic::warning(
                        offset,
                        "dropping invalid selector in forgiving list",
                    ));
                }
                None => return None,
            }
        }
        Some(selectors)
    }

    /// Comma-separated list of relative selectors, as accepted by `:has()`.
    ///
    /// Each entry may begin with a combinator anchoring it to the element
    /// under test; a bare selector anchors as a descendant. The anchor is
    /// recorded as the (otherwise always-`None`) combinator of the leftmost
    /// part. Strict: any invalid entry poisons the list.
    fn parse_relative_list(&mut self, lo: usize, hi: usize) -> Option<Vec<ComplexSelector>> {
        let mut selectors = Vec::new();
        for (seg_lo, seg_hi) in self.split_commas(lo, hi) {
            let mut pos = seg_lo;
            self.skip_ws(&mut pos, seg_hi);
            let anchor = match self.toks.get(pos).map(|t| &t.kind) {
                Some(TokenKind::Delim('>')) if pos < seg_hi => {
                    pos += 1;
                    Combinator::Child
                }
                Some(TokenKind::Delim('+')) if pos < seg_hi => {
                    pos += 1;
                    Combinator::NextSibling
                }
                Some(TokenKind::Delim('~')) if pos < seg_hi => {
                    pos += 1;
                    Combinator::SubsequentSibling
                }
                Some(TokenKind::Delim('|'))
                    if pos + 1 < seg_hi
                        && self.toks[pos + 1].kind == TokenKind::Delim('|')
                        && self.adjacent(pos, pos + 1) =>
                {
                    pos += 2;
                    Combinator::Column
                }
                _ => Combinator::Descendant,
            };
            let mut complex = self.parse_complex(pos, seg_hi)?;
            if let Some(last) = complex.parts.last_mut() {
                last.1 = Some(anchor);
            }
            selectors.push(complex);
        }
        Some(selectors)
    }

    /// Split `lo..hi` on commas outside of `()` and `[]`.
    fn split_commas(&self, lo: usize, hi: usize) -> Vec<(usize, usize)> {
        let mut segments = Vec::new();
        let mut depth = 0usize;
        let mut start = lo;
        for i in lo..hi {
            match self.toks[i].kind {
                TokenKind::Function(_) | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                TokenKind::Comma if depth == 0 => {
                    segments.push((start, i));
                    start = i + 1;
                }
                _ => {}
            }
        }
        segments.push((start, hi));
        segments
    }

    fn parse_complex(&mut self, lo: usize, hi: usize) -> Option<ComplexSelector> {
        let mut pos = lo;
        let mut end = hi;
        while pos < end && self.is_ignorable(pos) {
            pos += 1;
        }
        while end > pos && self.is_ignorable(end - 1) {
            end -= 1;
        }
        if pos == end {
            return None;
        }

        let mut parts_ltr: Vec<(CompoundSelector, Option<Combinator>)> = Vec::new();
        let mut pending: Option<Combinator> = None;
        loop {
            let compound = self.parse_compound(&mut pos, end)?;
            parts_ltr.push((compound, pending));

            let mut saw_ws = false;
            while pos < end {
                match self.toks[pos].kind {
                    TokenKind::Whitespace => {
                        saw_ws = true;
                        pos += 1;
                    }
                    TokenKind::Comment => pos += 1,
                    _ => break,
                }
            }
            if pos >= end {
                break;
            }

            let combinator = match self.toks[pos].kind {
                TokenKind::Delim('>') => {
                    pos += 1;
                    Combinator::Child
                }
                TokenKind::Delim('+') => {
                    pos += 1;
                    Combinator::NextSibling
                }
                TokenKind::Delim('~') => {
                    pos += 1;
                    Combinator::SubsequentSibling
                }
                TokenKind::Delim('|')
                    if pos + 1 < end
                        && self.toks[pos + 1].kind == TokenKind::Delim('|')
                        && self.adjacent(pos, pos + 1) =>
                {
                    pos += 2;
                    Combinator::Column
                }
                _ if saw_ws => Combinator::Descendant,
                _ => return None,
            };
            while pos < end && self.is_ignorable(pos) {
                pos += 1;
            }
            // A combinator with nothing after it is a stray combinator.
            if pos >= end {
                return None;
            }
            pending = Some(combinator);
        }

        parts_ltr.reverse();
        Some(ComplexSelector::from_parts(parts_ltr))
    }

    fn parse_compound(&mut self, pos: &mut usize, end: usize) -> Option<CompoundSelector> {
        let mut simples: SmallVec<[SimpleSelector; 2]> = SmallVec::new();
        while *pos < end {
            match &self.toks[*pos].kind {
                TokenKind::Comment => {
                    *pos += 1;
                }
                TokenKind::Ident(name) => {
                    if !simples.is_empty() {
                        return None;
                    }
                    simples.push(SimpleSelector::Type(name.to_ascii_lowercase()));
                    *pos += 1;
                }
                TokenKind::Delim('*') => {
                    if !simples.is_empty() {
                        return None;
                    }
                    simples.push(SimpleSelector::Universal);
                    *pos += 1;
                }
                TokenKind::Hash { value, id_valid } => {
                    if !id_valid {
                        return None;
                    }
                    simples.push(SimpleSelector::Id(value.clone()));
                    *pos += 1;
                }
                TokenKind::Delim('.') => {
                    let name = match self.toks.get(*pos + 1).map(|t| &t.kind) {
                        Some(TokenKind::Ident(name)) if *pos + 1 < end => name.clone(),
                        _ => return None,
                    };
                    simples.push(SimpleSelector::Class(name));
                    *pos += 2;
                }
                TokenKind::Delim('&') => {
                    if !self.nested {
                        return None;
                    }
                    simples.push(SimpleSelector::NestingParent);
                    *pos += 1;
                }
                TokenKind::LBracket => {
                    simples.push(self.parse_attribute(pos, end)?);
                }
                TokenKind::Colon => {
                    simples.push(self.parse_pseudo(pos, end)?);
                }
                TokenKind::Whitespace
                | TokenKind::Comma
                | TokenKind::Delim('>')
                | TokenKind::Delim('+')
                | TokenKind::Delim('~')
                | TokenKind::Delim('|')
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::RParen => break,
                _ => return None,
            }
        }
        if simples.is_empty() {
            return None;
        }
        Some(CompoundSelector { simples })
    }

    /// `[name]`, `[name=value]`, `[name op value]`, optional `i`/`s` flag.
    fn parse_attribute(&mut self, pos: &mut usize, end: usize) -> Option<SimpleSelector> {
        *pos += 1; // '['
        self.skip_ws(pos, end);

        let name = match self.toks.get(*pos).map(|t| &t.kind) {
            Some(TokenKind::Ident(n)) if *pos < end => n.clone(),
            _ => return None,
        };
        *pos += 1;
        self.skip_ws(pos, end);

        if *pos < end && self.toks[*pos].kind == TokenKind::RBracket {
            *pos += 1;
            return Some(SimpleSelector::Attribute {
                name,
                op: AttrOp::Exists,
                value: None,
                case_insensitive: false,
            });
        }

        let op = match self.toks.get(*pos).map(|t| &t.kind) {
            Some(TokenKind::Delim('=')) => {
                *pos += 1;
                AttrOp::Eq
            }
            Some(TokenKind::Delim(c @ ('~' | '|' | '^' | '$' | '*')))
                if *pos + 1 < end
                    && self.toks[*pos + 1].kind == TokenKind::Delim('=')
                    && self.adjacent(*pos, *pos + 1) =>
            {
                let op = match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                };
                *pos += 2;
                op
            }
            _ => return None,
        };
        self.skip_ws(pos, end);

        let value = match self.toks.get(*pos).map(|t| &t.kind) {
            Some(TokenKind::Ident(v)) if *pos < end => v.clone(),
            Some(TokenKind::String(v)) if *pos < end => v.clone(),
            _ => return None,
        };
        *pos += 1;
        self.skip_ws(pos, end);

        let mut case_insensitive = false;
        if let Some(TokenKind::Ident(flag)) = self.toks.get(*pos).map(|t| &t.kind) {
            if *pos < end {
                if flag.eq_ignore_ascii_case("i") {
                    case_insensitive = true;
                    *pos += 1;
                } else if flag.eq_ignore_ascii_case("s") {
                    *pos += 1;
                } else {
                    return None;
                }
                self.skip_ws(pos, end);
            }
        }

        if *pos < end && self.toks[*pos].kind == TokenKind::RBracket {
            *pos += 1;
            Some(SimpleSelector::Attribute {
                name,
                op,
                value: Some(value),
                case_insensitive,
            })
        } else {
            None
        }
    }

    fn parse_pseudo(&mut self, pos: &mut usize, end: usize) -> Option<SimpleSelector> {
        *pos += 1; // ':'
        if *pos < end && self.toks[*pos].kind == TokenKind::Colon {
            *pos += 1;
            let name = match self.toks.get(*pos).map(|t| &t.kind) {
                Some(TokenKind::Ident(n)) if *pos < end => n.to_ascii_lowercase(),
                _ => return None,
            };
            *pos += 1;
            return pseudo_element(&name).map(SimpleSelector::PseudoElement);
        }

        match self.toks.get(*pos).map(|t| t.kind.clone()) {
            Some(TokenKind::Ident(name)) if *pos < end => {
                *pos += 1;
                let lower = name.to_ascii_lowercase();
                // Single-colon spellings of the legacy pseudo-elements are
                // still valid.
                if let Some(pe) = pseudo_element(&lower) {
                    return Some(SimpleSelector::PseudoElement(pe));
                }
                pseudo_class_keyword(&lower).map(SimpleSelector::PseudoClass)
            }
            Some(TokenKind::Function(name)) if *pos < end => {
                let args_lo = *pos + 1;
                let close = self.find_close(args_lo, end)?;
                *pos = close + 1;
                let lower = name.to_ascii_lowercase();
                self.parse_functional(&lower, args_lo, close)
                    .map(SimpleSelector::PseudoClass)
            }
            _ => None,
        }
    }

    fn parse_functional(&mut self, name: &str, lo: usize, hi: usize) -> Option<PseudoClass> {
        match name {
            "nth-child" => self.parse_anb(lo, hi).map(PseudoClass::NthChild),
            "nth-last-child" => self.parse_anb(lo, hi).map(PseudoClass::NthLastChild),
            "nth-of-type" => self.parse_anb(lo, hi).map(PseudoClass::NthOfType),
            "nth-last-of-type" => self.parse_anb(lo, hi).map(PseudoClass::NthLastOfType),
            "not" => {
                let list = self.parse_list(lo, hi, false)?;
                if list.is_empty() {
                    return None;
                }
                Some(PseudoClass::Not(list))
            }
            "is" => Some(PseudoClass::Is(self.parse_list(lo, hi, true)?)),
            "where" => Some(PseudoClass::Where(self.parse_list(lo, hi, true)?)),
            "has" => {
                let list = self.parse_relative_list(lo, hi)?;
                if list.is_empty() {
                    return None;
                }
                Some(PseudoClass::Has(list))
            }
            "lang" => {
                let mut langs = Vec::new();
                for i in lo..hi {
                    match &self.toks[i].kind {
                        TokenKind::Ident(tag) | TokenKind::String(tag) => {
                            langs.push(tag.clone())
                        }
                        TokenKind::Whitespace | TokenKind::Comment | TokenKind::Comma => {}
                        _ => return None,
                    }
                }
                if langs.is_empty() {
                    return None;
                }
                Some(PseudoClass::Lang(langs))
            }
            "dir" => {
                let mut dir = None;
                for i in lo..hi {
                    match &self.toks[i].kind {
                        TokenKind::Ident(word) if dir.is_none() => {
                            dir = if word.eq_ignore_ascii_case("ltr") {
                                Some(Direction::Ltr)
                            } else if word.eq_ignore_ascii_case("rtl") {
                                Some(Direction::Rtl)
                            } else {
                                return None;
                            };
                        }
                        TokenKind::Whitespace | TokenKind::Comment => {}
                        _ => return None,
                    }
                }
                dir.map(PseudoClass::Dir)
            }
            _ => None,
        }
    }

    /// `An+B`: `odd`, `even`, `<integer>`, or the `An` / `An+B` / `An-B`
    /// forms in their various tokenizations.
    fn parse_anb(&mut self, lo: usize, hi: usize) -> Option<Nth> {
        let sig: Vec<&Token> = self.toks[lo..hi]
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))
            .collect();

        match sig.as_slice() {
            [t] => match &t.kind {
                TokenKind::Ident(word) if word.eq_ignore_ascii_case("odd") => {
                    return Some(Nth { a: 2, b: 1 });
                }
                TokenKind::Ident(word) if word.eq_ignore_ascii_case("even") => {
                    return Some(Nth { a: 2, b: 0 });
                }
                TokenKind::Number { value, is_integer: true } => {
                    return Some(Nth { a: 0, b: *value as i32 });
                }
                _ => {}
            },
            [] => return None,
            _ => {}
        }

        // Leading `An` part: a dimension with an `n…` unit, an ident
        // starting with `n` or `-n`, or `+` glued to such an ident.
        let mut i = 0;
        let (a, tail): (i32, String) = match &sig[i].kind {
            TokenKind::Dimension { value, unit } => {
                if value.fract() != 0.0 {
                    return None;
                }
                (*value as i32, unit.to_ascii_lowercase())
            }
            TokenKind::Ident(word) => {
                let lower = word.to_ascii_lowercase();
                if let Some(rest) = lower.strip_prefix("-n") {
                    (-1, format!("n{rest}"))
                } else {
                    (1, lower)
                }
            }
            TokenKind::Delim('+') if sig.len() > 1 => {
                let next = sig[i + 1];
                if next.offset != sig[i].end() {
                    return None;
                }
                match &next.kind {
                    TokenKind::Ident(word) => {
                        i += 1;
                        (1, word.to_ascii_lowercase())
                    }
                    _ => return None,
                }
            }
            _ => return None,
        };
        i += 1;

        let rest = tail.strip_prefix('n')?;
        let b = if rest.is_empty() {
            match sig.get(i) {
                None => 0,
                // `2n+1` / `2n -1`: the sign rode along on the number token.
                Some(t) => match &t.kind {
                    TokenKind::Number { value, is_integer: true }
                        if self.signed_number(t) && i + 1 == sig.len() =>
                    {
                        *value as i32
                    }
                    TokenKind::Delim(sign @ ('+' | '-')) => {
                        let num = sig.get(i + 1)?;
                        match &num.kind {
                            TokenKind::Number { value, is_integer: true }
                                if !self.signed_number(num) && i + 2 == sig.len() =>
                            {
                                let v = *value as i32;
                                if *sign == '-' { -v } else { v }
                            }
                            _ => return None,
                        }
                    }
                    _ => return None,
                },
            }
        } else if rest == "-" {
            // `2n- 1`
            let num = sig.get(i)?;
            match &num.kind {
                TokenKind::Number { value, is_integer: true }
                    if !self.signed_number(num) && i + 1 == sig.len() =>
                {
                    -(*value as i32)
                }
                _ => return None,
            }
        } else {
            // `2n-1`: digits folded into the dimension unit.
            let digits = rest.strip_prefix('-')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || i != sig.len()
            {
                return None;
            }
            -digits.parse::<i32>().ok()?
        };

        Some(Nth { a, b })
    }

    /// Whether a number token was written with an explicit `+`/`-`.
    fn signed_number(&self, token: &Token) -> bool {
        matches!(
            self.src.as_bytes().get(token.offset as usize),
            Some(b'+') | Some(b'-')
        )
    }

    /// Index of the `RParen` closing the function whose arguments begin at
    /// `start`; `None` when unterminated.
    fn find_close(&self, start: usize, end: usize) -> Option<usize> {
        let mut depth = 1usize;
        for i in start..end {
            match self.toks[i].kind {
                TokenKind::Function(_) | TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn skip_ws(&self, pos: &mut usize, end: usize) {
        while *pos < end
            && matches!(
                self.toks[*pos].kind,
                TokenKind::Whitespace | TokenKind::Comment
            )
        {
            *pos += 1;
        }
    }

    fn is_ignorable(&self, i: usize) -> bool {
        matches!(
            self.toks[i].kind,
            TokenKind::Whitespace | TokenKind::Comment
        )
    }

    fn adjacent(&self, i: usize, j: usize) -> bool {
        self.toks[i].end() == self.toks[j].offset
    }
}

fn pseudo_element(name: &str) -> Option<PseudoElement> {
    match name {
        "before" => Some(PseudoElement::Before),
        "after" => Some(PseudoElement::After),
        "first-line" => Some(PseudoElement::FirstLine),
        "first-letter" => Some(PseudoElement::FirstLetter),
        "marker" => Some(PseudoElement::Marker),
        "placeholder" => Some(PseudoElement::Placeholder),
        "selection" => Some(PseudoElement::Selection),
        "backdrop" => Some(PseudoElement::Backdrop),
        _ => None,
    }
}

fn pseudo_class_keyword(name: &str) -> Option<PseudoClass> {
    let pc = match name {
        "hover" => PseudoClass::Hover,
        "active" => PseudoClass::Active,
        "focus" => PseudoClass::Focus,
        "focus-visible" => PseudoClass::FocusVisible,
        "focus-within" => PseudoClass::FocusWithin,
        "link" => PseudoClass::Link,
        "visited" => PseudoClass::Visited,
        "any-link" => PseudoClass::AnyLink,
        "target" => PseudoClass::Target,
        "enabled" => PseudoClass::Enabled,
        "disabled" => PseudoClass::Disabled,
        "checked" => PseudoClass::Checked,
        "indeterminate" => PseudoClass::Indeterminate,
        "default" => PseudoClass::Default,
        "required" => PseudoClass::Required,
        "optional" => PseudoClass::Optional,
        "read-only" => PseudoClass::ReadOnly,
        "read-write" => PseudoClass::ReadWrite,
        "placeholder-shown" => PseudoClass::PlaceholderShown,
        "root" => PseudoClass::Root,
        "empty" => PseudoClass::Empty,
        "first-child" => PseudoClass::FirstChild,
        "last-child" => PseudoClass::LastChild,
        "only-child" => PseudoClass::OnlyChild,
        "first-of-type" => PseudoClass::FirstOfType,
        "last-of-type" => PseudoClass::LastOfType,
        "only-of-type" => PseudoClass::OnlyOfType,
        _ => return None,
    };
    Some(pc)
}
