//! Selector matching over the document tree.
//!
//! Complex selectors are matched **right-to-left**: the subject compound is
//! tested against the element itself, then the remaining compounds walk the
//! tree leftward through their combinators. Descendant and subsequent-sibling
//! steps are existential, so the walk backtracks: any ancestor or earlier
//! sibling may carry the rest of the selector.

use css::{
    Combinator, ComplexSelector, CompoundSelector, Direction, PseudoClass, SelectorGroup,
    SimpleSelector, Specificity,
};
use dom::{DocumentMode, ElementRef, ElementState, StateMap};

// ─────────────────────────────────────────────────────────────────────────────
// Match context
// ─────────────────────────────────────────────────────────────────────────────

/// Ambient matching inputs: the document's case regime and the optional
/// interaction-state oracle. Without an oracle every state pseudo-class
/// evaluates to false.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub mode: DocumentMode,
    pub states: Option<&'a StateMap>,
}

impl<'a> MatchContext<'a> {
    /// Standards-mode comparison, no state oracle.
    pub fn standards() -> Self {
        Self {
            mode: DocumentMode::Standards,
            states: None,
        }
    }

    /// Context taking the case regime from the element's owning document.
    pub fn for_element(element: ElementRef<'_>, states: Option<&'a StateMap>) -> Self {
        Self {
            mode: element.document_mode(),
            states,
        }
    }

    fn state(&self, element: ElementRef<'_>) -> ElementState {
        self.states
            .map(|s| s.get(element.node()))
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Test `element` against every member of a selector group.
///
/// Returns the specificity of the most specific matching member, or `None`
/// when no member matches.
pub fn match_group(
    group: &SelectorGroup,
    element: ElementRef<'_>,
    ctx: &MatchContext<'_>,
) -> Option<Specificity> {
    let mut best: Option<Specificity> = None;
    for selector in &group.selectors {
        if matches_complex(selector, element, ctx) {
            best = Some(match best {
                Some(prev) if prev >= selector.specificity => prev,
                _ => selector.specificity,
            });
        }
    }
    best
}

/// Test `element` against one complex selector.
pub fn matches_complex(
    selector: &ComplexSelector,
    element: ElementRef<'_>,
    ctx: &MatchContext<'_>,
) -> bool {
    if selector.parts.is_empty() {
        return false;
    }
    matches_compound(&selector.parts[0].0, element, ctx)
        && matches_leftward(&selector.parts, 1, element, ctx, None)
}

/// All simple selectors of a compound must hold on the same element.
pub fn matches_compound(
    compound: &CompoundSelector,
    element: ElementRef<'_>,
    ctx: &MatchContext<'_>,
) -> bool {
    compound
        .simples
        .iter()
        .all(|simple| matches_simple(simple, element, ctx))
}

// ─────────────────────────────────────────────────────────────────────────────
// Combinator walk
// ─────────────────────────────────────────────────────────────────────────────

/// Match `parts[idx..]` given that `parts[idx - 1]` matched `element`.
///
/// `anchor` carries the element a `:has()` relative selector is anchored to;
/// when the leftmost part has a trailing combinator, the final match position
/// must stand in that relation to the anchor.
fn matches_leftward(
    parts: &[(CompoundSelector, Option<Combinator>)],
    idx: usize,
    element: ElementRef<'_>,
    ctx: &MatchContext<'_>,
    anchor: Option<ElementRef<'_>>,
) -> bool {
    let combinator = parts[idx - 1].1;
    if idx == parts.len() {
        return match (combinator, anchor) {
            (None, _) => true,
            (Some(c), Some(scope)) => anchored(c, element, scope),
            (Some(_), None) => false,
        };
    }
    let Some(combinator) = combinator else {
        return false;
    };
    let compound = &parts[idx].0;
    match combinator {
        // `||` without table layout falls back to the ancestor walk.
        Combinator::Descendant | Combinator::Column => {
            let mut cursor = element.parent();
            while let Some(candidate) = cursor {
                if matches_compound(compound, candidate, ctx)
                    && matches_leftward(parts, idx + 1, candidate, ctx, anchor)
                {
                    return true;
                }
                cursor = candidate.parent();
            }
            false
        }
        Combinator::Child => match element.parent() {
            Some(parent) => {
                matches_compound(compound, parent, ctx)
                    && matches_leftward(parts, idx + 1, parent, ctx, anchor)
            }
            None => false,
        },
        Combinator::NextSibling => match element.previous_sibling() {
            Some(prev) => {
                matches_compound(compound, prev, ctx)
                    && matches_leftward(parts, idx + 1, prev, ctx, anchor)
            }
            None => false,
        },
        Combinator::SubsequentSibling => {
            let mut cursor = element.previous_sibling();
            while let Some(candidate) = cursor {
                if matches_compound(compound, candidate, ctx)
                    && matches_leftward(parts, idx + 1, candidate, ctx, anchor)
                {
                    return true;
                }
                cursor = candidate.previous_sibling();
            }
            false
        }
    }
}

/// Does `element` stand in `combinator` relation to `scope`?
fn anchored(combinator: Combinator, element: ElementRef<'_>, scope: ElementRef<'_>) -> bool {
    match combinator {
        Combinator::Descendant | Combinator::Column => {
            let mut cursor = element.parent();
            while let Some(ancestor) = cursor {
                if ancestor.node() == scope.node() {
                    return true;
                }
                cursor = ancestor.parent();
            }
            false
        }
        Combinator::Child => element.parent().is_some_and(|p| p.node() == scope.node()),
        Combinator::NextSibling => element
            .previous_sibling()
            .is_some_and(|p| p.node() == scope.node()),
        Combinator::SubsequentSibling => {
            let mut cursor = element.previous_sibling();
            while let Some(sibling) = cursor {
                if sibling.node() == scope.node() {
                    return true;
                }
                cursor = sibling.previous_sibling();
            }
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simple selectors
// ─────────────────────────────────────────────────────────────────────────────

fn matches_simple(
    simple: &SimpleSelector,
    element: ElementRef<'_>,
    ctx: &MatchContext<'_>,
) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(tag) => element.tag_name() == tag,
        SimpleSelector::Id(id) => match ctx.mode {
            DocumentMode::Standards => element.id() == Some(id.as_str()),
            DocumentMode::Quirks => element.id().is_some_and(|v| v.eq_ignore_ascii_case(id)),
        },
        SimpleSelector::Class(name) => element.has_class(name, ctx.mode),
        SimpleSelector::Attribute {
            name,
            op,
            value,
            case_insensitive,
        } => {
            let ci = *case_insensitive || ctx.mode == DocumentMode::Quirks;
            element.attr_matches(name, *op, value.as_deref(), ci)
        }
        SimpleSelector::PseudoClass(pseudo) => matches_pseudo_class(pseudo, element, ctx),
        // The originating element matches; the pseudo-element box itself is
        // the caller's concern.
        SimpleSelector::PseudoElement(_) => true,
        // `&` is substituted away when nested rules are flattened.
        SimpleSelector::NestingParent => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pseudo-classes
// ─────────────────────────────────────────────────────────────────────────────

fn matches_pseudo_class(
    pseudo: &PseudoClass,
    element: ElementRef<'_>,
    ctx: &MatchContext<'_>,
) -> bool {
    match pseudo {
        PseudoClass::Hover => ctx.state(element).contains(ElementState::HOVER),
        PseudoClass::Active => ctx.state(element).contains(ElementState::ACTIVE),
        PseudoClass::Focus => ctx.state(element).contains(ElementState::FOCUS),
        PseudoClass::FocusVisible => ctx.state(element).contains(ElementState::FOCUS_VISIBLE),
        PseudoClass::FocusWithin => ctx.state(element).contains(ElementState::FOCUS_WITHIN),
        PseudoClass::Target => ctx.state(element).contains(ElementState::TARGET),
        PseudoClass::Link => ctx.state(element).contains(ElementState::LINK),
        PseudoClass::Visited => ctx.state(element).contains(ElementState::VISITED),
        PseudoClass::AnyLink => ctx.state(element).is_any_link(),
        PseudoClass::Enabled => ctx.state(element).contains(ElementState::ENABLED),
        PseudoClass::Disabled => ctx.state(element).contains(ElementState::DISABLED),
        PseudoClass::Checked => ctx.state(element).contains(ElementState::CHECKED),
        PseudoClass::Indeterminate => ctx.state(element).contains(ElementState::INDETERMINATE),
        PseudoClass::Default => ctx.state(element).contains(ElementState::DEFAULT),
        PseudoClass::Required => ctx.state(element).contains(ElementState::REQUIRED),
        PseudoClass::Optional => ctx.state(element).contains(ElementState::OPTIONAL),
        PseudoClass::ReadOnly => ctx.state(element).contains(ElementState::READ_ONLY),
        PseudoClass::ReadWrite => ctx.state(element).contains(ElementState::READ_WRITE),
        PseudoClass::PlaceholderShown => {
            ctx.state(element).contains(ElementState::PLACEHOLDER_SHOWN)
        }

        PseudoClass::Root => element.is_root(),
        PseudoClass::Empty => element.is_empty(),
        PseudoClass::FirstChild => element.previous_sibling().is_none(),
        PseudoClass::LastChild => element.next_sibling().is_none(),
        PseudoClass::OnlyChild => {
            element.previous_sibling().is_none() && element.next_sibling().is_none()
        }
        PseudoClass::FirstOfType => previous_of_type(element).is_none(),
        PseudoClass::LastOfType => next_of_type(element).is_none(),
        PseudoClass::OnlyOfType => {
            previous_of_type(element).is_none() && next_of_type(element).is_none()
        }

        PseudoClass::NthChild(nth) => nth.matches(element.child_index() as i32),
        PseudoClass::NthLastChild(nth) => nth.matches(child_index_from_end(element)),
        PseudoClass::NthOfType(nth) => nth.matches(type_index(element)),
        PseudoClass::NthLastOfType(nth) => nth.matches(type_index_from_end(element)),

        PseudoClass::Not(list) => !list.iter().any(|sel| matches_complex(sel, element, ctx)),
        PseudoClass::Is(list) | PseudoClass::Where(list) => {
            list.iter().any(|sel| matches_complex(sel, element, ctx))
        }
        PseudoClass::Has(list) => matches_has(list, element, ctx),

        PseudoClass::Lang(tags) => match element.language() {
            Some(lang) => tags.iter().any(|tag| lang_matches(lang, tag)),
            None => false,
        },
        PseudoClass::Dir(direction) => element_direction(element) == *direction,
    }
}

/// `:has()` succeeds when any relative selector finds a subject anchored at
/// `element`.
fn matches_has(list: &[ComplexSelector], element: ElementRef<'_>, ctx: &MatchContext<'_>) -> bool {
    list.iter().any(|selector| {
        if selector.parts.is_empty() {
            return false;
        }
        let anchor_combinator = selector
            .parts
            .last()
            .and_then(|(_, comb)| *comb)
            .unwrap_or(Combinator::Descendant);
        has_candidates(element, anchor_combinator).into_iter().any(|candidate| {
            matches_compound(&selector.parts[0].0, candidate, ctx)
                && matches_leftward(&selector.parts, 1, candidate, ctx, Some(element))
        })
    })
}

/// Elements that can be the subject of a relative selector: the subtree for
/// descendant and child anchors, following sibling subtrees for the sibling
/// anchors. Exact anchoring is re-checked by the leftward walk.
fn has_candidates(element: ElementRef<'_>, combinator: Combinator) -> Vec<ElementRef<'_>> {
    let doc = element.document();
    let mut out = Vec::new();
    match combinator {
        Combinator::Descendant | Combinator::Child | Combinator::Column => {
            for id in doc.descendants(element.node()) {
                if let Some(el) = doc.element(id) {
                    out.push(el);
                }
            }
        }
        Combinator::NextSibling | Combinator::SubsequentSibling => {
            let mut cursor = element.next_sibling();
            while let Some(sibling) = cursor {
                out.push(sibling);
                for id in doc.descendants(sibling.node()) {
                    if let Some(el) = doc.element(id) {
                        out.push(el);
                    }
                }
                cursor = sibling.next_sibling();
            }
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree position helpers
// ─────────────────────────────────────────────────────────────────────────────

fn previous_of_type<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut cursor = element.previous_sibling();
    while let Some(sibling) = cursor {
        if sibling.tag_name() == element.tag_name() {
            return Some(sibling);
        }
        cursor = sibling.previous_sibling();
    }
    None
}

fn next_of_type<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut cursor = element.next_sibling();
    while let Some(sibling) = cursor {
        if sibling.tag_name() == element.tag_name() {
            return Some(sibling);
        }
        cursor = sibling.next_sibling();
    }
    None
}

/// 1-based position counting from the last element sibling.
fn child_index_from_end(element: ElementRef<'_>) -> i32 {
    let mut index = 1;
    let mut cursor = element.next_sibling();
    while let Some(sibling) = cursor {
        index += 1;
        cursor = sibling.next_sibling();
    }
    index
}

/// 1-based position among same-type element siblings.
fn type_index(element: ElementRef<'_>) -> i32 {
    let mut index = 1;
    let mut cursor = element.previous_sibling();
    while let Some(sibling) = cursor {
        if sibling.tag_name() == element.tag_name() {
            index += 1;
        }
        cursor = sibling.previous_sibling();
    }
    index
}

fn type_index_from_end(element: ElementRef<'_>) -> i32 {
    let mut index = 1;
    let mut cursor = element.next_sibling();
    while let Some(sibling) = cursor {
        if sibling.tag_name() == element.tag_name() {
            index += 1;
        }
        cursor = sibling.next_sibling();
    }
    index
}

/// `:lang(en)` matches `en` itself and any `en-*` subtag chain.
fn lang_matches(lang: &str, tag: &str) -> bool {
    if lang.eq_ignore_ascii_case(tag) {
        return true;
    }
    lang.len() > tag.len()
        && lang.as_bytes()[tag.len()] == b'-'
        && lang[..tag.len()].eq_ignore_ascii_case(tag)
}

/// Nearest `dir` attribute decides; the document default is left-to-right.
fn element_direction(element: ElementRef<'_>) -> Direction {
    let mut cursor = Some(element);
    while let Some(el) = cursor {
        if let Some(dir) = el.attr("dir") {
            if dir.eq_ignore_ascii_case("ltr") {
                return Direction::Ltr;
            }
            if dir.eq_ignore_ascii_case("rtl") {
                return Direction::Rtl;
            }
        }
        cursor = el.parent();
    }
    Direction::Ltr
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
