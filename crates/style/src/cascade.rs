//! Cascade resolution: collect matching declarations, rank them, substitute
//! references, and fill a computed style record.
//!
//! Every declaration that targets an element becomes a candidate tagged with
//! `(origin/importance rank, specificity, source order)`; the highest key
//! wins per property. Winners then pass through reference substitution and
//! CSS-wide keyword handling, and properties without a winner fall back to
//! the parent's computed value (inherited properties) or the registry
//! initial.

use css::{
    parse_declaration_block, parse_value_from_tokens, tokenize, Declaration, FeatureFlags, Origin,
    PropertyId, PropertyRef, PropertyRegistry, Specificity, Stylesheet, Value,
};
use dom::{ElementRef, StateMap};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::computed::ComputedStyle;
use crate::matching::{match_group, MatchContext};
use crate::substitute::Substituter;

// ─────────────────────────────────────────────────────────────────────────────
// Cascade context
// ─────────────────────────────────────────────────────────────────────────────

/// Shared inputs of a cascade run: the property table, feature flags for
/// re-parsing substituted text, the `env()` map, and the optional
/// interaction-state oracle.
pub struct CascadeContext<'a> {
    pub registry: &'a PropertyRegistry,
    pub flags: FeatureFlags,
    pub env: &'a FxHashMap<String, String>,
    pub states: Option<&'a StateMap>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Candidates
// ─────────────────────────────────────────────────────────────────────────────

/// One matched declaration, tagged with its cascade key.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    declaration: &'a Declaration,
    origin: Origin,
    specificity: Specificity,
    source_order: u32,
}

impl Candidate<'_> {
    fn key(&self) -> (u8, Specificity, u32) {
        (
            rank(self.origin, self.declaration.important),
            self.specificity,
            self.source_order,
        )
    }
}

/// Combined origin and importance rank; higher always wins. Important
/// declarations invert the origin order. Ranks 7 (transition) and 3
/// (animation) are reserved for effect origins this engine does not model.
fn rank(origin: Origin, important: bool) -> u8 {
    match (origin, important) {
        (Origin::UserAgent, true) => 6,
        (Origin::User, true) => 5,
        (Origin::Author, true) => 4,
        (Origin::Author, false) => 2,
        (Origin::User, false) => 1,
        (Origin::UserAgent, false) => 0,
    }
}

/// Candidates from every stylesheet, in document order, plus the inline
/// `style=""` block. One candidate per declaration of each matching rule;
/// the recorded specificity is that of the best matching group member.
fn collect_candidates<'a>(
    element: ElementRef<'_>,
    stylesheets: &[&'a Stylesheet],
    inline: Option<&'a [Declaration]>,
    ctx: &CascadeContext<'_>,
) -> Vec<Candidate<'a>> {
    let match_ctx = MatchContext::for_element(element, ctx.states);
    let mut candidates = Vec::new();
    let mut order: u32 = 0;
    for sheet in stylesheets {
        for rule in sheet.style_rules() {
            let Some(specificity) = match_group(&rule.selectors, element, &match_ctx) else {
                continue;
            };
            for declaration in &rule.declarations {
                candidates.push(Candidate {
                    declaration,
                    origin: sheet.origin,
                    specificity,
                    source_order: order,
                });
                order += 1;
            }
        }
    }
    // Inline style is author origin with inline specificity, after all
    // sheets in source order.
    if let Some(declarations) = inline {
        for declaration in declarations {
            candidates.push(Candidate {
                declaration,
                origin: Origin::Author,
                specificity: Specificity::inline_style(),
                source_order: order,
            });
            order += 1;
        }
    }
    candidates
}

// ─────────────────────────────────────────────────────────────────────────────
// Compute
// ─────────────────────────────────────────────────────────────────────────────

/// Compute the final style of `element` under `stylesheets` plus an optional
/// inline `style=""` declaration block.
///
/// `parent` is the parent element's computed style: inherited properties
/// without a winner adopt its values, and the custom-property table flows
/// through it.
pub fn compute(
    element: ElementRef<'_>,
    stylesheets: &[&Stylesheet],
    inline_style: Option<&str>,
    parent: Option<&ComputedStyle>,
    ctx: &CascadeContext<'_>,
) -> ComputedStyle {
    let inline = inline_style.map(|text| {
        let (declarations, _) = parse_declaration_block(text, ctx.registry, ctx.flags);
        declarations
    });
    let mut candidates = collect_candidates(element, stylesheets, inline.as_deref(), ctx);
    log::trace!(
        "cascade for <{}>: {} candidate declarations",
        element.tag_name(),
        candidates.len()
    );
    // Highest key first. Source order is unique per candidate, so the order
    // is total and the sort needs no stability guarantee.
    candidates.sort_by(|a, b| b.key().cmp(&a.key()));

    // Per-property candidate lists, best first. Custom properties keep only
    // their winner's raw text; the substituter resolves references between
    // them on demand.
    let mut known: FxHashMap<PropertyId, SmallVec<[Candidate<'_>; 4]>> = FxHashMap::default();
    let mut custom_raw: FxHashMap<String, String> = FxHashMap::default();
    for candidate in &candidates {
        match &candidate.declaration.property {
            PropertyRef::Known(id) => known.entry(*id).or_default().push(*candidate),
            PropertyRef::Custom(name) => {
                custom_raw.entry(name.clone()).or_insert_with(|| {
                    candidate
                        .declaration
                        .raw
                        .clone()
                        .unwrap_or_else(|| candidate.declaration.value.to_string())
                });
            }
        }
    }

    let mut substituter = Substituter::new(
        element,
        ctx.env,
        &custom_raw,
        parent.map(|p| p.custom_table()),
    );
    let resolved_customs = substituter.resolved_customs();

    let mut style = ComputedStyle::new();
    for id in ctx.registry.ids() {
        let value = match known.get(&id) {
            Some(list) => resolve_property(id, list, parent, ctx, &mut substituter),
            None => fallback_value(id, parent, ctx.registry),
        };
        style.set(id, value);
    }
    style.set_custom_table(resolved_customs);
    style
}

/// The winning value for one property after substitution and CSS-wide
/// keyword handling. `revert` walks down the candidate list to the best
/// declaration of a different origin.
fn resolve_property(
    id: PropertyId,
    candidates: &[Candidate<'_>],
    parent: Option<&ComputedStyle>,
    ctx: &CascadeContext<'_>,
    substituter: &mut Substituter<'_>,
) -> Value {
    let mut index = 0;
    loop {
        let Some(candidate) = candidates.get(index) else {
            return fallback_value(id, parent, ctx.registry);
        };
        let value = match &candidate.declaration.raw {
            Some(raw) if candidate.declaration.value.has_references() => {
                match substitute_and_reparse(raw, ctx, substituter) {
                    Some(value) => value,
                    // Invalid at computed-value time: the declaration still
                    // won the cascade, so earlier candidates are not
                    // consulted.
                    None => return fallback_value(id, parent, ctx.registry),
                }
            }
            _ => candidate.declaration.value.clone(),
        };
        match value {
            Value::Inherit => return inherited_value(id, parent, ctx.registry),
            Value::Initial => return ctx.registry.initial(id).clone(),
            Value::Unset => return fallback_value(id, parent, ctx.registry),
            Value::Revert => {
                let origin = candidate.origin;
                match candidates[index + 1..]
                    .iter()
                    .position(|c| c.origin != origin)
                {
                    Some(offset) => index += 1 + offset,
                    None => return fallback_value(id, parent, ctx.registry),
                }
            }
            other => return other,
        }
    }
}

/// Splice references into the raw value text, then re-tokenize and re-parse.
fn substitute_and_reparse(
    raw: &str,
    ctx: &CascadeContext<'_>,
    substituter: &mut Substituter<'_>,
) -> Option<Value> {
    let text = substituter.substitute(raw)?;
    let tokens = tokenize(&text);
    let mut diags = Vec::new();
    parse_value_from_tokens(&tokens, &text, ctx.flags, &mut diags)
}

/// Value for a property no declaration won: the parent's computed value when
/// the property inherits, the registry initial otherwise. `unset` resolves
/// the same way.
fn fallback_value(
    id: PropertyId,
    parent: Option<&ComputedStyle>,
    registry: &PropertyRegistry,
) -> Value {
    if registry.is_inherited(id) {
        inherited_value(id, parent, registry)
    } else {
        registry.initial(id).clone()
    }
}

fn inherited_value(
    id: PropertyId,
    parent: Option<&ComputedStyle>,
    registry: &PropertyRegistry,
) -> Value {
    parent
        .and_then(|p| p.get(id))
        .cloned()
        .unwrap_or_else(|| registry.initial(id).clone())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
