//! `var()`, `env()` and `attr()` substitution at computed-value time.
//!
//! Substitution is textual: each reference in the raw declaration text is
//! replaced by its substitution value, and the spliced result is re-tokenized
//! and re-parsed by the caller. A declaration whose references cannot be
//! resolved is invalid at computed-value time; the cascade then falls back to
//! the inherited or initial value.

use css::{is_custom_property_name, tokenize, Token, TokenKind};
use dom::ElementRef;
use rustc_hash::{FxHashMap, FxHashSet};

// ─────────────────────────────────────────────────────────────────────────────
// Substituter
// ─────────────────────────────────────────────────────────────────────────────

/// Per-element reference resolver.
///
/// `own_raw` holds the element's winning custom-property declarations as raw
/// text; `inherited` is the parent's fully resolved table. Custom properties
/// resolve lazily with memoisation, and an in-progress name stack detects
/// reference cycles: every custom property on a cycle is dropped, and `var()`
/// references to it take their fallback.
pub struct Substituter<'a> {
    element: ElementRef<'a>,
    env: &'a FxHashMap<String, String>,
    own_raw: &'a FxHashMap<String, String>,
    inherited: Option<&'a FxHashMap<String, String>>,
    memo: FxHashMap<String, Option<String>>,
    stack: Vec<String>,
    /// Names found on a reference cycle. Every member of a cycle is invalid,
    /// even when its own declaration carries a fallback; only references
    /// from outside the cycle get to use theirs.
    poisoned: FxHashSet<String>,
}

impl<'a> Substituter<'a> {
    pub fn new(
        element: ElementRef<'a>,
        env: &'a FxHashMap<String, String>,
        own_raw: &'a FxHashMap<String, String>,
        inherited: Option<&'a FxHashMap<String, String>>,
    ) -> Self {
        Self {
            element,
            env,
            own_raw,
            inherited,
            memo: FxHashMap::default(),
            stack: Vec::new(),
            poisoned: FxHashSet::default(),
        }
    }

    /// The element's resolved custom-property table: inherited entries
    /// overlaid with its own declarations. Cycle members are absent.
    pub fn resolved_customs(&mut self) -> FxHashMap<String, String> {
        let mut table = self.inherited.cloned().unwrap_or_default();
        let names: Vec<String> = self.own_raw.keys().cloned().collect();
        for name in names {
            match self.lookup(&name) {
                Some(text) => {
                    table.insert(name, text);
                }
                None => {
                    table.remove(&name);
                }
            }
        }
        table
    }

    /// Replace every reference in `raw`. `None` marks the declaration
    /// invalid at computed-value time.
    pub fn substitute(&mut self, raw: &str) -> Option<String> {
        let tokens = tokenize(raw);
        let mut out = String::with_capacity(raw.len());
        if !self.substitute_range(raw, &tokens, 0, tokens.len(), &mut out) {
            return None;
        }
        Some(out.trim().to_string())
    }

    /// Value of custom property `name`: own declaration first (resolved on
    /// demand), then the inherited table. `None` for absent names, failed
    /// resolutions, and cycle members.
    fn lookup(&mut self, name: &str) -> Option<String> {
        if self.poisoned.contains(name) {
            return None;
        }
        if let Some(memoed) = self.memo.get(name) {
            return memoed.clone();
        }
        if let Some(raw) = self.own_raw.get(name) {
            if let Some(pos) = self.stack.iter().position(|pending| pending == name) {
                // Re-entry: everything from the first occurrence to the top
                // of the stack is on the cycle.
                let members: Vec<String> = self.stack[pos..].to_vec();
                self.poisoned.extend(members);
                return None;
            }
            let raw = raw.clone();
            self.stack.push(name.to_string());
            let resolved = self.substitute(&raw);
            self.stack.pop();
            let resolved = if self.poisoned.contains(name) {
                None
            } else {
                resolved
            };
            self.memo.insert(name.to_string(), resolved.clone());
            return resolved;
        }
        self.inherited.and_then(|table| table.get(name).cloned())
    }

    fn substitute_range(
        &mut self,
        src: &str,
        tokens: &[Token],
        lo: usize,
        hi: usize,
        out: &mut String,
    ) -> bool {
        let mut i = lo;
        while i < hi {
            let token = &tokens[i];
            let reference = match &token.kind {
                TokenKind::Function(name) if name.eq_ignore_ascii_case("var") => Some(Ref::Var),
                TokenKind::Function(name) if name.eq_ignore_ascii_case("env") => Some(Ref::Env),
                TokenKind::Function(name) if name.eq_ignore_ascii_case("attr") => Some(Ref::Attr),
                _ => None,
            };
            match reference {
                Some(kind) => {
                    let Some(close) = close_of(tokens, i, hi) else {
                        return false;
                    };
                    let ok = match kind {
                        Ref::Var => self.eval_var(src, tokens, i + 1, close, out),
                        Ref::Env => self.eval_env(src, tokens, i + 1, close, out),
                        Ref::Attr => self.eval_attr(src, tokens, i + 1, close, out),
                    };
                    if !ok {
                        return false;
                    }
                    i = close + 1;
                }
                None => {
                    out.push_str(&src[token.offset as usize..token.end() as usize]);
                    i += 1;
                }
            }
        }
        true
    }

    fn eval_var(
        &mut self,
        src: &str,
        tokens: &[Token],
        lo: usize,
        hi: usize,
        out: &mut String,
    ) -> bool {
        let i = skip_trivia(tokens, lo, hi);
        let name = match tokens.get(i).filter(|_| i < hi).map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) if is_custom_property_name(name) => name.clone(),
            _ => return false,
        };
        let i = skip_trivia(tokens, i + 1, hi);
        let fallback = if i < hi {
            if !matches!(tokens[i].kind, TokenKind::Comma) {
                return false;
            }
            Some(i + 1)
        } else {
            None
        };
        match self.lookup(&name) {
            Some(text) => {
                out.push_str(&text);
                out.push(' ');
                true
            }
            None => match fallback {
                Some(fb_lo) => self.substitute_range(src, tokens, fb_lo, hi, out),
                None => false,
            },
        }
    }

    fn eval_env(
        &mut self,
        src: &str,
        tokens: &[Token],
        lo: usize,
        hi: usize,
        out: &mut String,
    ) -> bool {
        let i = skip_trivia(tokens, lo, hi);
        let name = match tokens.get(i).filter(|_| i < hi).map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) => name.clone(),
            _ => return false,
        };
        let i = skip_trivia(tokens, i + 1, hi);
        let fallback = if i < hi {
            if !matches!(tokens[i].kind, TokenKind::Comma) {
                return false;
            }
            Some(i + 1)
        } else {
            None
        };
        match self.env.get(&name) {
            Some(text) => {
                out.push_str(text);
                out.push(' ');
                true
            }
            None => match fallback {
                Some(fb_lo) => self.substitute_range(src, tokens, fb_lo, hi, out),
                None => false,
            },
        }
    }

    fn eval_attr(
        &mut self,
        src: &str,
        tokens: &[Token],
        lo: usize,
        hi: usize,
        out: &mut String,
    ) -> bool {
        let i = skip_trivia(tokens, lo, hi);
        let name = match tokens.get(i).filter(|_| i < hi).map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) => name.clone(),
            _ => return false,
        };
        let mut i = skip_trivia(tokens, i + 1, hi);
        let mut type_or_unit: Option<String> = None;
        if i < hi {
            if let TokenKind::Ident(ty) = &tokens[i].kind {
                type_or_unit = Some(ty.to_ascii_lowercase());
                i = skip_trivia(tokens, i + 1, hi);
            }
        }
        let fallback = if i < hi {
            if !matches!(tokens[i].kind, TokenKind::Comma) {
                return false;
            }
            Some(i + 1)
        } else {
            None
        };

        let coerced = self
            .element
            .attr(&name)
            .and_then(|value| coerce_attr(value, type_or_unit.as_deref()));
        match coerced {
            Some(text) => {
                out.push_str(&text);
                out.push(' ');
                true
            }
            None => match fallback {
                Some(fb_lo) => self.substitute_range(src, tokens, fb_lo, hi, out),
                None => {
                    // A missing string-typed attribute reads as the empty
                    // string; typed reads have no value to coerce.
                    if type_or_unit.as_deref().is_none_or(|t| t == "string") {
                        out.push_str("\"\" ");
                        true
                    } else {
                        false
                    }
                }
            },
        }
    }
}

enum Ref {
    Var,
    Env,
    Attr,
}

/// Coerce an attribute's text per the `attr()` type argument. The default
/// type is `string`, which quotes the value verbatim.
fn coerce_attr(value: &str, type_or_unit: Option<&str>) -> Option<String> {
    match type_or_unit {
        None | Some("string") => Some(quote(value)),
        Some("url") => Some(format!("url({})", quote(value))),
        Some("ident") | Some("color") => {
            let v = value.trim();
            if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            }
        }
        Some("number") => {
            let v = value.trim();
            v.parse::<f64>().ok().map(|_| v.to_string())
        }
        Some("percentage") => {
            let v = value.trim();
            v.parse::<f64>().ok().map(|n| format!("{n}%"))
        }
        // Any other identifier is treated as a unit suffix for a numeric
        // attribute, e.g. `attr(data-size px)`.
        Some(unit) => {
            let v = value.trim();
            v.parse::<f64>().ok().map(|n| format!("{n}{unit}"))
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Index of the `)` closing the function token at `open`, within `lo..hi`.
fn close_of(tokens: &[Token], open: usize, hi: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = open + 1;
    while i < hi {
        match tokens[i].kind {
            TokenKind::Function(_) | TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_trivia(tokens: &[Token], mut i: usize, hi: usize) -> usize {
    while i < hi && matches!(tokens[i].kind, TokenKind::Whitespace | TokenKind::Comment) {
        i += 1;
    }
    i
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
