use crate::color::{self, Color, ColorMix};
use crate::diagnostics::Diagnostic;
use crate::features::FeatureFlags;
use crate::token::{Token, TokenKind};

/// A CSS unit tag. Closed set of the units the engine understands, with
/// `Unknown` standing in for anything else so the value survives parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Pt,
    Pc,
    Cm,
    Mm,
    Q,
    In,
    Em,
    Rem,
    Ex,
    Ch,
    Cap,
    Ic,
    Lh,
    Rlh,
    Vw,
    Vh,
    Vmin,
    Vmax,
    Vi,
    Vb,
    Deg,
    Grad,
    Rad,
    Turn,
    S,
    Ms,
    Hz,
    Khz,
    Dpi,
    Dpcm,
    Dppx,
    Fr,
    Unknown,
}

/// Which dimension family a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionClass {
    Length,
    Angle,
    Time,
    Frequency,
    Resolution,
    Flex,
    Unknown,
}

impl Unit {
    pub fn from_name(name: &str) -> Option<Unit> {
        let lower = name.to_ascii_lowercase();
        let unit = match lower.as_str() {
            "px" => Unit::Px,
            "pt" => Unit::Pt,
            "pc" => Unit::Pc,
            "cm" => Unit::Cm,
            "mm" => Unit::Mm,
            "q" => Unit::Q,
            "in" => Unit::In,
            "em" => Unit::Em,
            "rem" => Unit::Rem,
            "ex" => Unit::Ex,
            "ch" => Unit::Ch,
            "cap" => Unit::Cap,
            "ic" => Unit::Ic,
            "lh" => Unit::Lh,
            "rlh" => Unit::Rlh,
            "vw" => Unit::Vw,
            "vh" => Unit::Vh,
            "vmin" => Unit::Vmin,
            "vmax" => Unit::Vmax,
            "vi" => Unit::Vi,
            "vb" => Unit::Vb,
            "deg" => Unit::Deg,
            "grad" => Unit::Grad,
            "rad" => Unit::Rad,
            "turn" => Unit::Turn,
            "s" => Unit::S,
            "ms" => Unit::Ms,
            "hz" => Unit::Hz,
            "khz" => Unit::Khz,
            "dpi" => Unit::Dpi,
            "dpcm" => Unit::Dpcm,
            "dppx" => Unit::Dppx,
            "fr" => Unit::Fr,
            _ => return None,
        };
        Some(unit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Pt => "pt",
            Unit::Pc => "pc",
            Unit::Cm => "cm",
            Unit::Mm => "mm",
            Unit::Q => "q",
            Unit::In => "in",
            Unit::Em => "em",
            Unit::Rem => "rem",
            Unit::Ex => "ex",
            Unit::Ch => "ch",
            Unit::Cap => "cap",
            Unit::Ic => "ic",
            Unit::Lh => "lh",
            Unit::Rlh => "rlh",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
            Unit::Vmin => "vmin",
            Unit::Vmax => "vmax",
            Unit::Vi => "vi",
            Unit::Vb => "vb",
            Unit::Deg => "deg",
            Unit::Grad => "grad",
            Unit::Rad => "rad",
            Unit::Turn => "turn",
            Unit::S => "s",
            Unit::Ms => "ms",
            Unit::Hz => "hz",
            Unit::Khz => "khz",
            Unit::Dpi => "dpi",
            Unit::Dpcm => "dpcm",
            Unit::Dppx => "dppx",
            Unit::Fr => "fr",
            Unit::Unknown => "",
        }
    }

    pub fn class(self) -> DimensionClass {
        match self {
            Unit::Px
            | Unit::Pt
            | Unit::Pc
            | Unit::Cm
            | Unit::Mm
            | Unit::Q
            | Unit::In
            | Unit::Em
            | Unit::Rem
            | Unit::Ex
            | Unit::Ch
            | Unit::Cap
            | Unit::Ic
            | Unit::Lh
            | Unit::Rlh
            | Unit::Vw
            | Unit::Vh
            | Unit::Vmin
            | Unit::Vmax
            | Unit::Vi
            | Unit::Vb => DimensionClass::Length,
            Unit::Deg | Unit::Grad | Unit::Rad | Unit::Turn => DimensionClass::Angle,
            Unit::S | Unit::Ms => DimensionClass::Time,
            Unit::Hz | Unit::Khz => DimensionClass::Frequency,
            Unit::Dpi | Unit::Dpcm | Unit::Dppx => DimensionClass::Resolution,
            Unit::Fr => DimensionClass::Flex,
            Unit::Unknown => DimensionClass::Unknown,
        }
    }
}

/// Separator of a [`Value::List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSeparator {
    Space,
    Comma,
}

/// One node of a parsed `calc()` expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcNode {
    Leaf(Value),
    Binary {
        op: CalcOp,
        lhs: Box<CalcNode>,
        rhs: Box<CalcNode>,
    },
    /// A math function such as `min()`, `clamp()` or `sin()`.
    Call { name: String, args: Vec<CalcNode> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl std::fmt::Display for CalcOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self {
            CalcOp::Add => '+',
            CalcOp::Sub => '-',
            CalcOp::Mul => '*',
            CalcOp::Div => '/',
        };
        write!(f, "{c}")
    }
}

/// A parsed CSS component value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An identifier that is not a color or wide keyword, case preserved.
    Keyword(String),
    String(String),
    Url(String),
    /// A number written without a decimal point or exponent.
    Integer(i64),
    Number(f64),
    /// A dimension whose unit is a length unit.
    Length(f64, Unit),
    Percentage(f64),
    /// A dimension of any other class, including unknown units.
    Dimension(f64, Unit),
    Color(Color),
    /// `U+0025`, `U+0-7F`, `U+4??` and friends.
    UnicodeRange { start: u32, end: u32 },
    /// `var(--name)` or `var(--name, fallback)`.
    VarRef {
        name: String,
        fallback: Option<Box<Value>>,
    },
    /// `env(name)` or `env(name, fallback)`.
    EnvRef {
        name: String,
        fallback: Option<Box<Value>>,
    },
    /// `attr(name)`, `attr(name type)`, `attr(name, fallback)`.
    AttrRef {
        name: String,
        type_or_unit: Option<String>,
        fallback: Option<Box<Value>>,
    },
    Calc(Box<CalcNode>),
    ColorMix(Box<ColorMix>),
    /// Any function the engine has no dedicated representation for.
    Function { name: String, args: Vec<Value> },
    List {
        items: Vec<Value>,
        separator: ListSeparator,
    },
    Inherit,
    Initial,
    Unset,
    Revert,
}

impl Value {
    pub fn is_wide_keyword(&self) -> bool {
        matches!(
            self,
            Value::Inherit | Value::Initial | Value::Unset | Value::Revert
        )
    }

    /// True when the value, or any nested part of it, carries a substitution
    /// reference that must be resolved before use.
    pub fn has_references(&self) -> bool {
        match self {
            Value::VarRef { .. } | Value::EnvRef { .. } | Value::AttrRef { .. } => true,
            Value::List { items, .. } => items.iter().any(Value::has_references),
            Value::Function { args, .. } => args.iter().any(Value::has_references),
            Value::Calc(node) => calc_has_references(node),
            _ => false,
        }
    }
}

fn calc_has_references(node: &CalcNode) -> bool {
    match node {
        CalcNode::Leaf(v) => v.has_references(),
        CalcNode::Binary { lhs, rhs, .. } => {
            calc_has_references(lhs) || calc_has_references(rhs)
        }
        CalcNode::Call { args, .. } => args.iter().any(calc_has_references),
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Keyword(s) => write!(f, "{s}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Url(u) => write!(f, "url(\"{u}\")"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Length(v, u) | Value::Dimension(v, u) => write!(f, "{v}{}", u.as_str()),
            Value::Percentage(v) => write!(f, "{v}%"),
            Value::Color(c) => write!(f, "{c}"),
            Value::UnicodeRange { start, end } => {
                if start == end {
                    write!(f, "U+{start:X}")
                } else {
                    write!(f, "U+{start:X}-{end:X}")
                }
            }
            Value::VarRef { name, fallback } => match fallback {
                Some(fb) => write!(f, "var({name}, {fb})"),
                None => write!(f, "var({name})"),
            },
            Value::EnvRef { name, fallback } => match fallback {
                Some(fb) => write!(f, "env({name}, {fb})"),
                None => write!(f, "env({name})"),
            },
            Value::AttrRef {
                name,
                type_or_unit,
                fallback,
            } => {
                write!(f, "attr({name}")?;
                if let Some(t) = type_or_unit {
                    write!(f, " {t}")?;
                }
                if let Some(fb) = fallback {
                    write!(f, ", {fb}")?;
                }
                write!(f, ")")
            }
            Value::Calc(node) => match &**node {
                CalcNode::Call { .. } => write!(f, "{node}"),
                _ => write!(f, "calc({node})"),
            },
            Value::ColorMix(mix) => {
                write!(f, "color-mix(in {}, {}", mix.space.as_str(), mix.a)?;
                if let Some(p) = mix.pa {
                    write!(f, " {p}%")?;
                }
                write!(f, ", {}", mix.b)?;
                if let Some(p) = mix.pb {
                    write!(f, " {p}%")?;
                }
                write!(f, ")")
            }
            Value::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Value::List { items, separator } => {
                let sep = match separator {
                    ListSeparator::Space => " ",
                    ListSeparator::Comma => ", ",
                };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Inherit => write!(f, "inherit"),
            Value::Initial => write!(f, "initial"),
            Value::Unset => write!(f, "unset"),
            Value::Revert => write!(f, "revert"),
        }
    }
}

impl std::fmt::Display for CalcNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn child(f: &mut std::fmt::Formatter<'_>, node: &CalcNode) -> std::fmt::Result {
            if matches!(node, CalcNode::Binary { .. }) {
                write!(f, "({node})")
            } else {
                write!(f, "{node}")
            }
        }
        match self {
            CalcNode::Leaf(v) => write!(f, "{v}"),
            CalcNode::Binary { op, lhs, rhs } => {
                child(f, lhs)?;
                write!(f, " {op} ")?;
                child(f, rhs)
            }
            CalcNode::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parse a declaration's value tokens into a [`Value`].
///
/// Whitespace and comments are skipped; commas build comma lists and adjacent
/// components build space lists. Returns `None` when the tokens do not form a
/// valid value, in which case the caller drops the declaration.
pub fn parse_value_from_tokens(
    tokens: &[Token],
    src: &str,
    flags: FeatureFlags,
    diags: &mut Vec<Diagnostic>,
) -> Option<Value> {
    let sig: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))
        .collect();
    let mut parser = ValueParser { src, flags, diags };
    parser.parse_top(&sig)
}

struct ValueParser<'a> {
    src: &'a str,
    flags: FeatureFlags,
    diags: &'a mut Vec<Diagnostic>,
}

impl ValueParser<'_> {
    fn warn(&mut self, offset: u32, message: impl Into<String>) {
        self.diags.push(Diagnostic::warning(offset, message));
    }

    /// Top-level entry: comma-separated groups of space-separated components.
    fn parse_top(&mut self, toks: &[&Token]) -> Option<Value> {
        if toks.is_empty() {
            return None;
        }
        let groups = split_top_level_commas(toks);
        let mut parsed = Vec::with_capacity(groups.len());
        for group in &groups {
            if group.is_empty() {
                return None;
            }
            parsed.push(self.parse_group(group)?);
        }
        if parsed.len() == 1 {
            parsed.pop()
        } else {
            Some(Value::List {
                items: parsed,
                separator: ListSeparator::Comma,
            })
        }
    }

    fn parse_group(&mut self, toks: &[&Token]) -> Option<Value> {
        let mut items = Vec::new();
        let mut pos = 0;
        while pos < toks.len() {
            items.push(self.parse_component(toks, &mut pos)?);
        }
        if items.len() == 1 {
            items.pop()
        } else {
            Some(Value::List {
                items,
                separator: ListSeparator::Space,
            })
        }
    }

    fn parse_component(&mut self, toks: &[&Token], pos: &mut usize) -> Option<Value> {
        let token = toks[*pos];
        match &token.kind {
            TokenKind::Ident(name) => {
                *pos += 1;
                if let Some(range) = self.try_unicode_range(name, toks, pos, token) {
                    return Some(range);
                }
                if name.eq_ignore_ascii_case("inherit") {
                    return Some(Value::Inherit);
                }
                if name.eq_ignore_ascii_case("initial") {
                    return Some(Value::Initial);
                }
                if name.eq_ignore_ascii_case("unset") {
                    return Some(Value::Unset);
                }
                if name.eq_ignore_ascii_case("revert") {
                    return Some(Value::Revert);
                }
                if name.eq_ignore_ascii_case("currentcolor") {
                    return Some(Value::Color(Color::CurrentColor));
                }
                if let Some(rgba) = color::parse_named(name) {
                    return Some(Value::Color(Color::Rgba(rgba)));
                }
                Some(Value::Keyword(name.clone()))
            }
            TokenKind::String(s) => {
                *pos += 1;
                Some(Value::String(s.clone()))
            }
            TokenKind::Url(u) => {
                *pos += 1;
                Some(Value::Url(u.clone()))
            }
            TokenKind::Number { value, is_integer } => {
                *pos += 1;
                if *is_integer {
                    Some(Value::Integer(*value as i64))
                } else {
                    Some(Value::Number(*value))
                }
            }
            TokenKind::Percentage(v) => {
                *pos += 1;
                Some(Value::Percentage(*v))
            }
            TokenKind::Dimension { value, unit } => {
                *pos += 1;
                match Unit::from_name(unit) {
                    Some(u) if u.class() == DimensionClass::Length => {
                        Some(Value::Length(*value, u))
                    }
                    Some(u) => Some(Value::Dimension(*value, u)),
                    None => {
                        self.warn(token.offset, format!("unknown unit '{unit}'"));
                        Some(Value::Dimension(*value, Unit::Unknown))
                    }
                }
            }
            TokenKind::Hash { value, .. } => {
                *pos += 1;
                match color::parse_hex(value) {
                    Some(rgba) => Some(Value::Color(Color::Rgba(rgba))),
                    None => {
                        self.warn(token.offset, format!("invalid hex color '#{value}'"));
                        Some(Value::Keyword(format!("#{value}")))
                    }
                }
            }
            TokenKind::Delim(c) => {
                *pos += 1;
                Some(Value::Keyword(c.to_string()))
            }
            TokenKind::Function(name) => {
                *pos += 1;
                let close = find_close_paren(toks, *pos);
                let args = &toks[*pos..close];
                *pos = (close + 1).min(toks.len());
                self.parse_function_value(name, token.offset, args)
            }
            _ => None,
        }
    }

    fn parse_function_value(
        &mut self,
        name: &str,
        offset: u32,
        args: &[&Token],
    ) -> Option<Value> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "var" => self.parse_var_like(args, offset, true),
            "env" => self.parse_var_like(args, offset, false),
            "attr" => self.parse_attr(args, offset),
            "calc" | "min" | "max" | "clamp" | "abs" | "sign" | "round" | "mod" | "rem"
            | "sin" | "cos" | "tan" | "sqrt" | "pow" | "hypot" => {
                let node = match self.parse_calc_function(&lower, args) {
                    Some(node) => node,
                    None => {
                        self.warn(offset, format!("invalid {lower}() expression"));
                        return None;
                    }
                };
                if calc_class(&node).is_some() {
                    Some(Value::Calc(Box::new(node)))
                } else {
                    // Dimensionally inconsistent math keeps the declaration
                    // alive as an opaque function value.
                    self.warn(offset, format!("incompatible units in {lower}()"));
                    Some(self.generic_function(name, args))
                }
            }
            "rgb" | "rgba" | "hsl" | "hsla" => match color::parse_function(&lower, args) {
                Some(c) => Some(Value::Color(c)),
                None => {
                    self.warn(offset, format!("invalid color function '{lower}()'"));
                    None
                }
            },
            "hwb" | "lab" | "lch" | "oklab" | "oklch"
                if self.flags.contains(FeatureFlags::COLOR_4) =>
            {
                match color::parse_function(&lower, args) {
                    Some(c) => Some(Value::Color(c)),
                    None => {
                        self.warn(offset, format!("invalid color function '{lower}()'"));
                        None
                    }
                }
            }
            "color-mix" if self.flags.contains(FeatureFlags::COLOR_4) => {
                match color::parse_color_mix(args) {
                    Some(mix) => Some(Value::ColorMix(Box::new(mix))),
                    None => {
                        self.warn(offset, "invalid color-mix()");
                        None
                    }
                }
            }
            "url" => match args {
                [t] => match &t.kind {
                    TokenKind::String(s) => Some(Value::Url(s.clone())),
                    _ => None,
                },
                _ => None,
            },
            _ => Some(self.generic_function(name, args)),
        }
    }

    fn generic_function(&mut self, name: &str, args: &[&Token]) -> Value {
        let parsed = if args.is_empty() {
            Vec::new()
        } else {
            match self.parse_top(args) {
                Some(Value::List {
                    items,
                    separator: ListSeparator::Comma,
                }) => items,
                Some(v) => vec![v],
                None => Vec::new(),
            }
        };
        Value::Function {
            name: name.to_string(),
            args: parsed,
        }
    }

    fn parse_var_like(
        &mut self,
        args: &[&Token],
        offset: u32,
        require_custom: bool,
    ) -> Option<Value> {
        let Some((first, rest)) = args.split_first() else {
            self.warn(offset, "empty reference");
            return None;
        };
        let name = match &first.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return None,
        };
        if require_custom && !name.starts_with("--") {
            self.warn(offset, format!("var() requires a custom property name, got '{name}'"));
            return None;
        }
        let fallback = self.parse_fallback(rest)?;
        if require_custom {
            Some(Value::VarRef { name, fallback })
        } else {
            Some(Value::EnvRef { name, fallback })
        }
    }

    fn parse_attr(&mut self, args: &[&Token], offset: u32) -> Option<Value> {
        let Some((first, mut rest)) = args.split_first() else {
            self.warn(offset, "empty attr()");
            return None;
        };
        let name = match &first.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return None,
        };
        let mut type_or_unit = None;
        if let Some((next, tail)) = rest.split_first() {
            if let TokenKind::Ident(t) = &next.kind {
                type_or_unit = Some(t.clone());
                rest = tail;
            }
        }
        let fallback = self.parse_fallback(rest)?;
        Some(Value::AttrRef {
            name,
            type_or_unit,
            fallback,
        })
    }

    /// After the reference name: either nothing, or a comma then a value.
    fn parse_fallback(&mut self, rest: &[&Token]) -> Option<Option<Box<Value>>> {
        match rest.split_first() {
            None => Some(None),
            Some((comma, tail)) if matches!(comma.kind, TokenKind::Comma) => {
                if tail.is_empty() {
                    // `var(--x,)` has an empty but valid fallback.
                    Some(None)
                } else {
                    Some(Some(Box::new(self.parse_top(tail)?)))
                }
            }
            Some(_) => None,
        }
    }

    // --- Math function parsing ---

    /// Parse one of the math functions. For `calc` this returns the summed
    /// expression directly, which is what makes `calc(calc(x))` collapse to
    /// the same tree as `calc(x)`.
    fn parse_calc_function(&mut self, lower: &str, args: &[&Token]) -> Option<CalcNode> {
        if lower == "calc" {
            let mut pos = 0;
            let node = self.calc_sum(args, &mut pos)?;
            if pos != args.len() {
                return None;
            }
            return Some(node);
        }

        let segments = split_top_level_commas(args);
        let mut nodes = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            if i == 0 && lower == "round" {
                if let [t] = segment {
                    if let TokenKind::Ident(word) = &t.kind {
                        let strat = word.to_ascii_lowercase();
                        if matches!(strat.as_str(), "nearest" | "up" | "down" | "to-zero") {
                            nodes.push(CalcNode::Leaf(Value::Keyword(strat)));
                            continue;
                        }
                    }
                }
            }
            let mut pos = 0;
            let node = self.calc_sum(segment, &mut pos)?;
            if pos != segment.len() {
                return None;
            }
            nodes.push(node);
        }

        let value_args = nodes.len()
            - usize::from(matches!(nodes.first(), Some(CalcNode::Leaf(Value::Keyword(_)))));
        let arity_ok = match lower {
            "min" | "max" | "hypot" => value_args >= 1,
            "clamp" => value_args == 3,
            "round" => (1..=2).contains(&value_args),
            "mod" | "rem" | "pow" => value_args == 2,
            _ => value_args == 1,
        };
        if !arity_ok {
            return None;
        }
        Some(CalcNode::Call {
            name: lower.to_string(),
            args: nodes,
        })
    }

    fn calc_sum(&mut self, toks: &[&Token], pos: &mut usize) -> Option<CalcNode> {
        let mut node = self.calc_product(toks, pos)?;
        while *pos < toks.len() {
            let op = match toks[*pos].kind {
                TokenKind::Delim('+') => CalcOp::Add,
                TokenKind::Delim('-') => CalcOp::Sub,
                _ => break,
            };
            // `+` and `-` must be surrounded by whitespace; the filtered
            // token stream shows that as a gap between spans.
            if !gap_before(toks, *pos) || !gap_after(toks, *pos) {
                return None;
            }
            *pos += 1;
            let rhs = self.calc_product(toks, pos)?;
            node = CalcNode::Binary {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Some(node)
    }

    fn calc_product(&mut self, toks: &[&Token], pos: &mut usize) -> Option<CalcNode> {
        let mut node = self.calc_operand(toks, pos)?;
        while *pos < toks.len() {
            let op = match toks[*pos].kind {
                TokenKind::Delim('*') => CalcOp::Mul,
                TokenKind::Delim('/') => CalcOp::Div,
                _ => break,
            };
            *pos += 1;
            let rhs = self.calc_operand(toks, pos)?;
            node = CalcNode::Binary {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Some(node)
    }

    fn calc_operand(&mut self, toks: &[&Token], pos: &mut usize) -> Option<CalcNode> {
        let token = *toks.get(*pos)?;
        match &token.kind {
            TokenKind::Number { value, is_integer } => {
                *pos += 1;
                let leaf = if *is_integer {
                    Value::Integer(*value as i64)
                } else {
                    Value::Number(*value)
                };
                Some(CalcNode::Leaf(leaf))
            }
            TokenKind::Percentage(v) => {
                *pos += 1;
                Some(CalcNode::Leaf(Value::Percentage(*v)))
            }
            TokenKind::Dimension { value, unit } => {
                *pos += 1;
                let u = Unit::from_name(unit)?;
                let leaf = if u.class() == DimensionClass::Length {
                    Value::Length(*value, u)
                } else {
                    Value::Dimension(*value, u)
                };
                Some(CalcNode::Leaf(leaf))
            }
            TokenKind::Ident(name) => {
                *pos += 1;
                let lower = name.to_ascii_lowercase();
                let n = match lower.as_str() {
                    "pi" => std::f64::consts::PI,
                    "e" => std::f64::consts::E,
                    "infinity" => f64::INFINITY,
                    "-infinity" => f64::NEG_INFINITY,
                    "nan" => f64::NAN,
                    _ => return None,
                };
                Some(CalcNode::Leaf(Value::Number(n)))
            }
            TokenKind::LParen => {
                *pos += 1;
                let close = find_close_paren(toks, *pos);
                let inner = &toks[*pos..close];
                let mut inner_pos = 0;
                let node = self.calc_sum(inner, &mut inner_pos)?;
                if inner_pos != inner.len() {
                    return None;
                }
                *pos = (close + 1).min(toks.len());
                Some(node)
            }
            TokenKind::Function(name) => {
                *pos += 1;
                let close = find_close_paren(toks, *pos);
                let args = &toks[*pos..close];
                *pos = (close + 1).min(toks.len());
                let lower = name.to_ascii_lowercase();
                match lower.as_str() {
                    "calc" | "min" | "max" | "clamp" | "abs" | "sign" | "round" | "mod"
                    | "rem" | "sin" | "cos" | "tan" | "sqrt" | "pow" | "hypot" => {
                        self.parse_calc_function(&lower, args)
                    }
                    "var" | "env" | "attr" => {
                        let v = self.parse_function_value(&lower, token.offset, args)?;
                        Some(CalcNode::Leaf(v))
                    }
                    _ => {
                        let v = self.parse_function_value(name, token.offset, args)?;
                        Some(CalcNode::Leaf(v))
                    }
                }
            }
            _ => None,
        }
    }

    // --- Unicode ranges ---

    /// `U+` ranges tokenize as an ident followed by number or dimension
    /// fragments, so they are reassembled from the source text. Returns
    /// `None` when the ident is not the start of a valid range.
    fn try_unicode_range(
        &mut self,
        name: &str,
        toks: &[&Token],
        pos: &mut usize,
        ident: &Token,
    ) -> Option<Value> {
        if !name.eq_ignore_ascii_case("u") {
            return None;
        }
        let bytes = self.src.as_bytes();
        let mut i = ident.end() as usize;
        if bytes.get(i) != Some(&b'+') {
            return None;
        }
        i += 1;

        let is_hex = |b: u8| b.is_ascii_hexdigit();
        let mut first = String::new();
        let mut wildcards = false;
        while first.len() < 6 {
            match bytes.get(i) {
                Some(&b) if is_hex(b) && !wildcards => first.push(b as char),
                Some(&b'?') => {
                    wildcards = true;
                    first.push('?');
                }
                _ => break,
            }
            i += 1;
        }
        if first.is_empty() {
            return None;
        }

        let mut second = String::new();
        if !wildcards && bytes.get(i) == Some(&b'-') && bytes.get(i + 1).is_some_and(|b| is_hex(*b))
        {
            i += 1;
            while second.len() < 6 {
                match bytes.get(i) {
                    Some(&b) if is_hex(b) => second.push(b as char),
                    _ => break,
                }
                i += 1;
            }
        }

        // The range must line up with whole tokens or the ident stays a
        // keyword ("u" followed by something else entirely).
        let range_end = i as u32;
        let mut consumed = *pos;
        while consumed < toks.len() && toks[consumed].offset < range_end {
            if toks[consumed].end() > range_end {
                return None;
            }
            consumed += 1;
        }
        if consumed == *pos {
            return None;
        }
        if toks[consumed - 1].end() != range_end {
            return None;
        }

        let start = u32::from_str_radix(&first.replace('?', "0"), 16).ok()?;
        let end = if !second.is_empty() {
            u32::from_str_radix(&second, 16).ok()?
        } else if wildcards {
            u32::from_str_radix(&first.replace('?', "f"), 16).ok()?
        } else {
            start
        };
        if end < start {
            self.warn(ident.offset, "unicode range end precedes start");
            return None;
        }
        *pos = consumed;
        Some(Value::UnicodeRange { start, end })
    }
}

/// Index of the `RParen` closing the function that starts at `start`, or the
/// slice length when unterminated.
fn find_close_paren(toks: &[&Token], start: usize) -> usize {
    let mut depth = 1usize;
    let mut i = start;
    while i < toks.len() {
        match toks[i].kind {
            TokenKind::Function(_) | TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
    toks.len()
}

fn split_top_level_commas<'t>(toks: &'t [&'t Token]) -> Vec<&'t [&'t Token]> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, token) in toks.iter().enumerate() {
        match token.kind {
            TokenKind::Function(_) | TokenKind::LParen | TokenKind::LBracket => depth += 1,
            TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                groups.push(&toks[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&toks[start..]);
    groups
}

fn gap_before(toks: &[&Token], i: usize) -> bool {
    i > 0 && toks[i - 1].end() < toks[i].offset
}

fn gap_after(toks: &[&Token], i: usize) -> bool {
    i + 1 < toks.len() && toks[i].end() < toks[i + 1].offset
}

// --- Dimensional analysis for math functions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalcClass {
    /// A substitution reference or opaque function; compatible with anything.
    Any,
    Number,
    Percent,
    Length,
    Angle,
    Time,
    Frequency,
    Resolution,
    Flex,
}

/// Resolve the dimension class of a calc tree, or `None` when the tree mixes
/// incompatible classes.
fn calc_class(node: &CalcNode) -> Option<CalcClass> {
    match node {
        CalcNode::Leaf(v) => leaf_class(v),
        CalcNode::Binary { op, lhs, rhs } => {
            let l = calc_class(lhs)?;
            let r = calc_class(rhs)?;
            match op {
                CalcOp::Add | CalcOp::Sub => combine_add(l, r),
                CalcOp::Mul => {
                    if l == CalcClass::Number || l == CalcClass::Any {
                        Some(r)
                    } else if r == CalcClass::Number || r == CalcClass::Any {
                        Some(l)
                    } else {
                        None
                    }
                }
                CalcOp::Div => {
                    if r == CalcClass::Number || r == CalcClass::Any {
                        Some(l)
                    } else {
                        None
                    }
                }
            }
        }
        CalcNode::Call { name, args } => {
            let args = if name == "round" {
                match args.first() {
                    Some(CalcNode::Leaf(Value::Keyword(_))) => &args[1..],
                    _ => &args[..],
                }
            } else {
                &args[..]
            };
            match name.as_str() {
                "sin" | "cos" | "tan" | "sqrt" | "pow" | "sign" => {
                    for arg in args {
                        calc_class(arg)?;
                    }
                    Some(CalcClass::Number)
                }
                _ => {
                    let mut acc = CalcClass::Any;
                    for arg in args {
                        acc = combine_add(acc, calc_class(arg)?)?;
                    }
                    Some(acc)
                }
            }
        }
    }
}

fn leaf_class(value: &Value) -> Option<CalcClass> {
    match value {
        Value::Integer(_) | Value::Number(_) => Some(CalcClass::Number),
        Value::Percentage(_) => Some(CalcClass::Percent),
        Value::Length(_, _) => Some(CalcClass::Length),
        Value::Dimension(_, unit) => match unit.class() {
            DimensionClass::Length => Some(CalcClass::Length),
            DimensionClass::Angle => Some(CalcClass::Angle),
            DimensionClass::Time => Some(CalcClass::Time),
            DimensionClass::Frequency => Some(CalcClass::Frequency),
            DimensionClass::Resolution => Some(CalcClass::Resolution),
            DimensionClass::Flex => Some(CalcClass::Flex),
            DimensionClass::Unknown => None,
        },
        Value::VarRef { .. } | Value::EnvRef { .. } | Value::AttrRef { .. } => {
            Some(CalcClass::Any)
        }
        Value::Function { .. } => Some(CalcClass::Any),
        _ => None,
    }
}

/// Addition compatibility: percentages combine with any class, `Any` defers
/// to the other side, otherwise both sides must agree.
fn combine_add(a: CalcClass, b: CalcClass) -> Option<CalcClass> {
    match (a, b) {
        (CalcClass::Any, other) | (other, CalcClass::Any) => Some(other),
        (CalcClass::Percent, other) | (other, CalcClass::Percent) => Some(other),
        (x, y) if x == y => Some(x),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{MixSpace, Rgba};
    use crate::token::tokenize;

    fn parse(input: &str) -> Option<Value> {
        let tokens = tokenize(input);
        let mut diags = Vec::new();
        parse_value_from_tokens(&tokens, input, FeatureFlags::default(), &mut diags)
    }

    fn parse_with_diags(input: &str) -> (Option<Value>, Vec<Diagnostic>) {
        let tokens = tokenize(input);
        let mut diags = Vec::new();
        let value =
            parse_value_from_tokens(&tokens, input, FeatureFlags::default(), &mut diags);
        (value, diags)
    }

    #[test]
    fn test_color_4_functions_gated_by_flag() {
        let input = "oklch(0.6 0.2 30)";
        let tokens = tokenize(input);
        let mut diags = Vec::new();
        let flags = FeatureFlags::default() - FeatureFlags::COLOR_4;
        let value = parse_value_from_tokens(&tokens, input, flags, &mut diags);
        match value {
            Some(Value::Function { name, .. }) => assert_eq!(name, "oklch"),
            other => panic!("expected opaque function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_length_and_keyword() {
        assert_eq!(parse("10px"), Some(Value::Length(10.0, Unit::Px)));
        assert_eq!(parse("block"), Some(Value::Keyword("block".into())));
        assert_eq!(parse("1.5em"), Some(Value::Length(1.5, Unit::Em)));
        assert_eq!(parse("50%"), Some(Value::Percentage(50.0)));
    }

    #[test]
    fn test_integer_vs_number() {
        assert_eq!(parse("42"), Some(Value::Integer(42)));
        assert_eq!(parse("42.0"), Some(Value::Number(42.0)));
        assert_eq!(parse("1e2"), Some(Value::Number(100.0)));
    }

    #[test]
    fn test_space_and_comma_lists() {
        let v = parse("10px 20px").unwrap();
        match v {
            Value::List { items, separator } => {
                assert_eq!(separator, ListSeparator::Space);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected list, got {other:?}"),
        }

        let v = parse("serif, sans-serif").unwrap();
        match v {
            Value::List { items, separator } => {
                assert_eq!(separator, ListSeparator::Comma);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_comma_list_of_space_groups() {
        let v = parse("1px solid red, 2px dashed blue").unwrap();
        let Value::List { items, separator } = v else {
            panic!("expected list");
        };
        assert_eq!(separator, ListSeparator::Comma);
        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[0],
            Value::List { separator: ListSeparator::Space, items } if items.len() == 3
        ));
    }

    #[test]
    fn test_wide_keywords() {
        assert_eq!(parse("inherit"), Some(Value::Inherit));
        assert_eq!(parse("INITIAL"), Some(Value::Initial));
        assert_eq!(parse("unset"), Some(Value::Unset));
        assert_eq!(parse("revert"), Some(Value::Revert));
    }

    #[test]
    fn test_colors_in_values() {
        assert_eq!(
            parse("red"),
            Some(Value::Color(Color::Rgba(Rgba::rgb(255, 0, 0))))
        );
        assert_eq!(
            parse("#00ff00"),
            Some(Value::Color(Color::Rgba(Rgba::rgb(0, 255, 0))))
        );
        assert_eq!(parse("currentColor"), Some(Value::Color(Color::CurrentColor)));
        let v = parse("rgb(255 0 0 / 50%)").unwrap();
        match v {
            Value::Color(c) => assert_eq!(c.to_rgba(Rgba::BLACK), Rgba::new(255, 0, 0, 0.5)),
            other => panic!("expected color, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_hex_becomes_keyword() {
        let (v, diags) = parse_with_diags("#zzz");
        assert_eq!(v, Some(Value::Keyword("#zzz".into())));
        assert!(!diags.is_empty());
    }

    #[test]
    fn test_unknown_unit_flagged() {
        let (v, diags) = parse_with_diags("5foo");
        assert_eq!(v, Some(Value::Dimension(5.0, Unit::Unknown)));
        assert!(diags.iter().any(|d| d.message.contains("unknown unit")));
    }

    #[test]
    fn test_angle_time_dimensions() {
        assert_eq!(parse("90deg"), Some(Value::Dimension(90.0, Unit::Deg)));
        assert_eq!(parse("200ms"), Some(Value::Dimension(200.0, Unit::Ms)));
        assert_eq!(parse("2fr"), Some(Value::Dimension(2.0, Unit::Fr)));
    }

    #[test]
    fn test_var_with_fallback() {
        let v = parse("var(--accent, 10px)").unwrap();
        match v {
            Value::VarRef { name, fallback } => {
                assert_eq!(name, "--accent");
                assert_eq!(*fallback.unwrap(), Value::Length(10.0, Unit::Px));
            }
            other => panic!("expected var ref, got {other:?}"),
        }
    }

    #[test]
    fn test_var_requires_custom_property_name() {
        let (v, diags) = parse_with_diags("var(accent)");
        assert_eq!(v, None);
        assert!(!diags.is_empty());
    }

    #[test]
    fn test_env_and_attr_refs() {
        let v = parse("env(safe-area-inset-top, 0px)").unwrap();
        assert!(matches!(v, Value::EnvRef { ref name, .. } if name == "safe-area-inset-top"));

        let v = parse("attr(data-width px, 10px)").unwrap();
        match v {
            Value::AttrRef {
                name,
                type_or_unit,
                fallback,
            } => {
                assert_eq!(name, "data-width");
                assert_eq!(type_or_unit.as_deref(), Some("px"));
                assert!(fallback.is_some());
            }
            other => panic!("expected attr ref, got {other:?}"),
        }
    }

    #[test]
    fn test_calc_basic() {
        let v = parse("calc(1px + 2px)").unwrap();
        let Value::Calc(node) = v else { panic!("expected calc") };
        match *node {
            CalcNode::Binary { op, .. } => assert_eq!(op, CalcOp::Add),
            other => panic!("expected binary node, got {other:?}"),
        }
    }

    #[test]
    fn test_calc_precedence() {
        let v = parse("calc(1px + 2 * 3px)").unwrap();
        let Value::Calc(node) = v else { panic!("expected calc") };
        let CalcNode::Binary { op, rhs, .. } = *node else {
            panic!("expected sum at top");
        };
        assert_eq!(op, CalcOp::Add);
        assert!(matches!(*rhs, CalcNode::Binary { op: CalcOp::Mul, .. }));
    }

    #[test]
    fn test_nested_calc_flattens() {
        assert_eq!(parse("calc(calc(1px + 2px))"), parse("calc(1px + 2px)"));
        assert_eq!(parse("calc((1px + 2px))"), parse("calc(1px + 2px)"));
    }

    #[test]
    fn test_calc_operator_needs_whitespace() {
        // "1px+2px" tokenizes as two dimensions with no operator between.
        assert_eq!(parse("calc(1px+2px)"), None);
        assert_eq!(parse("calc(1px +2px)"), None);
        assert!(parse("calc(1px + 2px)").is_some());
    }

    #[test]
    fn test_calc_incompatible_addition_kept_as_function() {
        let (v, diags) = parse_with_diags("calc(1px + 2deg)");
        assert!(matches!(v, Some(Value::Function { ref name, .. }) if name == "calc"));
        assert!(diags.iter().any(|d| d.message.contains("incompatible")));
    }

    #[test]
    fn test_calc_multiply_requires_number_side() {
        let (v, _) = parse_with_diags("calc(2px * 3px)");
        assert!(matches!(v, Some(Value::Function { .. })));
        assert!(parse("calc(2px * 3)").is_some_and(|v| matches!(v, Value::Calc(_))));
    }

    #[test]
    fn test_calc_divide_requires_number_divisor() {
        let (v, _) = parse_with_diags("calc(4px / 2px)");
        assert!(matches!(v, Some(Value::Function { .. })));
        assert!(matches!(parse("calc(4px / 2)"), Some(Value::Calc(_))));
    }

    #[test]
    fn test_calc_percent_mixes_with_length() {
        assert!(matches!(parse("calc(50% + 10px)"), Some(Value::Calc(_))));
        assert!(matches!(parse("calc(100% / 3)"), Some(Value::Calc(_))));
    }

    #[test]
    fn test_calc_var_operand_is_compatible() {
        assert!(matches!(
            parse("calc(var(--gap) + 10px)"),
            Some(Value::Calc(_))
        ));
    }

    #[test]
    fn test_calc_constants() {
        let v = parse("calc(pi * 1rad)").unwrap();
        assert!(matches!(v, Value::Calc(_)));
        let Value::Calc(node) = parse("calc(e)").unwrap() else {
            panic!("expected calc");
        };
        match *node {
            CalcNode::Leaf(Value::Number(n)) => {
                assert!((n - std::f64::consts::E).abs() < 1e-12)
            }
            other => panic!("expected number leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_min_max_clamp() {
        let v = parse("min(10px, 5vw)").unwrap();
        let Value::Calc(node) = v else { panic!("expected calc") };
        match *node {
            CalcNode::Call { ref name, ref args } => {
                assert_eq!(name, "min");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {other:?}"),
        }

        assert!(matches!(
            parse("clamp(1rem, 2.5vw, 2rem)"),
            Some(Value::Calc(_))
        ));
        // clamp takes exactly three arguments.
        assert_eq!(parse("clamp(1rem, 2rem)"), None);
    }

    #[test]
    fn test_round_with_strategy() {
        assert!(matches!(
            parse("round(up, 101px, 10px)"),
            Some(Value::Calc(_))
        ));
        assert!(matches!(parse("round(1.5px, 1px)"), Some(Value::Calc(_))));
    }

    #[test]
    fn test_nested_math_in_calc() {
        let v = parse("calc(min(10px, 2vw) + 5px)").unwrap();
        assert!(matches!(v, Value::Calc(_)));
    }

    #[test]
    fn test_unicode_ranges() {
        assert_eq!(
            parse("U+26"),
            Some(Value::UnicodeRange { start: 0x26, end: 0x26 })
        );
        assert_eq!(
            parse("U+0-7F"),
            Some(Value::UnicodeRange { start: 0, end: 0x7F })
        );
        assert_eq!(
            parse("U+4??"),
            Some(Value::UnicodeRange { start: 0x400, end: 0x4FF })
        );
        let v = parse("U+0025-00FF, U+4??").unwrap();
        let Value::List { items, .. } = v else { panic!("expected list") };
        assert_eq!(
            items[0],
            Value::UnicodeRange { start: 0x25, end: 0xFF }
        );
    }

    #[test]
    fn test_lone_u_stays_keyword() {
        assert_eq!(parse("u"), Some(Value::Keyword("u".into())));
        let v = parse("u + x").unwrap();
        assert!(matches!(v, Value::List { .. }));
    }

    #[test]
    fn test_unknown_function_round_trips() {
        let v = parse("wiggle(1px, fast)").unwrap();
        match &v {
            Value::Function { name, args } => {
                assert_eq!(name, "wiggle");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected function, got {other:?}"),
        }
        assert_eq!(v.to_string(), "wiggle(1px, fast)");
    }

    #[test]
    fn test_empty_function_args() {
        let v = parse("toggle()").unwrap();
        assert!(matches!(v, Value::Function { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn test_url_values() {
        assert_eq!(parse("url(image.png)"), Some(Value::Url("image.png".into())));
        assert_eq!(
            parse("url(\"image.png\")"),
            Some(Value::Url("image.png".into()))
        );
    }

    #[test]
    fn test_slash_kept_as_keyword() {
        let v = parse("1 / 2").unwrap();
        let Value::List { items, .. } = v else { panic!("expected list") };
        assert_eq!(items[1], Value::Keyword("/".into()));
    }

    #[test]
    fn test_color_mix_value() {
        let v = parse("color-mix(in oklab, red 40%, blue)").unwrap();
        let Value::ColorMix(mix) = v else { panic!("expected color-mix") };
        assert_eq!(mix.space, MixSpace::Oklab);
        assert_eq!(mix.pa, Some(40.0));
        assert_eq!(mix.pb, None);
    }

    #[test]
    fn test_invalid_color_mix_drops_value() {
        let (v, diags) = parse_with_diags("color-mix(in plan9, red, blue)");
        assert_eq!(v, None);
        assert!(!diags.is_empty());
    }

    #[test]
    fn test_empty_value_is_invalid() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("  /* nothing */  "), None);
        assert_eq!(parse("a, , b"), None);
    }

    #[test]
    fn test_bad_string_drops_value() {
        assert_eq!(parse("\"broken\nline\""), None);
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(parse("10px").unwrap().to_string(), "10px");
        assert_eq!(parse("50%").unwrap().to_string(), "50%");
        assert_eq!(
            parse("calc(1px + 2px)").unwrap().to_string(),
            "calc(1px + 2px)"
        );
        assert_eq!(
            parse("min(10px, 5vw)").unwrap().to_string(),
            "min(10px, 5vw)"
        );
        assert_eq!(
            parse("var(--x, 1px)").unwrap().to_string(),
            "var(--x, 1px)"
        );
        assert_eq!(parse("U+0-7F").unwrap().to_string(), "U+0-7F");
    }

    #[test]
    fn test_has_references() {
        assert!(parse("var(--x)").unwrap().has_references());
        assert!(parse("calc(var(--x) + 1px)").unwrap().has_references());
        assert!(parse("1px var(--x)").unwrap().has_references());
        assert!(!parse("1px 2px").unwrap().has_references());
    }
}
