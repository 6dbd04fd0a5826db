pub mod color;
pub mod diagnostics;
pub mod features;
pub mod parser;
pub mod property;
pub mod selector;
pub mod token;
pub mod value;

pub use color::{Color, ColorMix, MixSpace, Rgba};
pub use diagnostics::{Diagnostic, Severity};
pub use features::FeatureFlags;
pub use parser::{
    parse_declaration_block, parse_stylesheet, AtRule, AtRuleKind, Declaration, Origin,
    PropertyRef, Rule, Stylesheet, StyleRule,
};
pub use property::{is_custom_property_name, PropertyId, PropertyMeta, PropertyRegistry};
pub use selector::{
    compute_specificity, parse_selector_group, AttrOp, Combinator, ComplexSelector,
    CompoundSelector, Direction, Nth, PseudoClass, PseudoElement, SelectorGroup, SimpleSelector,
    Specificity,
};
pub use token::{tokenize, Token, TokenKind, Tokenizer};
pub use value::{parse_value_from_tokens, CalcNode, CalcOp, ListSeparator, Unit, Value};
