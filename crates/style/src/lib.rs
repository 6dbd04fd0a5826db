//! # Style Engine
//!
//! Selector matching, cascade resolution, reference substitution, and
//! computed style storage over the document tree.

pub mod cascade;
pub mod computed;
pub mod matching;
pub mod store;
pub mod substitute;

pub use cascade::{compute, CascadeContext};
pub use computed::ComputedStyle;
pub use matching::{match_group, matches_complex, matches_compound, MatchContext};
pub use store::{style_tree, StyleStore};
pub use substitute::Substituter;
