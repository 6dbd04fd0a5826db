//! Document tree for style computation.
//!
//! Arena-based node storage with intrusive links, plus the read-only
//! [`ElementRef`] view the selector matcher and cascade operate on. Uses
//! generational handles from the `arena` crate instead of Rc/RefCell.

pub mod element;
pub mod node;
pub mod tree;

pub use element::{DocumentMode, ElementRef, ElementState, StateMap};
pub use node::{Attr, CompatMode, ElementData, Namespace, Node, NodeData, NodeId};
pub use tree::Document;
