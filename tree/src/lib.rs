//! A red-black tree over ordered keys with read-only node handles.
//!
//! Insertion keeps the tree balanced, removal only unlinks nodes. See
//! [`RedBlackTree`] for the details.

#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

mod error;
mod node;
mod red_black_tree;
pub mod render;

pub use error::TreeError;
pub use node::{Color, NodeRef, NodeRelations};
pub use red_black_tree::RedBlackTree;
