//! Plain text rendering of a tree, one line per level.
//!
//! Only the public [`NodeRef`] accessors are used, so anything that can reach
//! a root handle can be rendered.

use core::fmt;

use crate::node::{Color, NodeRef};

const EMPTY_TREE: &str = "(empty)";
const MISSING_CHILD: &str = "-";

/// Renders the subtree under `root` level by level.
///
/// Every node is written as its key followed by `(R)` or `(B)`. Missing
/// children of nodes on the level above show up as `-`, so the position of
/// each node can be read off its line:
///
/// ```text
/// 2(B)
/// 3(B) 1(B)
/// 4(R) - - -
/// ```
pub fn render<K>(root: Option<NodeRef<'_, K>>) -> String
where
    K: fmt::Display,
{
    if root.is_none() {
        return EMPTY_TREE.to_owned();
    }

    let mut lines = Vec::new();
    let mut level = vec![root];
    while level.iter().any(Option::is_some) {
        let line: Vec<String> = level.iter().map(|node| entry(*node)).collect();
        lines.push(line.join(" "));

        level = level
            .into_iter()
            .flatten()
            .flat_map(|node| [node.left(), node.right()])
            .collect();
    }

    lines.join("\n")
}

fn entry<K>(node: Option<NodeRef<'_, K>>) -> String
where
    K: fmt::Display,
{
    match node {
        Some(node) => {
            let color = match node.color() {
                Color::Red => 'R',
                Color::Black => 'B',
            };
            format!("{}({color})", node.key())
        }
        None => MISSING_CHILD.to_owned(),
    }
}
