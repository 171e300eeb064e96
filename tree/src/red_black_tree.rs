use core::fmt;
use core::ptr;
use std::collections::VecDeque;
use std::marker::PhantomData;

use log::{debug, trace};

use crate::error::TreeError;
use crate::node::{Node, NodePos, NodeRef, NodeRelations, RawNode};
use crate::render;

/// A red-black tree of unique keys.
///
/// Keys are routed in the mirrored direction compared to most binary search
/// trees: if a node's key is less than the key being placed the search moves
/// to the left child, if it is greater it moves to the right. An in-order walk
/// therefore yields the keys from largest to smallest.
///
/// Insertion keeps the red-black properties. Removal only unlinks the node and
/// performs no recoloring or rotation.
pub struct RedBlackTree<K> {
    root: Option<RawNode<K>>,
    len: usize,
    // id handed to the next node created by this tree
    next_id: u64,
    marker: PhantomData<Box<Node<K>>>,
}

impl<K> Drop for RedBlackTree<K> {
    fn drop(&mut self) {
        // TODO: handle panics in `K::drop`

        unsafe fn inner<K>(node: RawNode<K>) {
            if let Some(l) = unsafe { node.left() } {
                unsafe { inner(l) };
            }
            if let Some(r) = unsafe { node.right() } {
                unsafe { inner(r) };
            }
            let _: Box<Node<K>> = unsafe { node.into_box() };
        }

        self.len = 0;
        if let Some(root) = self.root.take() {
            unsafe { inner(root) };
        }
    }
}

impl<K> fmt::Debug for RedBlackTree<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct TreeDebug<'a, K> {
            root: Option<NodeRef<'a, K>>,
        }

        impl<K> fmt::Debug for TreeDebug<'_, K>
        where
            K: fmt::Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut f = f.debug_list();

                fn preorder<'a, K>(
                    node: Option<NodeRef<'a, K>>,
                    func: &mut impl FnMut(NodeRef<'a, K>),
                ) {
                    if let Some(node) = node {
                        func(node);
                        preorder(node.left(), func);
                        preorder(node.right(), func);
                    }
                }

                preorder(self.root, &mut |node| {
                    f.entry(&node);
                });
                f.finish()
            }
        }

        f.debug_struct("RedBlackTree")
            .field("len", &self.len)
            .field("root", &self.root())
            .field("nodes", &TreeDebug { root: self.root() })
            .finish()
    }
}

impl<K> fmt::Display for RedBlackTree<K>
where
    K: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::render(self.root()))
    }
}

impl<K> Default for RedBlackTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RedBlackTree<K> {
    pub fn new() -> Self {
        Self {
            root: None,
            len: 0,
            next_id: 0,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> Option<NodeRef<'_, K>> {
        self.root.map(NodeRef::new)
    }

    fn new_node(&mut self, key: K) -> RawNode<K> {
        let id = self.next_id;
        self.next_id += 1;
        RawNode::from_node(Node::new(id, key))
    }

    /// Returns the node reached by following left links from `node`.
    pub fn find_min<'a>(&'a self, node: Option<NodeRef<'a, K>>) -> Option<NodeRef<'a, K>> {
        node.map(|node| NodeRef::new(unsafe { Self::min_of(node.raw()) }))
    }

    unsafe fn min_of(root: RawNode<K>) -> RawNode<K> {
        let mut x = root;
        while let Some(left) = unsafe { x.left() } {
            x = left;
        }

        x
    }

    pub fn find(&self, key: &K) -> Option<NodeRef<'_, K>>
    where
        K: Ord,
    {
        let mut maybe_node = self.root;
        while let Some(node) = maybe_node {
            unsafe {
                if node.is_less_than(key) {
                    maybe_node = node.left();
                } else if node.is_greater_than(key) {
                    maybe_node = node.right();
                } else {
                    return Some(NodeRef::new(node));
                }
            }
        }

        None
    }

    /// Level order search, returns the first node whose key equals `key`.
    pub fn breadth_first_search(&self, key: &K) -> Option<NodeRef<'_, K>>
    where
        K: PartialEq,
    {
        let mut queue = VecDeque::with_capacity(self.len);
        queue.extend(self.root);
        while let Some(node) = queue.pop_front() {
            unsafe {
                if node.key() == key {
                    return Some(NodeRef::new(node));
                }
                queue.extend(node.left());
                queue.extend(node.right());
            }
        }

        None
    }

    /// Pre-order search for the node that stores exactly `key`.
    ///
    /// This compares addresses, not values: only a reference obtained from
    /// this tree (e.g. [`NodeRef::key`]) can be found. Use [`find`] or
    /// [`breadth_first_search`] to search by value.
    ///
    /// [`find`]: RedBlackTree::find
    /// [`breadth_first_search`]: RedBlackTree::breadth_first_search
    pub fn depth_first_search(&self, key: &K) -> Option<NodeRef<'_, K>> {
        unsafe fn inner<K>(node: RawNode<K>, key: &K) -> Option<RawNode<K>> {
            if ptr::eq(unsafe { node.key() }, key) {
                return Some(node);
            }
            if let Some(left) = unsafe { node.left() } {
                if let found @ Some(_) = unsafe { inner(left, key) } {
                    return found;
                }
            }
            match unsafe { node.right() } {
                Some(right) => unsafe { inner(right, key) },
                None => None,
            }
        }

        self.root
            .and_then(|root| unsafe { inner(root, key) })
            .map(NodeRef::new)
    }

    /// Inserts `key`, returns `false` if it was already present.
    pub fn insert(&mut self, key: K) -> bool
    where
        K: Ord,
    {
        let Some(mut node) = self.root else {
            let mut root = self.new_node(key);
            unsafe { root.make_black() };
            self.root = Some(root);
            self.len += 1;
            debug!("inserted root node {}", unsafe { root.id() });
            return true;
        };

        loop {
            let pos = unsafe {
                if node.is_less_than(&key) {
                    NodePos::Left
                } else if node.is_greater_than(&key) {
                    NodePos::Right
                } else {
                    debug!("key already stored in node {}, nothing inserted", node.id());
                    return false;
                }
            };

            let child = unsafe {
                match pos {
                    NodePos::Left => node.left(),
                    _ => node.right(),
                }
            };
            match child {
                Some(child) => node = child,
                None => {
                    let new_node = self.new_node(key);
                    unsafe {
                        match pos {
                            NodePos::Left => node.set_left(Some(new_node)),
                            _ => node.set_right(Some(new_node)),
                        };
                        debug!(
                            "inserted node {} as {:?} child of node {}",
                            new_node.id(),
                            pos,
                            node.id()
                        );
                    }
                    self.len += 1;
                    self.balance(new_node);
                    return true;
                }
            }
        }
    }

    /// Restores the red-black properties after `new_node` was attached as a
    /// red leaf.
    fn balance(&mut self, new_node: RawNode<K>) {
        let mut node = new_node;
        unsafe {
            loop {
                let NodeRelations {
                    parent,
                    grand_parent,
                    uncle,
                } = node.relations();

                // a missing parent counts as black too, `node` is the root then
                let mut parent = match parent {
                    Some(parent) if parent.color().is_red() => parent,
                    _ => break,
                };

                let Some(mut grand_parent) = grand_parent else {
                    trace!("node {}: red root parent, recoloring it", node.id());
                    parent.make_black();
                    break;
                };

                match uncle {
                    Some(mut uncle) if uncle.color().is_red() => {
                        //     +--- gp:b ---+               +--- gp:r ---+
                        //     |            |               |            |
                        //  + p:r +      + u:r +   -->   + p:b +      + u:b +
                        //  |     |      |     |         |     |      |     |
                        // n:r   a:b    b:b   c:b       n:r   a:b    b:b   c:b
                        //
                        // the violation may move up to the grand parent
                        trace!("node {}: red uncle {}, recoloring", node.id(), uncle.id());
                        parent.make_black();
                        uncle.make_black();
                        if Some(grand_parent) == self.root {
                            grand_parent.make_black();
                            break;
                        }
                        grand_parent.make_red();
                        node = grand_parent;
                    }
                    _ => {
                        trace!(
                            "node {}: black uncle, rotating around {:?} parent",
                            node.id(),
                            parent.pos()
                        );
                        match (parent.pos(), node.pos()) {
                            (NodePos::Left, NodePos::Left) => self.rotate_right(grand_parent),
                            (NodePos::Left, NodePos::Right) => {
                                self.rotate_left(parent);
                                self.rotate_right(grand_parent);
                            }
                            (NodePos::Right, NodePos::Right) => self.rotate_left(grand_parent),
                            (NodePos::Right, NodePos::Left) => {
                                self.rotate_right(parent);
                                self.rotate_left(grand_parent);
                            }
                            (NodePos::Root, _) | (_, NodePos::Root) => {
                                unreachable!("parent and node both have a parent")
                            }
                        }
                        break;
                    }
                }
            }
        }
    }

    /// Rotates `node` down to the left. `node` becomes red, its former right
    /// child takes its place and becomes black.
    fn rotate_left(&mut self, mut node: RawNode<K>) {
        //    p                       p
        //    |                       |
        // +-node-+               +-right-+
        // |      |      -->      |       |
        // a  +-right-+       +-node-+    c
        //    |       |       |      |
        //    b       c       a      b
        // where a, b, c can be any subtrees
        unsafe {
            if let Some(mut right) = node.right() {
                trace!("rotating node {} left", node.id());
                let parent = node.parent();
                let pos = node.pos();

                // attach b to node
                node.set_right(right.left()).make_red();

                // attach right to parent
                match (pos, parent) {
                    (NodePos::Left, Some(mut parent)) => {
                        parent.set_left(Some(right));
                    }
                    (NodePos::Right, Some(mut parent)) => {
                        parent.set_right(Some(right));
                    }
                    _ => {
                        right.set_parent(None);
                        self.root = Some(right);
                    }
                }

                // attach node to right
                right.set_left(Some(node)).make_black();
            }
        }
    }

    /// Mirror of [`rotate_left`](Self::rotate_left).
    fn rotate_right(&mut self, mut node: RawNode<K>) {
        //         p              p
        //         |              |
        //     +-node-+       +-left-+
        //     |      |       |      |
        // +-left-+   c  -->  a  +-node-+
        // |      |              |      |
        // a      b              b      c
        // where a, b, c can be any subtrees
        unsafe {
            if let Some(mut left) = node.left() {
                trace!("rotating node {} right", node.id());
                let parent = node.parent();
                let pos = node.pos();

                // attach b to node
                node.set_left(left.right()).make_red();

                // attach left to parent
                match (pos, parent) {
                    (NodePos::Left, Some(mut parent)) => {
                        parent.set_left(Some(left));
                    }
                    (NodePos::Right, Some(mut parent)) => {
                        parent.set_right(Some(left));
                    }
                    _ => {
                        left.set_parent(None);
                        self.root = Some(left);
                    }
                }

                // attach node to left
                left.set_right(Some(node)).make_black();
            }
        }
    }

    /// Removes `key` from the tree and returns the key that was stored.
    ///
    /// No rebalancing is done afterwards, so the tree may no longer satisfy
    /// the red-black properties. Binary search order is always kept.
    ///
    /// # Errors
    ///
    /// [`TreeError::Empty`] for an empty tree and [`TreeError::KeyNotFound`]
    /// if no node holds `key`. The tree is not modified in either case.
    pub fn remove(&mut self, key: &K) -> Result<K, TreeError>
    where
        K: Ord,
    {
        let root = self.root.ok_or(TreeError::Empty)?;
        let removed = self.remove_at(Some(root), key)?;
        debug!("removed key, {} nodes left", self.len);
        Ok(removed)
    }

    fn remove_at(&mut self, node: Option<RawNode<K>>, key: &K) -> Result<K, TreeError>
    where
        K: Ord,
    {
        let Some(mut node) = node else {
            return Err(TreeError::KeyNotFound);
        };

        unsafe {
            if node.key() == key {
                match node.right() {
                    Some(right) if node.has_both_children() => {
                        // Move the minimum of the right subtree into `node`.
                        // Its old node now holds `key` and is still reached
                        // from `right` by following left links only, because
                        // every key under `right` is smaller than `key`.
                        let mut min = Self::min_of(right);
                        trace!(
                            "node {}: taking key of node {} before unlinking it",
                            node.id(),
                            min.id()
                        );
                        node.swap_keys(&mut min);
                        return self.remove_at(Some(right), key);
                    }
                    _ => {
                        let child = node.left().or(node.right());
                        trace!("node {}: splicing out", node.id());
                        self.replace_subtree(node, child);
                        self.len -= 1;
                        // the target is gone, don't descend any further
                        return Ok(node.into_box().key);
                    }
                }
            }

            if node.is_less_than(key) {
                self.remove_at(node.left(), key)
            } else {
                self.remove_at(node.right(), key)
            }
        }
    }

    /// Replaces subtree `old` with subtree `new`
    unsafe fn replace_subtree(&mut self, old: RawNode<K>, new: Option<RawNode<K>>) {
        // We need to do two things:
        //  a) make the parent of `old` point to `new` instead of `old`,
        //     if `old` doesn't have parents it must have been the root which
        //     means that `new` will be the new root
        //  b) make `new` point to the parent of `old`
        unsafe {
            match (old.pos(), old.parent()) {
                (NodePos::Left, Some(mut parent)) => {
                    parent.set_left(new);
                }
                (NodePos::Right, Some(mut parent)) => {
                    parent.set_right(new);
                }
                _ => {
                    if let Some(mut new) = new {
                        new.set_parent(None);
                    }
                    self.root = new;
                }
            }
        }
    }

    /// Number of black nodes on every path from the root down to a missing
    /// child, or `None` if two paths disagree.
    pub fn black_height(&self) -> Option<usize> {
        fn inner<K>(node: Option<NodeRef<'_, K>>) -> Option<usize> {
            let Some(node) = node else {
                return Some(0);
            };
            let left = inner(node.left())?;
            let right = inner(node.right())?;
            (left == right).then(|| left + usize::from(node.is_black()))
        }

        inner(self.root())
    }

    /// Returns `true` if some red node has a red child.
    pub fn has_red_red(&self) -> bool {
        fn inner<K>(node: Option<NodeRef<'_, K>>) -> bool {
            let Some(node) = node else {
                return false;
            };
            let red_child = [node.left(), node.right()]
                .into_iter()
                .flatten()
                .any(|child| child.is_red());
            (node.is_red() && red_child) || inner(node.left()) || inner(node.right())
        }

        inner(self.root())
    }

    /// Checks the red-black properties: black root, no red node with a red
    /// child and the same black height on all paths.
    pub fn is_valid(&self) -> bool {
        self.root().map_or(true, |root| root.is_black())
            && !self.has_red_red()
            && self.black_height().is_some()
    }
}
