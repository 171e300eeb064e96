use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

use crate::error::TreeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    /// Returns `true` if the color is [`Red`].
    ///
    /// [`Red`]: Color::Red
    #[must_use]
    pub fn is_red(&self) -> bool {
        matches!(self, Self::Red)
    }

    /// Returns `true` if the color is [`Black`].
    ///
    /// [`Black`]: Color::Black
    #[must_use]
    pub fn is_black(&self) -> bool {
        matches!(self, Self::Black)
    }
}

pub(crate) struct Node<K> {
    // creation order within the owning tree, only used for identity
    pub(crate) id: u64,
    pub(crate) key: K,
    pub(crate) color: Color,
    pub(crate) parent: Option<RawNode<K>>,
    pub(crate) left: Option<RawNode<K>>,
    pub(crate) right: Option<RawNode<K>>,
}

impl<K> Node<K> {
    pub(crate) fn new(id: u64, key: K) -> Self {
        Self {
            id,
            key,
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
        }
    }
}

/// Wrapper around `NonNull<Node<K>>` to provide convenient methods in order
/// to make the algorithms of the tree much more readable.
///
/// `left` and `right` own their targets, `parent` never does.
#[repr(transparent)]
pub(crate) struct RawNode<K> {
    ptr: NonNull<Node<K>>,
}

impl<K> Clone for RawNode<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for RawNode<K> {}

impl<K> PartialEq for RawNode<K> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.as_ptr(), other.as_ptr())
    }
}

impl<K> Eq for RawNode<K> {}

impl<K> fmt::Debug for RawNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawNode").field(&self.ptr).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodePos {
    Root,
    Left,
    Right,
}

impl<K> RawNode<K> {
    pub(crate) fn from_node(node: Node<K>) -> Self {
        Self {
            ptr: unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(node))) },
        }
    }

    /// Takes back ownership of the allocation.
    ///
    /// # Safety
    ///
    /// The node must be unlinked from the tree and never used again.
    #[inline]
    pub(crate) unsafe fn into_box(self) -> Box<Node<K>> {
        unsafe { Box::from_raw(self.as_ptr()) }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut Node<K> {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) unsafe fn id(&self) -> u64 {
        unsafe { (*self.as_ptr()).id }
    }

    #[inline]
    pub(crate) unsafe fn key<'a>(&self) -> &'a K {
        unsafe { &(*self.as_ptr()).key }
    }

    /// Swaps the keys of two distinct nodes.
    #[inline]
    pub(crate) unsafe fn swap_keys(&mut self, other: &mut RawNode<K>) {
        debug_assert!(self != other);
        unsafe { mem::swap(&mut (*self.as_ptr()).key, &mut (*other.as_ptr()).key) }
    }

    #[inline]
    pub(crate) unsafe fn parent(&self) -> Option<RawNode<K>> {
        unsafe { (*self.as_ptr()).parent }
    }

    #[inline]
    pub(crate) unsafe fn set_parent(&mut self, new_parent: Option<RawNode<K>>) {
        unsafe {
            (*self.as_ptr()).parent = new_parent;
        }
    }

    #[inline]
    pub(crate) unsafe fn left(&self) -> Option<RawNode<K>> {
        unsafe { (*self.as_ptr()).left }
    }

    /// Replaces the left child and points its parent link back at `self`.
    ///
    /// The previous owner of `new_left`, if any, is not updated.
    #[inline]
    pub(crate) unsafe fn set_left(&mut self, new_left: Option<RawNode<K>>) -> RawNode<K> {
        unsafe {
            (*self.as_ptr()).left = new_left;
            if let Some(mut left) = new_left {
                left.set_parent(Some(*self));
            }
        }
        *self
    }

    #[inline]
    pub(crate) unsafe fn right(&self) -> Option<RawNode<K>> {
        unsafe { (*self.as_ptr()).right }
    }

    /// Replaces the right child and points its parent link back at `self`.
    ///
    /// The previous owner of `new_right`, if any, is not updated.
    #[inline]
    pub(crate) unsafe fn set_right(&mut self, new_right: Option<RawNode<K>>) -> RawNode<K> {
        unsafe {
            (*self.as_ptr()).right = new_right;
            if let Some(mut right) = new_right {
                right.set_parent(Some(*self));
            }
        }
        *self
    }

    #[inline]
    pub(crate) unsafe fn color(&self) -> Color {
        unsafe { (*self.as_ptr()).color }
    }

    #[inline]
    pub(crate) unsafe fn make_red(&mut self) -> RawNode<K> {
        unsafe { (*self.as_ptr()).color = Color::Red }
        *self
    }

    #[inline]
    pub(crate) unsafe fn make_black(&mut self) -> RawNode<K> {
        unsafe { (*self.as_ptr()).color = Color::Black }
        *self
    }

    #[inline]
    pub(crate) unsafe fn is_less_than(&self, key: &K) -> bool
    where
        K: Ord,
    {
        unsafe { self.key() < key }
    }

    #[inline]
    pub(crate) unsafe fn is_greater_than(&self, key: &K) -> bool
    where
        K: Ord,
    {
        unsafe { self.key() > key }
    }

    #[inline]
    pub(crate) unsafe fn has_both_children(&self) -> bool {
        unsafe { self.left().is_some() && self.right().is_some() }
    }

    #[inline]
    pub(crate) unsafe fn grand_parent(&self) -> Option<RawNode<K>> {
        unsafe { self.parent().and_then(|p| p.parent()) }
    }

    /// The other child of the grand parent.
    #[inline]
    pub(crate) unsafe fn uncle(&self) -> Option<RawNode<K>> {
        unsafe {
            let parent = self.parent()?;
            let grand_parent = parent.parent()?;
            if grand_parent.left() == Some(parent) {
                grand_parent.right()
            } else {
                grand_parent.left()
            }
        }
    }

    #[inline]
    pub(crate) unsafe fn relations(&self) -> NodeRelations<RawNode<K>> {
        unsafe {
            NodeRelations {
                parent: self.parent(),
                grand_parent: self.grand_parent(),
                uncle: self.uncle(),
            }
        }
    }

    #[inline]
    pub(crate) unsafe fn is_left_child(&self) -> Result<bool, TreeError> {
        match unsafe { self.parent() } {
            Some(parent) => Ok(unsafe { parent.left() } == Some(*self)),
            None => Err(TreeError::RootHasNoSide),
        }
    }

    #[inline]
    pub(crate) unsafe fn pos(&self) -> NodePos {
        match unsafe { self.parent() } {
            Some(p) => {
                if unsafe { p.left() } == Some(*self) {
                    NodePos::Left
                } else {
                    debug_assert!(unsafe { p.right() } == Some(*self));
                    NodePos::Right
                }
            }
            None => NodePos::Root,
        }
    }
}

/// The parent, grand parent and uncle of a node, computed on demand.
///
/// Nothing keeps this in sync with the tree, it is a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRelations<N> {
    pub(crate) parent: Option<N>,
    pub(crate) grand_parent: Option<N>,
    pub(crate) uncle: Option<N>,
}

impl<N: Copy> NodeRelations<N> {
    pub fn parent(&self) -> Option<N> {
        self.parent
    }

    pub fn grand_parent(&self) -> Option<N> {
        self.grand_parent
    }

    pub fn uncle(&self) -> Option<N> {
        self.uncle
    }

    pub(crate) fn map<M>(self, mut f: impl FnMut(N) -> M) -> NodeRelations<M> {
        NodeRelations {
            parent: self.parent.map(&mut f),
            grand_parent: self.grand_parent.map(&mut f),
            uncle: self.uncle.map(&mut f),
        }
    }
}

/// Read-only handle to a node, valid for as long as the tree is borrowed.
///
/// Two handles compare equal if they carry the same creation id, which
/// within one tree means the same node. Keys are not compared.
pub struct NodeRef<'a, K> {
    raw: RawNode<K>,
    marker: PhantomData<&'a Node<K>>,
}

impl<K> Clone for NodeRef<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for NodeRef<'_, K> {}

impl<K> PartialEq for NodeRef<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<K> Eq for NodeRef<'_, K> {}

impl<K> fmt::Debug for NodeRef<'_, K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("Node");
        f.field("id", &self.id())
            .field("key", self.key())
            .field("color", &self.color());

        let mut dbg_opt_node = |name: &str, node: Option<Self>| match node {
            Some(node) => {
                f.field(name, &(node.key(), node.color()));
            }
            None => {
                f.field(name, &None::<K>);
            }
        };
        dbg_opt_node("parent", self.parent());
        dbg_opt_node("left", self.left());
        dbg_opt_node("right", self.right());

        f.finish()
    }
}

impl<'a, K> NodeRef<'a, K> {
    // The caller ties `'a` to a shared borrow of the tree owning `raw`.
    pub(crate) fn new(raw: RawNode<K>) -> Self {
        Self {
            raw,
            marker: PhantomData,
        }
    }

    fn wrap(raw: Option<RawNode<K>>) -> Option<Self> {
        raw.map(Self::new)
    }

    pub(crate) fn raw(&self) -> RawNode<K> {
        self.raw
    }

    /// Creation order of this node within its tree.
    pub fn id(&self) -> u64 {
        unsafe { self.raw.id() }
    }

    pub fn key(&self) -> &'a K {
        unsafe { self.raw.key() }
    }

    pub fn color(&self) -> Color {
        unsafe { self.raw.color() }
    }

    pub fn is_red(&self) -> bool {
        self.color().is_red()
    }

    pub fn is_black(&self) -> bool {
        self.color().is_black()
    }

    pub fn left(&self) -> Option<Self> {
        Self::wrap(unsafe { self.raw.left() })
    }

    pub fn right(&self) -> Option<Self> {
        Self::wrap(unsafe { self.raw.right() })
    }

    pub fn parent(&self) -> Option<Self> {
        Self::wrap(unsafe { self.raw.parent() })
    }

    pub fn grand_parent(&self) -> Option<Self> {
        Self::wrap(unsafe { self.raw.grand_parent() })
    }

    pub fn uncle(&self) -> Option<Self> {
        Self::wrap(unsafe { self.raw.uncle() })
    }

    pub fn relations(&self) -> NodeRelations<Self> {
        unsafe { self.raw.relations() }.map(Self::new)
    }

    pub fn has_both_children(&self) -> bool {
        unsafe { self.raw.has_both_children() }
    }

    /// Returns whether this node sits in its parent's left slot.
    ///
    /// # Errors
    ///
    /// [`TreeError::RootHasNoSide`] if the node is the root.
    pub fn is_left_child(&self) -> Result<bool, TreeError> {
        unsafe { self.raw.is_left_child() }
    }

    pub fn is_less_than(&self, key: &K) -> bool
    where
        K: Ord,
    {
        unsafe { self.raw.is_less_than(key) }
    }

    pub fn is_greater_than(&self, key: &K) -> bool
    where
        K: Ord,
    {
        unsafe { self.raw.is_greater_than(key) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builds the nodes by hand so the relations can be checked without going
    // through the balancing code.
    //
    //          +---- 8 ----+
    //          |           |
    //     +--- 4 ---+      12
    //     |         |
    //     2         6
    struct Fixture {
        nodes: Vec<RawNode<i32>>,
    }

    impl Fixture {
        fn new() -> Self {
            let nodes: Vec<_> = [8, 4, 12, 2, 6]
                .into_iter()
                .enumerate()
                .map(|(id, key)| RawNode::from_node(Node::new(id as u64, key)))
                .collect();
            let [mut n8, mut n4, n12, n2, n6] = nodes[..] else {
                unreachable!()
            };
            unsafe {
                n8.set_left(Some(n4));
                n8.set_right(Some(n12));
                n4.set_left(Some(n2));
                n4.set_right(Some(n6));
            }
            Self { nodes }
        }

        fn get(&self, key: i32) -> RawNode<i32> {
            *self
                .nodes
                .iter()
                .find(|n| unsafe { *n.key() } == key)
                .unwrap()
        }

        fn node_ref(&self, key: i32) -> NodeRef<'_, i32> {
            NodeRef::new(self.get(key))
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            for node in self.nodes.drain(..) {
                let _ = unsafe { node.into_box() };
            }
        }
    }

    fn keys(nodes: NodeRelations<NodeRef<'_, i32>>) -> (Option<i32>, Option<i32>, Option<i32>) {
        (
            nodes.parent().map(|n| *n.key()),
            nodes.grand_parent().map(|n| *n.key()),
            nodes.uncle().map(|n| *n.key()),
        )
    }

    #[test]
    fn new_node_is_red_and_detached() {
        let node = RawNode::from_node(Node::new(0, 1));
        unsafe {
            assert!(node.color().is_red());
            assert_eq!(node.parent(), None);
            assert_eq!(node.left(), None);
            assert_eq!(node.right(), None);
            let _ = node.into_box();
        }
    }

    #[test]
    fn set_child_updates_parent_link() {
        let fixture = Fixture::new();
        for key in [4, 12] {
            assert_eq!(
                unsafe { fixture.get(key).parent() },
                Some(fixture.get(8))
            );
        }
        for key in [2, 6] {
            assert_eq!(
                unsafe { fixture.get(key).parent() },
                Some(fixture.get(4))
            );
        }
    }

    #[test]
    fn relations() {
        let fixture = Fixture::new();
        assert_eq!(keys(fixture.node_ref(8).relations()), (None, None, None));
        assert_eq!(keys(fixture.node_ref(4).relations()), (Some(8), None, None));
        assert_eq!(
            keys(fixture.node_ref(2).relations()),
            (Some(4), Some(8), Some(12))
        );
        assert_eq!(
            keys(fixture.node_ref(6).relations()),
            (Some(4), Some(8), Some(12))
        );
        assert_eq!(fixture.node_ref(12).uncle(), None);
    }

    #[test]
    fn sides() {
        let fixture = Fixture::new();
        assert_eq!(fixture.node_ref(4).is_left_child(), Ok(true));
        assert_eq!(fixture.node_ref(12).is_left_child(), Ok(false));
        assert_eq!(fixture.node_ref(6).is_left_child(), Ok(false));
        assert_eq!(
            fixture.node_ref(8).is_left_child(),
            Err(TreeError::RootHasNoSide)
        );

        unsafe {
            assert_eq!(fixture.get(8).pos(), NodePos::Root);
            assert_eq!(fixture.get(2).pos(), NodePos::Left);
            assert_eq!(fixture.get(12).pos(), NodePos::Right);
        }
    }

    #[test]
    fn color_and_comparisons() {
        let fixture = Fixture::new();
        let mut raw = fixture.get(4);
        unsafe { raw.make_black() };
        let node = fixture.node_ref(4);
        assert!(node.is_black());
        unsafe { raw.make_red() };
        assert!(node.is_red());

        assert!(node.is_less_than(&5));
        assert!(!node.is_less_than(&4));
        assert!(node.is_greater_than(&3));
        assert!(!node.is_greater_than(&4));

        assert!(node.has_both_children());
        assert!(!fixture.node_ref(12).has_both_children());
    }

    #[test]
    fn handles_compare_by_identity() {
        let fixture = Fixture::new();
        assert_eq!(fixture.node_ref(2), fixture.node_ref(2));
        assert_ne!(fixture.node_ref(2), fixture.node_ref(6));
        assert_eq!(fixture.node_ref(2).parent(), Some(fixture.node_ref(4)));
    }
}
