//! An arena-backed red-black tree, the core of ordered associative containers.
//!
//! One [`RbTree`] serves unique-key sets and maps ([`RbTree::insert_unique`]) as well as
//! multisets ([`RbTree::insert_equal`]). What a key is and how keys are ordered is decided by the
//! [`KeyOf`] and [`Compare`] type parameters.

// In comments, "absent" links are `Link::Nil` or `Link::End`. Both count as black leaves.
//
// The invariants of the tree are:
// 1. The root is black.
// 2. A red node has no red child.
// 3. Every path from a node down to an absent link passes the same number of black nodes.
// 4. `head` is the minimum node and its left link is `End`; `tail` is the maximum node and its
//    right link is `End`. No other link is `End`.
//
// Corollary of (4): rotations never move an `End` link. A rotation only moves the inner subtree
// of the child being raised, and the minimum (maximum) node's left (right) link is never an inner
// subtree of anything.

use core::mem;

use log::{debug, trace};

mod arena;
mod cursor;
mod debug;
mod entry;
mod error;
mod handle;
mod iter;
mod order;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

use crate::arena::{Arena, Color, Dir, Link, Links};
use crate::entry::InsertAs;

pub use crate::cursor::{Cursor, CursorMut};
pub use crate::entry::{Entry, OccupiedEntry, VacantEntry};
pub use crate::error::{InvariantError, TreeStats};
pub use crate::handle::NodeHandle;
pub use crate::iter::{IntoIter, Iter, IterMut};
pub use crate::order::{Compare, Identity, KeyOf, Natural, PairKey, Reversed};

/// A red-black tree storing values of type `T`, keyed by the extractor `X` and ordered by the
/// comparator `C`.
///
/// Nodes live in an arena owned by the tree and are addressed by [`Position`]s. The cached
/// minimum and maximum make [`begin`](RbTree::begin) and [`prev`](RbTree::prev) from the end
/// position O(1).
pub struct RbTree<T, X = Identity, C = Natural> {
    nodes: Arena<T>,
    root: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    extract: X,
    compare: C,
}

/// A handle to an element of an [`RbTree`], or to the one-past-the-end position.
///
/// Positions are plain values: they do not borrow the tree. A position stays valid across
/// insertions, rotations and the removal of other elements. Once its own element is erased or
/// extracted, or the tree is cleared, it no longer resolves to anything.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position(Repr);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Repr {
    Node { index: usize, generation: u32 },
    End,
}

impl Position {
    /// The one-past-the-end position.
    pub const END: Position = Position(Repr::End);

    #[inline]
    pub const fn is_end(self) -> bool {
        matches!(self.0, Repr::End)
    }
}

impl<T, X: Default, C: Default> RbTree<T, X, C> {
    /// Returns a new empty tree.
    pub fn new() -> RbTree<T, X, C> {
        RbTree::with_order(X::default(), C::default())
    }
}

impl<T, X: Default, C: Default> Default for RbTree<T, X, C> {
    fn default() -> Self {
        RbTree::new()
    }
}

impl<T, X, C> RbTree<T, X, C> {
    /// Returns a new empty tree using the given extractor and comparator.
    pub const fn with_order(extract: X, compare: C) -> RbTree<T, X, C> {
        RbTree {
            nodes: Arena::new(),
            root: None,
            head: None,
            tail: None,
            len: 0,
            extract,
            compare,
        }
    }

    /// Returns the number of elements in the tree.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the largest number of elements a tree of `T` could ever hold.
    pub fn max_size(&self) -> usize {
        let slot = mem::size_of::<Links>() + mem::size_of::<Option<T>>();
        isize::MAX as usize / slot.max(1)
    }

    /// Returns the number of slots the arena holds without reallocating.
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Returns the position of the minimum element, or [`Position::END`] if the tree is empty.
    #[inline]
    pub fn begin(&self) -> Position {
        self.position_or_end(self.head)
    }

    /// Returns the one-past-the-end position.
    #[inline]
    pub fn end(&self) -> Position {
        Position::END
    }

    /// Same as [`begin`](RbTree::begin). Positions carry no mutability of their own.
    #[inline]
    pub fn cbegin(&self) -> Position {
        self.begin()
    }

    /// Same as [`end`](RbTree::end).
    #[inline]
    pub fn cend(&self) -> Position {
        Position::END
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<&T> {
        self.head.map(|idx| self.nodes.value(idx))
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<&T> {
        self.tail.map(|idx| self.nodes.value(idx))
    }

    /// Returns the element at `pos`, or `None` for the end position or a stale position.
    pub fn get(&self, pos: Position) -> Option<&T> {
        let idx = self.resolve(pos)?;
        Some(self.nodes.value(idx))
    }

    /// Returns the element at `pos` mutably.
    ///
    /// Changing the element so that its key orders differently relative to the other keys is a
    /// logic error. The tree stays memory safe but its lookups become unspecified.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        let idx = self.resolve(pos)?;
        Some(self.nodes.value_mut(idx))
    }

    /// Returns the position after `pos` in sorted order.
    ///
    /// The end position sits between the last and the first element: `next(END)` is the first
    /// element, and the position after the last element is `END`.
    pub fn next(&self, pos: Position) -> Position {
        match self.resolve(pos) {
            Some(idx) => self.position_or_end(arena::successor(self.nodes.link_table(), idx)),
            None if pos.is_end() => self.begin(),
            None => Position::END,
        }
    }

    /// Returns the position before `pos` in sorted order. `prev(END)` is the last element.
    pub fn prev(&self, pos: Position) -> Position {
        match self.resolve(pos) {
            Some(idx) => self.position_or_end(arena::predecessor(self.nodes.link_table(), idx)),
            None if pos.is_end() => self.position_or_end(self.tail),
            None => Position::END,
        }
    }

    /// Returns an iterator over the elements in sorted order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.nodes, self.head, self.tail, self.len)
    }

    /// Returns an iterator over mutable references to the elements in sorted order.
    ///
    /// The same ordering caveat as [`get_mut`](RbTree::get_mut) applies.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let (head, tail, len) = (self.head, self.tail, self.len);
        IterMut::new(&mut self.nodes, head, tail, len)
    }

    /// Returns a cursor pointing at the minimum element.
    pub fn cursor_first(&self) -> Cursor<'_, T, X, C> {
        Cursor::new(self, self.begin())
    }

    /// Returns a cursor pointing at the maximum element.
    pub fn cursor_last(&self) -> Cursor<'_, T, X, C> {
        Cursor::new(self, self.position_or_end(self.tail))
    }

    /// Returns a cursor pointing at `pos`.
    pub fn cursor_at(&self, pos: Position) -> Cursor<'_, T, X, C> {
        Cursor::new(self, pos)
    }

    /// Returns an editing cursor pointing at the minimum element.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, T, X, C> {
        let pos = self.begin();
        CursorMut::new(self, pos)
    }

    /// Returns an editing cursor pointing at the maximum element.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, T, X, C> {
        let pos = self.position_or_end(self.tail);
        CursorMut::new(self, pos)
    }

    /// Returns an editing cursor pointing at `pos`.
    pub fn cursor_at_mut(&mut self, pos: Position) -> CursorMut<'_, T, X, C> {
        CursorMut::new(self, pos)
    }

    /// Removes the element at `pos` and returns the position of its successor.
    ///
    /// Erasing the end position, or a position whose element is already gone, does nothing and
    /// returns `pos`.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn erase(&mut self, pos: Position) -> Position {
        let Some(idx) = self.resolve(pos) else {
            return pos;
        };

        let next = arena::successor(self.nodes.link_table(), idx);
        drop(self.unlink(idx));
        self.position_or_end(next)
    }

    /// Detaches the element at `pos` from the tree and hands it back as a [`NodeHandle`].
    pub fn extract(&mut self, pos: Position) -> Option<NodeHandle<T>> {
        let idx = self.resolve(pos)?;
        trace!("extracting slot {idx}");
        Some(NodeHandle::new(self.unlink(idx)))
    }

    /// Removes and returns the minimum element.
    pub fn pop_first(&mut self) -> Option<T> {
        let head = self.head?;
        Some(self.unlink(head))
    }

    /// Removes and returns the maximum element.
    pub fn pop_last(&mut self) -> Option<T> {
        let tail = self.tail?;
        Some(self.unlink(tail))
    }

    /// Exchanges the contents of two trees. Positions follow their elements into the other tree.
    ///
    /// Extractors and comparators stay where they are.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.nodes, &mut other.nodes);
        mem::swap(&mut self.root, &mut other.root);
        mem::swap(&mut self.head, &mut other.head);
        mem::swap(&mut self.tail, &mut other.tail);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Clears the tree, removing all elements. The arena keeps its capacity.
    pub fn clear(&mut self) {
        let cleared = self.len;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            // Descend to the minimum node.
            let cur = arena::min_in_subtree(self.nodes.link_table(), cur);
            let parent = self.parent_of(cur);

            let right = self.nodes.links(cur).right();

            // Elevate the node's right child (which may be absent).
            self.replace_child_or_set_root(parent, cur, right);
            if let Link::Node(right) = right {
                self.nodes.links_mut(right).set_parent(parent);
            }

            // Drop the node.
            drop(self.nodes.free(cur));
            self.len -= 1;

            // If the node had no right child, climb to the parent. If the node had no parent,
            // the tree is empty.
            opt_cur = right.node().or(parent);
        }

        self.head = None;
        self.tail = None;

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
        debug!("cleared {cleared} nodes");
    }

    // Support methods ========================================================

    #[inline]
    fn resolve(&self, pos: Position) -> Option<usize> {
        match pos.0 {
            Repr::Node { index, generation } if self.nodes.is_live(index, generation) => {
                Some(index)
            }
            _ => None,
        }
    }

    #[inline]
    fn position_of(&self, idx: usize) -> Position {
        Position(Repr::Node {
            index: idx,
            generation: self.nodes.links(idx).generation(),
        })
    }

    #[inline]
    fn position_or_end(&self, idx: Option<usize>) -> Position {
        match idx {
            Some(idx) => self.position_of(idx),
            None => Position::END,
        }
    }

    #[inline]
    fn parent_of(&self, idx: usize) -> Option<usize> {
        self.nodes.links(idx).parent()
    }

    #[inline]
    fn is_red(&self, link: Link) -> bool {
        match link {
            Link::Node(idx) => self.nodes.links(idx).color() == Color::Red,
            Link::Nil | Link::End => false,
        }
    }

    #[inline]
    fn set_color(&mut self, idx: usize, color: Color) {
        self.nodes.links_mut(idx).set_color(color);
    }

    #[inline]
    fn which_child(&self, parent: usize, child: usize) -> Dir {
        if self.nodes.links(parent).left() == Link::Node(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }

    // Like `which_child`, but `x` may be an absent link. An absent `x` carrying a black-height
    // deficit always has a real sibling, so the absent side of `parent` is `x`'s side.
    fn side_of(&self, parent: usize, x: Link) -> Dir {
        match x {
            Link::Node(x) => self.which_child(parent, x),
            Link::Nil | Link::End => match self.nodes.links(parent).left() {
                Link::Node(_) => Dir::Right,
                Link::Nil | Link::End => Dir::Left,
            },
        }
    }

    // Replaces the child link of `parent` pointing at `old_child` with `new_child`, or makes
    // `new_child` the root if `parent` is `None`.
    //
    // `new_child`'s parent link is not updated.
    fn replace_child_or_set_root(&mut self, parent: Option<usize>, old_child: usize, new_child: Link) {
        match parent {
            Some(parent) => {
                let dir = self.which_child(parent, old_child);
                debug_assert_eq!(
                    self.nodes.links(parent).child(dir),
                    Link::Node(old_child),
                    "`old_child` must be a child of `parent`"
                );
                self.nodes.links_mut(parent).set_child(dir, new_child);
            }
            None => self.root = new_child.node(),
        }
    }

    // Puts `new_child` where `old_child` hangs under `parent`, and points it back at `parent`.
    fn transplant(&mut self, parent: Option<usize>, old_child: usize, new_child: Link) {
        self.replace_child_or_set_root(parent, old_child, new_child);

        if let Link::Node(new_child) = new_child {
            self.nodes.links_mut(new_child).set_parent(parent);
        }
    }

    // Performs a rotation at `down`, moving it one level down toward `dir`. Its `!dir` child
    // takes its place.
    //
    // Colors are not updated.
    fn rotate(&mut self, down: usize, dir: Dir) {
        let up = match self.nodes.links(down).child(!dir) {
            Link::Node(up) => up,
            _ => unreachable!("rotating toward an absent child"),
        };

        // `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
        let across = self.nodes.links(up).child(dir);
        self.nodes.links_mut(down).set_child(!dir, across);
        if let Link::Node(across) = across {
            self.nodes.links_mut(across).set_parent(Some(down));
        }

        let parent = self.nodes.links(down).parent();
        self.transplant(parent, down, Link::Node(up));

        self.nodes.links_mut(up).set_child(dir, Link::Node(down));
        self.nodes.links_mut(down).set_parent(Some(up));
    }

    // Links the freshly allocated slot `idx` at `at` and restores the invariants.
    fn link_at(&mut self, at: InsertAs, idx: usize) {
        self.len += 1;

        let (parent, dir) = match at {
            InsertAs::Root => {
                debug_assert!(self.root.is_none());

                let links = self.nodes.links_mut(idx);
                links.set_parent(None);
                links.set_child(Dir::Left, Link::End);
                links.set_child(Dir::Right, Link::End);
                links.set_color(Color::Black);

                self.root = Some(idx);
                self.head = Some(idx);
                self.tail = Some(idx);
                return;
            }
            InsertAs::Child { parent, dir } => (parent, dir),
        };

        {
            let links = self.nodes.links_mut(idx);
            links.set_parent(Some(parent));
            links.set_child(Dir::Left, Link::Nil);
            links.set_child(Dir::Right, Link::Nil);
            links.set_color(Color::Red);
        }

        // If `parent` is an extreme and `idx` lands on its outer side, `idx` inherits the `End`
        // marker and becomes the new extreme.
        let old = self.nodes.links_mut(parent).set_child(dir, Link::Node(idx));
        debug_assert!(old.node().is_none(), "insertion point is occupied");
        if old == Link::End {
            self.nodes.links_mut(idx).set_child(dir, Link::End);
            match dir {
                Dir::Left => self.head = Some(idx),
                Dir::Right => self.tail = Some(idx),
            }
        }

        self.rebalance_inserted(idx);
    }

    // Performs a bottom-up rebalance of the tree after the insertion of the red node `node`.
    fn rebalance_inserted(&mut self, node: usize) {
        let mut x = node;

        while let Some(parent) = self.parent_of(x) {
            if !self.is_red(Link::Node(parent)) {
                break;
            }

            // A red parent is never the root, so the grandparent exists.
            let grand = self
                .parent_of(parent)
                .expect("red node must have a parent");
            let side = self.which_child(grand, parent);
            let uncle = self.nodes.links(grand).child(!side);

            if self.is_red(uncle) {
                // Push the grandparent's blackness down one level and continue from there.
                if let Link::Node(uncle) = uncle {
                    self.set_color(uncle, Color::Black);
                }
                self.set_color(parent, Color::Black);
                self.set_color(grand, Color::Red);
                x = grand;
                continue;
            }

            let mut parent = parent;
            if self.which_child(parent, x) != side {
                // Zig-zag: rotate the inner child out first to get a straight line.
                self.rotate(parent, side);
                mem::swap(&mut x, &mut parent);
            }

            self.set_color(parent, Color::Black);
            self.set_color(grand, Color::Red);
            self.rotate(grand, !side);
            break;
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    // Removes slot `z` from the tree and returns its value.
    //
    // There are three cases:
    //
    // 1. `z` has no left child. Its right link (possibly absent) takes its place.
    // 2. `z` has no right child. Its left child takes its place.
    // 3. `z` has two children. Its successor `y` (the minimum of the right subtree, which has no
    //    left child) is spliced out of its own position, takes `z`'s place and color, and `y`'s
    //    right link takes `y`'s old place.
    //
    // The color actually removed from the tree is `z`'s in cases 1 and 2 and `y`'s in case 3. If
    // it was black, the subtree now rooted at `x` is one black short.
    fn unlink(&mut self, z: usize) -> T {
        let (next, prev) = {
            let links = self.nodes.link_table();
            (arena::successor(links, z), arena::predecessor(links, z))
        };
        let was_head = self.head == Some(z);
        let was_tail = self.tail == Some(z);

        let z_links = self.nodes.links(z);
        let (left, right) = (z_links.left(), z_links.right());
        let (parent, z_color) = (z_links.parent(), z_links.color());

        let (x, x_parent, removed_color) = match (left, right) {
            (Link::Nil | Link::End, _) => {
                self.transplant(parent, z, right);
                (right, parent, z_color)
            }

            (Link::Node(_), Link::Nil | Link::End) => {
                self.transplant(parent, z, left);
                (left, parent, z_color)
            }

            (Link::Node(l), Link::Node(r)) => {
                let y = arena::min_in_subtree(self.nodes.link_table(), r);
                let y_links = self.nodes.links(y);
                let (y_right, y_color, y_parent) =
                    (y_links.right(), y_links.color(), y_links.parent());

                let x_parent = match y_parent {
                    Some(yp) if yp != z => {
                        // Elevate the successor's right child to replace it.
                        self.transplant(Some(yp), y, y_right);
                        self.nodes.links_mut(y).set_child(Dir::Right, Link::Node(r));
                        self.nodes.links_mut(r).set_parent(Some(y));
                        yp
                    }
                    // `y` is `z`'s right child and keeps its right subtree.
                    _ => y,
                };

                self.transplant(parent, z, Link::Node(y));
                self.nodes.links_mut(y).set_child(Dir::Left, Link::Node(l));
                self.nodes.links_mut(l).set_parent(Some(y));
                self.set_color(y, z_color);

                (y_right, Some(x_parent), y_color)
            }
        };

        if removed_color == Color::Black {
            self.rebalance_removed(x, x_parent);
        }

        // Move the boundary markers to the new extremes.
        if was_head {
            self.head = next;
            if let Some(next) = next {
                self.nodes.links_mut(next).set_child(Dir::Left, Link::End);
            }
        }
        if was_tail {
            self.tail = prev;
            if let Some(prev) = prev {
                self.nodes.links_mut(prev).set_child(Dir::Right, Link::End);
            }
        }

        self.len -= 1;
        debug_assert_eq!(self.len == 0, self.root.is_none());

        self.nodes.free(z)
    }

    // Restores the invariants after a black node was removed above `x`, whose parent is
    // `parent`. `x` may be absent.
    fn rebalance_removed(&mut self, mut x: Link, mut parent: Option<usize>) {
        while let Some(p) = parent {
            if self.is_red(x) {
                break;
            }

            let side = self.side_of(p, x);
            let mut w = self.sibling(p, side);

            if self.is_red(Link::Node(w)) {
                // Red sibling: rotate it above `p` so that `x` gets a black sibling.
                self.set_color(w, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, side);
                w = self.sibling(p, side);
            }

            let near = self.nodes.links(w).child(side);
            let far = self.nodes.links(w).child(!side);

            if !self.is_red(near) && !self.is_red(far) {
                // Both of the sibling's children are black: recolor and move the deficit up.
                self.set_color(w, Color::Red);
                x = Link::Node(p);
                parent = self.parent_of(p);
                continue;
            }

            if !self.is_red(far) {
                // Near child red, far child black: rotate the near child into the far position.
                if let Link::Node(near) = near {
                    self.set_color(near, Color::Black);
                }
                self.set_color(w, Color::Red);
                self.rotate(w, !side);
                w = self.sibling(p, side);
            }

            // Far child red: one rotation at `p` absorbs the deficit.
            let p_color = self.nodes.links(p).color();
            self.set_color(w, p_color);
            self.set_color(p, Color::Black);
            if let Link::Node(far) = self.nodes.links(w).child(!side) {
                self.set_color(far, Color::Black);
            }
            self.rotate(p, side);

            x = self.root.map_or(Link::Nil, Link::Node);
            break;
        }

        if let Link::Node(x) = x {
            self.set_color(x, Color::Black);
        }
    }

    // The sibling of a node carrying a black-height deficit is always a real node.
    fn sibling(&self, parent: usize, side: Dir) -> usize {
        self.nodes
            .links(parent)
            .child(!side)
            .node()
            .expect("sibling of a black-height deficit must exist")
    }
}

impl<T, X, C> RbTree<T, X, C>
where
    X: KeyOf<T>,
    C: Compare<X::Key>,
{
    /// Inserts `value` unless an element with an equivalent key is present.
    ///
    /// Returns the position of the new element and `true`, or the position of the existing
    /// element and `false`. In the latter case `value` is dropped and the tree is unchanged. If
    /// several equivalent elements are present (from [`insert_equal`](RbTree::insert_equal)), the
    /// last of them is reported.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert_unique(&mut self, value: T) -> (Position, bool) {
        match self.locate_unique(self.extract.key_of(&value)) {
            Ok(at) => (self.link_value(at, value), true),
            Err(existing) => (self.position_of(existing), false),
        }
    }

    /// Inserts `value` after every element with an equivalent key.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert_equal(&mut self, value: T) -> Position {
        let at = self.locate_equal(self.extract.key_of(&value));
        self.link_value(at, value)
    }

    /// Relinks a detached node unless its key is already present, in which case the node is
    /// handed back untouched.
    pub fn insert_node_unique(&mut self, node: NodeHandle<T>) -> (Position, Option<NodeHandle<T>>) {
        match self.locate_unique(self.extract.key_of(node.value())) {
            Ok(at) => {
                let pos = self.link_value(at, node.into_value());
                trace!("relinked detached node at {pos:?}");
                (pos, None)
            }
            Err(existing) => (self.position_of(existing), Some(node)),
        }
    }

    /// Relinks a detached node after every element with an equivalent key.
    pub fn insert_node_equal(&mut self, node: NodeHandle<T>) -> Position {
        let at = self.locate_equal(self.extract.key_of(node.value()));
        let pos = self.link_value(at, node.into_value());
        trace!("relinked detached node at {pos:?}");
        pos
    }

    /// Returns a view into the slot for `key`, for in-place inspection or insertion.
    pub fn entry<'tree, 'key>(&'tree mut self, key: &'key X::Key) -> Entry<'tree, 'key, T, X, C> {
        match self.locate_unique(key) {
            Ok(at) => Entry::Vacant(VacantEntry::new(self, key, at)),
            Err(existing) => Entry::Occupied(OccupiedEntry::new(self, existing)),
        }
    }

    /// Returns the position of an element whose key is equivalent to `key`, or
    /// [`Position::END`].
    pub fn search(&self, key: &X::Key) -> Position {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            let cur_key = self.key_at(cur);

            opt_cur = if self.compare.less(key, cur_key) {
                self.nodes.links(cur).left().node()
            } else if self.compare.less(cur_key, key) {
                self.nodes.links(cur).right().node()
            } else {
                return self.position_of(cur);
            };
        }

        Position::END
    }

    /// Returns `true` if an element with a key equivalent to `key` is present.
    pub fn contains(&self, key: &X::Key) -> bool {
        !self.search(key).is_end()
    }

    /// Returns the position of the first element whose key is not less than `key`.
    pub fn lower_bound(&self, key: &X::Key) -> Position {
        self.position_or_end(self.lower_bound_raw(key))
    }

    /// Returns the position of the first element whose key is greater than `key`.
    pub fn upper_bound(&self, key: &X::Key) -> Position {
        self.position_or_end(self.upper_bound_raw(key))
    }

    /// Returns the half-open range `[lower_bound(key), upper_bound(key))` of elements equivalent
    /// to `key`, in insertion order.
    pub fn equal_range(&self, key: &X::Key) -> (Position, Position) {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Returns the number of elements whose key is equivalent to `key`.
    pub fn count(&self, key: &X::Key) -> usize {
        let upper = self.upper_bound_raw(key);
        let links = self.nodes.link_table();

        let mut count = 0;
        let mut opt_cur = self.lower_bound_raw(key);
        while let Some(cur) = opt_cur.filter(|&cur| Some(cur) != upper) {
            count += 1;
            opt_cur = arena::successor(links, cur);
        }

        count
    }

    /// Moves every element of `other` whose key is absent from `self` into `self`. Elements with
    /// colliding keys stay in `other`.
    ///
    /// Elements are moved, never cloned.
    pub fn merge_unique(&mut self, other: &mut Self) {
        let total = other.len;
        let mut moved = 0;
        let mut opt_cur = other.head;

        while let Some(cur) = opt_cur {
            opt_cur = arena::successor(other.nodes.link_table(), cur);

            if let Ok(at) = self.locate_unique(other.key_at(cur)) {
                let value = other.unlink(cur);
                self.link_value(at, value);
                moved += 1;
            }
        }

        debug!(
            "merge_unique moved {moved} of {total} nodes, {} left behind",
            other.len
        );
    }

    /// Moves every element of `other` into `self`, each after the elements of `self` with an
    /// equivalent key.
    pub fn merge_equal(&mut self, other: &mut Self) {
        let total = other.len;

        while let Some(head) = other.head {
            let at = self.locate_equal(other.key_at(head));
            let value = other.unlink(head);
            self.link_value(at, value);
        }

        debug!("merge_equal moved {total} nodes");
    }

    /// Checks every structural invariant of the tree.
    pub fn validate(&self) -> Result<TreeStats, InvariantError> {
        let mut stats = TreeStats {
            len: self.len,
            ..TreeStats::default()
        };

        let Some(root) = self.root else {
            if self.len != 0 {
                return Err(InvariantError::LengthMismatch {
                    stored: self.len,
                    counted: 0,
                });
            }
            if self.head.is_some() || self.tail.is_some() {
                return Err(InvariantError::StaleBoundary);
            }
            return Ok(stats);
        };

        let links = self.nodes.link_table();

        if links[root].color() == Color::Red {
            return Err(InvariantError::RedRoot);
        }
        if links[root].parent().is_some() {
            return Err(InvariantError::BrokenParentLink(root));
        }
        if self.head != Some(arena::min_in_subtree(links, root))
            || self.tail != Some(arena::max_in_subtree(links, root))
        {
            return Err(InvariantError::StaleBoundary);
        }

        let mut black_height = None;
        let mut counted = 0;

        // (slot, depth, black nodes from the root down to and including the slot)
        let mut work = vec![(root, 1_usize, 1_usize)];
        while let Some((idx, depth, blacks)) = work.pop() {
            counted += 1;
            stats.height = stats.height.max(depth);

            let node = &links[idx];
            let red = node.color() == Color::Red;

            for dir in [Dir::Left, Dir::Right] {
                match node.child(dir) {
                    Link::Node(child) => {
                        if links[child].parent() != Some(idx) {
                            return Err(InvariantError::BrokenParentLink(child));
                        }

                        let child_red = links[child].color() == Color::Red;
                        if red && child_red {
                            return Err(InvariantError::ConsecutiveReds(child));
                        }

                        work.push((child, depth + 1, blacks + usize::from(!child_red)));
                    }

                    absent => {
                        let boundary = match dir {
                            Dir::Left => self.head == Some(idx),
                            Dir::Right => self.tail == Some(idx),
                        };
                        if (absent == Link::End) != boundary {
                            return Err(InvariantError::StaleBoundary);
                        }

                        match black_height {
                            None => black_height = Some(blacks),
                            Some(expected) if expected != blacks => {
                                return Err(InvariantError::UnbalancedBlacks {
                                    left: expected,
                                    right: blacks,
                                });
                            }
                            Some(_) => (),
                        }
                    }
                }
            }
        }

        if counted != self.len {
            return Err(InvariantError::LengthMismatch {
                stored: self.len,
                counted,
            });
        }

        let mut opt_prev = None;
        let mut opt_cur = self.head;
        while let Some(cur) = opt_cur {
            if let Some(prev) = opt_prev {
                if self.compare.less(self.key_at(cur), self.key_at(prev)) {
                    return Err(InvariantError::SortError(cur));
                }
            }
            opt_prev = Some(cur);
            opt_cur = arena::successor(links, cur);
        }

        stats.black_height = black_height.unwrap_or(0);
        Ok(stats)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Err(err) = self.validate() {
            panic!("red-black tree invariant violated: {err}");
        }
    }

    // Support methods ========================================================

    #[inline]
    fn key_at(&self, idx: usize) -> &X::Key {
        self.extract.key_of(self.nodes.value(idx))
    }

    fn link_value(&mut self, at: InsertAs, value: T) -> Position {
        let idx = self.nodes.alloc(value);
        self.link_at(at, idx);
        self.position_of(idx)
    }

    // Finds where a node keyed `key` would go if keys were unique.
    //
    // Descends left while `key` is less than the node's key and right otherwise, so the last
    // node visited is either the greatest node not greater than `key` (last step right) or the
    // successor of that node (last step left). Its predecessor, or the node itself, is the only
    // candidate for an equivalent key.
    //
    // Returns the existing node on a hit.
    pub(crate) fn locate_unique(&self, key: &X::Key) -> Result<InsertAs, usize> {
        let Some(mut parent) = self.root else {
            return Ok(InsertAs::Root);
        };

        let dir = loop {
            let dir = if self.compare.less(key, self.key_at(parent)) {
                Dir::Left
            } else {
                Dir::Right
            };

            match self.nodes.links(parent).child(dir) {
                Link::Node(child) => parent = child,
                Link::Nil | Link::End => break dir,
            }
        };

        let candidate = match dir {
            Dir::Right => parent,
            Dir::Left => match arena::predecessor(self.nodes.link_table(), parent) {
                Some(pred) => pred,
                // `parent` is the minimum: nothing can be equivalent to `key`.
                None => return Ok(InsertAs::Child { parent, dir }),
            },
        };

        if self.compare.less(self.key_at(candidate), key) {
            Ok(InsertAs::Child { parent, dir })
        } else {
            Err(candidate)
        }
    }

    // Finds where a node keyed `key` goes in a multi-key tree: ties descend right, so it lands
    // after every equivalent key.
    pub(crate) fn locate_equal(&self, key: &X::Key) -> InsertAs {
        let Some(mut parent) = self.root else {
            return InsertAs::Root;
        };

        loop {
            let dir = if self.compare.less(key, self.key_at(parent)) {
                Dir::Left
            } else {
                Dir::Right
            };

            match self.nodes.links(parent).child(dir) {
                Link::Node(child) => parent = child,
                Link::Nil | Link::End => return InsertAs::Child { parent, dir },
            }
        }
    }

    fn lower_bound_raw(&self, key: &X::Key) -> Option<usize> {
        let mut found = None;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            opt_cur = if self.compare.less(self.key_at(cur), key) {
                self.nodes.links(cur).right().node()
            } else {
                found = Some(cur);
                self.nodes.links(cur).left().node()
            };
        }

        found
    }

    fn upper_bound_raw(&self, key: &X::Key) -> Option<usize> {
        let mut found = None;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            opt_cur = if self.compare.less(key, self.key_at(cur)) {
                found = Some(cur);
                self.nodes.links(cur).left().node()
            } else {
                self.nodes.links(cur).right().node()
            };
        }

        found
    }
}

impl<T, X: Clone, C: Clone> RbTree<T, X, C> {
    /// Moves every element out into a new tree, leaving `self` empty with the same ordering.
    pub fn take(&mut self) -> RbTree<T, X, C> {
        let empty = RbTree::with_order(self.extract.clone(), self.compare.clone());
        mem::replace(self, empty)
    }
}

impl<T: Clone, X: Clone, C: Clone> Clone for RbTree<T, X, C> {
    // Copies the shape and colors node by node with an explicit worklist. The source's `End`
    // links tell which copies are the new head and tail.
    fn clone(&self) -> Self {
        let mut out = RbTree {
            nodes: Arena::with_capacity(self.len),
            root: None,
            head: None,
            tail: None,
            len: self.len,
            extract: self.extract.clone(),
            compare: self.compare.clone(),
        };

        let Some(root) = self.root else {
            return out;
        };

        // (source slot, copied parent and side)
        let mut work: Vec<(usize, Option<(usize, Dir)>)> = vec![(root, None)];
        while let Some((src, at)) = work.pop() {
            let dst = out.nodes.alloc(self.nodes.value(src).clone());
            let src_links = self.nodes.links(src);
            out.nodes.links_mut(dst).set_color(src_links.color());

            match at {
                Some((parent, dir)) => {
                    out.nodes.links_mut(dst).set_parent(Some(parent));
                    out.nodes.links_mut(parent).set_child(dir, Link::Node(dst));
                }
                None => out.root = Some(dst),
            }

            for dir in [Dir::Right, Dir::Left] {
                match src_links.child(dir) {
                    Link::Node(child) => work.push((child, Some((dst, dir)))),
                    Link::End => {
                        out.nodes.links_mut(dst).set_child(dir, Link::End);
                        match dir {
                            Dir::Left => out.head = Some(dst),
                            Dir::Right => out.tail = Some(dst),
                        }
                    }
                    Link::Nil => (),
                }
            }
        }

        trace!("cloned {} nodes", out.len);
        out
    }
}

impl<T, X, C> IntoIterator for RbTree<T, X, C> {
    type Item = T;
    type IntoIter = IntoIter<T, X, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'tree, T, X, C> IntoIterator for &'tree RbTree<T, X, C> {
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'tree, T, X, C> IntoIterator for &'tree mut RbTree<T, X, C> {
    type Item = &'tree mut T;
    type IntoIter = IterMut<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
