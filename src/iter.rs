use core::{fmt, iter::FusedIterator, marker::PhantomData};

use crate::arena::{self, Arena, Links};
use crate::RbTree;

/// An in-order iterator over the elements of an [`RbTree`].
///
/// Walks the successor links from the cached minimum and the predecessor links from the cached
/// maximum. `len` counts the elements not yet yielded from either end, so the two walks never
/// cross.
pub struct Iter<'tree, T> {
    nodes: &'tree Arena<T>,
    front: Option<usize>,
    back: Option<usize>,
    len: usize,
}

impl<'tree, T> Iter<'tree, T> {
    pub(crate) fn new(
        nodes: &'tree Arena<T>,
        front: Option<usize>,
        back: Option<usize>,
        len: usize,
    ) -> Self {
        Iter {
            nodes,
            front,
            back,
            len,
        }
    }
}

impl<'tree, T> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.front = arena::successor(self.nodes.link_table(), cur);
        self.len -= 1;

        Some(self.nodes.value(cur))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T> DoubleEndedIterator for Iter<'tree, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.back = arena::predecessor(self.nodes.link_table(), cur);
        self.len -= 1;

        Some(self.nodes.value(cur))
    }
}

impl<'tree, T> ExactSizeIterator for Iter<'tree, T> {}

impl<'tree, T> FusedIterator for Iter<'tree, T> {}

impl<'tree, T> Clone for Iter<'tree, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'tree, T: fmt::Debug> fmt::Debug for Iter<'tree, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An in-order iterator over mutable references to the elements of an [`RbTree`].
pub struct IterMut<'tree, T> {
    links: &'tree [Links],
    // Points into the arena's value table, which is exclusively borrowed for `'tree`.
    values: *mut Option<T>,
    front: Option<usize>,
    back: Option<usize>,
    len: usize,
    phantom: PhantomData<&'tree mut T>,
}

// SAFETY: `IterMut` behaves like `&'tree mut [T]`.
unsafe impl<'tree, T: Send> Send for IterMut<'tree, T> {}
unsafe impl<'tree, T: Sync> Sync for IterMut<'tree, T> {}

impl<'tree, T> IterMut<'tree, T> {
    pub(crate) fn new(
        nodes: &'tree mut Arena<T>,
        front: Option<usize>,
        back: Option<usize>,
        len: usize,
    ) -> Self {
        let (links, values) = nodes.split_mut();

        IterMut {
            links,
            values,
            front,
            back,
            len,
            phantom: PhantomData,
        }
    }

    fn value_at(&mut self, idx: usize) -> &'tree mut T {
        debug_assert!(idx < self.links.len());

        // SAFETY: `idx` is a live slot reached through the link table, so it is in bounds and
        // occupied. Each slot is yielded at most once because `len` stops the front and back walks
        // before they meet, so no two returned references alias.
        let slot = unsafe { &mut *self.values.add(idx) };
        slot.as_mut().expect("link points at a vacant arena slot")
    }
}

impl<'tree, T> Iterator for IterMut<'tree, T> {
    type Item = &'tree mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.front = arena::successor(self.links, cur);
        self.len -= 1;

        Some(self.value_at(cur))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T> DoubleEndedIterator for IterMut<'tree, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.back = arena::predecessor(self.links, cur);
        self.len -= 1;

        Some(self.value_at(cur))
    }
}

impl<'tree, T> ExactSizeIterator for IterMut<'tree, T> {}

impl<'tree, T> FusedIterator for IterMut<'tree, T> {}

/// An owning in-order iterator over the elements of an [`RbTree`].
pub struct IntoIter<T, X, C> {
    tree: RbTree<T, X, C>,
}

impl<T, X, C> IntoIter<T, X, C> {
    pub(crate) fn new(tree: RbTree<T, X, C>) -> Self {
        IntoIter { tree }
    }
}

impl<T, X, C> Iterator for IntoIter<T, X, C> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<T, X, C> DoubleEndedIterator for IntoIter<T, X, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_last()
    }
}

impl<T, X, C> ExactSizeIterator for IntoIter<T, X, C> {}

impl<T, X, C> FusedIterator for IntoIter<T, X, C> {}
