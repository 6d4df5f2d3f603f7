use core::mem;

use crate::arena::Dir;
use crate::{Compare, KeyOf, Position, RbTree};

/// A view into a single entry in an [`RbTree`], which may be either vacant or occupied.
///
/// Entries follow unique-key semantics: an entry is occupied if any element has a key equivalent
/// to the one looked up.
pub enum Entry<'tree, 'key, T, X, C>
where
    X: KeyOf<T>,
    C: Compare<X::Key>,
{
    Vacant(VacantEntry<'tree, 'key, T, X, C>),
    Occupied(OccupiedEntry<'tree, T, X, C>),
}

impl<'tree, 'key, T, X, C> Entry<'tree, 'key, T, X, C>
where
    X: KeyOf<T>,
    C: Compare<X::Key>,
{
    /// Inserts the value returned by `make` if the entry is vacant, and returns a mutable
    /// reference to the entry's element.
    pub fn or_insert_with<F>(self, make: F) -> &'tree mut T
    where
        F: FnOnce(&'key X::Key) -> T,
    {
        match self {
            Entry::Vacant(vacant) => {
                let value = make(vacant.key);
                vacant.insert(value)
            }
            Entry::Occupied(occupied) => occupied.into_mut(),
        }
    }

    /// Returns the position of the occupying element, or [`Position::END`] if the entry is
    /// vacant.
    pub fn position(&self) -> Position {
        match self {
            Entry::Vacant(_) => Position::END,
            Entry::Occupied(occupied) => occupied.position(),
        }
    }
}

/// Where a new node goes: as the root of an empty tree, or as the `dir` child of `parent`, whose
/// `dir` link is currently absent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum InsertAs {
    Root,
    Child { parent: usize, dir: Dir },
}

pub struct VacantEntry<'tree, 'key, T, X, C>
where
    X: KeyOf<T>,
    C: Compare<X::Key>,
{
    tree: &'tree mut RbTree<T, X, C>,
    key: &'key X::Key,
    insert_as: InsertAs,
}

impl<'tree, 'key, T, X, C> VacantEntry<'tree, 'key, T, X, C>
where
    X: KeyOf<T>,
    C: Compare<X::Key>,
{
    pub(crate) fn new(
        tree: &'tree mut RbTree<T, X, C>,
        key: &'key X::Key,
        insert_as: InsertAs,
    ) -> Self {
        VacantEntry {
            tree,
            key,
            insert_as,
        }
    }

    /// Returns the key this entry was looked up with.
    pub fn key(&self) -> &'key X::Key {
        self.key
    }

    /// Inserts `value` at the key associated with this entry.
    ///
    /// `value`'s key must be equivalent to the key used to retrieve this entry. Anything else is a
    /// logic error that leaves the tree's order unspecified.
    pub fn insert(self, value: T) -> &'tree mut T {
        debug_assert!(
            self.tree
                .compare
                .equivalent(self.tree.extract.key_of(&value), self.key),
            "value inserted through a vacant entry must match the entry's key"
        );

        let tree = self.tree;
        let idx = tree.nodes.alloc(value);
        tree.link_at(self.insert_as, idx);
        tree.nodes.value_mut(idx)
    }
}

pub struct OccupiedEntry<'tree, T, X, C> {
    tree: &'tree mut RbTree<T, X, C>,
    node: usize,
}

impl<'tree, T, X, C> OccupiedEntry<'tree, T, X, C> {
    pub(crate) fn new(tree: &'tree mut RbTree<T, X, C>, node: usize) -> Self {
        OccupiedEntry { tree, node }
    }

    /// Returns the position of the element in the entry.
    pub fn position(&self) -> Position {
        self.tree.position_of(self.node)
    }

    /// Returns a reference to the element in the entry.
    pub fn get(&self) -> &T {
        self.tree.nodes.value(self.node)
    }

    /// Returns a mutable reference to the element in the entry.
    ///
    /// The element's key must keep comparing the same way against every other key.
    pub fn get_mut(&mut self) -> &mut T {
        self.tree.nodes.value_mut(self.node)
    }

    /// Converts the entry into a mutable reference to its element, borrowed for the lifetime of
    /// the tree borrow.
    pub fn into_mut(self) -> &'tree mut T {
        let tree = self.tree;
        tree.nodes.value_mut(self.node)
    }

    /// Replaces the element in the entry, returning the previous element.
    ///
    /// The node stays where it is, so the new element's key must be equivalent to the old one.
    pub fn replace(&mut self, value: T) -> T {
        mem::replace(self.tree.nodes.value_mut(self.node), value)
    }

    /// Removes and returns the element in the entry.
    pub fn remove(self) -> T {
        self.tree.unlink(self.node)
    }
}
