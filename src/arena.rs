use core::{mem, ops::Not};

/// Color of a real node. `Nil` and `End` links always read as black.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// A child link.
///
/// `End` marks the left child of the minimum node and the right child of the maximum node. Every
/// other missing child is `Nil`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Link {
    Node(usize),
    Nil,
    End,
}

impl Link {
    #[inline]
    pub(crate) fn node(self) -> Option<usize> {
        match self {
            Link::Node(idx) => Some(idx),
            Link::Nil | Link::End => None,
        }
    }
}

/// Structural half of an arena slot. The value half lives in a parallel vector so that link walks
/// can borrow the links while values are lent out mutably.
#[derive(Clone, Debug)]
pub(crate) struct Links {
    parent: Option<usize>,
    children: [Link; 2],
    color: Color,
    generation: u32,
}

impl Links {
    const fn new(generation: u32) -> Links {
        Links {
            parent: None,
            children: [Link::Nil; 2],
            color: Color::Red,
            generation,
        }
    }

    #[inline]
    pub(crate) fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Link {
        self.children[dir as usize]
    }

    #[inline]
    pub(crate) fn left(&self) -> Link {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Link {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Option<usize>) -> Option<usize> {
        mem::replace(&mut self.parent, parent)
    }

    #[inline]
    pub(crate) fn set_child(&mut self, dir: Dir, child: Link) -> Link {
        mem::replace(&mut self.children[dir as usize], child)
    }

    #[inline]
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

/// Slot storage for tree nodes.
///
/// Freed slots go on a free list and have their generation bumped, so a stale
/// [`Position`](crate::Position) never resolves to the slot's next occupant.
pub(crate) struct Arena<T> {
    links: Vec<Links>,
    values: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Arena<T> {
        Arena {
            links: Vec::new(),
            values: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Arena<T> {
        Arena {
            links: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Stores `value` in a fresh red, unlinked slot and returns its index.
    pub(crate) fn alloc(&mut self, value: T) -> usize {
        match self.free.pop() {
            Some(idx) => {
                let generation = self.links[idx].generation;
                self.links[idx] = Links::new(generation);
                self.values[idx] = Some(value);
                idx
            }
            None => {
                let idx = self.links.len();
                self.links.push(Links::new(0));
                self.values.push(Some(value));
                idx
            }
        }
    }

    /// Vacates slot `idx`, returning its value.
    pub(crate) fn free(&mut self, idx: usize) -> T {
        let value = self.values[idx]
            .take()
            .expect("freeing a vacant arena slot");

        let links = &mut self.links[idx];
        links.generation = links.generation.wrapping_add(1);
        links.parent = None;
        links.children = [Link::Nil; 2];
        self.free.push(idx);

        value
    }

    /// Returns `true` if slot `idx` is occupied and was allocated in `generation`.
    pub(crate) fn is_live(&self, idx: usize, generation: u32) -> bool {
        match (self.links.get(idx), self.values.get(idx)) {
            (Some(links), Some(Some(_))) => links.generation == generation,
            _ => false,
        }
    }

    #[inline]
    pub(crate) fn links(&self, idx: usize) -> &Links {
        &self.links[idx]
    }

    #[inline]
    pub(crate) fn links_mut(&mut self, idx: usize) -> &mut Links {
        &mut self.links[idx]
    }

    #[inline]
    pub(crate) fn value(&self, idx: usize) -> &T {
        self.values[idx]
            .as_ref()
            .expect("link points at a vacant arena slot")
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, idx: usize) -> &mut T {
        self.values[idx]
            .as_mut()
            .expect("link points at a vacant arena slot")
    }

    /// Splits the arena into its link table and a raw pointer to the value table.
    ///
    /// Used by [`IterMut`](crate::IterMut), which walks the links while handing out disjoint
    /// mutable references to values.
    pub(crate) fn split_mut(&mut self) -> (&[Links], *mut Option<T>) {
        (&self.links, self.values.as_mut_ptr())
    }

    #[inline]
    pub(crate) fn link_table(&self) -> &[Links] {
        &self.links
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.links.capacity()
    }
}

// Link walks over a link table. They take the table rather than the arena so that iterators
// holding only `&[Links]` can share them.

pub(crate) fn min_in_subtree(links: &[Links], root: usize) -> usize {
    let mut cur = root;

    while let Link::Node(left) = links[cur].left() {
        cur = left;
    }

    cur
}

pub(crate) fn max_in_subtree(links: &[Links], root: usize) -> usize {
    let mut cur = root;

    while let Link::Node(right) = links[cur].right() {
        cur = right;
    }

    cur
}

/// Returns the in-order neighbor of `idx` in direction `dir` (`Right` for the successor).
///
/// Descends into the `dir` subtree if there is one. An `End` link means `idx` is the last node in
/// that direction. Otherwise climbs until arriving through a `!dir` edge.
pub(crate) fn step(links: &[Links], idx: usize, dir: Dir) -> Option<usize> {
    match links[idx].child(dir) {
        Link::Node(child) => Some(match dir {
            Dir::Right => min_in_subtree(links, child),
            Dir::Left => max_in_subtree(links, child),
        }),

        Link::End => None,

        Link::Nil => {
            let mut cur = idx;

            loop {
                let parent = links[cur].parent()?;

                if links[parent].child(!dir) == Link::Node(cur) {
                    return Some(parent);
                }

                cur = parent;
            }
        }
    }
}

#[inline]
pub(crate) fn successor(links: &[Links], idx: usize) -> Option<usize> {
    step(links, idx, Dir::Right)
}

#[inline]
pub(crate) fn predecessor(links: &[Links], idx: usize) -> Option<usize> {
    step(links, idx, Dir::Left)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_slot_is_reused_with_new_generation() {
        let mut arena = Arena::new();

        let a = arena.alloc("a");
        let generation = arena.links(a).generation();
        assert!(arena.is_live(a, generation));

        assert_eq!(arena.free(a), "a");
        assert!(!arena.is_live(a, generation));

        let b = arena.alloc("b");
        assert_eq!(a, b);
        assert!(!arena.is_live(b, generation));
        assert!(arena.is_live(b, generation.wrapping_add(1)));
        assert_eq!(*arena.value(b), "b");
    }

    #[test]
    fn dir_not() {
        assert_eq!(!Dir::Left, Dir::Right);
        assert_eq!(!Dir::Right, Dir::Left);
    }

    #[test]
    fn absent_links_are_not_nodes() {
        assert_eq!(Link::Node(3).node(), Some(3));
        assert_eq!(Link::Nil.node(), None);
        assert_eq!(Link::End.node(), None);
    }
}
