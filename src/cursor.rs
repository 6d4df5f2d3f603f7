use crate::{Position, RbTree};

/// A cursor over an [`RbTree`].
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first. The ghost is the tree's [`Position::END`].
pub struct Cursor<'tree, T, X, C> {
    tree: &'tree RbTree<T, X, C>,
    pos: Position,
}

impl<'tree, T, X, C> Cursor<'tree, T, X, C> {
    pub(crate) fn new(tree: &'tree RbTree<T, X, C>, pos: Position) -> Cursor<'tree, T, X, C> {
        Cursor { tree, pos }
    }

    /// Returns the position the cursor points at.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Moves the cursor to the next element of the `RbTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the first
    /// element. If it is pointing to the last element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        self.pos = self.tree.next(self.pos);
    }

    /// Moves the cursor to the previous element of the `RbTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the last
    /// element. If it is pointing to the first element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        self.pos = self.tree.prev(self.pos);
    }

    /// Returns a reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<&'tree T> {
        self.tree.get(self.pos)
    }

    /// Returns a reference to the next item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<&'tree T> {
        self.tree.get(self.tree.next(self.pos))
    }

    /// Returns a reference to the previous item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<&'tree T> {
        self.tree.get(self.tree.prev(self.pos))
    }
}

impl<'tree, T, X, C> Clone for Cursor<'tree, T, X, C> {
    fn clone(&self) -> Self {
        Cursor {
            tree: self.tree,
            pos: self.pos,
        }
    }
}

/// A cursor over an [`RbTree`] which supports editing operations.
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first.
pub struct CursorMut<'tree, T, X, C> {
    tree: &'tree mut RbTree<T, X, C>,
    pos: Position,
}

impl<'tree, T, X, C> CursorMut<'tree, T, X, C> {
    pub(crate) fn new(tree: &'tree mut RbTree<T, X, C>, pos: Position) -> CursorMut<'tree, T, X, C> {
        CursorMut { tree, pos }
    }

    /// Returns a read-only cursor pointing to the current element.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, T, X, C> {
        Cursor::new(self.tree, self.pos)
    }

    /// Returns the position the cursor points at.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Moves the cursor to the next element of the `RbTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the first
    /// element. If it is pointing to the last element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        self.pos = self.tree.next(self.pos);
    }

    /// Moves the cursor to the previous element of the `RbTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the last
    /// element. If it is pointing to the first element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        self.pos = self.tree.prev(self.pos);
    }

    /// Returns a reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<&T> {
        self.tree.get(self.pos)
    }

    /// Returns a mutable reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    ///
    /// The result of comparisons between the key of the returned item and the keys of other items
    /// in the tree must not change.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.tree.get_mut(self.pos)
    }

    /// Returns a reference to the next item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<&T> {
        self.tree.get(self.tree.next(self.pos))
    }

    /// Returns a reference to the previous item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<&T> {
        self.tree.get(self.tree.prev(self.pos))
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the next element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current(&mut self) -> Option<T> {
        let remove = self.pos;
        if self.tree.get(remove).is_none() {
            return None;
        }

        self.move_next();
        self.tree.extract(remove).map(|node| node.into_value())
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the previous element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current_and_move_prev(&mut self) -> Option<T> {
        let remove = self.pos;
        if self.tree.get(remove).is_none() {
            return None;
        }

        self.move_prev();
        self.tree.extract(remove).map(|node| node.into_value())
    }
}
