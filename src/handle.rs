use core::fmt;

/// An element detached from a tree by [`RbTree::extract`].
///
/// The handle owns the element exclusively. Relink it into any tree of the same kind with
/// [`RbTree::insert_node_unique`] or [`RbTree::insert_node_equal`]; dropping the handle drops the
/// element.
///
/// [`RbTree::extract`]: crate::RbTree::extract
/// [`RbTree::insert_node_unique`]: crate::RbTree::insert_node_unique
/// [`RbTree::insert_node_equal`]: crate::RbTree::insert_node_equal
pub struct NodeHandle<T> {
    value: T,
}

impl<T> NodeHandle<T> {
    pub(crate) fn new(value: T) -> NodeHandle<T> {
        NodeHandle { value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the element mutably. Any change to its key must happen before the handle is
    /// relinked.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeHandle").field(&self.value).finish()
    }
}
