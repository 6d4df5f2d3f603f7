use core::fmt;

/// InvariantError enumerates the ways a tree can fail [`RbTree::validate`].
///
/// None of these is reachable through the public API; they exist to make test and fuzz failures
/// readable.
///
/// [`RbTree::validate`]: crate::RbTree::validate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantError {
    /// The root is red.
    RedRoot,
    /// A red node has a red child. Carries the child's slot index.
    ConsecutiveReds(usize),
    /// Two root-to-leaf paths disagree on their number of black nodes.
    UnbalancedBlacks { left: usize, right: usize },
    /// A child's parent link does not point back at its parent.
    BrokenParentLink(usize),
    /// In-order traversal found a key less than its predecessor.
    SortError(usize),
    /// The cached minimum/maximum, or the `End` markers hanging off them, are stale.
    StaleBoundary,
    /// The stored length disagrees with the number of reachable nodes.
    LengthMismatch { stored: usize, counted: usize },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::RedRoot => write!(f, "root node is red"),
            InvariantError::ConsecutiveReds(idx) => {
                write!(f, "red node at slot {idx} has a red parent")
            }
            InvariantError::UnbalancedBlacks { left, right } => {
                write!(f, "unbalanced black height, left: {left} right: {right}")
            }
            InvariantError::BrokenParentLink(idx) => {
                write!(f, "node at slot {idx} does not link back to its parent")
            }
            InvariantError::SortError(idx) => {
                write!(f, "node at slot {idx} sorts before its predecessor")
            }
            InvariantError::StaleBoundary => write!(f, "head/tail cache or end marker is stale"),
            InvariantError::LengthMismatch { stored, counted } => {
                write!(f, "length is {stored} but {counted} nodes are reachable")
            }
        }
    }
}

impl std::error::Error for InvariantError {}

/// Statistics gathered by a successful [`RbTree::validate`].
///
/// [`RbTree::validate`]: crate::RbTree::validate
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub(crate) len: usize,
    pub(crate) black_height: usize,
    pub(crate) height: usize,
}

impl TreeStats {
    /// Number of entries in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of black nodes on every root-to-leaf path.
    #[inline]
    pub fn black_height(&self) -> usize {
        self.black_height
    }

    /// Number of nodes on the longest root-to-leaf path.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
}
