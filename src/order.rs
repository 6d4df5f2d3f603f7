//! Key extraction and ordering.
//!
//! A tree never looks at its values directly. It asks a [`KeyOf`] extractor for the key of a
//! value and a [`Compare`] comparator whether one key sorts before another.

use core::cmp::Ordering;

/// Pulls the comparison key out of a stored value.
pub trait KeyOf<T> {
    type Key: ?Sized;

    fn key_of<'a>(&self, value: &'a T) -> &'a Self::Key;
}

/// A strict weak order over keys.
///
/// Two keys are *equivalent* when neither is less than the other.
pub trait Compare<K: ?Sized> {
    /// Returns `true` if `lhs` sorts strictly before `rhs`.
    fn less(&self, lhs: &K, rhs: &K) -> bool;

    fn equivalent(&self, lhs: &K, rhs: &K) -> bool {
        !self.less(lhs, rhs) && !self.less(rhs, lhs)
    }
}

/// The value is its own key. Used by sets and multisets.
#[derive(Copy, Clone, Debug, Default)]
pub struct Identity;

impl<T> KeyOf<T> for Identity {
    type Key = T;

    #[inline]
    fn key_of<'a>(&self, value: &'a T) -> &'a T {
        value
    }
}

/// The key is the first element of a `(key, value)` pair. Used by maps.
#[derive(Copy, Clone, Debug, Default)]
pub struct PairKey;

impl<K, V> KeyOf<(K, V)> for PairKey {
    type Key = K;

    #[inline]
    fn key_of<'a>(&self, value: &'a (K, V)) -> &'a K {
        &value.0
    }
}

/// Ascending order by [`Ord`].
#[derive(Copy, Clone, Debug, Default)]
pub struct Natural;

impl<K: Ord + ?Sized> Compare<K> for Natural {
    #[inline]
    fn less(&self, lhs: &K, rhs: &K) -> bool {
        lhs.cmp(rhs) == Ordering::Less
    }

    #[inline]
    fn equivalent(&self, lhs: &K, rhs: &K) -> bool {
        lhs.cmp(rhs) == Ordering::Equal
    }
}

/// Descending order by [`Ord`].
#[derive(Copy, Clone, Debug, Default)]
pub struct Reversed;

impl<K: Ord + ?Sized> Compare<K> for Reversed {
    #[inline]
    fn less(&self, lhs: &K, rhs: &K) -> bool {
        rhs.cmp(lhs) == Ordering::Less
    }
}

/// Any `Fn(&K, &K) -> bool` "less than" closure is a comparator.
impl<K, F> Compare<K> for F
where
    K: ?Sized,
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, lhs: &K, rhs: &K) -> bool {
        self(lhs, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_and_reversed() {
        assert!(Natural.less(&1, &2));
        assert!(!Natural.less(&2, &2));
        assert!(Natural.equivalent(&2, &2));

        assert!(Reversed.less(&2, &1));
        assert!(!Reversed.less(&1, &2));
        assert!(Reversed.equivalent(&3, &3));
    }

    #[test]
    fn closure_comparator() {
        let by_len = |a: &&str, b: &&str| a.len() < b.len();

        assert!(by_len.less(&"ab", &"abc"));
        assert!(by_len.equivalent(&"ab", &"cd"));
    }

    #[test]
    fn extractors() {
        assert_eq!(Identity.key_of(&7), &7);
        assert_eq!(PairKey.key_of(&(1, "one")), &1);
    }
}
