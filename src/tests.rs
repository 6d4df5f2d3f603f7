use std::ops::Range;

use proptest::prelude::*;

use crate::model;

use super::*;

fn init_logging() {
    let _ = simplelog::TestLogger::init(simplelog::LevelFilter::Trace, simplelog::Config::default());
}

fn keys<X, C>(tree: &RbTree<u32, X, C>) -> Vec<u32> {
    tree.iter().copied().collect()
}

// Calls `f` with every permutation of `0..n`.
fn for_each_permutation(n: u32, mut f: impl FnMut(&[u32])) {
    fn permute(prefix: &mut Vec<u32>, rest: &mut Vec<u32>, f: &mut dyn FnMut(&[u32])) {
        if rest.is_empty() {
            f(prefix);
            return;
        }

        for i in 0..rest.len() {
            let key = rest.remove(i);
            prefix.push(key);
            permute(prefix, rest, f);
            prefix.pop();
            rest.insert(i, key);
        }
    }

    permute(&mut Vec::new(), &mut (0..n).collect(), &mut f);
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: RbTree<u32> = RbTree::new();

    for &key in keys {
        let (_, inserted) = tree.insert_unique(key);
        assert!(inserted);
        tree.assert_invariants();
    }

    for key in keys {
        let pos = tree.search(key);
        assert_eq!(tree.get(pos), Some(key), "item not found");
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn permutations_find() {
    for n in 2..=6 {
        for_each_permutation(n, insert_find_all);
    }
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: RbTree<u32> = RbTree::new();

    for &key in keys {
        tree.insert_unique(key);
        tree.assert_invariants();
    }

    for key in keys {
        let pos = tree.search(key);
        assert!(!pos.is_end(), "item not found");
        tree.erase(pos);
        tree.assert_invariants();
    }
    assert!(tree.is_empty());

    for &key in keys {
        tree.insert_unique(key);
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let pos = tree.search(key);
        assert!(!pos.is_end(), "item not found");
        tree.erase(pos);
        tree.assert_invariants();
    }
    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn permutations_remove() {
    for n in 2..=6 {
        for_each_permutation(n, insert_remove_all);
    }
}

#[test]
fn unique_insert_then_erase_max() {
    let mut tree: RbTree<u32> = RbTree::new();
    for key in [10, 5, 20, 1, 15] {
        assert!(tree.insert_unique(key).1);
    }
    assert_eq!(keys(&tree), [1, 5, 10, 15, 20]);

    let (pos, inserted) = tree.insert_unique(10);
    assert!(!inserted);
    assert_eq!(tree.get(pos), Some(&10));
    assert_eq!(tree.len(), 5);
    assert_eq!(tree.first(), Some(&1));
    assert_eq!(tree.last(), Some(&20));

    let next = tree.erase(tree.search(&20));
    assert!(next.is_end());
    assert_eq!(keys(&tree), [1, 5, 10, 15]);
    assert_eq!(tree.last(), Some(&15));
    assert_eq!(tree.get(tree.prev(tree.end())), Some(&15));
    tree.assert_invariants();
}

#[test]
fn unique_insert_after_equal_run_reports_last() {
    let mut tree: RbTree<(u32, u32), PairKey> = RbTree::new();
    for pair in [(0, 0), (0, 1), (0, 2)] {
        tree.insert_equal(pair);
    }

    let (pos, inserted) = tree.insert_unique((0, 9));
    assert!(!inserted);
    assert_eq!(tree.get(pos), Some(&(0, 2)));
    assert_eq!(tree.len(), 3);
    tree.assert_invariants();
}

#[test]
fn equal_keys_keep_insertion_order() {
    let mut tree: RbTree<(u32, char), PairKey> = RbTree::new();
    for pair in [(5, 'a'), (3, 'b'), (5, 'c'), (3, 'd')] {
        tree.insert_equal(pair);
    }

    let all: Vec<_> = tree.iter().copied().collect();
    assert_eq!(all, [(3, 'b'), (3, 'd'), (5, 'a'), (5, 'c')]);

    let (lo, hi) = tree.equal_range(&5);
    assert_eq!(tree.get(lo), Some(&(5, 'a')));
    assert!(hi.is_end());
    assert_eq!(tree.get(tree.lower_bound(&4)), Some(&(5, 'a')));
    assert_eq!(tree.get(tree.upper_bound(&3)), Some(&(5, 'a')));
}

#[test]
fn count_and_equal_range() {
    let mut tree: RbTree<u32> = RbTree::new();
    for _ in 0..3 {
        tree.insert_equal(2);
    }

    assert_eq!(tree.count(&2), 3);
    assert_eq!(tree.equal_range(&2), (tree.begin(), tree.end()));

    assert_eq!(tree.count(&1), 0);
    assert_eq!(tree.equal_range(&1), (tree.begin(), tree.begin()));
    assert_eq!(tree.count(&3), 0);
    assert_eq!(tree.equal_range(&3), (tree.end(), tree.end()));
    tree.assert_invariants();
}

#[test]
fn unique_insert_rejects_equivalent() {
    let mut tree: RbTree<u32> = RbTree::new();
    for key in [4, 2, 6, 1, 3, 5, 7] {
        tree.insert_unique(key);
    }

    for key in 1..=7 {
        let (pos, inserted) = tree.insert_unique(key);
        assert!(!inserted);
        assert_eq!(tree.get(pos), Some(&key));
    }
    assert_eq!(tree.len(), 7);
    assert_eq!(tree.count(&4), 1);
}

#[test]
fn navigation_wraps_through_end() {
    let empty: RbTree<u32> = RbTree::new();
    assert_eq!(empty.begin(), empty.end());
    assert_eq!(empty.cbegin(), empty.cend());
    assert!(empty.next(empty.end()).is_end());
    assert!(empty.prev(empty.end()).is_end());

    let mut tree: RbTree<u32> = RbTree::new();
    for key in [2, 1, 3] {
        tree.insert_unique(key);
    }

    assert_eq!(tree.next(tree.end()), tree.begin());
    assert!(tree.prev(tree.begin()).is_end());

    let mut pos = tree.begin();
    let mut seen = Vec::new();
    while let Some(&key) = tree.get(pos) {
        seen.push(key);
        pos = tree.next(pos);
    }
    assert_eq!(seen, [1, 2, 3]);

    let mut pos = tree.prev(tree.end());
    seen.clear();
    while let Some(&key) = tree.get(pos) {
        seen.push(key);
        pos = tree.prev(pos);
    }
    assert_eq!(seen, [3, 2, 1]);
}

#[test]
fn erase_end_is_a_no_op() {
    let mut tree: RbTree<u32> = RbTree::new();
    tree.insert_unique(1);

    assert!(tree.erase(tree.end()).is_end());
    assert_eq!(tree.len(), 1);
    assert!(tree.extract(Position::END).is_none());
}

#[test]
fn stale_positions_resolve_to_nothing() {
    let mut tree: RbTree<u32> = RbTree::new();
    for key in [1, 2, 3] {
        tree.insert_unique(key);
    }

    let two = tree.search(&2);
    let three = tree.search(&3);
    assert_eq!(tree.erase(two), three);

    // The freed slot is reused by the next insertion.
    tree.insert_unique(7);
    assert_eq!(tree.get(two), None);
    assert!(tree.next(two).is_end());
    assert_eq!(tree.erase(two), two);
    assert_eq!(keys(&tree), [1, 3, 7]);

    // Positions of other elements survive removals and rebalancing.
    for key in 10..50 {
        tree.insert_unique(key);
    }
    assert_eq!(tree.get(three), Some(&3));

    tree.clear();
    assert_eq!(tree.get(three), None);
}

#[test]
fn get_mut_through_position() {
    let mut tree: RbTree<(u32, &str), PairKey> = RbTree::new();
    let (pos, _) = tree.insert_unique((1, "one"));
    tree.insert_unique((2, "two"));

    if let Some(pair) = tree.get_mut(pos) {
        pair.1 = "uno";
    }
    assert_eq!(tree.first(), Some(&(1, "uno")));
}

#[test]
fn merge_unique_leaves_collisions_behind() {
    init_logging();

    let mut a: RbTree<(u32, char), PairKey> = RbTree::new();
    let mut b: RbTree<(u32, char), PairKey> = RbTree::new();
    for pair in [(1, 'a'), (3, 'a'), (5, 'a')] {
        a.insert_unique(pair);
    }
    for pair in [(3, 'b'), (4, 'b')] {
        b.insert_unique(pair);
    }
    let kept = b.search(&3);

    a.merge_unique(&mut b);

    let merged: Vec<_> = a.iter().copied().collect();
    assert_eq!(merged, [(1, 'a'), (3, 'a'), (4, 'b'), (5, 'a')]);
    assert_eq!(b.len(), 1);
    assert_eq!(b.get(kept), Some(&(3, 'b')));
    a.assert_invariants();
    b.assert_invariants();
}

#[test]
fn merge_equal_moves_everything() {
    init_logging();

    let mut a: RbTree<(u32, char), PairKey> = RbTree::new();
    let mut b: RbTree<(u32, char), PairKey> = RbTree::new();
    for pair in [(1, 'a'), (3, 'a')] {
        a.insert_equal(pair);
    }
    for pair in [(3, 'b'), (2, 'b'), (3, 'c')] {
        b.insert_equal(pair);
    }

    a.merge_equal(&mut b);

    let merged: Vec<_> = a.iter().copied().collect();
    assert_eq!(merged, [(1, 'a'), (2, 'b'), (3, 'a'), (3, 'b'), (3, 'c')]);
    assert!(b.is_empty());
    assert!(b.begin().is_end());
    a.assert_invariants();
    b.assert_invariants();
}

#[test]
fn extract_and_relink() {
    init_logging();

    let mut tree: RbTree<u32> = RbTree::new();
    for key in 0..10 {
        tree.insert_unique(key);
    }

    let node = tree.extract(tree.search(&4)).expect("4 is present");
    assert_eq!(node.value(), &4);
    assert!(!tree.contains(&4));
    tree.assert_invariants();

    let (pos, rejected) = tree.insert_node_unique(node);
    assert!(rejected.is_none());
    assert_eq!(tree.get(pos), Some(&4));

    let dup = tree.extract(tree.search(&5)).expect("5 is present");
    tree.insert_unique(5);
    let (pos, rejected) = tree.insert_node_unique(dup);
    assert_eq!(tree.get(pos), Some(&5));
    assert_eq!(rejected.map(NodeHandle::into_value), Some(5));

    let mut other: RbTree<u32> = RbTree::new();
    let node = tree.extract(tree.begin()).expect("tree is not empty");
    other.insert_node_equal(node);
    assert_eq!(keys(&other), [0]);
    assert_eq!(keys(&tree), (1..10).collect::<Vec<_>>());
    tree.assert_invariants();
}

#[test]
fn clone_is_deep_and_valid() {
    init_logging();

    let mut tree: RbTree<u32> = RbTree::new();
    for key in (0..100).rev() {
        tree.insert_equal(key % 40);
    }
    for key in 0..30 {
        tree.erase(tree.search(&key));
    }

    let copy = tree.clone();
    copy.assert_invariants();
    assert_eq!(keys(&copy), keys(&tree));
    assert_eq!(copy.validate(), tree.validate());

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(copy.len(), 70);

    let empty: RbTree<u32> = RbTree::new();
    let copy = empty.clone();
    assert!(copy.is_empty());
    copy.assert_invariants();
}

#[test]
fn clear_keeps_capacity() {
    init_logging();

    let mut tree: RbTree<u32> = RbTree::new();
    for key in 0..64 {
        tree.insert_unique(key);
    }
    let capacity = tree.capacity();

    tree.clear();
    tree.assert_invariants();
    assert!(tree.is_empty());
    assert_eq!(tree.first(), None);
    assert_eq!(tree.capacity(), capacity);

    for key in 0..64 {
        tree.insert_unique(key);
    }
    assert_eq!(tree.capacity(), capacity);
    tree.assert_invariants();
}

#[test]
fn swap_and_take() {
    let mut a: RbTree<u32> = RbTree::new();
    let mut b: RbTree<u32> = RbTree::new();
    let (one, _) = a.insert_unique(1);
    b.insert_unique(2);
    b.insert_unique(3);

    a.swap(&mut b);
    assert_eq!(keys(&a), [2, 3]);
    assert_eq!(keys(&b), [1]);
    assert_eq!(b.get(one), Some(&1));

    let taken = a.take();
    assert!(a.is_empty());
    a.assert_invariants();
    assert_eq!(keys(&taken), [2, 3]);
}

#[test]
fn iterators() {
    let mut tree: RbTree<(u32, u32), PairKey> = RbTree::new();
    for key in [3, 1, 4, 5, 9, 2, 6] {
        tree.insert_unique((key, 0));
    }

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 7);
    assert_eq!(iter.next(), Some(&(1, 0)));
    assert_eq!(iter.next_back(), Some(&(9, 0)));
    assert_eq!(iter.len(), 5);
    assert_eq!(iter.map(|&(k, _)| k).collect::<Vec<_>>(), [2, 3, 4, 5, 6]);

    for (key, value) in tree.iter_mut() {
        *value = *key * 10;
    }
    for pair in &mut tree {
        pair.1 += 1;
    }
    let values: Vec<_> = tree.iter().map(|&(_, v)| v).collect();
    assert_eq!(values, [11, 21, 31, 41, 51, 61, 91]);

    let mut iter_mut = tree.iter_mut();
    assert_eq!(iter_mut.next_back().map(|pair| pair.0), Some(9));
    assert_eq!(iter_mut.len(), 6);

    let owned: Vec<_> = tree.into_iter().rev().map(|(k, _)| k).collect();
    assert_eq!(owned, [9, 6, 5, 4, 3, 2, 1]);
}

#[test]
fn entry_api() {
    let mut counts: RbTree<(&str, usize), PairKey> = RbTree::new();
    for word in "the cat saw the other cat and the dog".split(' ') {
        let pair = counts.entry(&word).or_insert_with(|&key| (key, 0));
        pair.1 += 1;
    }
    counts.assert_invariants();

    let (pos, _) = counts.equal_range(&"the");
    assert_eq!(counts.get(pos), Some(&("the", 3)));
    assert_eq!(counts.count(&"cat"), 1);
    assert_eq!(counts.len(), 6);

    match counts.entry(&"dog") {
        Entry::Occupied(mut occupied) => {
            let old = occupied.replace(("dog", 10));
            assert_eq!(old.1, 1);
            assert_eq!(occupied.get().1, 10);
            assert_eq!(occupied.remove().1, 10);
        }
        Entry::Vacant(_) => panic!("dog is present"),
    }
    assert!(!counts.contains(&"dog"));

    match counts.entry(&"emu") {
        Entry::Vacant(vacant) => {
            assert_eq!(vacant.key(), &"emu");
            vacant.insert(("emu", 1));
        }
        Entry::Occupied(_) => panic!("emu is absent"),
    }
    assert!(counts.contains(&"emu"));
    counts.assert_invariants();
}

#[test]
fn custom_orders() {
    let mut tree: RbTree<u32, Identity, Reversed> = RbTree::new();
    for key in [1, 3, 2] {
        tree.insert_unique(key);
    }
    assert_eq!(keys(&tree), [3, 2, 1]);
    tree.assert_invariants();

    let mut by_digit: RbTree<u32, Identity, _> =
        RbTree::with_order(Identity, |a: &u32, b: &u32| a % 10 < b % 10);
    assert!(by_digit.insert_unique(13).1);
    assert!(!by_digit.insert_unique(3).1);
    assert!(by_digit.insert_unique(21).1);
    by_digit.insert_equal(33);
    assert_eq!(keys(&by_digit), [21, 13, 33]);
    assert_eq!(by_digit.count(&3), 2);
    by_digit.assert_invariants();
}

#[test]
fn cursor_edits() {
    let mut tree: RbTree<u32> = RbTree::new();
    for key in 0..6 {
        tree.insert_unique(key);
    }

    let mut cursor = tree.cursor_at_mut(tree.search(&2));
    assert_eq!(cursor.remove_current(), Some(2));
    assert_eq!(cursor.get(), Some(&3));
    assert_eq!(cursor.remove_current_and_move_prev(), Some(3));
    assert_eq!(cursor.get(), Some(&1));
    if let Some(key) = cursor.get_mut() {
        *key = 2;
    }
    assert_eq!(cursor.as_cursor().peek_next(), Some(&4));

    let mut cursor = tree.cursor_last_mut();
    cursor.move_next();
    assert_eq!(cursor.get(), None);
    assert_eq!(cursor.remove_current(), None);
    assert_eq!(cursor.peek_next(), Some(&0));
    assert_eq!(cursor.peek_prev(), Some(&5));

    assert_eq!(keys(&tree), [0, 2, 4, 5]);
    tree.assert_invariants();

    let cursor = tree.cursor_first();
    assert_eq!(cursor.peek_prev(), None);
    assert_eq!(cursor.get(), Some(&0));
}

#[test]
fn validate_reports_stats_and_corruption() {
    let mut tree: RbTree<u32> = RbTree::new();
    let n = 1000;
    for key in 0..n {
        tree.insert_unique(key);
    }

    let stats = tree.validate().expect("tree is valid");
    assert_eq!(stats.len(), n as usize);
    assert!(stats.black_height() > 0);
    let bound = 2.0 * f64::from(n + 1).log2();
    assert!((stats.height() as f64) <= bound);

    let root = tree.root.expect("tree is not empty");
    tree.nodes.links_mut(root).set_color(arena::Color::Red);
    assert_eq!(tree.validate(), Err(InvariantError::RedRoot));
    tree.nodes.links_mut(root).set_color(arena::Color::Black);

    tree.len += 1;
    assert!(matches!(
        tree.validate(),
        Err(InvariantError::LengthMismatch { .. })
    ));
    tree.len -= 1;

    let empty: RbTree<u32> = RbTree::new();
    assert_eq!(empty.validate().map(|stats| stats.is_empty()), Ok(true));
}

#[test]
fn small_conveniences() {
    let mut tree: RbTree<u32> = RbTree::default();
    assert!(tree.max_size() > 0);
    assert_eq!(tree.pop_first(), None);
    assert_eq!(tree.pop_last(), None);

    for key in [2, 1] {
        tree.insert_unique(key);
    }
    assert_eq!(format!("{tree:?}"), "{1, 2}");
    assert_eq!(tree.pop_last(), Some(2));
    assert_eq!(tree.pop_first(), Some(1));
    assert!(tree.is_empty());
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn model_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_model_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u32..50, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }

    #[test]
    fn height_stays_logarithmic(keys in proptest::collection::vec(any::<u32>(), 1..500)) {
        let mut tree: RbTree<u32> = RbTree::new();
        for key in keys {
            tree.insert_equal(key);
        }

        let stats = tree.validate().expect("tree is valid");
        let bound = 2.0 * ((stats.len() + 1) as f64).log2();
        prop_assert!(stats.height() as f64 <= bound);
    }
}
