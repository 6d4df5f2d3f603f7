//! Model-based equivalence checks, shared by the proptest suite and the fuzz targets.
//!
//! The model of a tree is a `Vec` of `(key, stamp)` pairs kept sorted by key, with equivalent keys
//! in insertion order. Stamps are unique per inserted element, so comparing whole pairs also checks
//! the relative order of equivalent keys.
//!
//! A second, "side" tree with its own model is the merge source and swap partner.

use core::mem;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{PairKey, RbTree};

/// The tree under test: `(key, stamp)` pairs keyed by `key`.
pub type ModelTree = RbTree<(u32, u32), PairKey>;

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..100,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    InsertUnique(ItemValue),
    InsertEqual(ItemValue),
    Erase(ItemValue),
    Reinsert(ItemValue),
    Search(ItemValue),
    LowerBound(ItemValue),
    UpperBound(ItemValue),
    Count(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
    SideInsert(ItemValue),
    MergeUnique,
    MergeEqual,
    Swap,
}

impl Op {
    fn finalize(self, sorted: &[(u32, u32)]) -> FinalOp {
        fn get_key(v: &[(u32, u32)], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()].0
                    }
                }
                ItemValue::Random(k) => k,
            }
        }

        match self {
            Op::InsertUnique(item) => FinalOp::InsertUnique(get_key(sorted, item)),
            Op::InsertEqual(item) => FinalOp::InsertEqual(get_key(sorted, item)),
            Op::Erase(item) => FinalOp::Erase(get_key(sorted, item)),
            Op::Reinsert(item) => FinalOp::Reinsert(get_key(sorted, item)),
            Op::Search(item) => FinalOp::Search(get_key(sorted, item)),
            Op::LowerBound(item) => FinalOp::LowerBound(get_key(sorted, item)),
            Op::UpperBound(item) => FinalOp::UpperBound(get_key(sorted, item)),
            Op::Count(item) => FinalOp::Count(get_key(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
            Op::SideInsert(item) => FinalOp::SideInsert(get_key(sorted, item)),
            Op::MergeUnique => FinalOp::MergeUnique,
            Op::MergeEqual => FinalOp::MergeEqual,
            Op::Swap => FinalOp::Swap,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    InsertUnique(u32),
    InsertEqual(u32),
    Erase(u32),
    Reinsert(u32),
    Search(u32),
    LowerBound(u32),
    UpperBound(u32),
    Count(u32),
    First,
    PopFirst,
    Last,
    PopLast,
    SideInsert(u32),
    MergeUnique,
    MergeEqual,
    Swap,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::InsertUnique),
        value_strategy().prop_map(Op::InsertEqual),
        value_strategy().prop_map(Op::Erase),
        value_strategy().prop_map(Op::Reinsert),
        value_strategy().prop_map(Op::Search),
        value_strategy().prop_map(Op::LowerBound),
        value_strategy().prop_map(Op::UpperBound),
        value_strategy().prop_map(Op::Count),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
        value_strategy().prop_map(Op::SideInsert),
        Just(Op::MergeUnique),
        Just(Op::MergeEqual),
        Just(Op::Swap),
    ]
}

// Index of the first pair whose key is not less than `key`.
fn lower(v: &[(u32, u32)], key: u32) -> usize {
    v.partition_point(|&(k, _)| k < key)
}

// Index of the first pair whose key is greater than `key`.
fn upper(v: &[(u32, u32)], key: u32) -> usize {
    v.partition_point(|&(k, _)| k <= key)
}

pub fn run_model_equivalence(ops: Vec<Op>) {
    let mut sorted = Vec::with_capacity(ops.len());
    let mut tree = ModelTree::new();
    let mut side_sorted = Vec::new();
    let mut side = ModelTree::new();
    let mut next_stamp = 0;

    let mut final_ops = Vec::with_capacity(ops.len());
    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted);
        final_ops.push(final_op);

        match final_op {
            FinalOp::InsertUnique(key) => {
                let stamp = next_stamp;
                next_stamp += 1;

                let (lo, hi) = (lower(&sorted, key), upper(&sorted, key));
                let expected = if lo == hi {
                    sorted.insert(lo, (key, stamp));
                    ((key, stamp), true)
                } else {
                    // The last of the equivalent run is the one reported.
                    (sorted[hi - 1], false)
                };

                let (pos, inserted) = tree.insert_unique((key, stamp));
                let from_tree = (tree.get(pos).copied(), inserted);

                assert_eq!((Some(expected.0), expected.1), from_tree, "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::InsertEqual(key) => {
                let stamp = next_stamp;
                next_stamp += 1;

                sorted.insert(upper(&sorted, key), (key, stamp));

                let pos = tree.insert_equal((key, stamp));
                assert_eq!(tree.get(pos), Some(&(key, stamp)), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::Erase(key) => {
                let lo = lower(&sorted, key);
                let expected = (lo < upper(&sorted, key)).then(|| sorted.remove(lo));

                let pos = tree.lower_bound(&key);
                let from_tree = tree.get(pos).copied().filter(|&(k, _)| k == key);
                if from_tree.is_some() {
                    let next = tree.erase(pos);
                    assert_eq!(
                        tree.get(next),
                        sorted.get(lo),
                        "FinalOp #{op_id}: {op:?}"
                    );
                }

                assert_eq!(expected, from_tree, "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::Reinsert(key) => {
                // Detach the first element with `key` and relink it behind its equals.
                let lo = lower(&sorted, key);
                let expected = (lo < upper(&sorted, key)).then(|| {
                    let pair = sorted.remove(lo);
                    sorted.insert(upper(&sorted, key), pair);
                    pair
                });

                let pos = tree.lower_bound(&key);
                let from_tree = match tree.get(pos) {
                    Some(&(k, _)) if k == key => tree
                        .extract(pos)
                        .map(|node| tree.insert_node_equal(node))
                        .and_then(|pos| tree.get(pos).copied()),
                    _ => None,
                };

                assert_eq!(expected, from_tree, "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::Search(key) => {
                let expected = (lower(&sorted, key) < upper(&sorted, key)).then_some(key);
                let from_tree = tree.get(tree.search(&key)).map(|&(k, _)| k);

                assert_eq!(expected, from_tree, "FinalOp #{op_id}: {op:?}");
                assert_eq!(expected.is_some(), tree.contains(&key));
            }

            FinalOp::LowerBound(key) => {
                let expected = sorted.get(lower(&sorted, key));
                let from_tree = tree.get(tree.lower_bound(&key));

                assert_eq!(expected, from_tree, "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::UpperBound(key) => {
                let expected = sorted.get(upper(&sorted, key));
                let from_tree = tree.get(tree.upper_bound(&key));

                assert_eq!(expected, from_tree, "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::Count(key) => {
                let expected = upper(&sorted, key) - lower(&sorted, key);

                assert_eq!(expected, tree.count(&key), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::First => {
                assert_eq!(sorted.first(), tree.first(), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::PopFirst => {
                let expected = (!sorted.is_empty()).then(|| sorted.remove(0));

                assert_eq!(expected, tree.pop_first(), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::Last => {
                assert_eq!(sorted.last(), tree.last(), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::PopLast => {
                assert_eq!(sorted.pop(), tree.pop_last(), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::SideInsert(key) => {
                let stamp = next_stamp;
                next_stamp += 1;

                side_sorted.insert(upper(&side_sorted, key), (key, stamp));

                let pos = side.insert_equal((key, stamp));
                assert_eq!(side.get(pos), Some(&(key, stamp)), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::MergeUnique => {
                let total = sorted.len() + side_sorted.len();

                let mut left_behind = Vec::new();
                for pair in side_sorted.drain(..) {
                    let lo = lower(&sorted, pair.0);
                    if lo == upper(&sorted, pair.0) {
                        sorted.insert(lo, pair);
                    } else {
                        left_behind.push(pair);
                    }
                }
                side_sorted = left_behind;

                tree.merge_unique(&mut side);
                assert_eq!(total, tree.len() + side.len(), "FinalOp #{op_id}: {op:?}");
                assert!(
                    side.iter().all(|&(k, _)| tree.contains(&k)),
                    "FinalOp #{op_id}: {op:?}"
                );
            }

            FinalOp::MergeEqual => {
                for pair in side_sorted.drain(..) {
                    sorted.insert(upper(&sorted, pair.0), pair);
                }

                tree.merge_equal(&mut side);
                assert!(side.is_empty(), "FinalOp #{op_id}: {op:?}");
            }

            FinalOp::Swap => {
                mem::swap(&mut sorted, &mut side_sorted);
                tree.swap(&mut side);
            }
        }

        tree.assert_invariants();
        assert_eq!(sorted.len(), tree.len());
        assert!(sorted.iter().eq(tree.iter()));
        assert!(sorted.iter().rev().eq(tree.iter().rev()));

        side.assert_invariants();
        assert_eq!(side_sorted.len(), side.len());
        assert!(side_sorted.iter().eq(side.iter()));
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum CursorOp {
    // Get is not an operation as it's executed on every loop iteration to check equivalence.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    RemoveCurrent,
    RemoveCurrentMovePrev,
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
        Just(CursorOp::RemoveCurrent),
        Just(CursorOp::RemoveCurrentMovePrev),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub values: Vec<u32>,
    pub ops: Vec<CursorOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> u32 {
            u32::arbitrary(u).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> CursorOp {
            CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(CursorEquivalenceInput { values, ops })
    }
}

/// Drives an editing cursor over a multiset built from `values` and a `Vec` cursor over the same
/// sorted values in lockstep.
pub fn run_cursor_equivalence(mut values: Vec<u32>, ops: Vec<CursorOp>) {
    values.sort_unstable();

    // Ideally this would be a BTreeMap cursor or even a LinkedList cursor, but neither is stable :(
    let mut vec = Vec::new();
    let mut tree: RbTree<u32> = RbTree::new();

    for val in values {
        vec.push(val);
        tree.insert_equal(val);
    }

    fn vec_curs_prev(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    let mut vec_curs = vec_curs_next(&vec, None);
    let mut tree_curs = tree.cursor_first_mut();

    // Check that the initial states are equivalent.
    {
        let v = vec_curs.map(|i| &vec[i]);
        let t = tree_curs.get();

        assert_eq!(v, t);
    }

    for op in ops {
        match op {
            CursorOp::MoveNext => {
                vec_curs = vec_curs_next(&vec, vec_curs);
                tree_curs.move_next();
            }

            CursorOp::MovePrev => {
                vec_curs = vec_curs_prev(&vec, vec_curs);
                tree_curs.move_prev();
            }

            CursorOp::PeekNext => {
                let v = vec_curs_next(&vec, vec_curs).map(|i| &vec[i]);
                let t = tree_curs.peek_next();

                assert_eq!(v, t);
            }

            CursorOp::PeekPrev => {
                let v = vec_curs_prev(&vec, vec_curs).map(|i| &vec[i]);
                let t = tree_curs.peek_prev();

                assert_eq!(v, t);
            }

            CursorOp::RemoveCurrent => {
                let v = vec_curs.map(|i| vec.remove(i));

                if vec_curs == Some(vec.len()) {
                    vec_curs = None;
                }

                let t = tree_curs.remove_current();

                assert_eq!(v, t);
            }

            CursorOp::RemoveCurrentMovePrev => {
                let new_v_curs = vec_curs.is_some().then(|| vec_curs_prev(&vec, vec_curs));
                let v = vec_curs.map(|i| vec.remove(i));

                if let Some(vc) = new_v_curs {
                    vec_curs = vc;
                }

                let t = tree_curs.remove_current_and_move_prev();

                assert_eq!(v, t);
            }
        }

        let v = vec_curs.map(|i| &vec[i]);
        let t = tree_curs.get();

        assert_eq!(v, t);
    }

    drop(tree_curs);
    tree.assert_invariants();
    assert!(vec.iter().eq(tree.iter()));
}
