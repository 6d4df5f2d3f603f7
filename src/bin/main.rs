use arena_rbtree::{PairKey, RbTree};

fn main() {
    let mut tree: RbTree<u32> = RbTree::new();

    for key in [2, 0, 3, 4, 5, 1, 6] {
        tree.insert_unique(key);
        tree.assert_invariants();
        println!("{:?}", tree.iter().collect::<Vec<_>>());
    }

    let zero = tree.pop_first().unwrap();
    assert_eq!(zero, 0);
    tree.assert_invariants();

    let mut out = String::new();
    tree.dotgraph("demo", &mut out).unwrap();
    println!("{out}");

    let mut multi: RbTree<(u32, &str), PairKey> = RbTree::new();
    for pair in [(5, "a"), (3, "b"), (5, "c"), (3, "d")] {
        multi.insert_equal(pair);
        multi.assert_invariants();
    }
    println!("{multi:?}, {} with key 5", multi.count(&5));

    drop(tree);
}
