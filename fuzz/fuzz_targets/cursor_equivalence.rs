#![no_main]

use arena_rbtree::model::CursorEquivalenceInput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: CursorEquivalenceInput| {
    arena_rbtree::model::run_cursor_equivalence(input.values, input.ops);
});
