//! Indented debug dumps of a token graph.

use std::fmt::Write;

use gramfuzz_token::{TokenArena, TokenId};

/// One token per line, children indented below their parent, following the
/// rendered view.
pub fn tree_string(arena: &TokenArena, root: TokenId) -> String {
    let mut out = String::new();
    write_tree(arena, root, 0, false, &mut out);
    out
}

/// Like [`tree_string`], but following the structural view: absent
/// optionals and unselected alternation branches show their children too.
pub fn internal_tree_string(arena: &TokenArena, root: TokenId) -> String {
    let mut out = String::new();
    write_tree(arena, root, 0, true, &mut out);
    out
}

fn write_tree(arena: &TokenArena, id: TokenId, level: usize, internal: bool, out: &mut String) {
    for _ in 0..level {
        out.push_str("  ");
    }
    writeln!(out, "{id} {}", arena.kind(id).describe()).expect("writing to a string");

    let children = if internal {
        arena.internal_children(id)
    } else {
        arena.logical_children(id)
    };
    for child in children {
        write_tree(arena, child, level + 1, internal, out);
    }
}
