//! Traversal utilities over a token graph.
//!
//! Traversal does not know how children are stored per kind; it goes
//! through the arena's child accessors. All three walks assume a finite
//! graph — only the loop detector in `gramfuzz-transform` is expected to
//! look at a graph that may still contain cycles.

use std::collections::VecDeque;

use crate::arena::{TokenArena, TokenId};

/// Top-down walk of the rendered view. Children hidden by their parent
/// (an absent optional, an unselected alternation branch) are not
/// visited.
pub fn walk(arena: &TokenArena, root: TokenId, visit: &mut dyn FnMut(TokenId)) {
    let mut queue = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        visit(id);
        queue.extend(arena.logical_children(id));
    }
}

/// Top-down walk of the structural view.
pub fn walk_internal(arena: &TokenArena, root: TokenId, visit: &mut dyn FnMut(TokenId)) {
    let mut queue = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        visit(id);
        queue.extend(arena.internal_children(id));
    }
}

/// Post-order walk of the structural view; children are visited before
/// their parent. Used to force fix-ups after the graph has been rewritten.
pub fn walk_internal_tail(arena: &TokenArena, root: TokenId, visit: &mut dyn FnMut(TokenId)) {
    for child in arena.internal_children(root) {
        walk_internal_tail(arena, child, visit);
    }
    visit(root);
}
