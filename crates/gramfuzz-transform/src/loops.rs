use std::collections::{HashSet, VecDeque};

use gramfuzz_token::{TokenArena, TokenId, TokenKind};
use tracing::debug;

/// Decides whether the graph reachable from `root` still contains a cycle
/// through a pointer token.
///
/// The walk keeps a set of already-seen tokens and reports a loop when a
/// pointer's target is already in the set. Identity equality is what makes
/// this correct: a depth-bounded walk would misjudge diamond-shaped but
/// acyclic graphs.
pub fn loop_exists(arena: &TokenArena, root: TokenId) -> bool {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([root]);

    while let Some(id) = queue.pop_front() {
        seen.insert(id);

        if matches!(arena.kind(id), TokenKind::Pointer(_)) {
            if let Some(target) = arena.internal_children(id).first().copied() {
                if seen.contains(&target) {
                    debug!("found a loop through {id}");
                    return true;
                }
                queue.push_back(target);
            }
        } else {
            queue.extend(arena.internal_children(id));
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_pointer_cycles() {
        let mut arena = TokenArena::new();
        let a = arena.constant("a");
        let pointer = arena.pointer();
        let optional = arena.optional(pointer);
        let root = arena.all(vec![a, optional]);
        arena.set_pointer(pointer, Some(root));

        assert!(loop_exists(&arena, root));
    }

    #[test]
    fn acyclic_graphs_pass() {
        let mut arena = TokenArena::new();
        let a = arena.constant("a");
        let pointer = arena.pointer();
        arena.set_pointer(pointer, Some(a));
        let root = arena.all(vec![pointer]);

        assert!(!loop_exists(&arena, root));
    }

    #[test]
    fn diamonds_are_not_cycles() {
        let mut arena = TokenArena::new();
        let shared = arena.constant("s");
        let left = arena.all(vec![shared]);
        let right = arena.all(vec![shared]);
        let root = arena.all(vec![left, right]);

        assert!(!loop_exists(&arena, root));
    }
}
