//! Pointer unrolling: rewriting a cyclic pointer graph into a bounded,
//! acyclic clone tree.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use gramfuzz_token::{walk_internal_tail, PointerToken, Removal, TokenArena, TokenId, TokenKind};
use tracing::{debug, trace};

use crate::edit::{logical_remove, replace_child};
use crate::MAX_REPEAT;

/// Unrolls pointer tokens by cloning the graphs they reference, with
/// [`MAX_REPEAT`] as the per-path bound. Returns the new root, or `None`
/// when pruning consumed the entire graph.
pub fn unroll_pointers(arena: &mut TokenArena, root: TokenId) -> Option<TokenId> {
    unroll_pointers_with_limit(arena, root, MAX_REPEAT)
}

/// [`unroll_pointers`] with an explicit per-path bound.
pub fn unroll_pointers_with_limit(
    arena: &mut TokenArena,
    root: TokenId,
    limit: u32,
) -> Option<TokenId> {
    debug!("start unrolling pointers by cloning them");

    let root = Unroller {
        arena,
        limit,
        originals: HashMap::new(),
        original_clones: HashMap::new(),
        queue: VecDeque::new(),
        root,
        root_alive: true,
    }
    .run()?;

    // Force regeneration: tokens that materialize state from their child
    // set re-read it now that clones have been spliced in.
    let mut order = Vec::new();
    walk_internal_tail(arena, root, &mut |id| order.push(id));
    for id in order {
        for child in arena.internal_children(id) {
            replace_child(arena, id, child, child);
        }
    }

    debug!("finished unrolling");
    Some(root)
}

/// A worklist entry carrying per-path state: the token to visit, the entry
/// of its structural parent, and how often the current path has traversed
/// each original token. Counts are copy-on-write — siblings share the map,
/// a pointer expansion forks it.
struct UnrollItem {
    token: TokenId,
    parent: Option<Rc<UnrollItem>>,
    counts: Rc<HashMap<TokenId, u32>>,
}

struct Unroller<'a> {
    arena: &'a mut TokenArena,
    limit: u32,
    // The first encounter of a token pins it as its own original and takes
    // a pristine clone of it, before later expansions parameterize the
    // tree it hangs in. Every clone made afterwards maps back to the
    // original so nested re-encounters count against the same cycle.
    originals: HashMap<TokenId, TokenId>,
    original_clones: HashMap<TokenId, TokenId>,
    queue: VecDeque<Rc<UnrollItem>>,
    root: TokenId,
    root_alive: bool,
}

impl Unroller<'_> {
    fn run(mut self) -> Option<TokenId> {
        self.queue.push_front(Rc::new(UnrollItem {
            token: self.root,
            parent: None,
            counts: Rc::new(HashMap::new()),
        }));

        while let Some(item) = self.queue.pop_front() {
            if matches!(self.arena.kind(item.token), TokenKind::Pointer(_)) {
                self.visit_pointer(&item);
            } else {
                let children = self.arena.internal_children(item.token);
                for child in children.into_iter().rev() {
                    self.queue.push_front(Rc::new(UnrollItem {
                        token: child,
                        parent: Some(item.clone()),
                        counts: item.counts.clone(),
                    }));
                }
            }
        }

        if !self.root_alive {
            debug!("finished unrolling, graph is empty");
            return None;
        }
        Some(self.root)
    }

    fn visit_pointer(&mut self, item: &Rc<UnrollItem>) {
        let pointer = item.token;

        // Follow pointer-to-pointer indirections; a chain that revisits
        // one of its own pointers can never be unrolled finitely.
        let Some(child) = self.resolve_target(pointer) else {
            self.cut(item, pointer);
            return;
        };

        let original = match self.originals.get(&child) {
            Some(&original) => {
                trace!("found original {original} for target {child}");
                original
            }
            None => {
                trace!("no original for target {child}, must be new");
                self.originals.insert(child, child);
                let pristine = self.arena.deep_clone(child);
                self.original_clones.insert(child, pristine);
                child
            }
        };

        let counted = item.counts.get(&original).copied().unwrap_or(0);
        if counted >= self.limit {
            debug!(
                "reached repeat limit {} for {pointer} with target {child}",
                self.limit
            );
            self.cut(item, pointer);
            return;
        }

        let pristine = self.original_clones[&original];
        let clone = self.arena.deep_clone(pristine);
        trace!("expand {pointer} with clone {clone} of {original}");

        let mut counts = (*item.counts).clone();
        counts.insert(original, counted + 1);
        self.originals.insert(clone, original);

        self.arena
            .kind_mut(pointer)
            .as_pointer_mut()
            .expect("pointer kind")
            .set(Some(clone));
        match &item.parent {
            Some(parent) => replace_child(self.arena, parent.token, pointer, clone),
            None => self.root = clone,
        }

        self.queue.push_front(Rc::new(UnrollItem {
            token: clone,
            parent: item.parent.clone(),
            counts: Rc::new(counts),
        }));
    }

    /// The first non-pointer token on the indirection chain starting at
    /// the pointer's target, or `None` for an endless pointer loop.
    fn resolve_target(&self, pointer: TokenId) -> Option<TokenId> {
        let mut child = self.pointer_target(pointer);
        if !matches!(self.arena.kind(child), TokenKind::Pointer(_)) {
            return Some(child);
        }

        let mut checked = HashSet::from([child]);
        loop {
            trace!("target {child} is itself a pointer, following");
            let next = self.pointer_target(child);
            if !matches!(self.arena.kind(next), TokenKind::Pointer(_)) {
                return Some(next);
            }
            if !checked.insert(next) {
                debug!("endless pointer loop through {next}");
                return None;
            }
            child = next;
        }
    }

    /// Clears the pointer and removes the now dangling tokens upward until
    /// an ancestor survives the removal.
    fn cut(&mut self, item: &Rc<UnrollItem>, pointer: TokenId) {
        self.arena
            .kind_mut(pointer)
            .as_pointer_mut()
            .expect("pointer kind")
            .set(None);

        let mut removed = pointer;
        let mut cursor = item.parent.clone();
        loop {
            let Some(ancestor) = cursor else {
                debug!("pruned the graph up to the root");
                self.root_alive = false;
                return;
            };
            trace!("remove {removed} from {}", ancestor.token);
            match logical_remove(self.arena, ancestor.token, removed) {
                Removal::Kept => return,
                Removal::Erased => {
                    removed = ancestor.token;
                    cursor = ancestor.parent.clone();
                }
            }
        }
    }

    fn pointer_target(&self, pointer: TokenId) -> TokenId {
        self.arena
            .internal_children(pointer)
            .first()
            .copied()
            .unwrap_or_else(|| panic!("target of {pointer} is empty"))
    }
}

#[cfg(test)]
mod tests {
    use gramfuzz_token::{walk_internal, OptionalToken};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::loop_exists;

    /// `X = "a" X?` — the pointer closes a cycle through the optional.
    fn self_recursive(arena: &mut TokenArena) -> TokenId {
        let a = arena.constant("a");
        let pointer = arena.pointer();
        let optional = arena.optional(pointer);
        let root = arena.all(vec![a, optional]);
        arena.set_pointer(pointer, Some(root));
        root
    }

    #[test]
    fn unrolls_self_recursion_to_the_limit() {
        let mut arena = TokenArena::new();
        let root = self_recursive(&mut arena);
        assert!(loop_exists(&arena, root));

        let root = unroll_pointers(&mut arena, root).expect("graph survives");
        assert!(!loop_exists(&arena, root));

        // With every optional active the tree carries the maximum number
        // of inlined repetitions.
        let mut optionals = Vec::new();
        walk_internal(&arena, root, &mut |id| {
            if arena.kind(id).as_optional().is_some() {
                optionals.push(id);
            }
        });
        assert_eq!(optionals.len(), 2);
        for optional in optionals {
            arena.kind_mut(optional).as_optional_mut().unwrap().activate();
        }
        assert_eq!(arena.render(root), "aaa");
    }

    #[test]
    fn respects_an_explicit_limit() {
        let mut arena = TokenArena::new();
        let root = self_recursive(&mut arena);

        let root = unroll_pointers_with_limit(&mut arena, root, 4).expect("graph survives");
        assert!(!loop_exists(&arena, root));

        let mut optionals = 0;
        walk_internal(&arena, root, &mut |id| {
            if arena.kind(id).as_optional().is_some() {
                optionals += 1;
            }
        });
        assert_eq!(optionals, 4);
    }

    #[test]
    fn shared_targets_unroll_independently() {
        // Two pointers at the same target must end up with two
        // independent subtrees.
        let mut arena = TokenArena::new();
        let digit = arena.char_class("01");
        let left = arena.pointer();
        let right = arena.pointer();
        arena.set_pointer(left, Some(digit));
        arena.set_pointer(right, Some(digit));
        let root = arena.all(vec![left, right]);

        let root = unroll_pointers(&mut arena, root).expect("graph survives");
        assert_eq!(arena.render(root), "00");

        let children = arena.internal_children(root);
        assert_eq!(children.len(), 2);
        assert_ne!(children[0], children[1]);

        arena.set_permutation(children[0], 2).unwrap();
        assert_eq!(arena.render(root), "10");
    }

    #[test]
    fn endless_pointer_chains_are_pruned() {
        let mut arena = TokenArena::new();
        let first = arena.pointer();
        let second = arena.pointer();
        arena.set_pointer(first, Some(second));
        arena.set_pointer(second, Some(first));
        let a = arena.constant("a");
        let optional = arena.optional(first);
        let root = arena.all(vec![a, optional]);

        let root = unroll_pointers(&mut arena, root).expect("graph survives");
        assert_eq!(arena.render(root), "a");
        assert!(!loop_exists(&arena, root));
    }

    #[test]
    fn pruning_can_consume_the_whole_graph() {
        let mut arena = TokenArena::new();
        let first = arena.pointer();
        let second = arena.pointer();
        arena.set_pointer(first, Some(second));
        arena.set_pointer(second, Some(first));
        let root = arena.all(vec![first]);

        assert_eq!(unroll_pointers(&mut arena, root), None);
    }

    #[test]
    #[should_panic(expected = "is empty")]
    fn empty_pointer_targets_are_structural_bugs() {
        let mut arena = TokenArena::new();
        let pointer = arena.pointer();
        let root = arena.all(vec![pointer]);
        unroll_pointers(&mut arena, root);
    }
}
