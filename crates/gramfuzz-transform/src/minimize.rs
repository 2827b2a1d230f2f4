//! Structural minimization: collapsing degenerate constructs.

use std::collections::{HashMap, VecDeque};

use gramfuzz_token::{MinimizeToken, TokenArena, TokenId};
use tracing::{debug, trace};

use crate::edit::replace_child;

/// Replaces unnecessarily complicated constructs with their simpler form,
/// e.g. a sequence holding a single token becomes that token.
///
/// Whether a token with one child is collapsible is the token's own call —
/// the check and the replacement come from its minimize capability. Each
/// successful replacement strictly decreases the node count, which is what
/// bounds the pass; a replacement is re-examined in place since it may be
/// minimizable itself. Returns the (possibly new) root.
pub fn minimize_tokens(arena: &mut TokenArena, root: TokenId) -> TokenId {
    debug!("start minimizing");

    let mut root = root;
    let mut parents: HashMap<TokenId, Option<TokenId>> = HashMap::new();
    let mut queue = VecDeque::from([root]);
    parents.insert(root, None);

    while let Some(id) = queue.pop_front() {
        let replacement = arena.kind(id).as_minimize().and_then(|m| m.minimize());
        if let Some(replacement) = replacement {
            let parent = parents[&id];
            trace!("minimize {id} to {replacement}");
            match parent {
                Some(parent) => replace_child(arena, parent, id, replacement),
                None => root = replacement,
            }
            // Do not descend into the replaced token; examine the
            // replacement in its place instead.
            queue.push_front(replacement);
            parents.insert(replacement, parent);
            continue;
        }

        let children = arena.internal_children(id);
        for child in children.into_iter().rev() {
            queue.push_front(child);
            parents.insert(child, Some(id));
        }
    }

    debug!("finished minimizing");
    root
}
