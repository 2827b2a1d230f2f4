//! Shared child-edge edits used by the rewriting passes.

use gramfuzz_token::{ForwardToken, ListToken, Removal, TokenArena, TokenId};

/// Swaps the `old` child of `parent` for `new`, whichever capability the
/// parent stores its children through.
pub(crate) fn replace_child(arena: &mut TokenArena, parent: TokenId, old: TokenId, new: TokenId) {
    let kind = arena.kind_mut(parent);
    if let Some(forward) = kind.as_forward_mut() {
        forward.internal_replace(old, new);
    } else if let Some(list) = kind.as_list_mut() {
        list.internal_replace(old, new);
    }
}

/// Logically removes `child` from `parent`.
pub(crate) fn logical_remove(arena: &mut TokenArena, parent: TokenId, child: TokenId) -> Removal {
    let kind = arena.kind_mut(parent);
    if let Some(forward) = kind.as_forward_mut() {
        forward.internal_logical_remove(child)
    } else if let Some(list) = kind.as_list_mut() {
        list.internal_logical_remove(child)
    } else {
        Removal::Kept
    }
}
