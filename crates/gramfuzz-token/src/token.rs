//! Capability traits implemented by the concrete token kinds.

use thiserror::Error;

use crate::arena::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// A permutation or reduction index outside of `1..=N` was requested.
    #[error("permutation index out of bounds")]
    IndexOutOfBound,
}

/// Outcome of [`ForwardToken::internal_logical_remove`] /
/// [`ListToken::internal_logical_remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The token is logically gone after the removal; pruning continues
    /// with the token's own parent.
    Erased,
    /// The token still exists (possibly restructured); pruning stops here.
    Kept,
}

/// The core contract every token kind satisfies.
///
/// Permutation indices are 1-based: `permutation(i)` selects shape `i` for
/// `1 <= i <= permutations()` and fails with
/// [`TokenError::IndexOutOfBound`] otherwise. Selecting a permutation
/// never changes the permutation count.
pub trait Token {
    fn permutations(&self) -> u32;
    fn permutation(&mut self, i: u32) -> Result<(), TokenError>;
}

/// A token wrapping exactly one logical child.
///
/// `get` is the rendered view (an inactive optional shows no child);
/// `internal_get` is the structural view used by traversals and graph
/// rewriting, which always shows the child.
pub trait ForwardToken: Token {
    fn get(&self) -> Option<TokenId>;
    fn internal_get(&self) -> Option<TokenId>;
    fn internal_replace(&mut self, old: TokenId, new: TokenId);
    fn internal_logical_remove(&mut self, child: TokenId) -> Removal;
}

/// A token holding a sequence of children.
///
/// As with forward tokens, `len`/`get` are the rendered view and
/// `internal_len`/`internal_get` the structural one; an alternation shows
/// only its selected branch logically but every branch structurally.
pub trait ListToken: Token {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> Option<TokenId>;
    fn internal_len(&self) -> usize;
    fn internal_get(&self, i: usize) -> Option<TokenId>;
    fn internal_replace(&mut self, old: TokenId, new: TokenId);
    fn internal_logical_remove(&mut self, child: TokenId) -> Removal;
}

/// A forward token whose child may be absent from the rendered output.
pub trait OptionalToken: ForwardToken {
    /// True when the child is part of the rendered output.
    fn is_active(&self) -> bool;
    fn activate(&mut self);
    fn deactivate(&mut self);
}

/// A forward token referencing another token in the arena, potentially an
/// ancestor. The target may be cleared while pruning.
pub trait PointerToken: ForwardToken {
    fn set(&mut self, target: Option<TokenId>);
}

/// A token carrying state outside its permutation dimensions, returned to
/// a well-defined baseline between enumeration steps.
pub trait ResetToken {
    fn reset(&mut self);
}

/// A token that can decide to replace itself with a simpler form.
pub trait MinimizeToken {
    /// Returns the replacement token, or `None` when the token is already
    /// minimal.
    fn minimize(&self) -> Option<TokenId>;
}

/// A token participating in delta-debugging style reduction.
pub trait ReduceToken {
    /// The number of reductions currently available; zero when the token
    /// cannot be reduced in its present state.
    fn reduces(&self) -> u32;
    fn reduce(&mut self, i: u32) -> Result<(), TokenError>;
}
