//! Token model for the gramfuzz engine.
//!
//! A grammar is held as a graph of tokens inside a [`TokenArena`]. Every
//! token exposes a finite number of local permutations and a rendered
//! string form; behavioral capabilities (forward, list, optional, pointer,
//! reset, minimize) are expressed as traits with `as_*` accessors on
//! [`TokenKind`] rather than an inheritance hierarchy.
//!
//! Recursion in a grammar is represented by pointer tokens whose target is
//! another token in the arena, so the raw graph may contain cycles. The
//! preparation passes in `gramfuzz-transform` rewrite such a graph into a
//! finite tree before any behavioral pass runs.

mod arena;
mod constraints;
mod lists;
mod parse;
mod primitives;
mod sequences;
mod token;
mod walk;

pub use arena::{TokenArena, TokenId, TokenKind};
pub use constraints::Optional;
pub use lists::{All, One, Repeat};
pub use parse::ParseError;
pub use primitives::{CharacterClass, ConstantString, Pointer};
pub use sequences::{Sequence, SequenceItem};
pub use token::{
    ForwardToken, ListToken, MinimizeToken, OptionalToken, PointerToken, ReduceToken, Removal,
    ResetToken, Token, TokenError,
};
pub use walk::{walk, walk_internal, walk_internal_tail};
