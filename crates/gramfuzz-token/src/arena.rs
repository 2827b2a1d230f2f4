//! Arena-backed storage for the token graph.
//!
//! Tokens are identified by [`TokenId`]; identity is by id, so two clones
//! rendering the same string are still different tokens. Preparation
//! passes may orphan portions of the graph — orphaned nodes simply stay in
//! the arena until it is dropped.

use std::fmt;

use crate::constraints::Optional;
use crate::lists::{All, One, Repeat};
use crate::primitives::{CharacterClass, ConstantString, Pointer};
use crate::sequences::{Sequence, SequenceItem};
use crate::token::{
    ForwardToken, ListToken, MinimizeToken, OptionalToken, PointerToken, ResetToken, Token,
    TokenError,
};

/// Identity of a token inside a [`TokenArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// The concrete token kinds.
///
/// A kind may claim several capabilities; the `as_*` accessors expose them
/// without callers having to match on the variant.
#[derive(Debug, Clone)]
pub enum TokenKind {
    Constant(ConstantString),
    CharClass(CharacterClass),
    All(All),
    One(One),
    Repeat(Repeat),
    Optional(Optional),
    Pointer(Pointer),
    Sequence(Sequence),
    SequenceItem(SequenceItem),
}

impl TokenKind {
    pub fn token(&self) -> &dyn Token {
        match self {
            TokenKind::Constant(t) => t,
            TokenKind::CharClass(t) => t,
            TokenKind::All(t) => t,
            TokenKind::One(t) => t,
            TokenKind::Repeat(t) => t,
            TokenKind::Optional(t) => t,
            TokenKind::Pointer(t) => t,
            TokenKind::Sequence(t) => t,
            TokenKind::SequenceItem(t) => t,
        }
    }

    pub fn token_mut(&mut self) -> &mut dyn Token {
        match self {
            TokenKind::Constant(t) => t,
            TokenKind::CharClass(t) => t,
            TokenKind::All(t) => t,
            TokenKind::One(t) => t,
            TokenKind::Repeat(t) => t,
            TokenKind::Optional(t) => t,
            TokenKind::Pointer(t) => t,
            TokenKind::Sequence(t) => t,
            TokenKind::SequenceItem(t) => t,
        }
    }

    pub fn as_forward(&self) -> Option<&dyn ForwardToken> {
        match self {
            TokenKind::Optional(t) => Some(t),
            TokenKind::Pointer(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_forward_mut(&mut self) -> Option<&mut dyn ForwardToken> {
        match self {
            TokenKind::Optional(t) => Some(t),
            TokenKind::Pointer(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&dyn ListToken> {
        match self {
            TokenKind::All(t) => Some(t),
            TokenKind::One(t) => Some(t),
            TokenKind::Repeat(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut dyn ListToken> {
        match self {
            TokenKind::All(t) => Some(t),
            TokenKind::One(t) => Some(t),
            TokenKind::Repeat(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_optional(&self) -> Option<&dyn OptionalToken> {
        match self {
            TokenKind::Optional(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_optional_mut(&mut self) -> Option<&mut dyn OptionalToken> {
        match self {
            TokenKind::Optional(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_pointer_mut(&mut self) -> Option<&mut dyn PointerToken> {
        match self {
            TokenKind::Pointer(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_reset_mut(&mut self) -> Option<&mut dyn ResetToken> {
        match self {
            TokenKind::Sequence(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_minimize(&self) -> Option<&dyn MinimizeToken> {
        match self {
            TokenKind::All(t) => Some(t),
            TokenKind::One(t) => Some(t),
            TokenKind::Repeat(t) => Some(t),
            _ => None,
        }
    }

    /// A short human-readable description, used by the tree printers.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Constant(t) => format!("Constant({:?})", t.value()),
            TokenKind::CharClass(t) => {
                format!("CharClass({:?}, {:?})", t.pattern(), t.value())
            }
            TokenKind::All(t) => format!("All[{}]", t.internal_len()),
            TokenKind::One(t) => format!("One[{}]", t.internal_len()),
            TokenKind::Repeat(t) => {
                format!("Repeat({}..={}, {})", t.from(), t.internal_len(), t.count())
            }
            TokenKind::Optional(t) => {
                if t.is_active() {
                    "Optional(present)".to_owned()
                } else {
                    "Optional(absent)".to_owned()
                }
            }
            TokenKind::Pointer(t) => match t.internal_get() {
                Some(target) => format!("Pointer({target})"),
                None => "Pointer(empty)".to_owned(),
            },
            TokenKind::Sequence(_) => "Sequence".to_owned(),
            TokenKind::SequenceItem(t) => format!("SequenceItem({})", t.value()),
        }
    }
}

/// Owns every token of a grammar graph.
#[derive(Debug, Default)]
pub struct TokenArena {
    tokens: Vec<TokenKind>,
}

impl TokenArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn kind(&self, id: TokenId) -> &TokenKind {
        &self.tokens[id.0 as usize]
    }

    pub fn kind_mut(&mut self, id: TokenId) -> &mut TokenKind {
        &mut self.tokens[id.0 as usize]
    }

    fn alloc(&mut self, kind: TokenKind) -> TokenId {
        let id = TokenId(u32::try_from(self.tokens.len()).expect("arena overflow"));
        self.tokens.push(kind);
        id
    }

    pub fn constant(&mut self, value: impl Into<String>) -> TokenId {
        self.alloc(TokenKind::Constant(ConstantString::new(value.into())))
    }

    pub fn char_class(&mut self, pattern: &str) -> TokenId {
        self.alloc(TokenKind::CharClass(CharacterClass::new(pattern)))
    }

    pub fn all(&mut self, tokens: Vec<TokenId>) -> TokenId {
        self.alloc(TokenKind::All(All::new(tokens)))
    }

    pub fn one(&mut self, tokens: Vec<TokenId>) -> TokenId {
        self.alloc(TokenKind::One(One::new(tokens)))
    }

    /// Allocates a repetition of `from..=to` copies of `template`. All `to`
    /// instances exist structurally up front so that preparation passes
    /// reach every one of them; the permutation selects how many are part
    /// of the rendered output.
    pub fn repeat(&mut self, template: TokenId, from: u32, to: u32) -> TokenId {
        assert!(to >= 1 && from <= to, "invalid repeat range {from}..={to}");
        let mut slots = vec![template];
        for _ in 1..to {
            let slot = self.deep_clone(template);
            slots.push(slot);
        }
        self.alloc(TokenKind::Repeat(Repeat::new(slots, from)))
    }

    pub fn optional(&mut self, token: TokenId) -> TokenId {
        self.alloc(TokenKind::Optional(Optional::new(token)))
    }

    /// Allocates a pointer with no target; use
    /// [`TokenArena::set_pointer`] to install one, which is also how a
    /// grammar ties its recursion knots.
    pub fn pointer(&mut self) -> TokenId {
        self.alloc(TokenKind::Pointer(Pointer::new()))
    }

    pub fn set_pointer(&mut self, pointer: TokenId, target: Option<TokenId>) {
        self.kind_mut(pointer)
            .as_pointer_mut()
            .unwrap_or_else(|| panic!("{pointer} is not a pointer"))
            .set(target);
    }

    pub fn sequence(&mut self, start: i64, step: i64) -> TokenId {
        self.alloc(TokenKind::Sequence(Sequence::new(start, step)))
    }

    pub fn sequence_item(&mut self, sequence: TokenId) -> TokenId {
        let value = match self.kind(sequence) {
            TokenKind::Sequence(s) => s.peek(),
            _ => panic!("{sequence} is not a sequence"),
        };
        self.alloc(TokenKind::SequenceItem(SequenceItem::new(sequence, value)))
    }

    pub fn permutations(&self, id: TokenId) -> u32 {
        self.kind(id).token().permutations()
    }

    /// Selects permutation `i` for the token.
    ///
    /// Sequence items draw their value from the shared sequence counter
    /// when assigned, which is why assignment goes through the arena.
    pub fn set_permutation(&mut self, id: TokenId, i: u32) -> Result<(), TokenError> {
        self.kind_mut(id).token_mut().permutation(i)?;
        if let TokenKind::SequenceItem(item) = self.kind(id) {
            let sequence = item.sequence();
            let value = match self.kind_mut(sequence) {
                TokenKind::Sequence(s) => s.next(),
                _ => panic!("{id} references {sequence}, which is not a sequence"),
            };
            match self.kind_mut(id) {
                TokenKind::SequenceItem(item) => item.assign(value),
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    /// The structural children of a token, in order.
    pub fn internal_children(&self, id: TokenId) -> Vec<TokenId> {
        let kind = self.kind(id);
        if let Some(forward) = kind.as_forward() {
            forward.internal_get().into_iter().collect()
        } else if let Some(list) = kind.as_list() {
            (0..list.internal_len())
                .filter_map(|i| list.internal_get(i))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// The rendered-view children of a token, in order. An inactive
    /// optional or an unselected alternation branch does not appear here.
    pub fn logical_children(&self, id: TokenId) -> Vec<TokenId> {
        let kind = self.kind(id);
        if let Some(forward) = kind.as_forward() {
            forward.get().into_iter().collect()
        } else if let Some(list) = kind.as_list() {
            (0..list.len()).filter_map(|i| list.get(i)).collect()
        } else {
            Vec::new()
        }
    }

    /// Renders the string the token currently denotes.
    ///
    /// Only valid on a finite graph; render a raw grammar only after the
    /// preparation passes have run.
    pub fn render(&self, id: TokenId) -> String {
        match self.kind(id) {
            TokenKind::Constant(t) => t.value().to_owned(),
            TokenKind::CharClass(t) => t.value().to_string(),
            TokenKind::All(t) => t.tokens().iter().map(|&c| self.render(c)).collect(),
            TokenKind::One(t) => self.render(t.selected()),
            TokenKind::Repeat(t) => t.active().iter().map(|&c| self.render(c)).collect(),
            TokenKind::Optional(t) => match t.get() {
                Some(child) => self.render(child),
                None => String::new(),
            },
            TokenKind::Pointer(t) => match t.internal_get() {
                Some(target) => self.render(target),
                None => String::new(),
            },
            TokenKind::Sequence(_) => String::new(),
            TokenKind::SequenceItem(t) => t.value().to_string(),
        }
    }

    /// Copies the subtree rooted at `id` and returns the new root.
    ///
    /// The copy is fully independent: mutating it never alters the
    /// original. Two references are deliberately shared instead of copied:
    /// a pointer keeps its target (copying it would recurse through the
    /// very cycles pointers exist to express) and a sequence item keeps
    /// its sequence.
    pub fn deep_clone(&mut self, id: TokenId) -> TokenId {
        let mut kind = self.kind(id).clone();
        match &mut kind {
            TokenKind::Constant(_)
            | TokenKind::CharClass(_)
            | TokenKind::Sequence(_)
            | TokenKind::SequenceItem(_)
            | TokenKind::Pointer(_) => {}
            TokenKind::All(t) => {
                for child in t.tokens_mut() {
                    *child = self.deep_clone(*child);
                }
            }
            TokenKind::One(t) => {
                let selected = t.selected_index();
                for child in t.tokens_mut() {
                    *child = self.deep_clone(*child);
                }
                t.select_index(selected);
            }
            TokenKind::Repeat(t) => {
                for slot in t.slots_mut() {
                    *slot = self.deep_clone(*slot);
                }
            }
            TokenKind::Optional(t) => {
                let old = t.internal_get().expect("optional has a child");
                let new = self.deep_clone(old);
                t.internal_replace(old, new);
            }
        }
        self.alloc(kind)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn render_composites() {
        let mut arena = TokenArena::new();
        let a = arena.constant("a");
        let b = arena.constant("b");
        let seq = arena.all(vec![a, b]);
        let opt = arena.optional(seq);
        assert_eq!(arena.render(opt), "ab");

        arena.kind_mut(opt).as_optional_mut().unwrap().deactivate();
        assert_eq!(arena.render(opt), "");
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut arena = TokenArena::new();
        let digit = arena.char_class("01");
        let other = arena.char_class("01");
        let root = arena.all(vec![digit, other]);

        let copy = arena.deep_clone(root);
        assert_eq!(arena.render(copy), arena.render(root));

        // Mutating the copy must not leak into the original.
        let copied_digit = arena.internal_children(copy)[0];
        arena.set_permutation(copied_digit, 2).unwrap();
        assert_eq!(arena.render(copy), "10");
        assert_eq!(arena.render(root), "00");
    }

    #[test]
    fn deep_clone_shares_pointer_targets() {
        let mut arena = TokenArena::new();
        let a = arena.constant("a");
        let pointer = arena.pointer();
        arena.set_pointer(pointer, Some(a));

        let copy = arena.deep_clone(pointer);
        assert_eq!(arena.kind(copy).as_forward().unwrap().internal_get(), Some(a));
    }

    #[test]
    fn permutation_bounds() {
        let mut arena = TokenArena::new();
        let digit = arena.char_class("01");
        assert_eq!(arena.set_permutation(digit, 0), Err(TokenError::IndexOutOfBound));
        assert_eq!(arena.set_permutation(digit, 3), Err(TokenError::IndexOutOfBound));
        for i in 1..=arena.permutations(digit) {
            arena.set_permutation(digit, i).unwrap();
            // Selecting a permutation never changes the count.
            assert_eq!(arena.permutations(digit), 2);
        }
    }

    #[test]
    fn sequence_items_draw_from_their_sequence() {
        let mut arena = TokenArena::new();
        let seq = arena.sequence(1, 1);
        let first = arena.sequence_item(seq);
        let second = arena.sequence_item(seq);
        let root = arena.all(vec![seq, first, second]);

        arena.set_permutation(first, 1).unwrap();
        arena.set_permutation(second, 1).unwrap();
        assert_eq!(arena.render(root), "12");

        arena.kind_mut(seq).as_reset_mut().unwrap().reset();
        arena.set_permutation(first, 1).unwrap();
        arena.set_permutation(second, 1).unwrap();
        assert_eq!(arena.render(root), "12");
    }
}
