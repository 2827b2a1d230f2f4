//! Parsing pass: matching input data against a prepared token graph.
//!
//! Leaf tokens match themselves; composite tokens act as combinators and
//! propagate the errors of their children. A successful parse leaves every
//! visited token in the state the input dictated (selected alternation
//! branches, optional presence, repetition counts, character values), so
//! rendering the root afterwards reproduces the input.

use thiserror::Error;

use crate::arena::{TokenArena, TokenId, TokenKind};
use crate::token::{ForwardToken, ListToken};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected data at offset {offset}, expected {expected}")]
    UnexpectedData { offset: usize, expected: String },
    #[error("unexpected end of input at offset {offset}, expected {expected}")]
    UnexpectedEof { offset: usize, expected: String },
}

impl ParseError {
    fn offset(&self) -> usize {
        match self {
            ParseError::UnexpectedData { offset, .. } => *offset,
            ParseError::UnexpectedEof { offset, .. } => *offset,
        }
    }
}

impl TokenArena {
    /// Parses `data` against the graph rooted at `root`, requiring the
    /// whole input to be consumed.
    pub fn parse(&mut self, root: TokenId, data: &str) -> Result<(), ParseError> {
        let end = self.parse_at(root, data, 0)?;
        if end != data.len() {
            return Err(ParseError::UnexpectedData {
                offset: end,
                expected: "end of input".to_owned(),
            });
        }
        Ok(())
    }

    /// Parses the token at byte offset `cur` of `data`, returning the
    /// offset after the match.
    fn parse_at(&mut self, id: TokenId, data: &str, cur: usize) -> Result<usize, ParseError> {
        match self.kind(id) {
            TokenKind::Constant(t) => {
                let value = t.value().to_owned();
                let next = cur + value.len();
                if next > data.len() {
                    return Err(ParseError::UnexpectedEof {
                        offset: cur,
                        expected: format!("{value:?}"),
                    });
                }
                if &data[cur..next] != value {
                    return Err(ParseError::UnexpectedData {
                        offset: cur,
                        expected: format!("{value:?}"),
                    });
                }
                Ok(next)
            }
            TokenKind::CharClass(t) => {
                let pattern = t.pattern().to_owned();
                let Some(c) = data[cur..].chars().next() else {
                    return Err(ParseError::UnexpectedEof {
                        offset: cur,
                        expected: format!("one of {pattern:?}"),
                    });
                };
                if !t.contains(c) {
                    return Err(ParseError::UnexpectedData {
                        offset: cur,
                        expected: format!("one of {pattern:?}"),
                    });
                }
                match self.kind_mut(id) {
                    TokenKind::CharClass(t) => t.set_value(c),
                    _ => unreachable!(),
                }
                Ok(cur + c.len_utf8())
            }
            TokenKind::All(t) => {
                let children = t.tokens().to_vec();
                let mut pos = cur;
                for child in children {
                    pos = self.parse_at(child, data, pos)?;
                }
                Ok(pos)
            }
            TokenKind::One(t) => {
                // Try every alternative; on failure report the attempt
                // that got furthest.
                let alternatives: Vec<TokenId> =
                    (0..t.internal_len()).filter_map(|i| t.internal_get(i)).collect();
                let mut furthest: Option<ParseError> = None;
                for alternative in alternatives {
                    match self.parse_at(alternative, data, cur) {
                        Ok(next) => {
                            match self.kind_mut(id) {
                                TokenKind::One(t) => t.select(alternative),
                                _ => unreachable!(),
                            }
                            return Ok(next);
                        }
                        Err(e) => {
                            if furthest.as_ref().map_or(true, |f| e.offset() > f.offset()) {
                                furthest = Some(e);
                            }
                        }
                    }
                }
                Err(furthest.expect("alternation has at least one branch"))
            }
            TokenKind::Repeat(t) => {
                let from = t.from();
                let slots: Vec<TokenId> =
                    (0..t.internal_len()).filter_map(|i| t.internal_get(i)).collect();
                let mut pos = cur;
                let mut count = 0u32;
                let mut failure = None;
                for slot in slots {
                    match self.parse_at(slot, data, pos) {
                        Ok(next) => {
                            pos = next;
                            count += 1;
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                if count < from {
                    return Err(failure.expect("missing instances imply a failed parse"));
                }
                match self.kind_mut(id) {
                    TokenKind::Repeat(t) => t.set_count(count),
                    _ => unreachable!(),
                }
                Ok(pos)
            }
            TokenKind::Optional(t) => {
                let child = t.internal_get().expect("optional has a child");
                match self.parse_at(child, data, cur) {
                    Ok(next) => {
                        self.kind_mut(id).as_optional_mut().unwrap().activate();
                        Ok(next)
                    }
                    Err(_) => {
                        self.kind_mut(id).as_optional_mut().unwrap().deactivate();
                        Ok(cur)
                    }
                }
            }
            TokenKind::Pointer(t) => match t.internal_get() {
                Some(target) => self.parse_at(target, data, cur),
                None => Ok(cur),
            },
            TokenKind::Sequence(_) => Ok(cur),
            TokenKind::SequenceItem(t) => {
                let value = t.value().to_string();
                let next = cur + value.len();
                if next > data.len() {
                    return Err(ParseError::UnexpectedEof {
                        offset: cur,
                        expected: format!("{value:?}"),
                    });
                }
                if &data[cur..next] != value {
                    return Err(ParseError::UnexpectedData {
                        offset: cur,
                        expected: format!("{value:?}"),
                    });
                }
                Ok(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_sets_token_state() {
        let mut arena = TokenArena::new();
        let a = arena.constant("a");
        let b = arena.constant("b");
        let choice = arena.one(vec![a, b]);
        let digit = arena.char_class("01");
        let optional = arena.optional(digit);
        let root = arena.all(vec![choice, optional]);

        arena.parse(root, "b1").unwrap();
        assert_eq!(arena.render(root), "b1");

        arena.parse(root, "a").unwrap();
        assert_eq!(arena.render(root), "a");
    }

    #[test]
    fn parse_repeat_greedily() {
        let mut arena = TokenArena::new();
        let a = arena.constant("a");
        let repeat = arena.repeat(a, 1, 3);

        arena.parse(repeat, "aa").unwrap();
        assert_eq!(arena.render(repeat), "aa");

        let err = arena.parse(repeat, "").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn parse_rejects_wrong_and_trailing_data() {
        let mut arena = TokenArena::new();
        let root = arena.constant("ab");

        assert_eq!(
            arena.parse(root, "ax"),
            Err(ParseError::UnexpectedData {
                offset: 0,
                expected: "\"ab\"".to_owned(),
            })
        );
        assert_eq!(
            arena.parse(root, "a"),
            Err(ParseError::UnexpectedEof {
                offset: 0,
                expected: "\"ab\"".to_owned(),
            })
        );
        assert_eq!(
            arena.parse(root, "abc"),
            Err(ParseError::UnexpectedData {
                offset: 2,
                expected: "end of input".to_owned(),
            })
        );
    }
}
