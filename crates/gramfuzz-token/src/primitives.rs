//! Leaf token kinds and the pointer primitive.

use indexmap::IndexSet;

use crate::arena::TokenId;
use crate::token::{ForwardToken, PointerToken, Removal, Token, TokenError};

/// A token holding a constant string.
#[derive(Debug, Clone)]
pub struct ConstantString {
    value: String,
}

impl ConstantString {
    pub(crate) fn new(value: String) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Token for ConstantString {
    fn permutations(&self) -> u32 {
        1
    }

    fn permutation(&mut self, i: u32) -> Result<(), TokenError> {
        if i < 1 || i > self.permutations() {
            return Err(TokenError::IndexOutOfBound);
        }
        Ok(())
    }
}

/// A token holding a set of characters described by a pattern.
///
/// Every character of the pattern is added to the set; `\d`, `\s` and `\w`
/// expand to the usual classes. Each permutation selects one character of
/// the set, in pattern order, as the current value.
#[derive(Debug, Clone)]
pub struct CharacterClass {
    chars: IndexSet<char>,
    pattern: String,
    value: char,
}

impl CharacterClass {
    pub(crate) fn new(pattern: &str) -> Self {
        assert!(!pattern.is_empty(), "character class pattern is empty");

        let mut chars = IndexSet::new();
        let mut runes = pattern.chars();
        while let Some(c) = runes.next() {
            if c == '\\' {
                let escape = runes
                    .next()
                    .unwrap_or_else(|| panic!("early end of pattern after escape in {pattern:?}"));
                match escape {
                    'd' => chars.extend('0'..='9'),
                    's' => chars.extend(['\t', '\n', '\u{c}', '\r']),
                    'w' => {
                        chars.extend('0'..='9');
                        chars.extend('A'..='Z');
                        chars.extend('a'..='z');
                        chars.insert('_');
                    }
                    _ => panic!("unknown escape character {escape:?} in {pattern:?}"),
                }
            } else if c.is_alphanumeric() || c.is_whitespace() {
                chars.insert(c);
            } else {
                panic!("unknown character {c:?} in {pattern:?}");
            }
        }

        let value = *chars.get_index(0).expect("character class has characters");
        Self {
            chars,
            pattern: pattern.to_owned(),
            value,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn value(&self) -> char {
        self.value
    }

    pub(crate) fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    pub(crate) fn set_value(&mut self, c: char) {
        self.value = c;
    }
}

impl Token for CharacterClass {
    fn permutations(&self) -> u32 {
        self.chars.len() as u32
    }

    fn permutation(&mut self, i: u32) -> Result<(), TokenError> {
        if i < 1 || i > self.permutations() {
            return Err(TokenError::IndexOutOfBound);
        }
        self.value = *self
            .chars
            .get_index(i as usize - 1)
            .expect("index checked against set size");
        Ok(())
    }
}

/// A token forwarding to another token of the arena.
///
/// The target may, transitively, forward back to the pointer; this is how
/// a grammar expresses recursion. Cloning a pointer keeps the target
/// reference, it does not copy the referenced subtree.
#[derive(Debug, Clone, Default)]
pub struct Pointer {
    token: Option<TokenId>,
}

impl Pointer {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Token for Pointer {
    fn permutations(&self) -> u32 {
        1
    }

    fn permutation(&mut self, i: u32) -> Result<(), TokenError> {
        if i < 1 || i > self.permutations() {
            return Err(TokenError::IndexOutOfBound);
        }
        Ok(())
    }
}

impl ForwardToken for Pointer {
    fn get(&self) -> Option<TokenId> {
        self.token
    }

    fn internal_get(&self) -> Option<TokenId> {
        self.token
    }

    fn internal_replace(&mut self, old: TokenId, new: TokenId) {
        if self.token == Some(old) {
            self.token = Some(new);
        }
    }

    fn internal_logical_remove(&mut self, child: TokenId) -> Removal {
        if self.token == Some(child) {
            self.token = None;
            return Removal::Erased;
        }
        Removal::Kept
    }
}

impl PointerToken for Pointer {
    fn set(&mut self, target: Option<TokenId>) {
        self.token = target;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case("01", &['0', '1'] ; "plain characters")]
    #[test_case("abca", &['a', 'b', 'c'] ; "duplicates collapse")]
    #[test_case("x\\d", &['x', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9'] ; "digit escape")]
    fn character_class_patterns(pattern: &str, expected: &[char]) {
        let class = CharacterClass::new(pattern);
        assert_eq!(class.permutations(), expected.len() as u32);
        for (i, &c) in expected.iter().enumerate() {
            let mut class = class.clone();
            class.permutation(i as u32 + 1).unwrap();
            assert_eq!(class.value(), c);
        }
    }

    #[test]
    #[should_panic(expected = "character class pattern is empty")]
    fn character_class_rejects_empty_pattern() {
        CharacterClass::new("");
    }

    #[test]
    #[should_panic(expected = "unknown escape character")]
    fn character_class_rejects_unknown_escape() {
        CharacterClass::new("\\q");
    }

    #[test]
    fn constant_permutation_bounds() {
        let mut constant = ConstantString::new("a".to_owned());
        assert_eq!(constant.permutation(1), Ok(()));
        assert_eq!(constant.permutation(2), Err(TokenError::IndexOutOfBound));
        assert_eq!(constant.permutation(0), Err(TokenError::IndexOutOfBound));
    }

    #[test]
    fn pointer_logical_remove_clears_target() {
        let mut arena = crate::TokenArena::new();
        let a = arena.constant("a");
        let b = arena.constant("b");
        let mut pointer = Pointer::new();
        pointer.set(Some(a));

        assert_eq!(pointer.internal_logical_remove(b), Removal::Kept);
        assert_eq!(pointer.internal_logical_remove(a), Removal::Erased);
        assert_eq!(pointer.internal_get(), None);
    }
}
