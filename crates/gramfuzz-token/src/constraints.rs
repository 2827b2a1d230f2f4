//! Constraint token kinds.

use crate::arena::TokenId;
use crate::token::{ForwardToken, OptionalToken, ReduceToken, Removal, Token, TokenError};

/// A forward token whose child may be left out of the rendered output.
///
/// Permutation 1 means the child is present, permutation 2 means it is
/// absent. The logical view hides the child when absent; the structural
/// view always exposes it so preparation passes can still rewrite it.
#[derive(Debug, Clone)]
pub struct Optional {
    token: TokenId,
    active: bool,

    reducing: bool,
    reducing_original_active: bool,
}

impl Optional {
    pub(crate) fn new(token: TokenId) -> Self {
        Self {
            token,
            active: true,
            reducing: false,
            reducing_original_active: false,
        }
    }

    /// The child state the token had when reduction began.
    pub fn reduction_baseline(&self) -> Option<bool> {
        self.reducing.then_some(self.reducing_original_active)
    }
}

impl Token for Optional {
    fn permutations(&self) -> u32 {
        2
    }

    fn permutation(&mut self, i: u32) -> Result<(), TokenError> {
        if i < 1 || i > self.permutations() {
            return Err(TokenError::IndexOutOfBound);
        }
        self.active = i == 1;
        Ok(())
    }
}

impl ForwardToken for Optional {
    fn get(&self) -> Option<TokenId> {
        self.active.then_some(self.token)
    }

    fn internal_get(&self) -> Option<TokenId> {
        Some(self.token)
    }

    fn internal_replace(&mut self, old: TokenId, new: TokenId) {
        if self.token == old {
            self.token = new;
        }
    }

    fn internal_logical_remove(&mut self, child: TokenId) -> Removal {
        if self.token == child {
            return Removal::Erased;
        }
        Removal::Kept
    }
}

impl OptionalToken for Optional {
    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

impl ReduceToken for Optional {
    fn reduces(&self) -> u32 {
        if self.reducing || self.active {
            2
        } else {
            0
        }
    }

    fn reduce(&mut self, i: u32) -> Result<(), TokenError> {
        let reduces = self.reduces();
        if reduces == 0 || i < 1 || i > reduces {
            return Err(TokenError::IndexOutOfBound);
        }
        if !self.reducing {
            self.reducing = true;
            self.reducing_original_active = self.active;
        }
        self.active = i == 1;
        Ok(())
    }
}
