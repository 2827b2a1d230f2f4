//! The systematic enumerator: every combination of local permutations of
//! every token in the graph, exactly once.

use std::collections::{HashMap, VecDeque};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use gramfuzz_token::{OptionalToken, ResetToken, TokenId};
use rand::RngCore;
use tracing::trace;

use crate::{FuzzHandle, SharedArena, Strategy};

/// Enumerates every permutation combination of the graph as a lazy,
/// resumable sequence of realized states.
///
/// Enumeration is a recursive descent over logical levels. A level is the
/// list of sibling tokens at one depth, stepped like an odometer whose
/// leftmost digit advances fastest; before a digit advances, the child
/// level below it is enumerated to exhaustion. Children of an absent
/// optional are not part of the rendered graph and are skipped, which is
/// why the number of realized states can be smaller than the naive product
/// over all nodes.
pub struct AllPermutations {
    arena: SharedArena,
    root: TokenId,
}

impl AllPermutations {
    pub fn new(arena: SharedArena, root: TokenId) -> Self {
        Self { arena, root }
    }
}

impl Strategy for AllPermutations {
    fn fuzz(&self, _rng: Box<dyn RngCore + Send>) -> FuzzHandle {
        let (step_tx, step_rx) = bounded(0);
        let (resume_tx, resume_rx) = bounded(0);

        let mut enumerator = Enumerator {
            arena: self.arena.clone(),
            root: self.root,
            assigned: HashMap::new(),
            steps: step_tx,
            resume: resume_rx,
        };
        let producer = thread::Builder::new()
            .name("all-permutations".to_owned())
            .spawn(move || enumerator.run())
            .expect("spawning the enumerator thread");

        FuzzHandle {
            arena: self.arena.clone(),
            root: self.root,
            steps: Some(step_rx),
            resume: Some(resume_tx),
            producer: Some(producer),
        }
    }
}

/// One odometer digit: a token, its pending permutation and its bound.
struct LevelEntry {
    token: TokenId,
    permutation: u32,
    max: u32,
}

struct Enumerator {
    arena: SharedArena,
    root: TokenId,
    /// Last permutation assigned per token within the current step.
    /// Re-assigning the same value is a no-op; in an unrolled graph this
    /// keeps shared state like sequence counters from being drawn twice.
    assigned: HashMap<TokenId, u32>,
    steps: Sender<()>,
    resume: Receiver<()>,
}

impl Enumerator {
    fn run(&mut self) {
        trace!("start all permutations enumeration");

        let mut level = self.level_of(self.root, false);
        if !level.is_empty() && !self.enumerate(&mut level) {
            return;
        }

        // The state left behind when the root level exhausts is the final
        // combination; hand it out and wait for the shutdown handshake.
        self.reset_reset_tokens();
        trace!("enumeration exhausted, final step");
        if self.steps.send(()).is_err() {
            return;
        }
        let _ = self.resume.recv();
        trace!("close the fuzzing channel");
    }

    /// Enumerates one level to exhaustion. Returns `false` when the caller
    /// hung up; the recursion unwinds without touching further state.
    fn enumerate(&mut self, level: &mut [LevelEntry]) -> bool {
        trace!("enumerate level of {} tokens", level.len());

        'step: loop {
            let mut i = 0;
            while i < level.len() {
                if level[i].permutation > level[i].max {
                    // Digit i overflowed: advance its neighbor, rebuild
                    // everything at and below i, and restart the pass.
                    if i + 1 < level.len() {
                        level[i + 1].permutation += 1;
                        self.set_token_permutation(level[i + 1].token, level[i + 1].permutation);
                        self.level_of(level[i + 1].token, true);
                    }
                    for k in 0..=i {
                        level[k].permutation = 1;
                        self.set_token_permutation(level[k].token, 1);
                        self.level_of(level[k].token, true);
                    }
                    continue 'step;
                }

                self.set_token_permutation(level[i].token, level[i].permutation);

                if self.enumerates_children(level[i].token) {
                    let mut children = self.level_of(level[i].token, true);
                    if !children.is_empty() && !self.enumerate(&mut children) {
                        return false;
                    }
                }

                if i == 0 {
                    level[i].permutation += 1;
                }
                i += 1;
            }

            if level[0].permutation > level[0].max
                && !level[1..].iter().any(|e| e.permutation < e.max)
            {
                trace!("done enumerating this level");
                break;
            }

            self.reset_reset_tokens();
            if !self.yield_step() {
                return false;
            }
        }

        true
    }

    /// Builds the level for `root` itself, or for its logical children,
    /// setting every member to permutation 1.
    fn level_of(&mut self, root: TokenId, from_children: bool) -> Vec<LevelEntry> {
        let tokens = if from_children {
            self.arena.lock().logical_children(root)
        } else {
            vec![root]
        };

        let mut level = Vec::with_capacity(tokens.len());
        for token in tokens {
            self.set_token_permutation(token, 1);
            let max = self.arena.lock().permutations(token);
            level.push(LevelEntry {
                token,
                permutation: 1,
                max,
            });
        }
        level
    }

    fn set_token_permutation(&mut self, token: TokenId, permutation: u32) {
        if self.assigned.get(&token) == Some(&permutation) {
            // Already assigned within this step.
            return;
        }
        // Out-of-range assignments occur while the odometer cascades; the
        // overflow handling brings the digit back into range before the
        // next state is realized.
        let _ = self.arena.lock().set_permutation(token, permutation);
        self.assigned.insert(token, permutation);
    }

    /// Children of an absent optional are not part of the rendered graph;
    /// their permutations are irrelevant for this configuration.
    fn enumerates_children(&self, token: TokenId) -> bool {
        let arena = self.arena.lock();
        match arena.kind(token).as_optional() {
            Some(optional) => optional.is_active(),
            None => true,
        }
    }

    /// Returns every reset-capable token of the rendered graph to its
    /// baseline. Walks the logical view, so inactive optionals keep their
    /// subtrees out of it.
    fn reset_reset_tokens(&self) {
        let mut arena = self.arena.lock();
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            if let Some(reset) = arena.kind_mut(id).as_reset_mut() {
                trace!("reset {id}");
                reset.reset();
            }
            queue.extend(arena.logical_children(id));
        }
    }

    /// Hands the realized state to the caller and suspends until the
    /// caller signals continuation. Returns `false` when the caller hung
    /// up instead.
    fn yield_step(&mut self) -> bool {
        trace!("done with fuzzing step");
        if self.steps.send(()).is_err() {
            return false;
        }
        if self.resume.recv().is_err() {
            trace!("fuzzing channel closed from the outside");
            return false;
        }
        self.assigned.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use gramfuzz_token::TokenArena;
    use gramfuzz_transform::{loop_exists, minimize_tokens, unroll_pointers};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    fn enumerate_all(arena: TokenArena, root: TokenId) -> Vec<String> {
        let strategy = AllPermutations::new(Arc::new(Mutex::new(arena)), root);
        let handle = strategy.fuzz(Box::new(SmallRng::seed_from_u64(0)));
        let mut outputs = Vec::new();
        while handle.step() {
            outputs.push(handle.render());
            handle.resume();
        }
        outputs
    }

    fn as_set(outputs: &[String]) -> HashSet<&str> {
        outputs.iter().map(String::as_str).collect()
    }

    #[test]
    fn optional_around_a_binary_choice() {
        let mut arena = TokenArena::new();
        let a = arena.constant("A");
        let b = arena.constant("B");
        let choice = arena.one(vec![a, b]);
        let root = arena.optional(choice);

        let outputs = enumerate_all(arena, root);
        assert_eq!(outputs.len(), 3);
        assert_eq!(as_set(&outputs), HashSet::from(["", "A", "B"]));
    }

    #[test]
    fn two_digit_character_class_pair() {
        let mut arena = TokenArena::new();
        let high = arena.char_class("01");
        let low = arena.char_class("01");
        let root = arena.all(vec![high, low]);

        let outputs = enumerate_all(arena, root);
        assert_eq!(outputs.len(), 4);
        assert_eq!(as_set(&outputs), HashSet::from(["00", "01", "10", "11"]));
    }

    #[test]
    fn unrolled_self_recursion() {
        // X = "a" X? with the default repeat limit of two.
        let mut arena = TokenArena::new();
        let a = arena.constant("a");
        let pointer = arena.pointer();
        let optional = arena.optional(pointer);
        let root = arena.all(vec![a, optional]);
        arena.set_pointer(pointer, Some(root));

        let root = unroll_pointers(&mut arena, root).expect("graph survives");
        assert!(!loop_exists(&arena, root));
        let root = minimize_tokens(&mut arena, root);

        let outputs = enumerate_all(arena, root);
        let states = as_set(&outputs);
        assert_eq!(states, HashSet::from(["a", "aa", "aaa"]));
        assert!(!states.contains("aaaa"));
    }

    #[test]
    fn state_count_accounts_for_hidden_subtrees() {
        // Optional(CharClass("abc")) and an independent CharClass("01"):
        // (3 present + 1 absent) * 2.
        let mut arena = TokenArena::new();
        let letter = arena.char_class("abc");
        let optional = arena.optional(letter);
        let digit = arena.char_class("01");
        let root = arena.all(vec![optional, digit]);

        let outputs = enumerate_all(arena, root);
        assert_eq!(outputs.len(), 8);
        assert_eq!(as_set(&outputs).len(), 8);
    }

    #[test]
    fn sequences_reset_between_steps() {
        let mut arena = TokenArena::new();
        let seq = arena.sequence(1, 1);
        let first = arena.sequence_item(seq);
        let second = arena.sequence_item(seq);
        let digit = arena.char_class("01");
        let root = arena.all(vec![seq, first, second, digit]);

        let outputs = enumerate_all(arena, root);
        assert_eq!(outputs.len(), 2);
        // Every step draws the items afresh from a reset counter.
        assert_eq!(as_set(&outputs), HashSet::from(["120", "121"]));
    }

    #[test]
    fn cancellation_mid_stream() {
        // A graph of 1000 states, abandoned after the third one.
        let mut arena = TokenArena::new();
        let digits: Vec<_> = (0..3).map(|_| arena.char_class("0123456789")).collect();
        let root = arena.all(digits);

        let strategy = AllPermutations::new(Arc::new(Mutex::new(arena)), root);
        let handle = strategy.fuzz(Box::new(SmallRng::seed_from_u64(0)));
        for _ in 0..3 {
            assert!(handle.step());
            handle.resume();
        }
        assert!(handle.step());
        // Hanging up instead of resuming stops the producer within one
        // handshake; cancel joins the producer thread.
        handle.cancel();
    }

    #[test]
    fn single_state_graphs_yield_once() {
        let mut arena = TokenArena::new();
        let root = arena.constant("only");

        let outputs = enumerate_all(arena, root);
        assert_eq!(outputs, vec!["only".to_owned()]);
    }
}
