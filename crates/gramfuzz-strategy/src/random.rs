//! The random strategy: one random permutation assignment per run.

use std::collections::VecDeque;
use std::thread;

use crossbeam_channel::bounded;
use gramfuzz_token::TokenId;
use rand::{Rng, RngCore};
use tracing::trace;

use crate::{FuzzHandle, SharedArena, Strategy};

/// Assigns a random permutation to every token of the rendered graph,
/// parent before children, yields the single resulting state and shuts
/// down through the usual handshake.
pub struct Random {
    arena: SharedArena,
    root: TokenId,
}

impl Random {
    pub fn new(arena: SharedArena, root: TokenId) -> Self {
        Self { arena, root }
    }
}

impl Strategy for Random {
    fn fuzz(&self, mut rng: Box<dyn RngCore + Send>) -> FuzzHandle {
        let (step_tx, step_rx) = bounded(0);
        let (resume_tx, resume_rx) = bounded(0);

        let arena = self.arena.clone();
        let root = self.root;
        let producer = thread::Builder::new()
            .name("random".to_owned())
            .spawn(move || {
                trace!("start random fuzzing step");
                {
                    let mut arena = arena.lock();
                    let mut queue = VecDeque::from([root]);
                    while let Some(id) = queue.pop_front() {
                        let permutations = arena.permutations(id);
                        let choice = rng.gen_range(1..=permutations);
                        arena
                            .set_permutation(id, choice)
                            .expect("choice is within bounds");
                        // The assignment decides what is logically visible
                        // (an optional may have gone absent), so children
                        // are collected afterwards.
                        queue.extend(arena.logical_children(id));
                    }
                }

                trace!("done with fuzzing step");
                if step_tx.send(()).is_err() {
                    return;
                }
                let _ = resume_rx.recv();
                trace!("close the fuzzing channel");
            })
            .expect("spawning the random strategy thread");

        FuzzHandle {
            arena: self.arena.clone(),
            root: self.root,
            steps: Some(step_rx),
            resume: Some(resume_tx),
            producer: Some(producer),
        }
    }
}
