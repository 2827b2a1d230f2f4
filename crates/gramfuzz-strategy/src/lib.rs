//! Fuzzing strategies driving a prepared token graph.
//!
//! A strategy runs as a producer on its own thread and talks to the
//! caller through a rendezvous handshake: after realizing a graph state it
//! signals readiness and suspends; the caller reads the shared graph
//! (typically by rendering the root) and either lets the producer continue
//! or hangs up. The handshake keeps at most one fresh state live at any
//! moment, so the two sides never look at the graph concurrently.

mod allpermutations;
mod random;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use gramfuzz_token::{TokenArena, TokenId};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::RngCore;
use thiserror::Error;

pub use allpermutations::AllPermutations;
pub use random::Random;

/// The token graph as shared between a strategy's producer thread and the
/// caller. The rendezvous discipline keeps the mutex uncontended.
pub type SharedArena = Arc<Mutex<TokenArena>>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown fuzzing strategy {0:?}")]
    UnknownStrategy(String),
}

/// A fuzzing strategy over a prepared, loop-free token graph.
pub trait Strategy {
    /// Starts the producer and returns the handle the caller drives the
    /// handshake through.
    fn fuzz(&self, rng: Box<dyn RngCore + Send>) -> FuzzHandle;
}

/// Caller side of the rendezvous handshake.
///
/// ```no_run
/// # use gramfuzz_strategy::{AllPermutations, SharedArena, Strategy};
/// # use rand::SeedableRng;
/// # fn demo(arena: SharedArena, root: gramfuzz_token::TokenId) {
/// let strategy = AllPermutations::new(arena, root);
/// let handle = strategy.fuzz(Box::new(rand::rngs::SmallRng::seed_from_u64(0)));
/// while handle.step() {
///     println!("{}", handle.render());
///     handle.resume();
/// }
/// # }
/// ```
///
/// Dropping the handle mid-stream cancels the producer, which returns
/// within one handshake cycle.
pub struct FuzzHandle {
    arena: SharedArena,
    root: TokenId,
    steps: Option<Receiver<()>>,
    resume: Option<Sender<()>>,
    producer: Option<JoinHandle<()>>,
}

impl FuzzHandle {
    /// Waits for the next realized state. Returns `false` once the
    /// producer is done.
    pub fn step(&self) -> bool {
        self.steps.as_ref().is_some_and(|rx| rx.recv().is_ok())
    }

    /// Renders the shared root in its current state.
    pub fn render(&self) -> String {
        self.arena.lock().render(self.root)
    }

    /// Lets the producer advance to the next state.
    pub fn resume(&self) {
        if let Some(tx) = &self.resume {
            // The producer may already have shut down; that is fine.
            let _ = tx.send(());
        }
    }

    /// Hangs up and waits for the producer to finish.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Closing both channel ends makes every producer-side suspension
        // point fail, which the producer treats as cancellation.
        self.resume.take();
        self.steps.take();
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
    }
}

impl Drop for FuzzHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

type Factory = fn(SharedArena, TokenId) -> Box<dyn Strategy + Send>;

static STRATEGIES: Lazy<Mutex<HashMap<&'static str, Factory>>> = Lazy::new(|| {
    let mut strategies: HashMap<&'static str, Factory> = HashMap::new();
    strategies.insert("AllPermutations", |arena, root| {
        Box::new(AllPermutations::new(arena, root))
    });
    strategies.insert("random", |arena, root| Box::new(Random::new(arena, root)));
    Mutex::new(strategies)
});

/// Registers a strategy under a name. Panics on an empty or duplicate
/// name.
pub fn register(name: &'static str, factory: Factory) {
    assert!(!name.is_empty(), "strategy name is empty");
    let mut strategies = STRATEGIES.lock();
    assert!(
        !strategies.contains_key(name),
        "strategy {name:?} is already registered"
    );
    strategies.insert(name, factory);
}

/// Instantiates the strategy registered under `name` for the given graph.
pub fn for_name(name: &str, arena: SharedArena, root: TokenId) -> Result<Box<dyn Strategy + Send>, Error> {
    let strategies = STRATEGIES.lock();
    let factory = strategies
        .get(name)
        .ok_or_else(|| Error::UnknownStrategy(name.to_owned()))?;
    Ok(factory(arena, root))
}

/// The registered strategy names, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = STRATEGIES.lock().keys().copied().collect();
    names.sort_unstable();
    names
}
