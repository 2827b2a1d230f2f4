//! Graph preparation pipeline for the gramfuzz engine.
//!
//! A raw grammar graph may contain cycles through pointer tokens. Before
//! any behavioral pass runs, the graph goes through this pipeline:
//! [`loop_exists`] decides whether cycles remain, [`unroll_pointers`]
//! rewrites cyclic pointer graphs into a bounded clone tree, and
//! [`minimize_tokens`] collapses degenerate constructs. Each pass returns
//! a (possibly new) root; callers must adopt it.

mod edit;
mod loops;
mod minimize;
mod print;
mod unroll;

/// How many times a cycle may be traversed along a single root-to-leaf
/// path while unrolling.
pub const MAX_REPEAT: u32 = 2;

pub use loops::loop_exists;
pub use minimize::minimize_tokens;
pub use print::{internal_tree_string, tree_string};
pub use unroll::{unroll_pointers, unroll_pointers_with_limit};
