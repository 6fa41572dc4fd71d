//! Launching one job as an isolated process tree.
//!
//! [`ProcessTree`] is the platform capability: how to make a spawned command lead its own group and
//! how to kill that whole group. [`JobRunner`] decides *when* to kill (deadline, cancellation) and
//! streams output lines as status events.

mod tree;
pub use tree::{ProcessTree, default_tree};
#[cfg(unix)]
pub use tree::PosixGroup;
#[cfg(not(unix))]
pub use tree::LeaderOnly;

mod runner;
pub use runner::JobRunner;
