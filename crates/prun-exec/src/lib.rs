mod error;
pub use error::ExecError;

mod util;

pub mod proc;
pub use proc::{JobRunner, ProcessTree, default_tree};

pub mod pool;
pub use pool::{PoolConfig, WorkerPool};
