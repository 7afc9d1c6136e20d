//! Batch-oriented tabular ingestion.
//!
//! Two small building blocks shared by reporting tools that read
//! directory-sharded delimited-text exports:
//!
//! * [`load_folder`] discovers the files of one dataset directory, parses
//!   each shard independently (in parallel) and concatenates the results
//!   into a single [`Frame`], tolerating per-file failures.
//! * [`run_batch`] runs a batch of independent tasks on isolated
//!   workers, reports completions as they happen and returns one outcome per
//!   task in submission order.

mod frame;
mod loader;
mod pool;

pub use crate::frame::{Frame, FrameError, Row, Value};
pub use crate::loader::{load_folder, LoadError, DEFAULT_PATTERN};
pub use crate::pool::{default_workers, run_batch, Outcome, Task, TaskError};
