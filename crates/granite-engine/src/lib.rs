//! Dependency-aware, priority-scheduled, retrying task engine.
//!
//! The scheduling core shared by anything `granite-installer` needs to run
//! with bounded concurrency, predecessor ordering, and automatic retries.
//! A fixed pool of async workers pulls from a single mutex-guarded
//! scheduler state, with a `Notify` waking workers and waiters on every
//! state change.

mod engine;
mod error;
mod result;
mod task;
mod work;

pub use engine::Engine;
pub use error::EngineError;
pub use result::{TaskOutcome, TaskResult};
pub use task::{Priority, TaskId, TaskSpec, RETRY_FOREVER};
pub use work::{Callback, Work};
