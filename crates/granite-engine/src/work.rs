//! The seam between the engine and whatever domain submits work to it.
//!
//! The engine stays domain-agnostic by being generic over a single closed
//! trait, `Work`, rather than an open `Box<dyn Fn>` existential. The caller
//! (granite-installer) supplies one closed sum type that implements it; the
//! engine itself never needs to know what an `InstallTask` is.

use std::sync::Arc;

use async_trait::async_trait;

use crate::result::TaskResult;
use crate::task::TaskId;
use crate::Engine;

/// A unit of work the engine can run. `execute` is retried according to the
/// owning task's `max_retries` budget; `worker_id` identifies which of the
/// engine's fixed worker slots is running this attempt, should the work need
/// it for logging or resource partitioning.
#[async_trait]
pub trait Work: Send + Sync + 'static {
    async fn execute(&self, worker_id: usize) -> anyhow::Result<crate::result::TaskOutcome>;
}

/// Invoked once a task reaches a terminal result (success or retries
/// exhausted). Callbacks run on the worker that finished the task, with a
/// handle back to the engine so they can submit follow-up work, including
/// a fresh attempt at the same logical task under a new id.
#[async_trait]
pub trait Callback<W: Work>: Send + Sync + 'static {
    async fn on_finished(&self, engine: Arc<Engine<W>>, task_id: TaskId, result: TaskResult);
}
