//! Task descriptors.

use std::sync::Arc;
use std::time::Duration;

use crate::work::{Callback, Work};

pub type TaskId = String;
pub type Priority = i32;

/// Retry indefinitely: the task is retried on failure until it succeeds or
/// the engine is shut down.
pub const RETRY_FOREVER: i32 = -1;

/// A task handed to [`crate::Engine::submit`].
///
/// `pre_tasks` names predecessor task ids this task is gated behind: it does
/// not become eligible for dispatch until every id in `pre_tasks` is present
/// as a key in the results map, regardless of whether those predecessors
/// succeeded or failed. Gating is presence-based, not success-based.
pub struct TaskSpec<W: Work> {
    pub id: TaskId,
    pub description: String,
    pub priority: Priority,
    pub max_retries: i32,
    pub pre_tasks: Vec<TaskId>,
    pub work: W,
    pub callback: Option<Arc<dyn Callback<W>>>,
    /// Reserved for a future per-attempt timeout; the engine does not
    /// currently enforce it.
    pub max_time: Option<Duration>,
}

impl<W: Work> TaskSpec<W> {
    /// A task with no predecessors, single-attempt by default.
    pub fn new(id: impl Into<TaskId>, description: impl Into<String>, priority: Priority, work: W) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority,
            max_retries: 0,
            pre_tasks: Vec::new(),
            work,
            callback: None,
            max_time: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_pre_tasks(mut self, pre_tasks: Vec<TaskId>) -> Self {
        self.pre_tasks = pre_tasks;
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn Callback<W>>) -> Self {
        self.callback = Some(callback);
        self
    }
}
