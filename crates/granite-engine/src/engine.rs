//! The scheduler itself: a priority-ordered ready heap, a predecessor-gated
//! pending list, and a fixed pool of worker tasks.
//!
//! A single async mutex guards all scheduler state, and a `Notify` wakes
//! workers and waiters on every state change instead of a condition
//! variable.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::EngineError;
use crate::result::TaskResult;
use crate::task::{TaskId, TaskSpec};
use crate::work::Work;

struct ReadyEntry<W: Work> {
    priority: i32,
    counter: u64,
    spec: Arc<TaskSpec<W>>,
}

impl<W: Work> PartialEq for ReadyEntry<W> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.counter == other.counter
    }
}
impl<W: Work> Eq for ReadyEntry<W> {}

impl<W: Work> PartialOrd for ReadyEntry<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W: Work> Ord for ReadyEntry<W> {
    // Higher priority sorts greater (popped first by BinaryHeap's max-heap).
    // Within equal priority, the lower submission counter sorts greater, so
    // submission order is preserved (FIFO tie-break).
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.counter.cmp(&self.counter))
    }
}

struct Assignment<W: Work> {
    spec: Arc<TaskSpec<W>>,
}

struct EngineState<W: Work> {
    ready: BinaryHeap<ReadyEntry<W>>,
    pending: Vec<(u64, Arc<TaskSpec<W>>)>,
    results: HashMap<TaskId, TaskResult>,
    free_workers: VecDeque<usize>,
    worker_txs: Vec<mpsc::UnboundedSender<Assignment<W>>>,
    stop_flag: bool,
}

impl<W: Work> EngineState<W> {
    fn is_quiescent(&self) -> bool {
        self.ready.is_empty() && self.pending.is_empty() && self.free_workers.len() == self.worker_txs.len()
    }
}

/// A dependency-aware, priority-scheduled, retrying task engine.
///
/// Generic over a single closed `Work` implementation supplied by the
/// caller. Construct with [`Engine::new`], submit descriptors
/// with [`Engine::submit`], call [`Engine::run`] to block until quiescence,
/// then [`Engine::shutdown`] to tear down the worker pool.
pub struct Engine<W: Work> {
    state: Mutex<EngineState<W>>,
    notify: Notify,
    submission_counter: AtomicU64,
    stopped: AtomicBool,
    max_workers: usize,
    worker_handles: Mutex<Option<Vec<JoinHandle<()>>>>,
}

impl<W: Work> Engine<W> {
    /// Build an engine with a fixed pool of `max_workers` worker slots and
    /// spawn them immediately. Workers sit idle (blocked on their channel)
    /// until a task is dispatched to them.
    pub fn new(max_workers: usize) -> Arc<Self> {
        assert!(max_workers > 0, "engine requires at least one worker");

        let mut worker_txs = Vec::with_capacity(max_workers);
        let mut worker_rxs = Vec::with_capacity(max_workers);
        for _ in 0..max_workers {
            let (tx, rx) = mpsc::unbounded_channel();
            worker_txs.push(tx);
            worker_rxs.push(rx);
        }

        let engine = Arc::new(Engine {
            state: Mutex::new(EngineState {
                ready: BinaryHeap::new(),
                pending: Vec::new(),
                results: HashMap::new(),
                free_workers: (0..max_workers).collect(),
                worker_txs,
                stop_flag: false,
            }),
            notify: Notify::new(),
            submission_counter: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            max_workers,
            worker_handles: Mutex::new(None),
        });

        let mut handles = Vec::with_capacity(max_workers);
        for (worker_id, rx) in worker_rxs.into_iter().enumerate() {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                Engine::worker_loop(engine, worker_id, rx).await;
            }));
        }

        // Safe: no other holder of `worker_handles` exists yet.
        *engine.worker_handles.try_lock().expect("uncontended at construction") = Some(handles);

        engine
    }

    /// Submit a task for scheduling. If `pre_tasks` is empty the task goes
    /// straight to the ready heap; otherwise it waits in the pending list
    /// until every predecessor id is present in the results map. Safe to
    /// call from any worker, including from within a task's `work` or a
    /// callback's `on_finished`, which may themselves submit follow-up
    /// tasks.
    pub async fn submit(self: &Arc<Self>, spec: TaskSpec<W>) -> Result<(), EngineError> {
        let spec = Arc::new(spec);
        let counter = self.submission_counter.fetch_add(1, AtomicOrdering::Relaxed);

        let mut state = self.state.lock().await;
        if state.stop_flag {
            return Err(EngineError::Stopped);
        }

        if spec.pre_tasks.iter().all(|p| state.results.contains_key(p)) {
            trace!(task_id = %spec.id, "task ready on submission");
            state.ready.push(ReadyEntry { priority: spec.priority, counter, spec });
        } else {
            trace!(task_id = %spec.id, "task pending predecessors");
            state.pending.push((counter, spec));
        }

        self.dispatch_ready(&mut state);
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Block until the engine reaches quiescence: no ready tasks, no
    /// pending tasks, and every worker idle. Spawns an internal gating task
    /// for the duration of the call that repeatedly scans the pending list
    /// and moves every task whose predecessors have all completed into the
    /// ready heap, draining all eligible tasks per pass rather than one at
    /// a time.
    pub async fn run(self: &Arc<Self>) {
        let gating_done = Arc::new(AtomicBool::new(false));
        let gating_engine = self.clone();
        let gating_flag = gating_done.clone();
        let gating_handle: JoinHandle<()> = tokio::spawn(async move {
            loop {
                if gating_flag.load(AtomicOrdering::Relaxed) {
                    break;
                }
                let notified = gating_engine.notify.notified();
                tokio::select! {
                    _ = notified => {}
                    _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {}
                }
                if gating_flag.load(AtomicOrdering::Relaxed) {
                    break;
                }
                let mut state = gating_engine.state.lock().await;
                if state.stop_flag {
                    break;
                }
                let moved = gating_engine.drain_pending_to_ready(&mut state);
                let quiescent = state.is_quiescent();
                drop(state);
                if moved {
                    gating_engine.notify.notify_waiters();
                }
                if quiescent {
                    break;
                }
            }
        });

        loop {
            let notified = self.notify.notified();
            {
                let state = self.state.lock().await;
                if state.stop_flag || state.is_quiescent() {
                    break;
                }
            }
            notified.await;
        }

        gating_done.store(true, AtomicOrdering::Relaxed);
        self.notify.notify_waiters();
        let _ = gating_handle.await;
        debug!("engine reached quiescence");
    }

    /// Terminate the worker pool and release resources. Idempotent: calling
    /// `shutdown` more than once is a no-op after the first call.
    pub async fn shutdown(self: &Arc<Self>) {
        if self.stopped.swap(true, AtomicOrdering::SeqCst) {
            return;
        }

        let handles = {
            let mut state = self.state.lock().await;
            state.stop_flag = true;
            state.worker_txs.clear(); // drop senders: worker rx.recv() returns None
            self.worker_handles.lock().await.take()
        };
        self.notify.notify_waiters();

        if let Some(handles) = handles {
            for handle in handles {
                let _ = handle.await;
            }
        }
    }

    /// Whether `shutdown` has been called. Polled by `run_with_retries` so an
    /// unbounded-retry task (`max_retries == -1`) can stop retrying once the
    /// engine is shutting down instead of looping forever.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(AtomicOrdering::SeqCst)
    }

    /// Snapshot of every terminal result recorded so far.
    pub async fn results(&self) -> HashMap<TaskId, TaskResult> {
        self.state.lock().await.results.clone()
    }

    /// Result for a single task id, if it has reached a terminal state.
    pub async fn result_for(&self, task_id: &str) -> Option<TaskResult> {
        self.state.lock().await.results.get(task_id).cloned()
    }

    fn drain_pending_to_ready(self: &Arc<Self>, state: &mut EngineState<W>) -> bool {
        if state.pending.is_empty() {
            return false;
        }
        let (ready_now, still_pending): (Vec<_>, Vec<_>) = state
            .pending
            .drain(..)
            .partition(|(_, spec)| spec.pre_tasks.iter().all(|p| state.results.contains_key(p)));
        state.pending = still_pending;
        if ready_now.is_empty() {
            return false;
        }
        for (counter, spec) in ready_now {
            trace!(task_id = %spec.id, "predecessors satisfied, moving to ready");
            state.ready.push(ReadyEntry { priority: spec.priority, counter, spec });
        }
        self.dispatch_ready(state);
        true
    }

    /// Assign ready tasks to free worker slots until one side is exhausted.
    /// Dispatch hands the descriptor to a specific worker; workers never
    /// pull from the ready heap themselves.
    fn dispatch_ready(&self, state: &mut EngineState<W>) {
        while let Some(worker_id) = state.free_workers.front().copied() {
            let Some(entry) = state.ready.pop() else { break };
            state.free_workers.pop_front();
            if state.worker_txs[worker_id].send(Assignment { spec: entry.spec }).is_err() {
                warn!(worker_id, "worker channel closed during dispatch");
            }
        }
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize, mut rx: mpsc::UnboundedReceiver<Assignment<W>>) {
        while let Some(assignment) = rx.recv().await {
            let spec = assignment.spec;
            let result = run_with_retries(self.as_ref(), spec.as_ref(), worker_id).await;
            debug!(task_id = %spec.id, result = %result, "task finished");

            {
                let mut state = self.state.lock().await;
                state.results.insert(spec.id.clone(), result.clone());
            }

            if let Some(callback) = &spec.callback {
                callback.on_finished(self.clone(), spec.id.clone(), result).await;
            }

            {
                let mut state = self.state.lock().await;
                state.free_workers.push_back(worker_id);
                self.drain_pending_to_ready(&mut state);
                self.dispatch_ready(&mut state);
            }
            self.notify.notify_waiters();
        }
    }
}

/// Run `work.execute` according to `max_retries`. `max_retries < 0` retries
/// forever (bounded only by the caller eventually shutting the engine
/// down); otherwise `max_retries + 1` attempts are made before the task is
/// finalized with an error-tagged result.
async fn run_with_retries<W: Work>(engine: &Engine<W>, spec: &TaskSpec<W>, worker_id: usize) -> TaskResult {
    let mut last_err: Option<anyhow::Error> = None;

    if spec.max_retries < 0 {
        loop {
            match spec.work.execute(worker_id).await {
                Ok(outcome) => return TaskResult::Ok(outcome),
                Err(err) => {
                    if engine.is_stopped() {
                        warn!(task_id = %spec.id, error = %err, "attempt failed, stopping (engine shut down)");
                        last_err = Some(err);
                        break;
                    }
                    warn!(task_id = %spec.id, error = %err, "attempt failed, retrying indefinitely");
                    last_err = Some(err);
                }
            }
        }
        return TaskResult::Err(format!(
            "Error: {}",
            last_err.map(|e| e.to_string()).unwrap_or_else(|| "unknown error".to_string())
        ));
    }

    for attempt in 0..=spec.max_retries {
        match spec.work.execute(worker_id).await {
            Ok(outcome) => return TaskResult::Ok(outcome),
            Err(err) => {
                warn!(task_id = %spec.id, attempt, error = %err, "attempt failed");
                last_err = Some(err);
            }
        }
    }

    TaskResult::Err(format!(
        "Error: {}",
        last_err.map(|e| e.to_string()).unwrap_or_else(|| "unknown error".to_string())
    ))
}
