//! Leaf download callback.

use std::sync::Arc;

use async_trait::async_trait;
use granite_core::constants::LEAF_CALLBACK_MAX_RETRIES;
use granite_engine::{Callback, Engine, TaskId, TaskResult, TaskSpec};
use tracing::warn;

use crate::state::InstallerState;
use crate::task_work::{InstallTask, LeafKind, RegularDownloadArgs};

/// Constructed fresh for every leaf submission, capturing exactly the
/// state needed to resubmit it. On a terminal failure it resubmits a fresh
/// task at priority 12 with a `…-retry-<n>` id, up to
/// [`LEAF_CALLBACK_MAX_RETRIES`] times, after which the leaf is counted as
/// an ultimate failure.
pub struct LeafCallback {
    pub state: Arc<InstallerState>,
    pub args: RegularDownloadArgs,
}

#[async_trait]
impl Callback<InstallTask> for LeafCallback {
    async fn on_finished(&self, engine: Arc<Engine<InstallTask>>, task_id: TaskId, result: TaskResult) {
        let counters = match self.args.kind {
            LeafKind::Asset => &self.state.asset_counters,
            LeafKind::Library => &self.state.library_counters,
        };

        if result.is_ok() {
            counters.mark_installed();
            return;
        }

        if self.args.retry_count >= LEAF_CALLBACK_MAX_RETRIES {
            counters.mark_failed();
            return;
        }

        let retry_number = counters.mark_retried();
        let mut retry_args = self.args.clone();
        retry_args.retry_count += 1;

        let prefix = match self.args.kind {
            LeafKind::Asset => "asset",
            LeafKind::Library => "library",
        };
        let retry_id = format!("{prefix}-downloading-worker-retry-{retry_number}");

        let task = InstallTask::RegularDownload { state: self.state.clone(), args: retry_args.clone() };
        let callback = Arc::new(LeafCallback { state: self.state.clone(), args: retry_args });
        let spec = TaskSpec::new(retry_id, format!("retry of {task_id}"), 12, task)
            .with_max_retries(granite_core::constants::LEAF_MAX_RETRIES)
            .with_callback(callback);

        if let Err(err) = engine.submit(spec).await {
            warn!(%task_id, error = %err, "failed to resubmit leaf download");
            counters.mark_failed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use granite_core::{Mirror, Settings};
    use granite_engine::TaskOutcome;
    use std::path::PathBuf;

    fn sample_args() -> RegularDownloadArgs {
        RegularDownloadArgs {
            url: "http://example.invalid/object".into(),
            destinations: vec![(PathBuf::from("/tmp/granite-test"), "object".into())],
            expected_hash: "deadbeef".into(),
            kind: LeafKind::Asset,
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn success_marks_installed_without_retry() {
        let engine = Engine::<InstallTask>::new(1);
        let state = InstallerState::new(Settings::default(), Mirror::Mojang, engine.clone()).unwrap();
        let callback = LeafCallback { state: state.clone(), args: sample_args() };

        callback
            .on_finished(engine, "asset-downloading-worker-0".into(), TaskResult::Ok(TaskOutcome::Flag(true)))
            .await;

        assert_eq!(state.asset_counters.installed(), 1);
        assert_eq!(state.asset_counters.failed(), 0);
        assert_eq!(state.asset_counters.retried(), 0);
    }

    #[tokio::test]
    async fn failure_resubmits_up_to_the_bound_then_marks_failed() {
        let engine = Engine::<InstallTask>::new(1);
        let state = InstallerState::new(Settings::default(), Mirror::Mojang, engine.clone()).unwrap();

        for retry_count in 0..LEAF_CALLBACK_MAX_RETRIES {
            let args = RegularDownloadArgs { retry_count, ..sample_args() };
            let callback = LeafCallback { state: state.clone(), args };
            callback
                .on_finished(engine.clone(), "asset-downloading-worker-0".into(), TaskResult::Err("boom".into()))
                .await;
        }
        assert_eq!(state.asset_counters.retried(), LEAF_CALLBACK_MAX_RETRIES as usize);
        assert_eq!(state.asset_counters.failed(), 0);

        let args = RegularDownloadArgs { retry_count: LEAF_CALLBACK_MAX_RETRIES, ..sample_args() };
        let callback = LeafCallback { state: state.clone(), args };
        callback
            .on_finished(engine.clone(), "asset-downloading-worker-0".into(), TaskResult::Err("boom".into()))
            .await;

        assert_eq!(state.asset_counters.failed(), 1);
        assert_eq!(state.asset_counters.retried(), LEAF_CALLBACK_MAX_RETRIES as usize);
    }
}
