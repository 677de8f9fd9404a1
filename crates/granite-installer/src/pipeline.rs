//! The installer pipeline driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use granite_core::constants::{BATCH_POLL_INTERVAL_MS, BATCH_WAIT_TIMEOUT_SECS};
use granite_core::{AppError, Mirror, Settings};
use granite_engine::{Engine, TaskResult, TaskSpec};
use tracing::info;

use crate::counters::Counters;
use crate::state::InstallerState;
use crate::task_work::InstallTask;

const STAGE_IDS: [&str; 6] = ["stage-0", "stage-1", "stage-2", "stage-3", "stage-4", "stage-5"];

/// Typed result of an install: success, or a fatal condition. `From<InstallOutcome>
/// for i32` bridges this to `granite-cli`'s process exit code (`0` on success,
/// nonzero otherwise).
#[derive(Debug)]
pub enum InstallOutcome {
    Success,
    Failed(AppError),
}

impl From<InstallOutcome> for i32 {
    fn from(outcome: InstallOutcome) -> Self {
        match outcome {
            InstallOutcome::Success => 0,
            InstallOutcome::Failed(_) => 1,
        }
    }
}

/// Drives exactly one install: one engine, one `InstallerState`, six stage
/// tasks submitted up front with fixed predecessor edges between them.
pub struct Installer {
    settings: Settings,
    mirror: Mirror,
}

impl Installer {
    pub fn new(settings: Settings, mirror: Mirror) -> Self {
        Self { settings, mirror }
    }

    pub async fn install(self) -> InstallOutcome {
        let start = Instant::now();
        let max_workers = self.settings.max_workers;
        let engine = Engine::<InstallTask>::new(max_workers);

        let state = match InstallerState::new(self.settings, self.mirror, engine.clone()) {
            Ok(state) => state,
            Err(err) => return InstallOutcome::Failed(AppError::transport(err.to_string())),
        };

        if let Err(err) = submit_stages(&engine, &state).await {
            engine.shutdown().await;
            return InstallOutcome::Failed(AppError::transport(err.to_string()));
        }

        engine.run().await;
        let outcome = summarize(&engine, &state).await;
        engine.shutdown().await;

        info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            failed_assets = state.asset_counters.failed(),
            failed_libraries = state.library_counters.failed(),
            installed_assets = state.asset_counters.installed(),
            installed_libraries = state.library_counters.installed(),
            "install finished"
        );

        outcome
    }
}

async fn submit_stages(engine: &Arc<Engine<InstallTask>>, state: &Arc<InstallerState>) -> anyhow::Result<()> {
    let stages = [
        TaskSpec::new(STAGE_IDS[0], "download version manifest", 10, InstallTask::ManifestFetch(state.clone())),
        TaskSpec::new(STAGE_IDS[1], "download version metadata", 10, InstallTask::VersionMetadataFetch(state.clone()))
            .with_pre_tasks(vec![STAGE_IDS[0].into()]),
        TaskSpec::new(STAGE_IDS[2], "download main client archive", 10, InstallTask::MainFileCoordinator(state.clone()))
            .with_pre_tasks(vec![STAGE_IDS[1].into()]),
        TaskSpec::new(STAGE_IDS[3], "download asset index", 10, InstallTask::AssetIndexFetch(state.clone()))
            .with_pre_tasks(vec![STAGE_IDS[1].into()]),
        TaskSpec::new(STAGE_IDS[4], "fan out asset downloads", 10, InstallTask::AssetsFanout(state.clone()))
            .with_pre_tasks(vec![STAGE_IDS[3].into()]),
        TaskSpec::new(STAGE_IDS[5], "fan out library downloads", 10, InstallTask::LibrariesFanout(state.clone()))
            .with_pre_tasks(vec![STAGE_IDS[1].into()]),
    ];

    for spec in stages {
        engine.submit(spec).await?;
    }
    Ok(())
}

async fn summarize(engine: &Arc<Engine<InstallTask>>, state: &Arc<InstallerState>) -> InstallOutcome {
    if let Some(cause) = state.take_abort_reason().await {
        return InstallOutcome::Failed(cause);
    }

    for stage_id in STAGE_IDS {
        match engine.result_for(stage_id).await {
            Some(TaskResult::Err(message)) => return InstallOutcome::Failed(AppError::transport(message)),
            Some(TaskResult::Ok(_)) => {}
            None => return InstallOutcome::Failed(AppError::schema(format!("{stage_id} never completed"))),
        }
    }

    InstallOutcome::Success
}

/// Block until `min_completed` leaves have finished or
/// [`BATCH_WAIT_TIMEOUT_SECS`] elapses, whichever comes first.
pub(crate) async fn wait_for_batch_completion(counters: &Counters, min_completed: f64) {
    let deadline = Instant::now() + Duration::from_secs(BATCH_WAIT_TIMEOUT_SECS);
    loop {
        if counters.completed() as f64 >= min_completed || Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(BATCH_POLL_INTERVAL_MS)).await;
    }
}
