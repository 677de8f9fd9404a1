//! Adaptive-interval progress sampling.
//!
//! Each leaf-submission pass spawns one of these as a detached task. It is
//! not itself submitted to the engine; it only samples the counters the
//! engine's callbacks update and logs a line per change.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::counters::Counters;
use crate::state::InstallerState;
use granite_core::constants::{
    PROGRESS_ACCEL_THRESHOLD, PROGRESS_INITIAL_SLEEP_SECS, PROGRESS_MAX_SLEEP_SECS, PROGRESS_MIN_SLEEP_SECS,
};

pub fn spawn_progress_task(
    state: Arc<InstallerState>,
    description: &'static str,
    total: usize,
    counters: fn(&InstallerState) -> &Counters,
) {
    if total == 0 {
        return;
    }
    tokio::spawn(async move {
        let mut last = 0usize;
        let mut sleep_secs = PROGRESS_INITIAL_SLEEP_SECS;

        loop {
            let current = counters(&state).completed();
            if current >= total {
                info!(description, current, total, "progress complete");
                break;
            }
            if current > last {
                if current - last > PROGRESS_ACCEL_THRESHOLD as usize {
                    sleep_secs = (sleep_secs * 0.8).max(PROGRESS_MIN_SLEEP_SECS);
                } else {
                    sleep_secs = (sleep_secs * 1.2).min(PROGRESS_MAX_SLEEP_SECS);
                }
                info!(description, current, total, "progress");
                last = current;
            }
            tokio::time::sleep(Duration::from_secs_f64(sleep_secs)).await;
        }
    });
}
