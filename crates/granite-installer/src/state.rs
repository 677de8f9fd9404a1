//! Installer state: one instance per `Installer::install()` call, held
//! behind `Arc` and shared by every task variant and callback. Never a
//! process singleton.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use granite_core::manifest::{VersionManifest, VersionMetadata};
use granite_core::{AppError, Mirror, Settings};
use granite_engine::Engine;
use reqwest::Client;
use tokio::sync::Mutex;

use crate::counters::Counters;
use crate::task_work::InstallTask;

pub struct InstallerState {
    pub client: Client,
    pub chunk_client: Client,
    pub mirror: Mirror,
    pub settings: Settings,
    pub engine: Arc<Engine<InstallTask>>,
    pub manifest: Mutex<Option<VersionManifest>>,
    pub version_metadata: Mutex<Option<VersionMetadata>>,
    pub asset_counters: Counters,
    pub library_counters: Counters,
    stop_reason: Mutex<Option<AppError>>,
    seen_asset_destinations: Mutex<HashSet<(PathBuf, String)>>,
}

impl InstallerState {
    pub fn new(settings: Settings, mirror: Mirror, engine: Arc<Engine<InstallTask>>) -> anyhow::Result<Arc<Self>> {
        let client = crate::http::build_client(settings.max_workers)?;
        let chunk_client = crate::http::build_chunk_client(settings.max_workers)?;
        Ok(Arc::new(Self {
            client,
            chunk_client,
            mirror,
            settings,
            engine,
            manifest: Mutex::new(None),
            version_metadata: Mutex::new(None),
            asset_counters: Counters::default(),
            library_counters: Counters::default(),
            stop_reason: Mutex::new(None),
            seen_asset_destinations: Mutex::new(HashSet::new()),
        }))
    }

    pub fn version(&self) -> anyhow::Result<String> {
        self.settings
            .current_version
            .clone()
            .ok_or_else(|| AppError::schema("no current_version configured").into())
    }

    /// Cooperative abort: records the fatal cause (first one wins) so fanout
    /// stages can stop submitting further leaf work without the task that
    /// discovered the failure calling `Engine::shutdown` itself, which would
    /// deadlock (shutdown joins every worker, including the caller's own).
    pub async fn abort(&self, cause: AppError) {
        let mut guard = self.stop_reason.lock().await;
        if guard.is_none() {
            *guard = Some(cause);
        }
    }

    pub async fn is_aborted(&self) -> bool {
        self.stop_reason.lock().await.is_some()
    }

    pub async fn take_abort_reason(&self) -> Option<AppError> {
        self.stop_reason.lock().await.take()
    }

    /// Returns `true` the first time `(dest_dir, filename)` is seen for this
    /// install pass. Deduplicates submissions across the three asset
    /// fan-out destinations that can otherwise name the same file.
    pub async fn dedup_destination(&self, dest_dir: &std::path::Path, filename: &str) -> bool {
        let key = (dest_dir.to_path_buf(), filename.to_string());
        self.seen_asset_destinations.lock().await.insert(key)
    }
}
