//! `InstallTask`: the single closed sum type over every task flavor the
//! installer submits. The engine only ever sees this one type implement
//! `granite_engine::Work`; it has no idea an install is happening.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use granite_core::constants::{CHUNK_SIZE_BYTES, CHUNK_SUBMIT_DELAY_MS, LEAF_MAX_RETRIES};
use granite_core::manifest::AssetIndex;
use granite_core::AppError;
use granite_engine::{TaskOutcome, TaskResult, TaskSpec, Work};
use tracing::info;

use crate::callbacks::LeafCallback;
use crate::http;
use crate::paths;
use crate::state::InstallerState;
use crate::{chunk, progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Asset,
    Library,
}

/// A leaf download's contract: one URL, one or more `(dest_dir, filename)`
/// destinations that each receive identical bytes, and an expected hash
/// that is not checked against the downloaded bytes here.
#[derive(Debug, Clone)]
pub struct RegularDownloadArgs {
    pub url: String,
    pub destinations: Vec<(PathBuf, String)>,
    pub expected_hash: String,
    pub kind: LeafKind,
    pub retry_count: u32,
}

pub enum InstallTask {
    ManifestFetch(Arc<InstallerState>),
    VersionMetadataFetch(Arc<InstallerState>),
    MainFileCoordinator(Arc<InstallerState>),
    MainFileChunk {
        state: Arc<InstallerState>,
        index: usize,
        url: String,
        start: u64,
        end: u64,
        temp_dir: PathBuf,
    },
    AssetIndexFetch(Arc<InstallerState>),
    AssetsFanout(Arc<InstallerState>),
    LibrariesFanout(Arc<InstallerState>),
    RegularDownload {
        state: Arc<InstallerState>,
        args: RegularDownloadArgs,
    },
}

#[async_trait]
impl Work for InstallTask {
    async fn execute(&self, _worker_id: usize) -> anyhow::Result<TaskOutcome> {
        match self {
            InstallTask::ManifestFetch(state) => manifest_fetch(state).await,
            InstallTask::VersionMetadataFetch(state) => version_metadata_fetch(state).await,
            InstallTask::MainFileCoordinator(state) => main_file_coordinator(state).await,
            InstallTask::MainFileChunk { state, index, url, start, end, temp_dir } => {
                main_file_chunk(state, *index, url, *start, *end, temp_dir).await
            }
            InstallTask::AssetIndexFetch(state) => asset_index_fetch(state).await,
            InstallTask::AssetsFanout(state) => assets_fanout(state).await,
            InstallTask::LibrariesFanout(state) => libraries_fanout(state).await,
            InstallTask::RegularDownload { state, args } => regular_download(state, args).await,
        }
    }
}

// ---- Stage 0: manifest fetch --------------------------------------------

async fn manifest_fetch(state: &Arc<InstallerState>) -> anyhow::Result<TaskOutcome> {
    let url = state.mirror.manifest_url();
    let response = http::get_with_retry(&state.client, url).await?;
    let body = response.text().await.map_err(AppError::transport)?;
    let manifest = serde_json::from_str(&body).map_err(|e| AppError::schema(e.to_string()))?;
    *state.manifest.lock().await = Some(manifest);
    info!("downloaded version manifest");
    Ok(TaskOutcome::Status(0))
}

// ---- Stage 1: version metadata fetch ------------------------------------

async fn version_metadata_fetch(state: &Arc<InstallerState>) -> anyhow::Result<TaskOutcome> {
    let version = state.version()?;

    let url = {
        let guard = state.manifest.lock().await;
        let manifest = guard.as_ref().ok_or_else(|| AppError::schema("manifest not loaded"))?;
        let entry = manifest
            .find(&version)
            .ok_or_else(|| AppError::schema(format!("version {version} not found in manifest")))?;
        state.mirror.rewrite_url(&entry.url)
    };

    let response = http::get_with_retry(&state.client, &url).await?;
    let body = response.text().await.map_err(AppError::transport)?;
    let metadata = serde_json::from_str(&body).map_err(|e| AppError::schema(e.to_string()))?;

    let path = paths::version_json_path(&state.settings.working_path, &version);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &body).await?;

    *state.version_metadata.lock().await = Some(metadata);
    info!(%version, "downloaded version metadata");
    Ok(TaskOutcome::Status(0))
}

// ---- Stage 2: main client archive, chunked ------------------------------

async fn main_file_coordinator(state: &Arc<InstallerState>) -> anyhow::Result<TaskOutcome> {
    let version = state.version()?;
    let dest = paths::version_jar_path(&state.settings.working_path, &version);

    let (url, expected_sha1) = {
        let guard = state.version_metadata.lock().await;
        let metadata = guard.as_ref().ok_or_else(|| AppError::schema("version metadata not loaded"))?;
        (state.mirror.rewrite_url(&metadata.downloads.client.url), metadata.downloads.client.sha1.clone())
    };

    if dest.exists() && chunk::file_matches_sha1(&dest, &expected_sha1).await.unwrap_or(false) {
        info!("main archive already present, skipping download");
        return Ok(TaskOutcome::Status(0));
    }

    match chunk::probe_range_support(&state.chunk_client, &url).await? {
        Some(total_size) => chunked_main_file_download(state, &url, &dest, &expected_sha1, total_size).await,
        None => regular_main_file_download(state, &url, &dest, &expected_sha1).await,
    }
}

async fn chunked_main_file_download(
    state: &Arc<InstallerState>,
    url: &str,
    dest: &Path,
    expected_sha1: &str,
    total_size: u64,
) -> anyhow::Result<TaskOutcome> {
    let ranges = chunk::plan_chunks(total_size, CHUNK_SIZE_BYTES);
    let temp_dir = paths::chunk_temp_dir(&state.settings.temp_path, expected_sha1);
    tokio::fs::create_dir_all(&temp_dir).await?;

    for (index, (start, end)) in ranges.iter().enumerate() {
        let task = InstallTask::MainFileChunk {
            state: state.clone(),
            index,
            url: url.to_string(),
            start: *start,
            end: *end,
            temp_dir: temp_dir.clone(),
        };
        state
            .engine
            .submit(
                TaskSpec::new(format!("main-file-worker-{index}"), "main archive chunk", 11, task)
                    .with_max_retries(LEAF_MAX_RETRIES),
            )
            .await?;
        tokio::time::sleep(Duration::from_millis(CHUNK_SUBMIT_DELAY_MS)).await;
    }

    wait_for_chunks(state, ranges.len()).await?;

    let dest = dest.to_path_buf();
    let temp_dir_for_blocking = temp_dir.clone();
    let expected = expected_sha1.to_string();
    let num_chunks = ranges.len();
    let reassembled = tokio::task::spawn_blocking(move || {
        chunk::reassemble_chunks(&temp_dir_for_blocking, num_chunks, &dest, &expected)
    })
    .await
    .map_err(|e| AppError::Filesystem(std::io::Error::other(e.to_string())))?;

    match reassembled {
        Ok(()) => Ok(TaskOutcome::Status(0)),
        Err(err) => {
            let cause = match &err {
                AppError::Integrity { expected, actual } => {
                    AppError::Integrity { expected: expected.clone(), actual: actual.clone() }
                }
                other => AppError::transport(other.to_string()),
            };
            state.abort(cause).await;
            Err(err.into())
        }
    }
}

/// Poll the results map until every `main-file-worker-<i>` id has a result.
async fn wait_for_chunks(state: &Arc<InstallerState>, chunk_count: usize) -> anyhow::Result<()> {
    loop {
        let mut all_present = true;
        for index in 0..chunk_count {
            match state.engine.result_for(&format!("main-file-worker-{index}")).await {
                Some(TaskResult::Ok(_)) => {}
                Some(TaskResult::Err(_)) => {
                    state.abort(AppError::transport("one or more main archive chunks failed")).await;
                    anyhow::bail!("main archive chunk download failed");
                }
                None => all_present = false,
            }
        }
        if all_present {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn main_file_chunk(
    state: &Arc<InstallerState>,
    index: usize,
    url: &str,
    start: u64,
    end: u64,
    temp_dir: &Path,
) -> anyhow::Result<TaskOutcome> {
    let dest = paths::chunk_file_path(temp_dir, index);
    chunk::download_chunk(&state.chunk_client, url, start, end, &dest).await?;
    Ok(TaskOutcome::Status(0))
}

async fn regular_main_file_download(
    state: &Arc<InstallerState>,
    url: &str,
    dest: &Path,
    expected_sha1: &str,
) -> anyhow::Result<TaskOutcome> {
    use sha1::{Digest, Sha1};

    let response = http::get_with_retry(&state.client, url).await?;
    let bytes = response.bytes().await.map_err(AppError::transport)?;

    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    let actual = hex::encode(hasher.finalize());
    if actual != expected_sha1 {
        state.abort(AppError::Integrity { expected: expected_sha1.to_string(), actual: actual.clone() }).await;
        return Err(AppError::Integrity { expected: expected_sha1.to_string(), actual }.into());
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &bytes).await?;
    Ok(TaskOutcome::Status(0))
}

// ---- Stage 3: asset index -----------------------------------------------

async fn asset_index_fetch(state: &Arc<InstallerState>) -> anyhow::Result<TaskOutcome> {
    let (asset_index_id, expected_sha1, url) = {
        let guard = state.version_metadata.lock().await;
        let metadata = guard.as_ref().ok_or_else(|| AppError::schema("version metadata not loaded"))?;
        (
            metadata.asset_index.id.clone(),
            metadata.asset_index.sha1.clone(),
            state.mirror.rewrite_url(&metadata.asset_index.url),
        )
    };

    let dest = paths::asset_index_path(&state.settings.working_path, &asset_index_id);
    if dest.exists() && chunk::file_matches_sha1(&dest, &expected_sha1).await.unwrap_or(false) {
        info!(%asset_index_id, "asset index already present, skipping download");
        return Ok(TaskOutcome::Status(0));
    }

    let response = http::get_with_retry(&state.client, &url).await?;
    let body = response.text().await.map_err(AppError::transport)?;
    let _: AssetIndex = serde_json::from_str(&body).map_err(|e| AppError::schema(e.to_string()))?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&dest, &body).await?;
    Ok(TaskOutcome::Status(0))
}

// ---- Stage 4: asset fan-out ----------------------------------------------

async fn assets_fanout(state: &Arc<InstallerState>) -> anyhow::Result<TaskOutcome> {
    let asset_index_id = {
        let guard = state.version_metadata.lock().await;
        guard.as_ref().ok_or_else(|| AppError::schema("version metadata not loaded"))?.asset_index.id.clone()
    };

    let index_path = paths::asset_index_path(&state.settings.working_path, &asset_index_id);
    let body = tokio::fs::read_to_string(&index_path).await?;
    let index: AssetIndex = serde_json::from_str(&body).map_err(|e| AppError::schema(e.to_string()))?;

    let total = index.objects.len();
    state.asset_counters.add_total(total);
    progress::spawn_progress_task(state.clone(), "asset download progress", total, |s| &s.asset_counters);

    let mut submitted = 0usize;
    for (object_name, object) in index.objects.iter() {
        if state.is_aborted().await {
            break;
        }

        let hash = &object.hash;
        let object_filename = Path::new(object_name).file_name().unwrap_or_default().to_string_lossy().to_string();

        let candidates = [
            (paths::asset_object_path(&state.settings.working_path, hash).parent().unwrap().to_path_buf(), hash.clone()),
            (paths::asset_virtual_legacy_path(&state.settings.working_path, object_name).parent().unwrap().to_path_buf(), object_filename.clone()),
            (paths::asset_virtual_pre16_path(&state.settings.working_path, object_name).parent().unwrap().to_path_buf(), object_filename.clone()),
        ];

        let mut pending = Vec::new();
        for (dest_dir, filename) in candidates {
            if dest_dir.join(&filename).exists() {
                continue;
            }
            if !state.dedup_destination(&dest_dir, &filename).await {
                continue;
            }
            pending.push((dest_dir, filename));
        }
        if pending.is_empty() {
            continue;
        }

        let url = format!("{}/{}/{}", state.mirror.assets_base(), &hash[..2], hash);
        let args = RegularDownloadArgs {
            url,
            destinations: pending,
            expected_hash: hash.clone(),
            kind: LeafKind::Asset,
            retry_count: 0,
        };
        submit_leaf(state, format!("asset-downloading-worker-{submitted}"), args).await?;
        submitted += 1;

        if submitted % granite_core::constants::LEAF_BATCH_SIZE == 0 {
            crate::pipeline::wait_for_batch_completion(&state.asset_counters, submitted as f64 * granite_core::constants::BATCH_COMPLETION_FRACTION)
                .await;
        }
    }

    Ok(TaskOutcome::Status(0))
}

// ---- Stage 5: library fan-out --------------------------------------------

async fn libraries_fanout(state: &Arc<InstallerState>) -> anyhow::Result<TaskOutcome> {
    let libraries = {
        let guard = state.version_metadata.lock().await;
        guard.as_ref().ok_or_else(|| AppError::schema("version metadata not loaded"))?.libraries.clone()
    };

    let total: usize = libraries
        .iter()
        .map(|lib| lib.downloads.classifiers.as_ref().map(|c| c.len()).unwrap_or(1))
        .sum();
    state.library_counters.add_total(total);
    progress::spawn_progress_task(state.clone(), "library download progress", total, |s| &s.library_counters);

    let mut submitted = 0usize;
    for library in &libraries {
        if state.is_aborted().await {
            break;
        }

        if let Some(classifiers) = &library.downloads.classifiers {
            for artifact in classifiers.values() {
                let dest = paths::library_path(&state.settings.working_path, &artifact.path);
                if dest.exists() {
                    continue;
                }
                let filename = Path::new(&artifact.path).file_name().unwrap_or_default().to_string_lossy().to_string();
                let args = RegularDownloadArgs {
                    url: state.mirror.rewrite_url(&artifact.url),
                    destinations: vec![(dest.parent().unwrap().to_path_buf(), filename)],
                    expected_hash: artifact.sha1.clone(),
                    kind: LeafKind::Library,
                    retry_count: 0,
                };
                submit_leaf(state, format!("library-downloading-worker-{submitted}"), args).await?;
                submitted += 1;
            }
        } else if let Some(artifact) = &library.downloads.artifact {
            let dest = paths::library_path(&state.settings.working_path, &artifact.path);
            if !dest.exists() {
                let filename = Path::new(&artifact.path).file_name().unwrap_or_default().to_string_lossy().to_string();
                let args = RegularDownloadArgs {
                    url: state.mirror.rewrite_url(&artifact.url),
                    destinations: vec![(dest.parent().unwrap().to_path_buf(), filename)],
                    expected_hash: artifact.sha1.clone(),
                    kind: LeafKind::Library,
                    retry_count: 0,
                };
                submit_leaf(state, format!("library-downloading-worker-{submitted}"), args).await?;
                submitted += 1;
            }
        }

        if submitted > 0 && submitted % granite_core::constants::LEAF_BATCH_SIZE == 0 {
            crate::pipeline::wait_for_batch_completion(
                &state.library_counters,
                submitted as f64 * granite_core::constants::BATCH_COMPLETION_FRACTION,
            )
            .await;
        }
    }

    Ok(TaskOutcome::Status(0))
}

async fn submit_leaf(state: &Arc<InstallerState>, id: String, args: RegularDownloadArgs) -> anyhow::Result<()> {
    let task = InstallTask::RegularDownload { state: state.clone(), args: args.clone() };
    let callback = Arc::new(LeafCallback { state: state.clone(), args });
    state
        .engine
        .submit(
            TaskSpec::new(id, "leaf download", 11, task)
                .with_max_retries(LEAF_MAX_RETRIES)
                .with_callback(callback),
        )
        .await?;
    Ok(())
}

// ---- Leaf download --------------------------------------------------------

async fn regular_download(state: &Arc<InstallerState>, args: &RegularDownloadArgs) -> anyhow::Result<TaskOutcome> {
    let response = http::get_with_retry(&state.client, &args.url).await?;
    let bytes = response.bytes().await.map_err(AppError::transport)?;

    for (dest_dir, filename) in &args.destinations {
        tokio::fs::create_dir_all(dest_dir).await?;
        tokio::fs::write(dest_dir.join(filename), &bytes).await?;
    }

    Ok(TaskOutcome::Flag(true))
}
