//! Application-wide constants.

/// Browser-like User-Agent attached to every outbound request, matching the
/// mirrors' expectations (some reject default Rust/Python user agents).
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

/// Default worker pool size, matching `GraniteSettings.max_workers`.
pub const DEFAULT_MAX_WORKERS: usize = 128;

/// Main-archive chunk size: 4 MiB.
pub const CHUNK_SIZE_BYTES: u64 = 4 * 1024 * 1024;

/// HTTP status codes the shared client retries with exponential backoff.
pub const RETRY_STATUS_CODES: &[u16] = &[403, 429, 500, 502, 503, 504, 567];

/// Socket-level timeout for regular (non-chunked) requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Socket-level timeout for chunk range-GETs, which can legitimately take
/// longer for a 4 MiB body over a slow mirror.
pub const CHUNK_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Number of leaf tasks submitted before the pipeline throttles.
pub const LEAF_BATCH_SIZE: usize = 100;

/// Fraction of the cumulative leaf target that must complete before a batch
/// throttle point releases early.
pub const BATCH_COMPLETION_FRACTION: f64 = 0.7;

/// Upper bound on how long a batch throttle point blocks.
pub const BATCH_WAIT_TIMEOUT_SECS: u64 = 30;

/// Poll interval while waiting for a batch throttle point to release.
pub const BATCH_POLL_INTERVAL_MS: u64 = 500;

/// Engine-level `max_retries` for a leaf download task (transient transport
/// failure budget, exhausted before the leaf callback resubmits fresh work).
pub const LEAF_MAX_RETRIES: i32 = 3;

/// Callback-level cap on how many times a leaf's terminal failure is
/// resubmitted as a fresh task before it is counted as an ultimate failure.
pub const LEAF_CALLBACK_MAX_RETRIES: u32 = 3;

/// Delay between successive chunk-task submissions for the main archive.
pub const CHUNK_SUBMIT_DELAY_MS: u64 = 50;

/// Adaptive progress-sampling sleep bounds.
pub const PROGRESS_INITIAL_SLEEP_SECS: f64 = 0.5;
pub const PROGRESS_MIN_SLEEP_SECS: f64 = 0.1;
pub const PROGRESS_MAX_SLEEP_SECS: f64 = 2.0;
pub const PROGRESS_ACCEL_THRESHOLD: u64 = 10;
