//! Chunked main-archive download: planning, per-chunk fetch, and reassembly.

use std::io::Write;
use std::path::Path;

use granite_core::AppError;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;

use crate::paths::chunk_file_path;

/// Inclusive-exclusive `[start, end)` byte ranges covering `total_size` in
/// `chunk_size`-byte pieces. The last range may be smaller.
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    if total_size == 0 {
        return Vec::new();
    }
    let mut ranges = Vec::new();
    let mut start = 0u64;
    while start < total_size {
        let end = (start + chunk_size).min(total_size);
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Probe a URL for range support. Returns `Some(content_length)` when the
/// server advertises `Accept-Ranges: bytes`; `None` means the caller must
/// fall back to a single regular GET.
pub async fn probe_range_support(client: &Client, url: &str) -> anyhow::Result<Option<u64>> {
    let response = crate::http::head_with_retry(client, url).await?;
    let accepts_ranges = response
        .headers()
        .get(reqwest::header::ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("bytes"))
        .unwrap_or(false);
    if !accepts_ranges {
        return Ok(None);
    }
    let content_length = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    Ok(content_length)
}

/// Fetch byte range `[start, end)` of `url` and write it to `dest`.
pub async fn download_chunk(client: &Client, url: &str, start: u64, end: u64, dest: &Path) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let range_header = format!("bytes={start}-{}", end.saturating_sub(1));
    let response = client
        .get(url)
        .header(reqwest::header::RANGE, range_header)
        .send()
        .await?;
    let bytes = response.bytes().await?;
    let mut file = tokio::fs::File::create(dest).await?;
    file.write_all(&bytes).await?;
    Ok(())
}

/// Concatenate `num_chunks` chunk files from `temp_dir` in ascending index
/// order, verify the result's SHA-1 against `expected_sha1`, write it to
/// `dest`, and only on a successful match remove `temp_dir`. On mismatch the
/// chunk directory is left in place and an `AppError::Integrity` is
/// returned.
pub fn reassemble_chunks(temp_dir: &Path, num_chunks: usize, dest: &Path, expected_sha1: &str) -> Result<(), AppError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut hasher = Sha1::new();
    let mut out = std::fs::File::create(dest)?;
    for index in 0..num_chunks {
        let chunk_path = chunk_file_path(temp_dir, index);
        let bytes = std::fs::read(&chunk_path)?;
        hasher.update(&bytes);
        out.write_all(&bytes)?;
    }
    out.flush()?;

    let actual = hex::encode(hasher.finalize());
    if actual != expected_sha1 {
        return Err(AppError::Integrity { expected: expected_sha1.to_string(), actual });
    }

    std::fs::remove_dir_all(temp_dir)?;
    Ok(())
}

/// Presence-plus-matching-hash check used for the main archive and the
/// asset index, the two artifacts worth the cost of hashing on every run.
pub async fn file_matches_sha1(path: &Path, expected_sha1: &str) -> anyhow::Result<bool> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()) == expected_sha1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plan_chunks_covers_exact_multiple() {
        let ranges = plan_chunks(8 * 1024, 4 * 1024);
        assert_eq!(ranges, vec![(0, 4096), (4096, 8192)]);
    }

    #[test]
    fn plan_chunks_leaves_a_smaller_last_chunk() {
        let ranges = plan_chunks(10, 4);
        assert_eq!(ranges, vec![(0, 4), (4, 8), (8, 10)]);
    }

    #[test]
    fn plan_chunks_empty_for_zero_size() {
        assert!(plan_chunks(0, 4096).is_empty());
    }

    #[test]
    fn reassembly_verifies_hash_and_cleans_up_on_success() {
        let dir = tempdir().unwrap();
        let temp_dir = dir.path().join("downloads").join("ab").join("abcdef");
        std::fs::create_dir_all(&temp_dir).unwrap();
        std::fs::write(chunk_file_path(&temp_dir, 0), b"hello, ").unwrap();
        std::fs::write(chunk_file_path(&temp_dir, 1), b"world!").unwrap();

        let mut hasher = Sha1::new();
        hasher.update(b"hello, world!");
        let expected = hex::encode(hasher.finalize());

        let dest = dir.path().join("out.bin");
        reassemble_chunks(&temp_dir, 2, &dest, &expected).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"hello, world!");
        assert!(!temp_dir.exists());
    }

    #[test]
    fn reassembly_on_hash_mismatch_keeps_chunk_dir_and_errors() {
        let dir = tempdir().unwrap();
        let temp_dir = dir.path().join("downloads").join("ab").join("abcdef");
        std::fs::create_dir_all(&temp_dir).unwrap();
        std::fs::write(chunk_file_path(&temp_dir, 0), b"corrupted").unwrap();

        let dest = dir.path().join("out.bin");
        let result = reassemble_chunks(&temp_dir, 1, &dest, "0000000000000000000000000000000000000000");

        assert!(matches!(result, Err(AppError::Integrity { .. })));
        assert!(temp_dir.exists());
    }
}
