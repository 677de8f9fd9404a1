//! Shared HTTP client construction and transport-level retry.

use std::time::Duration;

use granite_core::constants::{
    CHUNK_REQUEST_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, RETRY_STATUS_CODES, USER_AGENT,
};
use granite_core::AppError;
use reqwest::{Client, Response};
use tracing::warn;

const TRANSPORT_RETRY_ATTEMPTS: u32 = 4;

/// One client per installer instance. Connection pool sized to the worker
/// count. TLS verification is disabled; content that matters is
/// hash-guarded separately.
pub fn build_client(max_workers: usize) -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(max_workers)
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

/// A client tuned for chunk range-GETs, which run longer than the bulk of
/// requests and should not share the shorter default timeout.
pub fn build_chunk_client(max_workers: usize) -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(max_workers)
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(CHUNK_REQUEST_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

fn backoff_for(attempt: u32) -> Duration {
    Duration::from_secs_f64(0.5 * 2f64.powi(attempt as i32))
}

/// GET `url`, retrying with exponential backoff on [`RETRY_STATUS_CODES`].
pub async fn get_with_retry(client: &Client, url: &str) -> anyhow::Result<Response> {
    request_with_retry(client, reqwest::Method::GET, url).await
}

/// HEAD `url` with the same retry policy (used to probe `Content-Length`
/// and `Accept-Ranges` before a chunked download).
pub async fn head_with_retry(client: &Client, url: &str) -> anyhow::Result<Response> {
    request_with_retry(client, reqwest::Method::HEAD, url).await
}

async fn request_with_retry(client: &Client, method: reqwest::Method, url: &str) -> anyhow::Result<Response> {
    let mut attempt = 0u32;
    loop {
        let result = client.request(method.clone(), url).send().await;
        match result {
            Ok(response) if !RETRY_STATUS_CODES.contains(&response.status().as_u16()) => {
                return Ok(response);
            }
            Ok(response) if attempt >= TRANSPORT_RETRY_ATTEMPTS => {
                return Err(AppError::transport(format!(
                    "{method} {url} exhausted retries with status {}",
                    response.status()
                ))
                .into());
            }
            Ok(response) => {
                warn!(%url, status = %response.status(), attempt, "retryable status, backing off");
                attempt += 1;
                tokio::time::sleep(backoff_for(attempt)).await;
            }
            Err(err) if attempt >= TRANSPORT_RETRY_ATTEMPTS => {
                return Err(AppError::transport(err.to_string()).into());
            }
            Err(err) => {
                warn!(%url, error = %err, attempt, "transport error, backing off");
                attempt += 1;
                tokio::time::sleep(backoff_for(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `request_with_retry` backs off on a retryable status and returns the
    /// eventual success response, against a real (local) server rather than
    /// asserting on the backoff math directly. Paused time lets the backoff
    /// sleeps fast-forward instead of the test actually waiting out the
    /// exponential delay.
    #[tokio::test(start_paused = true)]
    async fn retries_a_retryable_status_then_returns_success() {
        let mut server = mockito::Server::new_async().await;
        let failure = server.mock("GET", "/client.jar").with_status(503).expect(1).create_async().await;
        let success =
            server.mock("GET", "/client.jar").with_status(200).with_body("jar-bytes").expect(1).create_async().await;

        let client = build_client(4).unwrap();
        let url = format!("{}/client.jar", server.url());
        let response = get_with_retry(&client, &url).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.bytes().await.unwrap(), "jar-bytes".as_bytes());
        failure.assert_async().await;
        success.assert_async().await;
    }

    /// A non-retryable status (404) is returned immediately without
    /// consulting the backoff loop at all.
    #[tokio::test]
    async fn non_retryable_status_returns_immediately() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/missing.json").with_status(404).expect(1).create_async().await;

        let client = build_client(4).unwrap();
        let url = format!("{}/missing.json", server.url());
        let response = get_with_retry(&client, &url).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        mock.assert_async().await;
    }

    /// Exhausting every retry attempt on a persistently retryable status
    /// surfaces an `AppError::Transport`, not a panic or a hang.
    #[tokio::test(start_paused = true)]
    async fn exhausting_retries_on_persistent_failure_is_a_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/manifest.json")
            .with_status(500)
            .expect(TRANSPORT_RETRY_ATTEMPTS as usize + 1)
            .create_async()
            .await;

        let client = build_client(4).unwrap();
        let url = format!("{}/manifest.json", server.url());
        let result = get_with_retry(&client, &url).await;

        assert!(result.is_err());
        mock.assert_async().await;
    }
}
