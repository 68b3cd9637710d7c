//! HTTP client wrapper for streaming one asset attempt to a temporary file.
//!
//! This module provides the `HttpClient` struct which performs a single
//! streamed GET with timeout configuration, size accounting and cleanup of
//! the temporary file on every failure path.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// HTTP client for streaming release assets to disk.
///
/// Created once per run and shared by every acquisition, taking advantage of
/// connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    show_progress: bool,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts and no progress bars.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Request timeout: 5 minutes (for large files)
    /// - No content decoding: bytes land on disk exactly as served
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, request_timeout_secs: u64) -> Self {
        let client = build_client(connect_timeout_secs, request_timeout_secs)
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            show_progress: false,
        }
    }

    /// Enables or disables terminal progress bars for transfers of known size.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Streams `url` into `temp_path`, returning the number of bytes written.
    ///
    /// The effective target size is `expected_size` when non-zero, else the
    /// response's declared `Content-Length` when positive, else unknown.
    /// Only a caller-supplied `expected_size` is enforced.
    ///
    /// The temporary file is created only once the response status is
    /// successful, and is removed before any error is returned, so a failed
    /// attempt never leaves it behind.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing to disk fails
    /// - The byte count differs from a non-zero `expected_size` (`SizeMismatch`)
    /// - The data cannot be flushed to storage (`Flush`)
    #[instrument(skip(self, temp_path), fields(url = %url, expected_size))]
    pub async fn fetch_to_path(
        &self,
        url: &str,
        temp_path: &Path,
        expected_size: u64,
    ) -> Result<u64, DownloadError> {
        debug!("starting transfer");

        Url::parse(url).map_err(|_| DownloadError::invalid_url(url.to_string()))?;

        let response = self.send_request(url).await?;

        let target_size = effective_size(expected_size, declared_length(&response));
        if expected_size == 0 {
            if let Some(size) = target_size {
                debug!(size, "using size declared by response");
            } else {
                debug!("size unknown; progress reporting disabled");
            }
        }

        let file = File::create(temp_path)
            .await
            .map_err(|e| DownloadError::io(temp_path.to_path_buf(), e))?;

        let progress = target_size
            .filter(|_| self.show_progress)
            .map(new_progress_bar);

        let result = stream_to_file(file, response, url, temp_path, progress.as_ref()).await;
        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }

        let result = result.and_then(|written| {
            if expected_size > 0 && written != expected_size {
                Err(DownloadError::size_mismatch(url, expected_size, written))
            } else {
                Ok(written)
            }
        });

        match result {
            Ok(written) => {
                info!(bytes = written, "transfer complete");
                Ok(written)
            }
            Err(error) => {
                debug!(path = %temp_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(temp_path).await;
                Err(error)
            }
        }
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        if !response.status().is_success() {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Streams response body to file, flushing and syncing it before returning
/// the number of bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    progress: Option<&ProgressBar>,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
        if let Some(bar) = progress {
            bar.set_position(bytes_written);
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| DownloadError::flush(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

fn build_client(
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(request_timeout_secs))
        .user_agent(user_agent::default_user_agent())
        .build()
}

fn declared_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Picks the size used for progress reporting.
fn effective_size(expected_size: u64, declared: Option<u64>) -> Option<u64> {
    if expected_size > 0 {
        Some(expected_size)
    } else {
        declared.filter(|size| *size > 0)
    }
}

fn new_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_effective_size_prefers_expected() {
        assert_eq!(effective_size(1000, Some(5)), Some(1000));
        assert_eq!(effective_size(0, Some(5)), Some(5));
        assert_eq!(effective_size(0, Some(0)), None);
        assert_eq!(effective_size(0, None), None);
    }

    #[tokio::test]
    async fn test_fetch_to_path_success() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/widget.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"widget bytes"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/widget.tar.gz", mock_server.uri());
        let temp = temp_dir.path().join("widget.tar.gz.tmp");

        let written = client.fetch_to_path(&url, &temp, 12).await.unwrap();

        assert_eq!(written, 12);
        assert_eq!(std::fs::read(&temp).unwrap(), b"widget bytes");
    }

    #[tokio::test]
    async fn test_fetch_to_path_unknown_size_accepts_any_length() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/unsized"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().with_progress(false);
        let url = format!("{}/unsized", mock_server.uri());
        let temp = temp_dir.path().join("unsized.tmp");

        assert_eq!(client.fetch_to_path(&url, &temp, 0).await.unwrap(), 4096);
    }

    #[tokio::test]
    async fn test_fetch_to_path_status_error_leaves_no_temp() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/missing", mock_server.uri());
        let temp = temp_dir.path().join("missing.tmp");

        let result = client.fetch_to_path(&url, &temp, 10).await;

        match result {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
        assert!(
            dir_is_empty(temp_dir.path()),
            "No partial files should be left after error"
        );
    }

    #[tokio::test]
    async fn test_fetch_to_path_short_body_is_size_mismatch() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/short"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 999]))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/short", mock_server.uri());
        let temp = temp_dir.path().join("short.tmp");

        let result = client.fetch_to_path(&url, &temp, 1000).await;

        match result {
            Err(DownloadError::SizeMismatch {
                expected_bytes,
                actual_bytes,
                ..
            }) => {
                assert_eq!(expected_bytes, 1000);
                assert_eq!(actual_bytes, 999);
            }
            other => panic!("Expected SizeMismatch, got: {other:?}"),
        }
        assert!(dir_is_empty(temp_dir.path()), "temp file must be removed");
    }

    #[tokio::test]
    async fn test_fetch_to_path_connection_refused_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        // Reserve a port, then release it so nothing is listening.
        let port = {
            let Ok(listener) = std::net::TcpListener::bind("127.0.0.1:0") else {
                return;
            };
            listener.local_addr().unwrap().port()
        };

        let client = HttpClient::new_with_timeouts(2, 5);
        let url = format!("http://127.0.0.1:{port}/asset");
        let temp = temp_dir.path().join("asset.tmp");

        let result = client.fetch_to_path(&url, &temp, 10).await;

        assert!(
            matches!(
                result,
                Err(DownloadError::Network { .. } | DownloadError::Timeout { .. })
            ),
            "Expected network error, got: {result:?}"
        );
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_to_path_timeout_cleans_up() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"data")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new_with_timeouts(30, 1);
        let url = format!("{}/slow", mock_server.uri());
        let temp = temp_dir.path().join("slow.tmp");

        let result = client.fetch_to_path(&url, &temp, 0).await;
        assert!(result.is_err(), "expected timeout or network error");
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_to_path_invalid_url() {
        let temp_dir = TempDir::new().unwrap();
        let client = HttpClient::new();
        let result = client
            .fetch_to_path("not-a-valid-url", &temp_dir.path().join("x.tmp"), 0)
            .await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_to_path_sends_tool_user_agent() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/ua"))
            .and(header_regex("user-agent", "^release-mirror/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/ua", mock_server.uri());
        let result = client
            .fetch_to_path(&url, &temp_dir.path().join("ua.tmp"), 2)
            .await;
        assert!(result.is_ok(), "Client must send User-Agent; got: {result:?}");
    }
}
