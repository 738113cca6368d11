//! Streaming downloads with SHA256 hashing.
//!
//! Bytes are hashed as they are written, so verifying an archive never
//! needs a second pass over the file.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use mvi_schema::Sha256Digest;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::Reporter;

/// Initial connection timeout for every request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest gap between two body chunks before a download is abandoned.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);

/// Failure while fetching a file.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Connection or protocol failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the destination file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status returned.
        status: StatusCode,
    },

    /// Neither headers nor body bytes arrived within the idle window.
    #[error("No data received for {} seconds from {url}", .idle.as_secs())]
    Stalled {
        /// Requested URL.
        url: String,
        /// How long the connection stayed silent.
        idle: Duration,
    },
}

/// HTTP client shared by every request of one installer run.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(crate::USER_AGENT)
        .build()
}

/// Download `url` into `dest`, returning the SHA256 of the bytes written.
///
/// `label` is the name progress is reported under. Waiting for the response
/// headers and for each body chunk is bounded by [`INACTIVITY_TIMEOUT`].
///
/// # Errors
///
/// Returns an error on connection failure, a non-success status, a stalled
/// transfer, or when `dest` cannot be written.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn Reporter,
) -> Result<Sha256Digest, DownloadError> {
    download_with_idle(client, url, dest, label, reporter, INACTIVITY_TIMEOUT).await
}

async fn download_with_idle(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn Reporter,
    idle: Duration,
) -> Result<Sha256Digest, DownloadError> {
    tracing::debug!("Downloading {url} -> {}", dest.display());

    let stalled = || DownloadError::Stalled {
        url: url.to_string(),
        idle,
    };

    let response = timeout(idle, client.get(url).send())
        .await
        .map_err(|_| stalled())??;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status,
        });
    }

    let total_size = response.content_length();
    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    reporter.downloading(label, 0, total_size);

    loop {
        let chunk = match timeout(idle, stream.next()).await {
            Ok(Some(chunk)) => chunk?,
            Ok(None) => break,
            Err(_) => return Err(stalled()),
        };

        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        reporter.downloading(label, downloaded, total_size);
    }

    file.flush().await?;
    let digest = Sha256Digest::from_hasher(hasher);
    tracing::debug!("Downloaded {downloaded} bytes, sha256 {digest}");
    Ok(digest)
}
