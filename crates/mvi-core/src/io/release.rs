//! Release index lookup and artifact URLs.

use std::time::Duration;

use mvi_schema::{Platform, ReleaseTag, ReleaseTagError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure to resolve the latest release.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Connection, timeout or body decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The index answered with a non-success status.
    #[error("Release index returned HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status returned.
        status: StatusCode,
    },

    /// The published tag is not usable.
    #[error(transparent)]
    Tag(#[from] ReleaseTagError),
}

/// Where releases are looked up and downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    /// Base of the GitHub-compatible REST API.
    pub api_base: String,
    /// Base that `{tag}/{file}` is appended to for downloads.
    pub download_base: String,
    /// `owner/name` of the publishing repository.
    pub repository: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self::github(mvi_schema::REPOSITORY)
    }
}

impl ReleaseSource {
    /// Releases published on github.com for `repository`.
    pub fn github(repository: &str) -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            download_base: format!("https://github.com/{repository}/releases/download"),
            repository: repository.to_string(),
        }
    }

    /// Endpoint describing the latest published release.
    pub fn latest_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.repository
        )
    }

    /// Download URL of `file` attached to `tag`.
    pub fn asset_url(&self, tag: &ReleaseTag, file: &str) -> String {
        format!("{}/{tag}/{file}", self.download_base.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// Query the release index for the latest published tag.
///
/// # Errors
///
/// Returns an error if the request fails, the index answers with a
/// non-success status, or the response carries no usable `tag_name`.
pub async fn fetch_latest_tag(
    client: &Client,
    source: &ReleaseSource,
) -> Result<ReleaseTag, ReleaseError> {
    let url = source.latest_url();
    tracing::debug!("Querying latest release: {url}");

    let response = client
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .timeout(API_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ReleaseError::Status { url, status });
    }

    let release: LatestRelease = response.json().await?;
    let tag = ReleaseTag::new(release.tag_name)?;
    tracing::debug!("Latest release is {tag}");
    Ok(tag)
}

/// Everything needed to fetch one platform's artifact for a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    /// Release being installed.
    pub tag: ReleaseTag,
    /// Target the archive was built for.
    pub platform: Platform,
    /// File name of the archive, as listed in `checksums.txt`.
    pub archive_name: String,
    /// Where the archive is downloaded from.
    pub archive_url: String,
    /// Where the checksum manifest is downloaded from.
    pub checksums_url: String,
}

impl ReleaseDescriptor {
    /// Derive the artifact names and URLs for `tag` on `platform`.
    pub fn new(source: &ReleaseSource, tag: ReleaseTag, platform: Platform) -> Self {
        let archive_name = mvi_schema::archive_name(&tag, &platform);
        let archive_url = source.asset_url(&tag, &archive_name);
        let checksums_url = source.asset_url(&tag, mvi_schema::CHECKSUMS_FILE);
        Self {
            tag,
            platform,
            archive_name,
            archive_url,
            checksums_url,
        }
    }
}
