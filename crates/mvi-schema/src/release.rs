//! Release tags and artifact naming.

use thiserror::Error;

use crate::Platform;

/// A tag that does not carry a usable version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Release tag '{0}' does not contain a version")]
pub struct ReleaseTagError(pub String);

/// A published release tag, such as `v1.2.0`.
///
/// The raw tag is kept for building download URLs; [`version`](Self::version)
/// gives the bare version used in archive names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// Validate and wrap a tag.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseTagError`] if the tag is empty or its version part
    /// does not start with a digit.
    pub fn new(tag: impl Into<String>) -> Result<Self, ReleaseTagError> {
        let tag = tag.into();
        let trimmed = tag.trim();
        let version = strip_marker(trimmed);

        if version.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ReleaseTagError(tag));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The tag exactly as published.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The version with any leading marker (`v`, `V`, ...) stripped.
    pub fn version(&self) -> &str {
        strip_marker(&self.0)
    }
}

impl std::fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ReleaseTag {
    type Err = ReleaseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn strip_marker(tag: &str) -> &str {
    tag.trim_start_matches(|c: char| !c.is_ascii_digit())
}

/// Archive file name for `tag` on `platform`.
///
/// Follows `{name}_{version}_{os}_{arch}.{ext}`.
///
/// ```
/// use mvi_schema::{archive_name, Platform, ReleaseTag};
///
/// let tag = ReleaseTag::new("v1.2.0").unwrap();
/// let platform = Platform::from_parts("linux", "amd64").unwrap();
/// assert_eq!(archive_name(&tag, &platform), "msgvault_1.2.0_linux_amd64.tar.gz");
/// ```
pub fn archive_name(tag: &ReleaseTag, platform: &Platform) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        crate::BINARY_NAME,
        tag.version(),
        platform.os,
        platform.arch,
        platform.archive_format().extension()
    )
}
