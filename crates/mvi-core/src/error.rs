//! Errors that abort an installer run.

use std::path::PathBuf;

use mvi_schema::PlatformError;
use thiserror::Error;

use crate::checksum::ChecksumError;
use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;
use crate::io::release::ReleaseError;
use crate::place::PlaceError;

/// Why an installer run stopped.
///
/// Each variant maps to one exit status via [`InstallError::exit_code`].
#[derive(Error, Debug)]
pub enum InstallError {
    /// This machine has no published release.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// No `--install-dir` and no platform default.
    #[error("Could not determine a default install directory; pass --install-dir")]
    NoInstallDir,

    /// The latest tag could not be looked up.
    #[error("Failed to resolve the latest release: {0}")]
    Release(#[from] ReleaseError),

    /// The archive download failed.
    #[error("Failed to download {name}: {source}")]
    Download {
        /// File being fetched.
        name: String,
        /// Underlying failure.
        #[source]
        source: DownloadError,
    },

    /// `checksums.txt` could not be fetched and verification was not skipped.
    #[error("Failed to download {name}: {source} (use --skip-checksum to install unverified)")]
    ChecksumsUnavailable {
        /// Manifest file name.
        name: String,
        /// Underlying failure.
        #[source]
        source: DownloadError,
    },

    /// The manifest rejected the archive.
    #[error("Integrity check failed: {0}")]
    Integrity(#[from] ChecksumError),

    /// The archive could not be unpacked or searched.
    #[error("Failed to extract {name}: {source}")]
    Extract {
        /// Archive file name.
        name: String,
        /// Underlying failure.
        #[source]
        source: ExtractError,
    },

    /// The archive holds no file with the executable's name.
    #[error("{name} not found in {archive}")]
    BinaryNotFound {
        /// Executable file name searched for.
        name: String,
        /// Archive file name.
        archive: String,
    },

    /// Writing the binary into the install directory failed.
    #[error(transparent)]
    Place(#[from] PlaceError),

    /// The run-scoped temp directory could not be created or removed.
    #[error("Failed to prepare working directory: {0}")]
    Workspace(#[source] std::io::Error),

    /// A local file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Ctrl-C arrived before the run finished.
    #[error("Interrupted")]
    Interrupted,
}

impl InstallError {
    /// Process exit status for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Platform(_) => 2,
            Self::Release(_) | Self::Download { .. } | Self::ChecksumsUnavailable { .. } => 3,
            Self::Integrity(_) => 4,
            Self::Extract { .. } | Self::BinaryNotFound { .. } => 5,
            Self::Place(_) | Self::NoInstallDir => 6,
            Self::Workspace(_) | Self::Io { .. } => 1,
            Self::Interrupted => 130,
        }
    }
}
