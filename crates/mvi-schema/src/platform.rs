//! Operating system and CPU architecture detection.
//!
//! Release artifacts exist for a fixed set of OS × architecture pairs.
//! Anything outside that set is rejected up front with a typed error,
//! before the installer touches the network.
//!
//! # Example
//!
//! ```
//! use mvi_schema::{Arch, Os, Platform};
//!
//! let platform = Platform::from_parts("linux", "x86_64").unwrap();
//! assert_eq!(platform, Platform::new(Os::Linux, Arch::Amd64));
//! assert_eq!(platform.to_string(), "linux/amd64");
//! ```

use thiserror::Error;

/// Errors raised while resolving the current platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The operating system has no published release.
    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    /// The architecture is unknown for this operating system.
    #[error("Unsupported architecture '{arch}' on {os}")]
    UnsupportedArch {
        /// Release identifier of the detected OS.
        os: &'static str,
        /// Architecture name as reported by the system.
        arch: String,
    },

    /// A 32-bit architecture was detected where only 64-bit builds are published.
    #[error("msgvault requires a 64-bit system; detected 32-bit architecture '{arch}' on {os}")]
    Requires64Bit {
        /// Release identifier of the detected OS.
        os: &'static str,
        /// Architecture name as reported by the system.
        arch: String,
    },
}

/// Operating system family with a published release.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux (any distribution).
    Linux,
    /// macOS.
    Darwin,
    /// Windows.
    Windows,
}

impl Os {
    /// Identifier used in release archive names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Archive format the release pipeline produces for this OS.
    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            Self::Linux | Self::Darwin => ArchiveFormat::TarGz,
            Self::Windows => ArchiveFormat::Zip,
        }
    }

    /// Separator used by the `PATH` variable.
    pub fn path_separator(&self) -> char {
        match self {
            Self::Windows => ';',
            Self::Linux | Self::Darwin => ':',
        }
    }

    /// Whether the platform tracks an executable permission bit.
    pub fn is_posix(&self) -> bool {
        !matches!(self, Self::Windows)
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Os {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::Darwin),
            "windows" => Ok(Self::Windows),
            _ => Err(PlatformError::UnsupportedOs(s.to_string())),
        }
    }
}

/// 64-bit CPU architecture with a published release.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// `x86_64`.
    Amd64,
    /// `aarch64` (Apple Silicon, ARM servers).
    Arm64,
}

impl Arch {
    /// Identifier used in release archive names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Names that identify a 32-bit CPU.
const THIRTY_TWO_BIT: &[&str] = &["x86", "i386", "i486", "i586", "i686", "arm", "armv6l", "armv7", "armv7l"];

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball.
    TarGz,
    /// Zip archive.
    Zip,
}

impl ArchiveFormat {
    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

/// A resolved OS × architecture pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Build a platform from already-resolved parts.
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the OS or architecture has no release.
    pub fn detect() -> Result<Self, PlatformError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolve a platform from OS and architecture names.
    ///
    /// Accepts both Rust (`macos`, `x86_64`, `aarch64`) and release
    /// (`darwin`, `amd64`, `arm64`) spellings.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Requires64Bit`] for known 32-bit names and
    /// [`PlatformError::UnsupportedOs`] / [`PlatformError::UnsupportedArch`]
    /// for anything unrecognized.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, PlatformError> {
        let os: Os = os.parse()?;
        let lowered = arch.to_lowercase();

        let arch = match lowered.as_str() {
            "x86_64" | "amd64" | "x64" => Arch::Amd64,
            "aarch64" | "arm64" => Arch::Arm64,
            other if THIRTY_TWO_BIT.contains(&other) => {
                return Err(PlatformError::Requires64Bit {
                    os: os.as_str(),
                    arch: arch.to_string(),
                });
            }
            _ => {
                return Err(PlatformError::UnsupportedArch {
                    os: os.as_str(),
                    arch: arch.to_string(),
                });
            }
        };

        Ok(Self { os, arch })
    }

    /// File name of the product executable on this platform.
    pub fn binary_file_name(&self) -> String {
        match self.os {
            Os::Windows => format!("{}.exe", crate::BINARY_NAME),
            Os::Linux | Os::Darwin => crate::BINARY_NAME.to_string(),
        }
    }

    /// Archive format published for this platform.
    pub fn archive_format(&self) -> ArchiveFormat {
        self.os.archive_format()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
