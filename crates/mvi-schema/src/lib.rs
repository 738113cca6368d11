//! Shared types for the msgvault installer.
//!
//! Everything here is pure data: no network, no filesystem side effects.
//! The closed [`Platform`] variant, the release naming rules, and the
//! [`Sha256Digest`] newtype are consumed by `mvi-core` and `mvi-cli`.

pub mod hash;
pub mod platform;
pub mod release;

// Re-exports
pub use hash::*;
pub use platform::*;
pub use release::*;

/// Name of the product executable, without any platform suffix.
pub const BINARY_NAME: &str = "msgvault";

/// GitHub `owner/name` of the repository that publishes releases.
pub const REPOSITORY: &str = "wesm/msgvault";

/// Well-known name of the checksum manifest attached to every release.
pub const CHECKSUMS_FILE: &str = "checksums.txt";
