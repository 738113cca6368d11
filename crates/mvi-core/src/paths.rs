//! Platform default locations.

use dirs::{data_local_dir, home_dir};
use mvi_schema::Os;
use std::path::PathBuf;

/// Default install directory for `os`, or None if the user's home cannot be resolved.
///
/// - Linux / macOS: `~/.local/bin`
/// - Windows: `%LOCALAPPDATA%\msgvault\bin`
pub fn default_install_dir(os: Os) -> Option<PathBuf> {
    match os {
        Os::Windows => data_local_dir().map(|d| d.join(mvi_schema::BINARY_NAME).join("bin")),
        Os::Linux | Os::Darwin => home_dir().map(|h| h.join(".local").join("bin")),
    }
}
