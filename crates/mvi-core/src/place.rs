//! Moving the verified executable into the install directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// A filesystem step of placement failed.
#[derive(Error, Debug)]
#[error("Failed to {action} {}: {source}", .path.display())]
pub struct PlaceError {
    /// What was being attempted, e.g. `"move binary to"`.
    pub action: &'static str,
    /// Path the step operated on.
    pub path: PathBuf,
    /// Underlying I/O error.
    #[source]
    pub source: io::Error,
}

impl PlaceError {
    fn new(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Move `source` to `install_dir/file_name`, replacing any existing file.
///
/// The install directory is created if needed. On Unix the result is made
/// executable (0755).
///
/// # Errors
///
/// Returns an error naming the step and path that failed.
pub fn place_binary(
    source: &Path,
    install_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, PlaceError> {
    fs::create_dir_all(install_dir)
        .map_err(|e| PlaceError::new("create install directory", install_dir, e))?;

    let dest = install_dir.join(file_name);
    if fs::symlink_metadata(&dest).is_ok() {
        tracing::debug!("Removing existing {}", dest.display());
        fs::remove_file(&dest).map_err(|e| PlaceError::new("remove existing", &dest, e))?;
    }

    move_file(source, &dest).map_err(|e| PlaceError::new("move binary to", &dest, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o755))
            .map_err(|e| PlaceError::new("set permissions on", &dest, e))?;
    }

    tracing::debug!("Placed binary at {}", dest.display());
    Ok(dest)
}

/// Rename, falling back to copy + remove when crossing filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!("rename failed ({e}); copying instead");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// Ad-hoc sign `path` so Gatekeeper accepts a locally placed binary.
///
/// Only meaningful on macOS. Callers treat failure as a warning.
///
/// # Errors
///
/// Returns an error if `codesign` cannot be run or exits unsuccessfully.
pub fn adhoc_codesign(path: &Path) -> io::Result<()> {
    let output = Command::new("codesign")
        .args(["--force", "--sign", "-"])
        .arg(path)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "codesign exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}
