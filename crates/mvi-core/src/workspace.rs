//! Run-scoped working directory.
//!
//! Holds the downloaded archive, the checksum manifest, and the extracted
//! tree for exactly one installer run. The directory is removed when the
//! value is dropped, on success, on error, and while unwinding.

use std::io;
use std::path::{Path, PathBuf};

const PREFIX: &str = "msgvault-install-";

/// Temporary directory owned by one installer run.
#[derive(Debug)]
pub struct RunWorkspace {
    temp_dir: tempfile::TempDir,
}

impl RunWorkspace {
    /// Create a fresh workspace under the system temp directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        Ok(Self { temp_dir })
    }

    /// Create a fresh workspace under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` or the directory cannot be created.
    pub fn new_in(parent: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let temp_dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(parent)?;
        Ok(Self { temp_dir })
    }

    /// Access the root path
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a downloaded file named `name`.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Directory archives are unpacked into.
    pub fn extract_dir(&self) -> PathBuf {
        self.path().join("extract")
    }

    /// Remove the workspace now, surfacing any removal error.
    ///
    /// Dropping the workspace also removes it but swallows errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be removed.
    pub fn close(self) -> io::Result<()> {
        self.temp_dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let root = {
            let ws = RunWorkspace::new_in(parent.path()).unwrap();
            std::fs::write(ws.file("archive.tar.gz"), b"data").unwrap();
            std::fs::create_dir_all(ws.extract_dir().join("nested")).unwrap();
            ws.path().to_path_buf()
        };
        assert!(!root.exists());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn removed_when_an_error_propagates() {
        fn failing_step(parent: &Path) -> io::Result<PathBuf> {
            let ws = RunWorkspace::new_in(parent)?;
            std::fs::write(ws.file("checksums.txt"), b"")?;
            Err(io::Error::other(format!("boom in {}", ws.path().display())))
        }

        let parent = tempfile::tempdir().unwrap();
        assert!(failing_step(parent.path()).is_err());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn close_removes_and_reports() {
        let parent = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::new_in(parent.path()).unwrap();
        let root = ws.path().to_path_buf();
        assert!(root.file_name().unwrap().to_string_lossy().starts_with(PREFIX));
        ws.close().unwrap();
        assert!(!root.exists());
    }
}
