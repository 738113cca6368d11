//! Archive extraction module
//!
//! Unpacks release archives and finds the executable inside them.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use mvi_schema::ArchiveFormat;
use thiserror::Error;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Failure while unpacking or searching an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing its contents failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive is malformed or holds an entry escaping the destination.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Extract `archive_path` into `dest_dir`.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or an entry is unsafe.
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
) -> Result<(), ExtractError> {
    tracing::debug!(
        "Extracting {} into {}",
        archive_path.display(),
        dest_dir.display()
    );
    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
    }
}

/// Extract a tar.gz archive to a destination directory
///
/// # Errors
///
/// Returns an error on a corrupt stream or an entry outside `dest_dir`.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    fs::create_dir_all(dest_dir)?;
    let mut archive = tar::Archive::new(gz_decoder);

    for entry in archive.entries()? {
        let mut entry = entry?;
        // `unpack_in` refuses entries that would land outside `dest_dir`.
        if !entry.unpack_in(dest_dir)? {
            let path = entry.path()?.display().to_string();
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {path}"
            )));
        }
    }

    Ok(())
}

/// Extract a zip archive
///
/// # Errors
///
/// Returns an error on a corrupt archive or an entry outside `dest_dir`.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        let absolute_path = dest_dir.join(&relative_path);
        if file.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }

        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}

/// Find the first regular file named `file_name` under `root`.
///
/// Release archives may wrap the executable in a top-level directory, so the
/// whole tree is searched. Traversal is sorted by name to keep "first"
/// deterministic.
///
/// # Errors
///
/// Returns an error if part of the tree cannot be read, rather than
/// reporting the binary as absent.
pub fn locate_binary(root: &Path, file_name: &str) -> Result<Option<PathBuf>, ExtractError> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name() == file_name {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}
