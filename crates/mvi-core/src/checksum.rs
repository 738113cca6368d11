//! Checksum manifest parsing and archive verification.
//!
//! A manifest is the `sha256sum`-style listing published next to every
//! release:
//!
//! ```text
//! 3f1c...e0a2  msgvault_1.2.0_darwin_arm64.tar.gz
//! 9b77...41cd *msgvault_1.2.0_linux_amd64.tar.gz
//! ```
//!
//! Verification is fail-closed: a missing entry, more than one entry for the
//! same file, or a differing digest are all errors.

use std::io::Read;
use std::path::Path;

use mvi_schema::Sha256Digest;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Integrity failures. All of them abort the install.
#[derive(Error, Debug)]
pub enum ChecksumError {
    /// The manifest has no entry for the archive.
    #[error("No checksum entry for {filename} in manifest")]
    Missing {
        /// Normalized archive name that was looked up.
        filename: String,
    },

    /// The manifest lists the archive more than once.
    #[error("Checksum manifest lists {filename} {count} times; refusing to pick one")]
    Ambiguous {
        /// Normalized archive name that was looked up.
        filename: String,
        /// Number of matching entries.
        count: usize,
    },

    /// The archive's digest differs from the manifest.
    #[error("Checksum mismatch for {filename}: expected {expected}, got {actual}")]
    Mismatch {
        /// Normalized archive name.
        filename: String,
        /// Hash listed in the manifest.
        expected: String,
        /// Hash of the downloaded bytes.
        actual: String,
    },

    /// Reading a file to hash failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One `(hash, filename)` line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Hex digest as written in the manifest.
    pub hash: String,
    /// Filename with `*`, `./` and `.\` markers stripped.
    pub filename: String,
}

/// Parsed checksum manifest, in file order.
#[derive(Debug, Clone, Default)]
pub struct ChecksumManifest {
    entries: Vec<ChecksumEntry>,
}

impl ChecksumManifest {
    /// Parse manifest text.
    ///
    /// Blank lines and lines with fewer than two fields are skipped.
    /// Filenames are normalized with [`normalize_filename`].
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let hash = fields.next()?;
                let filename = fields.next()?;
                Some(ChecksumEntry {
                    hash: hash.to_string(),
                    filename: normalize_filename(filename).to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.entries
    }

    /// The expected hash for `filename`.
    ///
    /// # Errors
    ///
    /// [`ChecksumError::Missing`] when no entry matches and
    /// [`ChecksumError::Ambiguous`] when more than one does.
    pub fn expected_for(&self, filename: &str) -> Result<&str, ChecksumError> {
        let wanted = normalize_filename(filename);
        let mut matches = self.entries.iter().filter(|e| e.filename == wanted);

        match (matches.next(), matches.count()) {
            (None, _) => Err(ChecksumError::Missing {
                filename: wanted.to_string(),
            }),
            (Some(entry), 0) => Ok(&entry.hash),
            (Some(_), rest) => Err(ChecksumError::Ambiguous {
                filename: wanted.to_string(),
                count: rest + 1,
            }),
        }
    }
}

/// Strip `*` (binary mode), `./` and `.\` markers from a manifest filename.
///
/// Idempotent: normalizing an already-normalized name returns it unchanged.
pub fn normalize_filename(name: &str) -> &str {
    let mut name = name;
    loop {
        let stripped = name
            .strip_prefix('*')
            .or_else(|| name.strip_prefix("./"))
            .or_else(|| name.strip_prefix(".\\"));
        match stripped {
            Some(rest) => name = rest,
            None => return name,
        }
    }
}

/// Check `actual` against the manifest entry for `filename`.
///
/// # Errors
///
/// Propagates lookup errors from [`ChecksumManifest::expected_for`] and
/// returns [`ChecksumError::Mismatch`] with both values when they differ.
pub fn verify(
    manifest: &ChecksumManifest,
    filename: &str,
    actual: &Sha256Digest,
) -> Result<(), ChecksumError> {
    let expected = manifest.expected_for(filename)?;

    if expected.eq_ignore_ascii_case(actual.as_str()) {
        Ok(())
    } else {
        Err(ChecksumError::Mismatch {
            filename: normalize_filename(filename).to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// SHA-256 of a file on disk, read in fixed-size blocks.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<Sha256Digest, ChecksumError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }
    Ok(Sha256Digest::from_hasher(hasher))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHIVE: &str = "msgvault_1.2.0_linux_amd64.tar.gz";

    fn digest_of(data: &[u8]) -> Sha256Digest {
        Sha256Digest::compute(data)
    }

    #[test]
    fn binary_marker_is_stripped() {
        let hash = digest_of(b"archive");
        let manifest = ChecksumManifest::parse(&format!("{hash}  *{ARCHIVE}\n"));
        assert_eq!(manifest.expected_for(ARCHIVE).unwrap(), hash.as_str());
        verify(&manifest, ARCHIVE, &hash).unwrap();
    }

    #[test]
    fn relative_markers_are_stripped() {
        let text = format!(
            "{a}  ./{ARCHIVE}\n{b}  .\\msgvault_1.2.0_windows_amd64.zip\n",
            a = "a".repeat(64),
            b = "b".repeat(64)
        );
        let manifest = ChecksumManifest::parse(&text);
        let names: Vec<_> = manifest.entries().iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, [ARCHIVE, "msgvault_1.2.0_windows_amd64.zip"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["*x.tar.gz", "./x.tar.gz", ".\\x.tar.gz", "*./x.tar.gz", "x.tar.gz"] {
            let once = normalize_filename(raw);
            assert_eq!(normalize_filename(once), once);
            assert_eq!(once, "x.tar.gz");
        }
    }

    #[test]
    fn blank_and_short_lines_are_skipped() {
        let hash = digest_of(b"archive");
        let text = format!("\n   \nlonelyhash\n{hash}  {ARCHIVE}\n\n");
        let manifest = ChecksumManifest::parse(&text);
        assert_eq!(manifest.entries().len(), 1);
        verify(&manifest, ARCHIVE, &hash).unwrap();
    }

    #[test]
    fn missing_entry_names_the_file() {
        let manifest = ChecksumManifest::parse(&format!("{}  other.tar.gz\n", "c".repeat(64)));
        let err = verify(&manifest, ARCHIVE, &digest_of(b"x")).unwrap_err();
        assert!(matches!(err, ChecksumError::Missing { ref filename } if filename == ARCHIVE));
        assert!(err.to_string().contains(ARCHIVE));
    }

    #[test]
    fn duplicate_entries_are_ambiguous_even_if_hash_matches() {
        let hash = digest_of(b"archive");
        let text = format!("{hash}  {ARCHIVE}\n{hash}  *{ARCHIVE}\n");
        let err = verify(&ChecksumManifest::parse(&text), ARCHIVE, &hash).unwrap_err();
        assert!(matches!(err, ChecksumError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn comparison_ignores_case() {
        let hash = digest_of(b"archive");
        let text = format!("{}  {ARCHIVE}\n", hash.as_str().to_uppercase());
        verify(&ChecksumManifest::parse(&text), ARCHIVE, &hash).unwrap();
    }

    #[test]
    fn one_character_difference_is_a_mismatch() {
        let hash = digest_of(b"archive");
        let mut tampered = hash.as_str().to_string();
        let last = if tampered.ends_with('0') { "1" } else { "0" };
        tampered.replace_range(63.., last);

        let manifest = ChecksumManifest::parse(&format!("{tampered}  {ARCHIVE}\n"));
        match verify(&manifest, ARCHIVE, &hash).unwrap_err() {
            ChecksumError::Mismatch { expected, actual, .. } => {
                assert_eq!(expected, tampered);
                assert_eq!(actual, hash.as_str());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_hash_matches_buffer_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ARCHIVE);
        let data = vec![7u8; 20_000];
        std::fs::write(&path, &data).unwrap();
        assert_eq!(sha256_file(&path).unwrap(), digest_of(&data));
    }
}
