//! Hash command

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Print `<sha256>  <name>` for each file, the same layout as `checksums.txt`.
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest = mvi_core::checksum::sha256_file(file)
            .with_context(|| format!("Failed to hash {}", file.display()))?;
        let name = file
            .file_name()
            .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
        println!("{digest}  {name}");
    }
    Ok(())
}
