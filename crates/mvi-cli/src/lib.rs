//! msgvault-install - fetch, verify and install msgvault
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Downloads the latest msgvault release for this machine, checks it against
//! the published `checksums.txt`, and places the binary on `PATH`.
//!
//! Every option can also be set through the environment, which is how the
//! one-line `curl | sh` style bootstrap passes them through:
//!
//! | Flag                | Environment                 |
//! |---------------------|-----------------------------|
//! | `--install-dir`     | `MSGVAULT_INSTALL_DIR`      |
//! | `--skip-checksum`   | `MSGVAULT_SKIP_CHECKSUM`    |
//! | `--no-modify-path`  | `MSGVAULT_NO_MODIFY_PATH`   |
//! | `--release`         | `MSGVAULT_VERSION`          |

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use mvi_core::InstallOptions;
use mvi_core::io::release::ReleaseSource;
use mvi_schema::ReleaseTag;

#[derive(Debug, Parser)]
#[command(name = "msgvault-install")]
#[command(version = env!("MSGVAULT_INSTALL_VERSION"))]
#[command(about = "Install the latest msgvault release")]
pub struct Cli {
    /// Directory to install msgvault into
    /// [default: ~/.local/bin, or %LOCALAPPDATA%\msgvault\bin on Windows]
    #[arg(long, env = "MSGVAULT_INSTALL_DIR", value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Install without verifying the archive checksum (not recommended)
    #[arg(long, env = "MSGVAULT_SKIP_CHECKSUM", value_parser = BoolishValueParser::new())]
    pub skip_checksum: bool,

    /// Do not add the install directory to PATH
    #[arg(long, env = "MSGVAULT_NO_MODIFY_PATH", value_parser = BoolishValueParser::new())]
    pub no_modify_path: bool,

    /// Install a specific release tag instead of the latest
    #[arg(long, env = "MSGVAULT_VERSION", value_name = "TAG")]
    pub release: Option<ReleaseTag>,

    /// Show what would be installed without downloading anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Release API base URL (mirrors and testing)
    #[arg(long, env = "MSGVAULT_API_BASE", hide = true)]
    pub api_base: Option<String>,

    /// Release download base URL (mirrors and testing)
    #[arg(long, env = "MSGVAULT_DOWNLOAD_BASE", hide = true)]
    pub download_base: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print SHA256 sums in checksums.txt format
    #[command(hide = true)]
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    /// Installer options from the parsed flags and environment.
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            install_dir: self.install_dir.clone(),
            skip_checksum: self.skip_checksum,
            no_modify_path: self.no_modify_path,
            version: self.release.clone(),
            dry_run: self.dry_run,
        }
    }

    /// Release source, with any mirror overrides applied.
    pub fn release_source(&self) -> ReleaseSource {
        let mut source = ReleaseSource::default();
        if let Some(api_base) = &self.api_base {
            source.api_base.clone_from(api_base);
        }
        if let Some(download_base) = &self.download_base {
            source.download_base.clone_from(download_base);
        }
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "msgvault-install",
            "--install-dir",
            "/opt/msgvault/bin",
            "--skip-checksum",
            "--no-modify-path",
            "--release",
            "v1.2.0",
            "--dry-run",
        ])
        .unwrap();

        let options = cli.install_options();
        assert_eq!(options.install_dir, Some(PathBuf::from("/opt/msgvault/bin")));
        assert!(options.skip_checksum);
        assert!(options.no_modify_path);
        assert!(options.dry_run);
        assert_eq!(options.version.unwrap().as_str(), "v1.2.0");
    }

    #[test]
    fn mirror_overrides() {
        let cli = Cli::try_parse_from([
            "msgvault-install",
            "--api-base",
            "http://127.0.0.1:8080",
            "--download-base",
            "http://127.0.0.1:8080/dl",
        ])
        .unwrap();

        let source = cli.release_source();
        assert_eq!(
            source.latest_url(),
            "http://127.0.0.1:8080/repos/wesm/msgvault/releases/latest"
        );
        assert_eq!(source.download_base, "http://127.0.0.1:8080/dl");
    }

    #[test]
    fn hash_requires_files() {
        assert!(Cli::try_parse_from(["msgvault-install", "hash"]).is_err());
    }
}
