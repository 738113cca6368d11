//! The install sequence: resolve, download, verify, extract, place, PATH.
//!
//! [`Installer::run`] performs every step strictly in order; each failure
//! aborts the run. All intermediate files live in a [`RunWorkspace`], which
//! is removed on every exit path, including when the `run` future is dropped
//! mid-flight (e.g. on Ctrl-C).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mvi_schema::{Os, Platform, ReleaseTag};
use reqwest::Client;

use crate::checksum::{self, ChecksumManifest};
use crate::error::InstallError;
use crate::io::download::download_to_file;
use crate::io::extract::{ExtractError, extract_archive, locate_binary};
use crate::io::release::{ReleaseDescriptor, ReleaseSource, fetch_latest_tag};
use crate::path_env::{self, PathChange, PathStore};
use crate::place::{adhoc_codesign, place_binary};
use crate::workspace::RunWorkspace;
use crate::{Reporter, paths};

/// Options recognized by an installer run, built once at the entry point.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Where the binary goes; the platform default when `None`.
    pub install_dir: Option<PathBuf>,
    /// Install without checking the archive against the manifest.
    pub skip_checksum: bool,
    /// Leave the persisted PATH alone.
    pub no_modify_path: bool,
    /// Install this tag instead of the latest release.
    pub version: Option<ReleaseTag>,
    /// Resolve and report the plan without downloading anything.
    pub dry_run: bool,
}

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Release that was installed (or would be, on a dry run).
    pub tag: ReleaseTag,
    /// Target the archive was chosen for.
    pub platform: Platform,
    /// Archive download URL.
    pub archive_url: String,
    /// Directory the binary is placed in.
    pub install_dir: PathBuf,
    /// Full path of the placed binary.
    pub destination: PathBuf,
    /// Whether the archive was checked against the manifest.
    pub verified: bool,
    /// `None` when PATH integration was skipped or failed.
    pub path_change: Option<PathChange>,
    /// Nothing was downloaded or written.
    pub dry_run: bool,
}

/// One configured installer run.
pub struct Installer {
    client: Client,
    source: ReleaseSource,
    platform: Platform,
    options: InstallOptions,
    reporter: Arc<dyn Reporter>,
    path_store: Option<Box<dyn PathStore>>,
    workspace_root: Option<PathBuf>,
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("source", &self.source)
            .field("platform", &self.platform)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Installer for `platform`, fetching from `source` through `client`.
    pub fn new(
        client: Client,
        source: ReleaseSource,
        platform: Platform,
        options: InstallOptions,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            client,
            source,
            platform,
            options,
            reporter,
            path_store: None,
            workspace_root: None,
        }
    }

    /// Persist PATH through `store` instead of the platform default.
    #[must_use]
    pub fn with_path_store(mut self, store: Box<dyn PathStore>) -> Self {
        self.path_store = Some(store);
        self
    }

    /// Create the run workspace under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Run every step in order and describe what was done.
    ///
    /// PATH integration failures are reported as warnings, not errors.
    ///
    /// # Errors
    ///
    /// Returns the first failing step; see [`InstallError::exit_code`] for
    /// how each maps to an exit status.
    pub async fn run(&self) -> Result<InstallReport, InstallError> {
        let install_dir = match &self.options.install_dir {
            Some(dir) => dir.clone(),
            None => paths::default_install_dir(self.platform.os).ok_or(InstallError::NoInstallDir)?,
        };

        self.reporter.section("Resolving");
        let tag = match &self.options.version {
            Some(tag) => tag.clone(),
            None => fetch_latest_tag(&self.client, &self.source).await?,
        };
        let release = ReleaseDescriptor::new(&self.source, tag, self.platform);
        let file_name = self.platform.binary_file_name();
        self.reporter.info(&format!(
            "msgvault {} for {}",
            release.tag, release.platform
        ));

        let mut report = InstallReport {
            tag: release.tag.clone(),
            platform: self.platform,
            archive_url: release.archive_url.clone(),
            destination: install_dir.join(&file_name),
            install_dir,
            verified: false,
            path_change: None,
            dry_run: self.options.dry_run,
        };

        if self.options.dry_run {
            self.reporter
                .info(&format!("Would download {}", release.archive_url));
            self.reporter
                .info(&format!("Would install to {}", report.destination.display()));
            return Ok(report);
        }

        let workspace = match &self.workspace_root {
            Some(root) => RunWorkspace::new_in(root),
            None => RunWorkspace::new(),
        }
        .map_err(InstallError::Workspace)?;
        tracing::debug!("Workspace at {}", workspace.path().display());

        self.reporter.section("Downloading");
        report.verified = self.fetch_and_verify(&release, &workspace).await?;

        self.reporter.section("Installing");
        let binary = self.unpack(&release, &workspace, &file_name).await?;
        report.destination = place_binary(&binary, &report.install_dir, &file_name)?;

        if self.platform.os == Os::Darwin {
            if let Err(e) = adhoc_codesign(&report.destination) {
                tracing::warn!("codesign failed: {e}");
                self.reporter
                    .warning(&format!("Ad-hoc code signing failed: {e}"));
            }
        }
        self.reporter.success(&format!(
            "Installed {} to {}",
            release.tag,
            report.destination.display()
        ));

        report.path_change = self.integrate_path(&report.install_dir);

        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove workspace: {e}");
        }

        Ok(report)
    }

    /// Download the archive and, unless skipped, check it against the manifest.
    ///
    /// Returns whether verification happened.
    async fn fetch_and_verify(
        &self,
        release: &ReleaseDescriptor,
        workspace: &RunWorkspace,
    ) -> Result<bool, InstallError> {
        let reporter = self.reporter.as_ref();
        let archive_path = workspace.file(&release.archive_name);

        if self.options.skip_checksum {
            reporter.warning("Checksum verification skipped; installing an unverified archive");
            self.download_archive(release, &archive_path).await?;
            return Ok(false);
        }

        // Manifest first: without it nothing can be installed.
        let manifest_path = workspace.file(mvi_schema::CHECKSUMS_FILE);
        download_to_file(
            &self.client,
            &release.checksums_url,
            &manifest_path,
            mvi_schema::CHECKSUMS_FILE,
            reporter,
        )
        .await
        .map_err(|source| InstallError::ChecksumsUnavailable {
            name: mvi_schema::CHECKSUMS_FILE.to_string(),
            source,
        })?;

        let actual = self.download_archive(release, &archive_path).await?;

        let text = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|source| InstallError::Io {
                path: manifest_path.clone(),
                source,
            })?;
        let manifest = ChecksumManifest::parse(&text);
        tracing::debug!("Manifest lists {} entries", manifest.entries().len());

        checksum::verify(&manifest, &release.archive_name, &actual)?;
        reporter.success(&format!("Verified sha256 {actual}"));
        Ok(true)
    }

    async fn download_archive(
        &self,
        release: &ReleaseDescriptor,
        dest: &Path,
    ) -> Result<mvi_schema::Sha256Digest, InstallError> {
        download_to_file(
            &self.client,
            &release.archive_url,
            dest,
            &release.archive_name,
            self.reporter.as_ref(),
        )
        .await
        .map_err(|source| InstallError::Download {
            name: release.archive_name.clone(),
            source,
        })
    }

    async fn unpack(
        &self,
        release: &ReleaseDescriptor,
        workspace: &RunWorkspace,
        file_name: &str,
    ) -> Result<PathBuf, InstallError> {
        let archive = workspace.file(&release.archive_name);
        let dest = workspace.extract_dir();
        let format = release.platform.archive_format();
        let wanted = file_name.to_string();

        let extract_error = |source: ExtractError| InstallError::Extract {
            name: release.archive_name.clone(),
            source,
        };

        let found = tokio::task::spawn_blocking(move || {
            extract_archive(&archive, &dest, format)?;
            locate_binary(&dest, &wanted)
        })
        .await
        .map_err(|e| extract_error(ExtractError::Archive(e.to_string())))?
        .map_err(extract_error)?;

        found.ok_or_else(|| InstallError::BinaryNotFound {
            name: file_name.to_string(),
            archive: release.archive_name.clone(),
        })
    }

    /// Best-effort PATH persistence; failures become warnings.
    fn integrate_path(&self, install_dir: &Path) -> Option<PathChange> {
        if self.options.no_modify_path {
            tracing::debug!("Skipping PATH integration");
            return None;
        }

        let fallback;
        let store: &dyn PathStore = if let Some(store) = &self.path_store {
            store.as_ref()
        } else {
            let Some(store) = path_env::default_store(self.platform.os) else {
                self.warn_manual_path(install_dir, "no shell profile found");
                return None;
            };
            fallback = store;
            fallback.as_ref()
        };

        match path_env::integrate(store, install_dir) {
            Ok(change) => Some(change),
            Err(e) => {
                self.warn_manual_path(install_dir, &e.to_string());
                None
            }
        }
    }

    fn warn_manual_path(&self, install_dir: &Path, reason: &str) {
        tracing::warn!("PATH not updated: {reason}");
        let hint = if self.platform.os.is_posix() {
            format!("export PATH=\"$PATH:{}\"", install_dir.display())
        } else {
            format!("add {} to your user Path", install_dir.display())
        };
        self.reporter
            .warning(&format!("Could not update PATH ({reason}); {hint}"));
    }
}
