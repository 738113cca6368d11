//! Core library for the msgvault installer.
//!
//! Release lookup, streaming download with hashing, checksum verification,
//! archive extraction, binary placement and PATH integration. The
//! [`Installer`] ties them together; progress goes through a [`Reporter`]
//! so the terminal layer stays in `mvi-cli`.

pub mod checksum;
pub mod error;
pub mod installer;
pub mod io;
pub mod path_env;
pub mod paths;
pub mod place;
pub mod reporter;
pub mod workspace;

pub use error::InstallError;
pub use installer::{InstallOptions, InstallReport, Installer};
pub use paths::default_install_dir;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for every HTTP request
pub const USER_AGENT: &str = concat!("msgvault-install/", env!("CARGO_PKG_VERSION"));
