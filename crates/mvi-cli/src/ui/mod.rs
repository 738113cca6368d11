//! Terminal output for the installer.
//!
//! - [`theme`] - Colors and icons
//! - [`progress`] - Download progress formatting
//! - [`output`] - The [`Output`] reporter the installer writes through

pub mod output;
pub mod progress;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
