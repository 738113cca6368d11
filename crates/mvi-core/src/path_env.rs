//! Persisting the install directory on the user's `PATH`.
//!
//! Each platform persists `PATH` differently: Unix shells read an rc file,
//! Windows keeps a per-user environment variable. Both sit behind
//! [`PathStore`] so the membership check and idempotence live in one place.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use mvi_schema::Os;
use thiserror::Error;

const PROFILE_MARKER: &str = "# Added by the msgvault installer";

/// Failure to read or persist PATH.
#[derive(Error, Debug)]
pub enum PathError {
    /// Reading or writing a shell profile failed.
    #[error("Failed to update {}: {source}", .path.display())]
    Io {
        /// The profile file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A helper process (PowerShell) failed.
    #[error("{0}")]
    Command(String),

    /// The directory cannot be written as a PATH entry for this shell.
    #[error("Cannot add {0} to PATH: unsupported character in path")]
    Unrepresentable(String),
}

/// Outcome of a PATH integration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathChange {
    /// The directory was appended and persisted.
    Added,
    /// The directory was already on the persisted PATH.
    AlreadyPresent,
}

/// A persisted PATH that future sessions will read.
pub trait PathStore: Send + Sync {
    /// Directories currently on the persisted PATH.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted value cannot be read.
    fn entries(&self) -> Result<Vec<String>, PathError>;

    /// Append `dir` to the persisted PATH.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written or cannot hold `dir`.
    fn persist(&self, dir: &str) -> Result<(), PathError>;

    /// Human-readable description of where PATH is persisted.
    fn location(&self) -> String;
}

fn normalize(entry: &str) -> String {
    let trimmed = entry.trim().trim_end_matches(['/', '\\']);
    let trimmed = if trimmed.is_empty() { entry.trim() } else { trimmed };
    trimmed.to_lowercase()
}

/// Whether `dir` is among `entries`.
///
/// Case-insensitive and ignores trailing path separators, so `C:\Bin\` and
/// `c:\bin` are the same entry.
pub fn path_contains<S: AsRef<str>>(entries: &[S], dir: &str) -> bool {
    let wanted = normalize(dir);
    entries.iter().any(|e| normalize(e.as_ref()) == wanted)
}

/// Append `dir` to the persisted PATH unless it is already there.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written, or cannot
/// represent `dir`.
pub fn integrate(store: &dyn PathStore, dir: &Path) -> Result<PathChange, PathError> {
    let dir = dir.to_string_lossy();
    let entries = store.entries()?;

    if path_contains(&entries, &dir) {
        tracing::debug!("{dir} already on PATH ({})", store.location());
        return Ok(PathChange::AlreadyPresent);
    }

    store.persist(&dir)?;
    tracing::info!("Added {dir} to PATH in {}", store.location());
    Ok(PathChange::Added)
}

/// Append `dir` to this process's `PATH` if it is missing.
///
/// Returns whether the variable changed.
pub fn export_to_process(dir: &Path) -> bool {
    let current = std::env::var_os("PATH").unwrap_or_default();
    let entries: Vec<String> = std::env::split_paths(&current)
        .map(|p| p.to_string_lossy().into_owned())
        .collect();

    if path_contains(&entries, &dir.to_string_lossy()) {
        return false;
    }

    let mut paths: Vec<PathBuf> = std::env::split_paths(&current).collect();
    paths.push(dir.to_path_buf());
    let Ok(joined) = std::env::join_paths(paths) else {
        tracing::warn!("Cannot add {} to PATH: contains a separator", dir.display());
        return false;
    };

    set_process_path(&joined);
    true
}

#[allow(unsafe_code)]
fn set_process_path(value: &OsString) {
    // SAFETY: called from the installer's single-threaded runtime after all
    // blocking extraction work has joined; nothing else reads the
    // environment concurrently.
    unsafe { std::env::set_var("PATH", value) };
}

/// The store used for `os` on this machine, if one can be determined.
pub fn default_store(os: Os) -> Option<Box<dyn PathStore>> {
    match os {
        Os::Windows => Some(Box::new(WindowsUserPath)),
        Os::Linux | Os::Darwin => {
            ShellProfile::detect(os).map(|p| Box::new(p) as Box<dyn PathStore>)
        }
    }
}

/// Shell syntax used when writing the profile line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// `sh`, `bash`, `zsh` and friends.
    Posix,
    /// The fish shell.
    Fish,
}

/// A shell rc file that PATH additions are appended to.
///
/// The inherited `PATH` counts as persisted too: a directory already
/// exported by the login environment needs no new line.
#[derive(Debug, Clone)]
pub struct ShellProfile {
    profile: PathBuf,
    kind: ShellKind,
    inherited: Vec<String>,
    home: Option<PathBuf>,
}

impl ShellProfile {
    /// A profile at `profile`, with `inherited` as the PATH of the login environment.
    pub fn new(profile: PathBuf, kind: ShellKind, inherited: Vec<String>) -> Self {
        Self {
            profile,
            kind,
            inherited,
            home: dirs::home_dir(),
        }
    }

    /// Expand `~` and `$HOME` in existing profile lines against `home`.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Pick the rc file for the user's `$SHELL`.
    pub fn detect(os: Os) -> Option<Self> {
        let home = dirs::home_dir()?;
        let shell = std::env::var("SHELL").unwrap_or_default();
        let shell_name = Path::new(&shell)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (profile, kind) = match shell_name.as_str() {
            "zsh" => (home.join(".zshrc"), ShellKind::Posix),
            "bash" if os == Os::Darwin => (home.join(".bash_profile"), ShellKind::Posix),
            "bash" => (home.join(".bashrc"), ShellKind::Posix),
            "fish" => (
                home.join(".config").join("fish").join("config.fish"),
                ShellKind::Fish,
            ),
            _ => (home.join(".profile"), ShellKind::Posix),
        };

        let inherited = std::env::var_os("PATH")
            .map(|p| {
                std::env::split_paths(&p)
                    .map(|e| e.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self::new(profile, kind, inherited).with_home(home))
    }

    /// The rc file lines are appended to.
    pub fn profile(&self) -> &Path {
        &self.profile
    }

    /// The rc-file line that appends `dir`, quoted for the shell.
    fn line_for(&self, dir: &str) -> Result<String, PathError> {
        // A newline ends the statement; `:` splits a POSIX PATH.
        if dir.contains(['\n', '\r']) || (self.kind == ShellKind::Posix && dir.contains(':')) {
            return Err(PathError::Unrepresentable(dir.to_string()));
        }

        let quoted = escape_double_quoted(dir);
        Ok(match self.kind {
            ShellKind::Posix => format!("export PATH=\"$PATH:{quoted}\""),
            ShellKind::Fish => format!("fish_add_path -a \"{quoted}\""),
        })
    }

    fn io_error(&self, source: io::Error) -> PathError {
        PathError::Io {
            path: self.profile.clone(),
            source,
        }
    }
}

/// Backslash-escape the characters that stay special inside `"..."`.
fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Undo [`escape_double_quoted`].
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        let escaped = if c == '\\' { chars.next() } else { None };
        out.push(escaped.unwrap_or(c));
    }
    out
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

/// Resolve a leading `~`, `$HOME` or `${HOME}` against `home`.
fn expand_home(entry: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return entry.to_string();
    };
    ["$HOME", "${HOME}", "~"]
        .iter()
        .find_map(|prefix| {
            entry
                .strip_prefix(prefix)
                .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        })
        .map_or_else(|| entry.to_string(), |rest| format!("{}{rest}", home.display()))
}

/// Directories a single rc-file line adds to PATH.
fn profile_line_entries(line: &str, home: Option<&Path>) -> Vec<String> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix("fish_add_path") {
        return rest
            .split_whitespace()
            .filter(|arg| !arg.starts_with('-'))
            .map(|arg| expand_home(&unescape(unquote(arg)), home))
            .collect();
    }

    let assignment = line.strip_prefix("export ").unwrap_or(line);
    let Some(value) = assignment.strip_prefix("PATH=") else {
        return Vec::new();
    };

    unquote(value)
        .split(':')
        .filter(|e| !e.is_empty() && *e != "$PATH" && *e != "${PATH}")
        .map(|e| expand_home(&unescape(e), home))
        .collect()
}

impl PathStore for ShellProfile {
    fn entries(&self) -> Result<Vec<String>, PathError> {
        let mut entries = self.inherited.clone();

        match fs::read_to_string(&self.profile) {
            Ok(content) => entries.extend(
                content
                    .lines()
                    .flat_map(|line| profile_line_entries(line, self.home.as_deref())),
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.io_error(e)),
        }

        Ok(entries)
    }

    fn persist(&self, dir: &str) -> Result<(), PathError> {
        let line = self.line_for(dir)?;
        if let Some(parent) = self.profile.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.profile)
            .map_err(|e| self.io_error(e))?;

        writeln!(file, "\n{PROFILE_MARKER}\n{line}").map_err(|e| self.io_error(e))
    }

    fn location(&self) -> String {
        self.profile.display().to_string()
    }
}

/// The per-user `Path` environment variable on Windows.
#[derive(Debug, Clone, Copy)]
pub struct WindowsUserPath;

impl WindowsUserPath {
    fn powershell(script: &str) -> Result<String, PathError> {
        let output = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", script])
            .output()
            .map_err(|e| PathError::Command(format!("Failed to run powershell: {e}")))?;

        if !output.status.success() {
            return Err(PathError::Command(format!(
                "powershell exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn raw(&self) -> Result<String, PathError> {
        Self::powershell("[Environment]::GetEnvironmentVariable('Path', 'User')")
    }
}

/// Join a `;`-separated PATH value and a new entry.
fn append_windows_path(current: &str, dir: &str) -> String {
    let current = current.trim().trim_end_matches(';');
    if current.is_empty() {
        dir.to_string()
    } else {
        format!("{current};{dir}")
    }
}

impl PathStore for WindowsUserPath {
    fn entries(&self) -> Result<Vec<String>, PathError> {
        Ok(self
            .raw()?
            .split(';')
            .filter(|e| !e.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn persist(&self, dir: &str) -> Result<(), PathError> {
        let value = append_windows_path(&self.raw()?, dir).replace('\'', "''");
        Self::powershell(&format!(
            "[Environment]::SetEnvironmentVariable('Path', '{value}', 'User')"
        ))
        .map(|_| ())
    }

    fn location(&self) -> String {
        "the user Path environment variable".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<Vec<String>>,
        persisted: Mutex<usize>,
    }

    impl PathStore for MemoryStore {
        fn entries(&self) -> Result<Vec<String>, PathError> {
            Ok(self.entries.lock().unwrap().clone())
        }
        fn persist(&self, dir: &str) -> Result<(), PathError> {
            self.entries.lock().unwrap().push(dir.to_string());
            *self.persisted.lock().unwrap() += 1;
            Ok(())
        }
        fn location(&self) -> String {
            "memory".into()
        }
    }

    #[test]
    fn contains_ignores_case_and_trailing_separators() {
        let entries = ["C:\\Users\\Ann\\AppData\\Local\\msgvault\\bin\\", "/usr/bin"];
        assert!(path_contains(&entries, "c:\\users\\ann\\appdata\\local\\msgvault\\bin"));
        assert!(path_contains(&entries, "/usr/bin/"));
        assert!(path_contains(&entries, "/USR/BIN"));
        assert!(!path_contains(&entries, "/usr/local/bin"));
    }

    #[test]
    fn root_is_not_collapsed_to_empty() {
        assert!(path_contains(&["/"], "/"));
        assert!(!path_contains(&["/"], ""));
    }

    #[test]
    fn integrate_is_idempotent() {
        let store = MemoryStore::default();
        let dir = Path::new("/home/ann/.local/bin");

        assert_eq!(integrate(&store, dir).unwrap(), PathChange::Added);
        assert_eq!(integrate(&store, dir).unwrap(), PathChange::AlreadyPresent);
        assert_eq!(
            integrate(&store, Path::new("/HOME/ann/.local/bin/")).unwrap(),
            PathChange::AlreadyPresent
        );
        assert_eq!(*store.persisted.lock().unwrap(), 1);
    }

    #[test]
    fn shell_profile_round_trip() {
        let home = tempfile::tempdir().unwrap();
        let profile = ShellProfile::new(
            home.path().join(".zshrc"),
            ShellKind::Posix,
            vec!["/usr/bin".into()],
        );
        let dir = home.path().join(".local").join("bin");

        assert_eq!(integrate(&profile, &dir).unwrap(), PathChange::Added);
        assert_eq!(integrate(&profile, &dir).unwrap(), PathChange::AlreadyPresent);

        let content = fs::read_to_string(profile.profile()).unwrap();
        assert_eq!(content.matches(PROFILE_MARKER).count(), 1);
        assert!(content.contains(&format!("export PATH=\"$PATH:{}\"", dir.display())));
    }

    #[test]
    fn inherited_path_counts_as_present() {
        let home = tempfile::tempdir().unwrap();
        let profile = ShellProfile::new(
            home.path().join(".profile"),
            ShellKind::Posix,
            vec!["/opt/tools/bin/".into()],
        );

        assert_eq!(
            integrate(&profile, Path::new("/opt/tools/bin")).unwrap(),
            PathChange::AlreadyPresent
        );
        assert!(!profile.profile().exists());
    }

    #[test]
    fn fish_profile_uses_fish_add_path() {
        let home = tempfile::tempdir().unwrap();
        let profile = ShellProfile::new(
            home.path().join(".config/fish/config.fish"),
            ShellKind::Fish,
            Vec::new(),
        );

        assert_eq!(
            integrate(&profile, Path::new("/home/ann/.local/bin")).unwrap(),
            PathChange::Added
        );
        assert_eq!(
            integrate(&profile, Path::new("/home/ann/.local/bin")).unwrap(),
            PathChange::AlreadyPresent
        );
        let content = fs::read_to_string(profile.profile()).unwrap();
        assert!(content.contains("fish_add_path -a \"/home/ann/.local/bin\""));
    }

    #[test]
    fn profile_lines_are_parsed() {
        assert_eq!(
            profile_line_entries("export PATH=\"$PATH:/a/bin:/b/bin\"", None),
            ["/a/bin", "/b/bin"]
        );
        assert_eq!(profile_line_entries("PATH=/c/bin:${PATH}", None), ["/c/bin"]);
        assert_eq!(profile_line_entries("fish_add_path -a '/d/bin'", None), ["/d/bin"]);
        assert!(profile_line_entries("alias ll='ls -l'", None).is_empty());
    }

    #[test]
    fn home_references_are_expanded() {
        let home = Path::new("/home/ann");
        assert_eq!(
            profile_line_entries("export PATH=\"$HOME/.local/bin:$PATH\"", Some(home)),
            ["/home/ann/.local/bin"]
        );
        assert_eq!(
            profile_line_entries("export PATH=\"${HOME}/bin:~/tools:$PATH\"", Some(home)),
            ["/home/ann/bin", "/home/ann/tools"]
        );
        assert_eq!(
            profile_line_entries("fish_add_path ~/.local/bin", Some(home)),
            ["/home/ann/.local/bin"]
        );
        assert_eq!(
            profile_line_entries("export PATH=\"$HOMEBREW/bin:$PATH\"", Some(home)),
            ["$HOMEBREW/bin"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn existing_home_relative_line_is_not_duplicated() {
        let home = tempfile::tempdir().unwrap();
        let rc = home.path().join(".bashrc");
        fs::write(&rc, "export PATH=\"$HOME/.local/bin:$PATH\"\n").unwrap();
        let profile =
            ShellProfile::new(rc.clone(), ShellKind::Posix, Vec::new()).with_home(home.path());

        let dir = home.path().join(".local").join("bin");
        assert_eq!(integrate(&profile, &dir).unwrap(), PathChange::AlreadyPresent);
        assert!(!fs::read_to_string(&rc).unwrap().contains(PROFILE_MARKER));
    }

    #[test]
    fn special_characters_are_escaped() {
        let home = tempfile::tempdir().unwrap();
        let profile = ShellProfile::new(home.path().join(".zshrc"), ShellKind::Posix, Vec::new());
        let dir = Path::new("/opt/a \"b\" $x `y`/bin");

        assert_eq!(integrate(&profile, dir).unwrap(), PathChange::Added);
        let content = fs::read_to_string(profile.profile()).unwrap();
        assert!(content.contains(r#"export PATH="$PATH:/opt/a \"b\" \$x \`y\`/bin""#));

        assert_eq!(integrate(&profile, dir).unwrap(), PathChange::AlreadyPresent);
        let content = fs::read_to_string(profile.profile()).unwrap();
        assert_eq!(content.matches(PROFILE_MARKER).count(), 1);
    }

    #[test]
    fn unrepresentable_directories_are_refused() {
        let home = tempfile::tempdir().unwrap();
        let profile = ShellProfile::new(home.path().join(".profile"), ShellKind::Posix, Vec::new());

        let err = integrate(&profile, Path::new("/opt/a:b/bin")).unwrap_err();
        assert!(matches!(err, PathError::Unrepresentable(_)));
        assert!(!profile.profile().exists());
    }

    #[test]
    fn windows_value_is_appended() {
        assert_eq!(append_windows_path("", "C:\\bin"), "C:\\bin");
        assert_eq!(append_windows_path("C:\\a;C:\\b;", "C:\\bin"), "C:\\a;C:\\b;C:\\bin");
    }
}
