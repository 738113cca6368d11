//! Terminal implementation of the core [`Reporter`].
//!
//! Messages go to stdout. Download progress redraws a single line when stdout
//! is a terminal and is reduced to one line per file otherwise, so logs from
//! CI or a piped bootstrap stay readable.

use std::io::{IsTerminal, Write, stdout};
use std::sync::Mutex;

use crossterm::style::Stylize;
use crossterm::{
    QueueableCommand,
    cursor::MoveToColumn,
    terminal::{Clear, ClearType},
};
use mvi_core::Reporter;

use super::progress::{format_download_progress, percent};
use super::theme::{Theme, format_size};

/// State of the download line currently on screen.
#[derive(Debug, Default)]
struct ProgressLine {
    name: String,
    last_percent: Option<u64>,
    open: bool,
}

#[derive(Debug)]
pub struct Output {
    theme: Theme,
    quiet: bool,
    interactive: bool,
    progress: Mutex<ProgressLine>,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
            interactive: stdout().is_terminal(),
            progress: Mutex::new(ProgressLine::default()),
        }
    }

    /// End an open progress line so the next message starts on its own row.
    fn finish_line(&self) {
        let Ok(mut line) = self.progress.lock() else {
            return;
        };
        if line.open {
            println!();
            line.open = false;
        }
    }

    fn redraw(&self, name: &str, current: u64, total: Option<u64>) -> std::io::Result<()> {
        let mut out = stdout().lock();
        out.queue(MoveToColumn(0))?;
        out.queue(Clear(ClearType::CurrentLine))?;
        write!(
            out,
            "  {} {}",
            name,
            format_download_progress(current, total).with(self.theme.colors.active)
        )?;
        out.flush()
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        self.finish_line();
        println!(
            "{} {}",
            self.theme.icons.section.with(self.theme.colors.header),
            title.bold()
        );
    }

    fn downloading(&self, name: &str, current: u64, total: Option<u64>) {
        if self.quiet {
            return;
        }
        let Ok(mut line) = self.progress.lock() else {
            return;
        };

        if line.name != name {
            if line.open {
                println!();
            }
            line.name = name.to_string();
            line.last_percent = None;
            line.open = false;
        }

        if !self.interactive {
            if current == 0 {
                let size = total.map(format_size).unwrap_or_default();
                println!("  {name} {}", size.with(self.theme.colors.secondary));
            }
            return;
        }

        // Redraw only when the whole percentage moves.
        let pct = total.map(|t| percent(current, t));
        if pct.is_some() && pct == line.last_percent {
            return;
        }
        line.last_percent = pct;

        if self.redraw(name, current, total).is_ok() {
            line.open = true;
        }
        if total.is_some_and(|t| current >= t) {
            println!();
            line.open = false;
        }
    }

    fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.finish_line();
        println!("  {} {msg}", self.theme.icons.info.with(self.theme.colors.secondary));
    }

    fn success(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.finish_line();
        println!(
            "  {} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            msg.with(self.theme.colors.success)
        );
    }

    fn warning(&self, msg: &str) {
        self.finish_line();
        eprintln!(
            "{} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        self.finish_line();
        eprintln!(
            "{} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }
}
