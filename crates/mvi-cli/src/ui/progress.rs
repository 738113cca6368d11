//! Download progress formatting.

use super::theme::format_size;

const BAR_WIDTH: usize = 24;

/// Whole percent of `current` out of `total`, clamped to 100.
pub fn percent(current: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        (current.saturating_mul(100) / total).min(100)
    }
}

/// Format a progress bar using ▓ (filled) and ░ (empty).
pub fn format_progress_bar(current: u64, total: u64, width: usize) -> String {
    let filled = if total > 0 {
        ((current as f64 / total as f64).min(1.0) * width as f64).round() as usize
    } else {
        0
    };
    let empty = width.saturating_sub(filled);
    format!("{}{}", "▓".repeat(filled), "░".repeat(empty))
}

/// One progress line: bar, percent and size when the total is known,
/// otherwise just the bytes received so far.
pub fn format_download_progress(current: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let bar = format_progress_bar(current, total, BAR_WIDTH);
            let pct = percent(current, total);
            format!("{bar}  {pct:>3}%  {}", format_size(total))
        }
        _ => format_size(current),
    }
}
