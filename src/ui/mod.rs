//! Terminal presentation for batch runs: progress bar, status lines and the
//! closing summary. Everything here writes to stderr so stdout stays free for
//! CSV or JSON.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::OutputRecord;
use crate::utils::truncate_at_word;

/// Check if stderr is a terminal.
pub fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Icon and colour for a status, as one styled string
pub fn styled_icon(status: Status) -> String {
    let icon = status_icon(status);
    match status {
        Status::Success => icon.green().bold().to_string(),
        Status::Error => icon.red().bold().to_string(),
        Status::Warning => icon.yellow().bold().to_string(),
        Status::Info => icon.cyan().bold().to_string(),
    }
}

/// One status line per processed document
pub fn record_line(record: &OutputRecord) -> String {
    let status = if record.found {
        Status::Success
    } else {
        Status::Error
    };
    let title = if record.title.is_empty() {
        "untitled".dimmed().to_string()
    } else {
        truncate_at_word(&record.title, 60)
    };

    format!(
        "{} {} {} {}",
        styled_icon(status),
        record.filename.bold(),
        title,
        format!("({:.2})", record.score).dimmed()
    )
}

/// Progress over the documents of a folder run.
///
/// Hidden when quiet or when stderr is not a terminal; status lines are then
/// skipped too.
pub struct BatchProgress {
    pb: ProgressBar,
    visible: bool,
}

impl BatchProgress {
    pub fn new(total: usize, quiet: bool) -> Self {
        let visible = !quiet && is_terminal();
        let pb = ProgressBar::new(total as u64);
        if visible {
            pb.set_draw_target(ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan} {msg} {wide_bar:.cyan/blue} {pos}/{len} ({eta})",
            ) {
                pb.set_style(
                    style
                        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                        .progress_chars("█▓▒░ "),
                );
            }
            pb.set_message("Scanning");
            pb.enable_steady_tick(Duration::from_millis(120));
        } else {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }

        Self { pb, visible }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn record(&self, record: &OutputRecord) {
        if self.visible {
            self.pb.println(record_line(record));
        }
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Closing summary line for a run
pub fn summary_line(found: usize, completed: usize, total: usize, cancelled: bool) -> String {
    let mut line = format!(
        "{} of {} document(s) contain a positionality statement",
        found, completed
    );
    if cancelled {
        line.push_str(&format!(" (cancelled, {} not started)", total - completed));
    }
    line
}

pub fn print_summary(found: usize, completed: usize, total: usize, cancelled: bool) {
    let status = if cancelled {
        Status::Warning
    } else {
        Status::Info
    };
    eprintln!(
        "{} {}",
        styled_icon(status),
        summary_line(found, completed, total, cancelled)
    );
}
