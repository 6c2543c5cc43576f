//! Output formatting utilities

use std::time::Duration;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use cybervault_core::services::{EntryOutcome, SyncReport, SyncSkipReason};
use indicatif::{ProgressBar, ProgressStyle};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Spinner shown while waiting on the server; hidden when stdout is not a tty
pub fn spinner(msg: &str) -> ProgressBar {
    if atty::isnt(atty::Stream::Stdout) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Shorten a hash or ciphertext for table display
pub fn abbreviate(value: &str, keep: usize) -> String {
    if value.chars().count() <= keep {
        value.to_string()
    } else {
        let head: String = value.chars().take(keep).collect();
        format!("{}…", head)
    }
}

/// Human-readable summary of a sync pass
pub fn print_sync_report(report: &SyncReport) {
    match report.skipped {
        Some(SyncSkipReason::Offline) => {
            warning(&format!(
                "Offline: sync skipped, {} transaction(s) still queued",
                report.remaining
            ));
            return;
        }
        Some(SyncSkipReason::QueueDisabled) => {
            warning("Offline queue unavailable this session; nothing to sync");
            return;
        }
        Some(SyncSkipReason::Empty) => {
            info("Offline queue is empty");
            return;
        }
        None => {}
    }

    for outcome in &report.outcomes {
        match outcome {
            EntryOutcome::Submitted { seq, fraud_flag: true } => {
                println!("  {} #{} {}", "✓".green(), seq, "flagged for review".yellow());
            }
            EntryOutcome::Submitted { seq, .. } => {
                println!("  {} #{}", "✓".green(), seq);
            }
            EntryOutcome::Failed { seq, reason } => {
                println!("  {} #{} {}", "✗".red(), seq, reason.dimmed());
            }
        }
    }

    let summary = format!(
        "Synced {} transaction(s), {} failed, {} remaining",
        report.submitted(),
        report.failed(),
        report.remaining
    );
    if report.failed() > 0 {
        warning(&summary);
    } else {
        success(&summary);
    }
}
