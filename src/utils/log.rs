// src/utils/log.rs

//! Console report helpers with server-style formatting.
//!
//! Diagnostics go through the `log` facade; these helpers render the
//! human-facing run output of the CLI.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress console output (tests, `--quiet` style callers).
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn emit(message: &str) {
    if !QUIET.load(Ordering::Relaxed) {
        println!("{}", format_line(message));
    }
}

/// Format a console line with a timestamp
fn format_line(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] {}", timestamp, message)
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    emit(&format!("[STEP {}/{}] {}", step_num, total, message));
}

/// Log a separator line
pub fn separator() {
    emit(&"─".repeat(60));
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    emit(&border);
    emit(&format!("  {}", title));
    emit(&border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    emit(&format!("    {}", message));
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    if QUIET.load(Ordering::Relaxed) {
        return;
    }
    println!();
    emit(&format!("[SUMMARY] {}", title));
    for (key, value) in items {
        emit(&format!("    {}: {}", key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_has_timestamp() {
        let line = format_line("hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] hello"));
    }
}
