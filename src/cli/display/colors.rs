//! Status and priority styling for CLI output.
//!
//! Respects `NO_COLOR` automatically via `console`'s terminal detection.

use console::{style, StyledObject};

/// Returns a styled string for any status value.
///
/// Color scheme:
/// - Green:  complete, active
/// - Yellow: running, in_progress
/// - Blue:   pending, ready
/// - Cyan:   blocked
/// - Red:    failed, degraded
/// - Dim:    cancelled, retired, deprecated
pub fn colorize_status(status: &str) -> StyledObject<String> {
    let text = status.to_string();
    match status.to_lowercase().as_str() {
        "completed" | "complete" | "active" | "healthy" => style(text).green().bold(),
        "running" | "in_progress" => style(text).yellow(),
        "pending" | "ready" => style(text).blue(),
        "blocked" => style(text).cyan(),
        "failed" | "degraded" => style(text).red().bold(),
        "cancelled" | "canceled" | "retired" | "deprecated" => style(text).dim(),
        _ => style(text),
    }
}

/// Returns a styled string for priority values.
pub fn colorize_priority(priority: &str) -> StyledObject<String> {
    let text = priority.to_string();
    match priority.to_lowercase().as_str() {
        "critical" => style(text).red().bold(),
        "high" => style(text).red(),
        "medium" | "normal" => style(text),
        "low" => style(text).dim(),
        _ => style(text),
    }
}

/// Styled label for detail views (bold name, dimmed colon).
pub fn label(name: &str) -> String {
    format!("{}{}", style(name).bold(), style(":").dim())
}

/// Section header with a blank line above.
pub fn section_header(title: &str) -> String {
    format!("\n{}", style(title).bold().underlined())
}
