//! ID, time, and truncation formatters for CLI output.

use chrono::{DateTime, Utc};

/// Return first 8 chars of a UUID string for list display.
pub fn short_id(id: &str) -> &str {
    if id.len() >= 8 {
        &id[..8]
    } else {
        id
    }
}

/// Format a DateTime as coarse relative time ("2h ago", "3d ago").
///
/// Deliberately coarse (single unit, no sub-second precision) rather than
/// a full humanization library; good enough for a list column.
pub fn relative_time(dt: &DateTime<Utc>) -> String {
    let seconds = Utc::now().signed_duration_since(*dt).num_seconds();
    let future = seconds < 0;
    let magnitude = seconds.unsigned_abs();

    let (value, unit) = if magnitude < 60 {
        (magnitude, "s")
    } else if magnitude < 3600 {
        (magnitude / 60, "m")
    } else if magnitude < 86400 {
        (magnitude / 3600, "h")
    } else {
        (magnitude / 86400, "d")
    };

    if future {
        format!("in {value}{unit}")
    } else {
        format!("{value}{unit} ago")
    }
}

/// Format an optional DateTime as relative time or "-".
pub fn relative_time_opt(dt: Option<&DateTime<Utc>>) -> String {
    match dt {
        Some(dt) => relative_time(dt),
        None => "-".to_string(),
    }
}

/// Truncate a string with a unicode ellipsis.
pub fn truncate_ellipsis(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}\u{2026}", &s[..max_len.saturating_sub(1)])
    }
}

/// Format a count with a pluralized label: "3 goals", "1 goal".
pub fn count_label(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_truncates_to_eight() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn relative_time_reports_seconds_for_recent() {
        let dt = Utc::now() - chrono::Duration::seconds(5);
        assert_eq!(relative_time(&dt), "5s ago");
    }

    #[test]
    fn count_label_pluralizes() {
        assert_eq!(count_label(1, "goal", "goals"), "1 goal");
        assert_eq!(count_label(0, "goal", "goals"), "0 goals");
    }
}
