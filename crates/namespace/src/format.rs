//! Human-readable formatting for listing rows.

use chrono::{DateTime, Utc};

const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

/// Format a byte count using base-1024 units.
///
/// Values are rounded to two decimals with trailing zeros dropped, so 1536
/// bytes is `1.5 KB` and 1048576 bytes is `1 MB`. Sizes past the largest
/// unit stay in GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Format a creation timestamp as a calendar date.
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}
