//! Conversions between the in-memory model and the text columns it is stored in.
//!
//! Recipe ingredients and instructions are stored one entry per line.
//! Preference lists are stored as JSON arrays, and rows written by older
//! builds as comma-separated text are still readable.

/// Join entries into a newline-delimited column value.
pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}

/// Split a newline-delimited column value, dropping empty lines.
///
/// `split_lines(&join_lines(v)) == v` for any `v` whose entries are non-empty
/// and contain no `'\n'`.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

pub fn decode_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
        return items;
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fraction (`0.0..=1.0`) to the stored whole percentage.
pub fn threshold_to_percent(fraction: f64) -> i64 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as i64
}

#[allow(clippy::cast_precision_loss)]
pub fn percent_to_threshold(percent: i64) -> f64 {
    percent.clamp(0, 100) as f64 / 100.0
}
