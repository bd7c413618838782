//! Small text helpers shared by the reply builders.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Matches a single backslash escape such as `\*` or `\_`.
static ESCAPE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\(.)").unwrap());

/// Format a duration into a human-readable string (e.g., "3:45" or "1:23:45")
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Create a progress bar for the current track, with timecodes on both ends.
pub fn format_progress_bar(position: Duration, total: Duration) -> String {
    const BAR_LENGTH: usize = 30;
    let progress = if total.as_secs() == 0 {
        0.0
    } else {
        (position.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    };

    let filled = ((progress * BAR_LENGTH as f64).round() as usize).min(BAR_LENGTH);
    let empty = BAR_LENGTH - filled;

    format!(
        "{} ┃ {}●{} ┃ {}",
        format_duration(position),
        "-".repeat(filled),
        "-".repeat(empty),
        format_duration(total)
    )
}

/// Strips the first markdown escape from prefix command input, so `\*song\*`
/// searches for `*song\*` the same way Discord renders it.
pub fn unescape(input: &str) -> String {
    ESCAPE_REGEX.replace(input, "$1").into_owned()
}

/// Splits text into chunks of at most `max_chars` characters without breaking
/// a UTF-8 code point.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Truncates a string to `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
