//! Pure string and date helpers shared by the message factory and front end.

use chrono::{DateTime, Utc};

/// Ecology vocabulary used for keyword extraction. Order matters: extraction
/// reports hits in this order, not in the order they appear in the input.
pub const ECOLOGICAL_TERMS: &[&str] = &[
    "plant",
    "tree",
    "flower",
    "garden",
    "soil",
    "compost",
    "organic",
    "sustainable",
    "ecology",
    "ecosystem",
    "biodiversity",
    "climate",
    "conservation",
    "environment",
    "green",
    "recycling",
    "renewable",
    "species",
    "wildlife",
    "forest",
    "farming",
    "pesticide",
    "fertilizer",
    "drought",
    "irrigation",
    "harvest",
    "permaculture",
    "pollinator",
    "seed",
    "native",
    "invasive",
    "carbon",
    "footprint",
    "waste",
    "water",
    "energy",
    "sustainability",
];

pub const ELLIPSIS: &str = "...";

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;
const WEEK_MS: i64 = 604_800_000;

/// Vocabulary terms occurring as substrings of `text`, case-insensitively.
pub fn extract_keywords(text: &str) -> Vec<&'static str> {
    if text.is_empty() {
        return Vec::new();
    }

    let lower = text.to_lowercase();
    ECOLOGICAL_TERMS
        .iter()
        .copied()
        .filter(|term| lower.contains(term))
        .collect()
}

/// Cuts `text` to `max_length` characters and appends an ellipsis when it is
/// longer than that. Lengths are counted in chars, not bytes.
pub fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let mut out: String = text.chars().take(max_length).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Human-friendly elapsed time between `instant` and `now`.
pub fn format_relative_time(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - instant).num_milliseconds();

    if elapsed < MINUTE_MS {
        return "Just now".to_string();
    }
    if elapsed < HOUR_MS {
        return plural(elapsed / MINUTE_MS, "minute");
    }
    if elapsed < DAY_MS {
        return plural(elapsed / HOUR_MS, "hour");
    }
    if elapsed < WEEK_MS {
        return plural(elapsed / DAY_MS, "day");
    }

    instant.format("%Y-%m-%d").to_string()
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Opaque, time-ordered message id.
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Byte count rendered with the largest fitting unit, at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[unit])
}
