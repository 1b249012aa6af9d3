//! Time formatting and parsing for trim points.
//!
//! Two renderings exist: the full `HH:MM:SS.mmm` form embedded in ffmpeg
//! commands, and a flexible form for display that drops leading zero-valued
//! hour and minute groups. Parsing accepts every form either produces.

use tracing::warn;

const ZERO_TIME: &str = "00:00:00.000";

/// Returns true when `seconds` can be rendered as a timestamp.
pub fn is_valid_time(seconds: f64) -> bool {
    seconds.is_finite() && seconds >= 0.0
}

fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60, ms)
}

/// Format seconds as `HH:MM:SS.mmm`.
///
/// NaN, infinite and negative inputs are logged and rendered as zero.
pub fn format_time(seconds: f64) -> String {
    if !is_valid_time(seconds) {
        warn!("Invalid time value provided to format_time: {}", seconds);
        return ZERO_TIME.to_string();
    }

    let (hours, minutes, secs, ms) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}

/// Format seconds for display: `HH:MM:SS.mmm`, `MM:SS.mmm` or `SS.mmm`.
pub fn format_time_flexible(seconds: f64) -> String {
    if !is_valid_time(seconds) {
        warn!("Invalid time value provided to format_time_flexible: {}", seconds);
        return "00.000".to_string();
    }

    let (hours, minutes, secs, ms) = split_millis(seconds);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    } else if minutes > 0 {
        format!("{:02}:{:02}.{:03}", minutes, secs, ms)
    } else {
        format!("{:02}.{:03}", secs, ms)
    }
}

fn parse_whole(part: &str) -> Option<f64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse::<u64>().ok().map(|v| v as f64)
}

fn parse_seconds(part: &str) -> Option<f64> {
    let (whole, frac) = match part.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (part, None),
    };

    let mut value = parse_whole(whole)?;
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        value += format!("0.{}", frac).parse::<f64>().ok()?;
    }
    Some(value)
}

/// Parse `HH:MM:SS.mmm`, `MM:SS.mmm`, `SS.mmm`, `MM:SS` or `SS` into seconds.
///
/// Returns `None` for anything else; callers keep their previous value.
pub fn parse_time_flexible(input: &str) -> Option<f64> {
    let parts: Vec<&str> = input.trim().split(':').collect();

    match parts.as_slice() {
        [secs] => parse_seconds(secs),
        [mins, secs] => Some(parse_whole(mins)? * 60.0 + parse_seconds(secs)?),
        [hours, mins, secs] => Some(
            parse_whole(hours)? * 3600.0 + parse_whole(mins)? * 60.0 + parse_seconds(secs)?,
        ),
        _ => None,
    }
}
