//! HTTP `Range` header parsing against a known object size.
//!
//! Only the first range of a range set is honored, since the backend serves
//! a single ordered stream per request. The suffix form `bytes=-N` is not
//! treated as "last N bytes": an empty start simply means 0.

use crate::models::media::ByteWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDecision {
    /// No usable range: header absent or object length unknown.
    NoRange,
    Single(ByteWindow),
    /// Malformed header or a start beyond the end of the object.
    Unsatisfiable,
}

pub fn parse_range(header: Option<&str>, total_size: u64) -> RangeDecision {
    let Some(header) = header else {
        return RangeDecision::NoRange;
    };
    if total_size == 0 {
        return RangeDecision::NoRange;
    }

    let Some(set) = header.trim().strip_prefix("bytes=") else {
        return RangeDecision::Unsatisfiable;
    };
    let first = set.split(',').next().unwrap_or_default().trim();
    let Some((start_str, end_str)) = first.split_once('-') else {
        return RangeDecision::Unsatisfiable;
    };

    let last = total_size - 1;
    let start = match parse_bound(start_str, 0) {
        Some(start) => start,
        None => return RangeDecision::Unsatisfiable,
    };
    let end = match parse_bound(end_str, last) {
        Some(end) => end,
        None => return RangeDecision::Unsatisfiable,
    };

    if start > last {
        return RangeDecision::Unsatisfiable;
    }
    let end = end.min(last).max(start);

    match ByteWindow::new(start, end) {
        Some(window) => RangeDecision::Single(window),
        None => RangeDecision::Unsatisfiable,
    }
}

fn parse_bound(raw: &str, default: u64) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(default);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
