use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

// ── Today ─────────────────────────────────────────────────────────────────────

/// The current calendar date in UTC.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a timestamp as emitted by job-history exports into a UTC [`DateTime`].
///
/// Accepts RFC 3339 (`2024-01-15T10:00:00Z`, any fixed offset) and the
/// `bq`-style `2024-01-15 10:00:00.123 UTC` form. Naive timestamps without a
/// zone are taken as UTC. Returns `None` for empty or unrecognised input.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive_part = s.strip_suffix(" UTC").unwrap_or(s);
    const FMTS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in FMTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_part, fmt) {
            return Some(naive.and_utc());
        }
    }

    warn!("could not parse timestamp \"{}\"", s);
    None
}

/// Parse a calendar date column (`YYYY-MM-DD`).
///
/// Full timestamps are also accepted and truncated to their UTC date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    parse_timestamp(s).map(|dt| dt.date_naive())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
