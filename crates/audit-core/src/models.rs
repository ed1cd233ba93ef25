use chrono::{Days, NaiveDate};
use serde::{de, Deserialize, Deserializer};

use crate::error::{AuditError, Result};
use crate::time_utils::parse_date;

// ── ReportWindow ──────────────────────────────────────────────────────────────

/// A contiguous run of UTC calendar dates ending "today", inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    num_days: u32,
}

impl ReportWindow {
    /// Window length used when the configuration does not specify one.
    pub const DEFAULT_DAYS: u32 = 7;

    /// Longest window accepted, roughly ten years.
    pub const MAX_DAYS: u32 = 3650;

    /// Create a window covering `num_days` days, between 1 and [`Self::MAX_DAYS`].
    pub fn new(num_days: u32) -> Result<Self> {
        if !(1..=Self::MAX_DAYS).contains(&num_days) {
            return Err(AuditError::InvalidWindow(num_days));
        }
        Ok(Self { num_days })
    }

    pub fn num_days(&self) -> u32 {
        self.num_days
    }

    /// First date of the window when it ends on `today`.
    ///
    /// `None` when the window would begin before the earliest representable date.
    pub fn start(&self, today: NaiveDate) -> Option<NaiveDate> {
        today.checked_sub_days(Days::new(u64::from(self.num_days - 1)))
    }

    /// Every date of the window ending on `today`, oldest first.
    ///
    /// Yields exactly `num_days` dates whenever [`Self::start`] is `Some`,
    /// and nothing otherwise.
    pub fn dates(&self, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        let len = self.num_days as usize;
        self.start(today)
            .into_iter()
            .flat_map(move |start| start.iter_days().take(len))
    }
}

impl Default for ReportWindow {
    fn default() -> Self {
        Self {
            num_days: Self::DEFAULT_DAYS,
        }
    }
}

// ── DailyStat ─────────────────────────────────────────────────────────────────

/// Query activity recorded for a single UTC calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub query_count: u64,
    pub total_bytes_billed: u64,
}

impl DailyStat {
    /// A day with no recorded activity.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            query_count: 0,
            total_bytes_billed: 0,
        }
    }
}

// ── DailyStatsTable ───────────────────────────────────────────────────────────

/// Per-day statistics for a report window, oldest first.
///
/// Entries are stored contiguously and addressed by their day offset from the
/// first date, so the table never has gaps, duplicates or dates outside the
/// window it was built for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyStatsTable {
    days: Vec<DailyStat>,
}

impl DailyStatsTable {
    /// Build a zero-valued table with one entry per date of `window` ending on `today`.
    pub fn new(window: ReportWindow, today: NaiveDate) -> Self {
        Self {
            days: window.dates(today).map(DailyStat::empty).collect(),
        }
    }

    /// Overwrite the counters for `date`.
    ///
    /// Returns `false` (and changes nothing) when `date` lies outside the table.
    pub fn record(&mut self, date: NaiveDate, query_count: u64, total_bytes_billed: u64) -> bool {
        match self.index_of(date) {
            Some(idx) => {
                let day = &mut self.days[idx];
                day.query_count = query_count;
                day.total_bytes_billed = total_bytes_billed;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyStat> {
        self.index_of(date).map(|idx| &self.days[idx])
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DailyStat> {
        self.days.iter()
    }

    /// `true` when no day in the table saw a query (vacuously true when empty).
    pub fn is_all_zero(&self) -> bool {
        self.days.iter().all(|d| d.query_count == 0)
    }

    fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let first = self.days.first()?.date;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        (offset < self.days.len()).then_some(offset)
    }
}

impl<'a> IntoIterator for &'a DailyStatsTable {
    type Item = &'a DailyStat;
    type IntoIter = std::slice::Iter<'a, DailyStat>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Totals and busiest day derived from a [`DailyStatsTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total_queries: u64,
    pub total_bytes_billed: u64,
    pub busiest_date: NaiveDate,
    pub busiest_count: u64,
}

// ── HistoryRow ────────────────────────────────────────────────────────────────

/// One per-day row returned by a query-history source.
///
/// Column names follow the standard history query. Counter columns accept JSON
/// numbers as well as numeric strings, and `null` counts as zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryRow {
    #[serde(deserialize_with = "deserialize_date")]
    pub job_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub num_queries: u64,
    #[serde(
        default,
        alias = "total_bytes_billed",
        deserialize_with = "deserialize_count"
    )]
    pub total_bytes_billed_for_queries: u64,
}

impl HistoryRow {
    pub fn new(job_date: NaiveDate, num_queries: u64, total_bytes_billed: u64) -> Self {
        Self {
            job_date,
            num_queries,
            total_bytes_billed_for_queries: total_bytes_billed,
        }
    }
}

fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid job_date \"{}\"", raw)))
}

fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| de::Error::custom(format!("negative count {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| de::Error::custom(format!("invalid count \"{}\": {}", s, e))),
        Some(other) => Err(de::Error::custom(format!("invalid count {}", other))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
