//! Offline [`QuerySource`] over JSONL job-history exports.
//!
//! Each line of a `.jsonl` file under the export directory is one job record
//! as found in the jobs history view (`creation_time`, `job_type`,
//! `statement_type`, `total_bytes_billed`, optionally `location`). The source
//! evaluates the standard per-day history query locally instead of running
//! the SQL text: query jobs, excluding script parents, in the requested
//! location, created within the last `num_report_days` UTC days, grouped by
//! creation date.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

use audit_core::error::SourceError;
use audit_core::models::HistoryRow;
use audit_core::time_utils::{parse_timestamp, utc_today};

use crate::source::{
    find_i64_param, QueryOptions, QueryParameter, QuerySource, Rows, REPORT_DAYS_PARAM,
};

/// Reads job records from exported JSONL files.
#[derive(Debug, Clone)]
pub struct JobsExportSource {
    dir: PathBuf,
    today: Option<NaiveDate>,
}

impl JobsExportSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            today: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

impl QuerySource for JobsExportSource {
    fn execute(
        &self,
        query: &str,
        params: &[QueryParameter],
        options: &QueryOptions,
    ) -> Result<Rows, SourceError> {
        debug!(
            "evaluating history query offline over {} ({} chars of SQL not executed)",
            self.dir.display(),
            query.len()
        );

        let num_days = find_i64_param(params, REPORT_DAYS_PARAM)
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                SourceError::other(format!("missing or invalid @{} parameter", REPORT_DAYS_PARAM))
            })?;
        let today = self.today.unwrap_or_else(utc_today);
        let since = today
            .checked_sub_days(Days::new(num_days as u64 - 1))
            .unwrap_or(NaiveDate::MIN);

        let files = find_export_files(&self.dir)?;
        if files.is_empty() {
            warn!("No JSONL job exports found in {}", self.dir.display());
        }

        let filter = JobFilter {
            location: normalise_location(&options.location),
            since,
            until: today,
        };

        let mut per_day: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
        for file in &files {
            process_export_file(file, &filter, &mut per_day)?;
        }

        let rows: Vec<Result<HistoryRow, SourceError>> = per_day
            .into_iter()
            .map(|(date, (count, bytes))| Ok(HistoryRow::new(date, count, bytes)))
            .collect();
        Ok(Box::new(rows.into_iter()))
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find all `.jsonl` files recursively under `dir`, sorted by path.
///
/// A missing directory is reported as not-found; an unreadable entry carries
/// the kind of its underlying I/O error.
pub fn find_export_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::not_found(format!(
            "job export directory {} does not exist",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => SourceError::from(io),
            None => SourceError::other(format!("filesystem loop under {}", dir.display())),
        })?;
        let is_jsonl = entry
            .path()
            .extension()
            .map(|ext| ext == "jsonl")
            .unwrap_or(false);
        if entry.file_type().is_file() && is_jsonl {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

// ── Record filtering ──────────────────────────────────────────────────────────

struct JobFilter {
    location: String,
    since: NaiveDate,
    until: NaiveDate,
}

/// The parts of a job record the history query looks at.
#[derive(Debug, PartialEq, Eq)]
struct JobRecord {
    date: NaiveDate,
    bytes_billed: u64,
}

fn process_export_file(
    path: &Path,
    filter: &JobFilter,
    per_day: &mut BTreeMap<NaiveDate, (u64, u64)>,
) -> Result<(), SourceError> {
    let file = std::fs::File::open(path).map_err(|e| {
        let mut err = SourceError::from(e);
        err.message = format!("{}: {}", path.display(), err.message);
        err
    })?;

    let mut lines_read = 0u64;
    let mut jobs_counted = 0u64;
    for line in std::io::BufReader::new(file).lines() {
        let line = line.map_err(SourceError::from)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        lines_read += 1;

        let data: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                debug!("Failed to parse JSON line in {}: {}", path.display(), e);
                continue;
            }
        };

        if let Some(job) = map_to_job(&data, filter) {
            let slot = per_day.entry(job.date).or_insert((0, 0));
            slot.0 = slot.0.saturating_add(1);
            slot.1 = slot.1.saturating_add(job.bytes_billed);
            jobs_counted += 1;
        }
    }

    debug!(
        "File {}: {} lines read, {} query jobs counted",
        path.display(),
        lines_read,
        jobs_counted
    );
    Ok(())
}

/// Apply the history query's predicates to one raw record.
fn map_to_job(data: &serde_json::Value, filter: &JobFilter) -> Option<JobRecord> {
    let job_type = data.get("job_type").and_then(|v| v.as_str()).unwrap_or("");
    if !job_type.eq_ignore_ascii_case("QUERY") {
        return None;
    }

    let statement_type = data.get("statement_type").and_then(|v| v.as_str());
    if statement_type.is_some_and(|s| s.eq_ignore_ascii_case("SCRIPT")) {
        return None;
    }

    if let Some(location) = data.get("location").and_then(|v| v.as_str()) {
        if normalise_location(location) != filter.location {
            return None;
        }
    }

    let created = parse_timestamp(data.get("creation_time")?.as_str()?)?;
    let date = created.date_naive();
    if date < filter.since || date > filter.until {
        return None;
    }

    Some(JobRecord {
        date,
        bytes_billed: extract_u64(data.get("total_bytes_billed")),
    })
}

/// Read a counter that may be a JSON number, a numeric string or absent.
fn extract_u64(value: Option<&serde_json::Value>) -> u64 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn normalise_location(location: &str) -> String {
    location.trim().to_lowercase().replace('_', "-")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
