//! Report rendering for a daily-usage table.

use tracing::info;

use audit_core::config::ReporterConfig;
use audit_core::formatting::{format_byte_size, format_report_date};
use audit_core::models::{DailyStatsTable, Summary};
use audit_data::history::TOOL_NAME;

// ── Report ────────────────────────────────────────────────────────────────────

/// Rendered report lines plus the summary they were derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub lines: Vec<String>,
    /// `None` when the window had no activity at all.
    pub summary: Option<Summary>,
}

impl Report {
    /// Emit every line at info level.
    pub fn log(&self) {
        for line in &self.lines {
            info!("{}", line);
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Totals and busiest day of `table`.
///
/// The busiest day is the one with the highest query count; on a tie the
/// later date wins. Returns `None` only for an empty table.
pub fn summarize(table: &DailyStatsTable) -> Option<Summary> {
    let mut total_queries = 0u64;
    let mut total_bytes_billed = 0u64;
    let mut busiest: Option<(chrono::NaiveDate, u64)> = None;

    for day in table {
        total_queries = total_queries.saturating_add(day.query_count);
        total_bytes_billed = total_bytes_billed.saturating_add(day.total_bytes_billed);
        // `>=` on a chronological scan moves ties to the later date.
        if busiest.map_or(true, |(_, max)| day.query_count >= max) {
            busiest = Some((day.date, day.query_count));
        }
    }

    busiest.map(|(busiest_date, busiest_count)| Summary {
        total_queries,
        total_bytes_billed,
        busiest_date,
        busiest_count,
    })
}

// ── build_report ──────────────────────────────────────────────────────────────

/// Render the per-day lines and summary for `table`.
///
/// A table without a single query collapses to one "no activity" line.
pub fn build_report(
    project_id: &str,
    config: &ReporterConfig,
    num_days: u32,
    table: &DailyStatsTable,
) -> Report {
    if table.is_all_zero() {
        return Report {
            lines: vec![format!(
                "{}: No query executions found in job history for project '{}' in region '{}' for the past {}-day period.",
                TOOL_NAME, project_id, config.reporting_region, num_days
            )],
            summary: None,
        };
    }

    let mut lines: Vec<String> = table
        .iter()
        .map(|day| {
            format!(
                "{} for day {}: {} queries, Bytes Billed: {}",
                TOOL_NAME,
                format_report_date(day.date),
                day.query_count,
                format_byte_size(day.total_bytes_billed as f64)
            )
        })
        .collect();

    let summary = summarize(table);
    if let Some(s) = &summary {
        lines.push(format!(
            "{}: Total queries in the last {} days: {}",
            TOOL_NAME, num_days, s.total_queries
        ));
        lines.push(format!(
            "{}: Total bytes billed in the last {} days: {}",
            TOOL_NAME,
            num_days,
            format_byte_size(s.total_bytes_billed as f64)
        ));
        lines.push(format!(
            "{}: Busiest day by query count: {} (with {} queries)",
            TOOL_NAME,
            format_report_date(s.busiest_date),
            s.busiest_count
        ));
    }

    Report { lines, summary }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
