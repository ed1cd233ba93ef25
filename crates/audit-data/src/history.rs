//! Daily usage aggregation over a rolling window of query history.
//!
//! [`fetch_daily_stats`] builds the history query for a project and region,
//! runs it through a [`QuerySource`], and folds the returned rows into a
//! [`DailyStatsTable`] that always covers every day of the window. Source
//! failures are logged and leave the affected days at zero.

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, error, info, warn};

use audit_core::config::ReporterConfig;
use audit_core::error::{SourceError, SourceErrorKind};
use audit_core::models::{DailyStatsTable, ReportWindow};
use audit_core::time_utils::utc_today;

use crate::source::{QueryOptions, QueryParameter, QuerySource, REPORT_DAYS_PARAM};

/// Placeholder in the query template replaced by the history table name.
pub const TABLE_NAME_PLACEHOLDER: &str = "{info_schema_table_name}";

/// Placeholders in the table template.
pub const PROJECT_ID_PLACEHOLDER: &str = "{project_id}";
pub const REGION_PART_PLACEHOLDER: &str = "{dataset_region_part}";

/// Prefix used in log lines emitted by the reporter.
pub const TOOL_NAME: &str = "BigQuery Count Reporter";

// ── HistoryRequest ────────────────────────────────────────────────────────────

/// Everything needed to address and query one project's job history.
#[derive(Debug, Clone, Copy)]
pub struct HistoryRequest<'a> {
    pub project_id: &'a str,
    pub region: &'a str,
    /// Query text containing [`TABLE_NAME_PLACEHOLDER`].
    pub query_template: &'a str,
    /// Table identifier template with project and region placeholders.
    pub table_template: &'a str,
}

impl<'a> HistoryRequest<'a> {
    pub fn from_config(project_id: &'a str, config: &'a ReporterConfig) -> Self {
        Self {
            project_id,
            region: &config.reporting_region,
            query_template: &config.history_query_template,
            table_template: &config.history_table_template,
        }
    }

    /// Fully-qualified history table identifier.
    pub fn table_name(&self) -> String {
        history_table_name(self.table_template, self.project_id, self.region)
    }

    /// Final query text with the table identifier substituted.
    pub fn query_text(&self) -> String {
        render_query(self.query_template, &self.table_name())
    }
}

// ── Identifier building ───────────────────────────────────────────────────────

/// Normalise a region into its dataset qualifier.
///
/// `"EUROPE_WEST1"` becomes `"region-europe-west1"`.
pub fn region_token(region: &str) -> String {
    format!("region-{}", region.to_lowercase().replace('_', "-"))
}

/// Render the history table identifier for `project_id` and `region`.
pub fn history_table_name(table_template: &str, project_id: &str, region: &str) -> String {
    table_template
        .replace(PROJECT_ID_PLACEHOLDER, project_id)
        .replace(REGION_PART_PLACEHOLDER, &region_token(region))
}

/// Substitute the table identifier into the query template.
///
/// Placeholders that remain unresolved afterwards are logged as a warning;
/// the query is still returned so the source can report the real failure.
pub fn render_query(query_template: &str, table_name: &str) -> String {
    if !query_template.contains(TABLE_NAME_PLACEHOLDER) {
        warn!(
            "{}: query template has no {} placeholder; running it unchanged",
            TOOL_NAME, TABLE_NAME_PLACEHOLDER
        );
    }
    let query = query_template.replace(TABLE_NAME_PLACEHOLDER, table_name);

    let re = Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").expect("regex is valid");
    let leftover: Vec<&str> = re.find_iter(&query).map(|m| m.as_str()).collect();
    if !leftover.is_empty() {
        warn!("{}: unresolved placeholders in query: {:?}", TOOL_NAME, leftover);
    }

    query
}

// ── Fetch ─────────────────────────────────────────────────────────────────────

/// Fetch per-day query counts and billed bytes for the window ending today (UTC).
///
/// Never fails: the returned table always has one entry per day of `window`,
/// oldest first, and days the source did not report stay at zero.
pub fn fetch_daily_stats<S: QuerySource + ?Sized>(
    request: &HistoryRequest<'_>,
    window: ReportWindow,
    source: &S,
) -> DailyStatsTable {
    fetch_daily_stats_on(utc_today(), request, window, source)
}

/// [`fetch_daily_stats`] with an explicit "today".
pub fn fetch_daily_stats_on<S: QuerySource + ?Sized>(
    today: NaiveDate,
    request: &HistoryRequest<'_>,
    window: ReportWindow,
    source: &S,
) -> DailyStatsTable {
    let mut table = DailyStatsTable::new(window, today);

    let table_name = request.table_name();
    let query = request.query_text();
    let params = [QueryParameter::int64(
        REPORT_DAYS_PARAM,
        i64::from(window.num_days()),
    )];
    let options = QueryOptions {
        use_query_cache: false,
        location: request.region.to_string(),
    };

    info!(
        "{}: Fetching query history from {} for the last {} days.",
        TOOL_NAME,
        table_name,
        window.num_days()
    );
    debug!("{}: Executing query: {}", TOOL_NAME, query.trim());

    let rows = match source.execute(&query, &params, &options) {
        Ok(rows) => rows,
        Err(e) => {
            log_source_error(&e, &table_name, request.region);
            return table;
        }
    };

    let mut recorded = 0usize;
    let mut ignored = 0usize;
    for row in rows {
        match row {
            Ok(row) => {
                if table.record(row.job_date, row.num_queries, row.total_bytes_billed_for_queries)
                {
                    recorded += 1;
                } else {
                    debug!(
                        "{}: ignoring row for {} outside the report window",
                        TOOL_NAME, row.job_date
                    );
                    ignored += 1;
                }
            }
            Err(e) => {
                log_source_error(&e, &table_name, request.region);
                return table;
            }
        }
    }

    debug!(recorded, ignored, "history rows processed");
    info!(
        "{}: Successfully fetched and processed query history.",
        TOOL_NAME
    );
    table
}

/// Log a source failure with a hint matching its category.
fn log_source_error(err: &SourceError, table_name: &str, region: &str) {
    match err.kind {
        SourceErrorKind::NotFound => error!(
            "{}: Could not find {}. Ensure region '{}' is correct, the BigQuery API is enabled, \
             the project ID is cased correctly, and the history table template in the \
             configuration is valid. Error: {}",
            TOOL_NAME, table_name, region, err.message
        ),
        SourceErrorKind::PermissionDenied => error!(
            "{}: Permission denied to query {}. Requires 'bigquery.jobs.listAll'. Error: {}",
            TOOL_NAME, table_name, err.message
        ),
        SourceErrorKind::Other => error!(
            "{}: An unexpected error occurred while fetching query history: {}",
            TOOL_NAME, err
        ),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Rows;
    use audit_core::models::HistoryRow;
    use std::cell::RefCell;

    const QUERY: &str = "SELECT DATE(creation_time) AS job_date FROM `{info_schema_table_name}` \
                         WHERE creation_time >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL @num_report_days DAY)";
    const TABLE: &str = "{project_id}.{dataset_region_part}.INFORMATION_SCHEMA.JOBS_BY_PROJECT";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn request() -> HistoryRequest<'static> {
        HistoryRequest {
            project_id: "demo-project",
            region: "EUROPE_WEST1",
            query_template: QUERY,
            table_template: TABLE,
        }
    }

    fn window(n: u32) -> ReportWindow {
        ReportWindow::new(n).unwrap()
    }

    // ── Test doubles ──────────────────────────────────────────────────────────

    struct StaticSource(Vec<HistoryRow>);

    impl QuerySource for StaticSource {
        fn execute(
            &self,
            _query: &str,
            _params: &[QueryParameter],
            _options: &QueryOptions,
        ) -> Result<Rows, SourceError> {
            Ok(Box::new(self.0.clone().into_iter().map(Ok)))
        }
    }

    struct FailingSource(SourceErrorKind);

    impl QuerySource for FailingSource {
        fn execute(
            &self,
            _query: &str,
            _params: &[QueryParameter],
            _options: &QueryOptions,
        ) -> Result<Rows, SourceError> {
            Err(SourceError::new(self.0, "simulated failure"))
        }
    }

    /// Yields its rows, then fails.
    struct BrokenStreamSource(Vec<HistoryRow>);

    impl QuerySource for BrokenStreamSource {
        fn execute(
            &self,
            _query: &str,
            _params: &[QueryParameter],
            _options: &QueryOptions,
        ) -> Result<Rows, SourceError> {
            let rows = self
                .0
                .clone()
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(SourceError::other("connection reset"))));
            Ok(Box::new(rows))
        }
    }

    #[derive(Default)]
    struct RecordingSource {
        calls: RefCell<Vec<(String, Vec<QueryParameter>, QueryOptions)>>,
    }

    impl QuerySource for RecordingSource {
        fn execute(
            &self,
            query: &str,
            params: &[QueryParameter],
            options: &QueryOptions,
        ) -> Result<Rows, SourceError> {
            self.calls
                .borrow_mut()
                .push((query.to_string(), params.to_vec(), options.clone()));
            Ok(Box::new(std::iter::empty()))
        }
    }

    // ── Identifier building ───────────────────────────────────────────────────

    #[test]
    fn test_region_token_normalises() {
        assert_eq!(region_token("EU"), "region-eu");
        assert_eq!(region_token("US_CENTRAL1"), "region-us-central1");
        assert_eq!(region_token("europe-west1"), "region-europe-west1");
    }

    #[test]
    fn test_history_table_name() {
        assert_eq!(
            request().table_name(),
            "demo-project.region-europe-west1.INFORMATION_SCHEMA.JOBS_BY_PROJECT"
        );
    }

    #[test]
    fn test_render_query_substitutes_table() {
        let query = request().query_text();
        assert!(query.contains(
            "`demo-project.region-europe-west1.INFORMATION_SCHEMA.JOBS_BY_PROJECT`"
        ));
        assert!(!query.contains(TABLE_NAME_PLACEHOLDER));
        assert!(query.contains("@num_report_days"));
    }

    #[test]
    fn test_render_query_without_placeholder_is_unchanged() {
        assert_eq!(render_query("SELECT 1", "t"), "SELECT 1");
    }

    // ── Fetch ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_fetch_passes_query_parameters_and_options() {
        let source = RecordingSource::default();
        fetch_daily_stats_on(d(2024, 1, 3), &request(), window(5), &source);

        let calls = source.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (query, params, options) = &calls[0];
        assert_eq!(query, &request().query_text());
        assert!(query.contains("demo-project.region-europe-west1"));
        assert_eq!(params, &vec![QueryParameter::int64("num_report_days", 5)]);
        assert!(!options.use_query_cache);
        assert_eq!(options.location, "EUROPE_WEST1");
    }

    #[test]
    fn test_fetch_end_to_end_three_days() {
        let source = StaticSource(vec![
            HistoryRow::new(d(2024, 1, 1), 5, 1024),
            HistoryRow::new(d(2024, 1, 3), 5, 2048),
        ]);
        let table = fetch_daily_stats_on(d(2024, 1, 3), &request(), window(3), &source);

        let days: Vec<(NaiveDate, u64, u64)> = table
            .iter()
            .map(|s| (s.date, s.query_count, s.total_bytes_billed))
            .collect();
        assert_eq!(
            days,
            vec![
                (d(2024, 1, 1), 5, 1024),
                (d(2024, 1, 2), 0, 0),
                (d(2024, 1, 3), 5, 2048),
            ]
        );
    }

    #[test]
    fn test_fetch_ignores_rows_outside_window() {
        let source = StaticSource(vec![
            HistoryRow::new(d(2023, 12, 31), 99, 99),
            HistoryRow::new(d(2024, 1, 2), 1, 10),
            HistoryRow::new(d(2024, 1, 4), 99, 99),
        ]);
        let table = fetch_daily_stats_on(d(2024, 1, 3), &request(), window(3), &source);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(d(2024, 1, 2)).unwrap().query_count, 1);
        assert_eq!(table.iter().map(|s| s.query_count).sum::<u64>(), 1);
    }

    #[test]
    fn test_fetch_keeps_every_day_on_each_failure_kind() {
        for kind in [
            SourceErrorKind::NotFound,
            SourceErrorKind::PermissionDenied,
            SourceErrorKind::Other,
        ] {
            let table =
                fetch_daily_stats_on(d(2024, 3, 1), &request(), window(7), &FailingSource(kind));
            assert_eq!(table.len(), 7, "{:?}", kind);
            assert!(table.is_all_zero());
            let dates: Vec<NaiveDate> = table.iter().map(|s| s.date).collect();
            assert_eq!(dates.first(), Some(&d(2024, 2, 24)));
            assert_eq!(dates.last(), Some(&d(2024, 3, 1)));
            assert!(dates.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_fetch_keeps_rows_seen_before_stream_failure() {
        let source = BrokenStreamSource(vec![HistoryRow::new(d(2024, 1, 2), 4, 512)]);
        let table = fetch_daily_stats_on(d(2024, 1, 3), &request(), window(3), &source);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(d(2024, 1, 2)).unwrap().query_count, 4);
        assert_eq!(table.get(d(2024, 1, 3)).unwrap().query_count, 0);
    }

    #[test]
    fn test_fetch_window_ends_today() {
        let table = fetch_daily_stats(&request(), window(2), &StaticSource(vec![]));
        let today = utc_today();
        let last = table.iter().last().unwrap().date;
        // Tolerate the test straddling UTC midnight.
        assert!(last == today || last + chrono::Days::new(1) == today);
        assert_eq!(table.len(), 2);
    }
}
