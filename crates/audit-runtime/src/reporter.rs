//! One run of the query-history reporter.
//!
//! Validates the reporter section, fetches the daily table through the given
//! [`QuerySource`], and logs the rendered report. Configuration problems abort
//! the run before any query is issued; source failures do not abort it.

use tracing::{debug, error, info};

use audit_core::config::ReporterSection;
use audit_core::models::ReportWindow;
use audit_data::history::{fetch_daily_stats, HistoryRequest, TOOL_NAME};
use audit_data::source::QuerySource;

use crate::report::{build_report, Report};

/// Run the reporter for `project_id`.
///
/// `days_override` replaces the configured window length when set. Returns the
/// logged report, or `None` when the configuration was rejected.
pub fn run_reporter<S: QuerySource + ?Sized>(
    project_id: &str,
    section: &ReporterSection,
    days_override: Option<u32>,
    source: &S,
) -> Option<Report> {
    info!("Starting {} for project '{}'.", TOOL_NAME, project_id);

    let mut config = match section.validate() {
        Ok(config) => config,
        Err(e) => {
            error!("{}: {}. Aborting report.", TOOL_NAME, e);
            return None;
        }
    };

    if let Some(days) = days_override {
        match ReportWindow::new(days) {
            Ok(window) => {
                debug!(days, "report window overridden from the command line");
                config.window = window;
            }
            Err(e) => {
                error!("{}: {}. Aborting report.", TOOL_NAME, e);
                return None;
            }
        }
    }

    let num_days = config.window.num_days();
    info!(
        "{} - Last {} Days from Job History for region {} ---",
        TOOL_NAME, num_days, config.reporting_region
    );

    let request = HistoryRequest::from_config(project_id, &config);
    let table = fetch_daily_stats(&request, config.window, source);

    let report = build_report(project_id, &config, num_days, &table);
    report.log();
    Some(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
