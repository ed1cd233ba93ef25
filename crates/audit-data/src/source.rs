//! The query-source seam.
//!
//! A [`QuerySource`] runs one parameterized history query and yields per-day
//! rows. Rows are handed back as an iterator so a source can surface a failure
//! part-way through its results; everything already yielded stays valid.

use audit_core::error::SourceError;
use audit_core::models::HistoryRow;

/// Name of the INT64 parameter carrying the report window length.
pub const REPORT_DAYS_PARAM: &str = "num_report_days";

/// Rows produced by a successful [`QuerySource::execute`] call.
pub type Rows = Box<dyn Iterator<Item = Result<HistoryRow, SourceError>>>;

/// A named, typed query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameter {
    pub name: String,
    /// Standard SQL type name, e.g. `"INT64"`.
    pub param_type: String,
    pub value: String,
}

impl QueryParameter {
    pub fn int64(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            param_type: "INT64".to_string(),
            value: value.to_string(),
        }
    }

    /// Integer value of the parameter, if it holds one.
    pub fn as_i64(&self) -> Option<i64> {
        self.value.parse().ok()
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub use_query_cache: bool,
    /// Execution location (region) of the job.
    pub location: String,
}

/// Something that can run a history query and return per-day rows.
pub trait QuerySource {
    fn execute(
        &self,
        query: &str,
        params: &[QueryParameter],
        options: &QueryOptions,
    ) -> Result<Rows, SourceError>;
}

/// Look up an integer parameter by name.
pub fn find_i64_param(params: &[QueryParameter], name: &str) -> Option<i64> {
    params
        .iter()
        .find(|p| p.name == name)
        .and_then(QueryParameter::as_i64)
}
