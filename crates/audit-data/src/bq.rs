//! [`QuerySource`] backed by the `bq` command-line tool.
//!
//! Credentials, project defaults and transport are all left to the CLI; this
//! module only builds the argument list, runs the process and maps its JSON
//! output (or error text) back into rows and [`SourceError`]s.

use std::process::Command;

use regex::Regex;
use tracing::debug;

use audit_core::error::SourceError;
use audit_core::models::HistoryRow;

use crate::source::{QueryOptions, QueryParameter, QuerySource, Rows};

/// Upper bound on rows requested from the CLI; history queries return one row per day.
const MAX_ROWS: u32 = 10_000;

/// Runs history queries through `bq query`.
#[derive(Debug, Clone)]
pub struct BqCliSource {
    program: String,
}

impl BqCliSource {
    /// Use the `bq` binary at `program` (a bare name is looked up on `PATH`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to the CLI for one query, excluding the program name.
    pub fn build_args(
        query: &str,
        params: &[QueryParameter],
        options: &QueryOptions,
    ) -> Vec<String> {
        let mut args = vec![
            "query".to_string(),
            "--quiet".to_string(),
            "--nouse_legacy_sql".to_string(),
            "--format=json".to_string(),
            format!("--max_rows={}", MAX_ROWS),
            format!("--location={}", options.location),
        ];
        args.push(if options.use_query_cache {
            "--use_cache".to_string()
        } else {
            "--nouse_cache".to_string()
        });
        for p in params {
            args.push(format!("--parameter={}:{}:{}", p.name, p.param_type, p.value));
        }
        args.push(query.to_string());
        args
    }
}

impl Default for BqCliSource {
    fn default() -> Self {
        Self::new("bq")
    }
}

impl QuerySource for BqCliSource {
    fn execute(
        &self,
        query: &str,
        params: &[QueryParameter],
        options: &QueryOptions,
    ) -> Result<Rows, SourceError> {
        let args = Self::build_args(query, params, options);
        debug!(program = %self.program, location = %options.location, "running bq query");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| SourceError::other(format!("failed to run '{}': {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let text = format!("{}\n{}", stderr.trim(), stdout.trim());
            return Err(classify_bq_error(text.trim(), output.status.code()));
        }

        let rows = parse_bq_rows(&stdout)?;
        debug!(rows = rows.len(), "bq query returned");
        Ok(Box::new(rows.into_iter()))
    }
}

/// Map the CLI's error text onto a failure category.
pub fn classify_bq_error(text: &str, exit_code: Option<i32>) -> SourceError {
    let not_found = Regex::new(r"(?i)\bnot found:").expect("regex is valid");
    let denied =
        Regex::new(r"(?i)access denied|permission|forbidden|\b403\b").expect("regex is valid");

    let message = if text.is_empty() {
        format!("bq exited with status {:?}", exit_code)
    } else {
        text.to_string()
    };

    if not_found.is_match(text) {
        SourceError::not_found(message)
    } else if denied.is_match(text) {
        SourceError::permission_denied(message)
    } else {
        SourceError::other(message)
    }
}

/// Decode `bq --format=json` output into rows.
///
/// A query with no results prints nothing (or `[]`). Each row is decoded
/// lazily so a malformed row fails only from that point on.
pub fn parse_bq_rows(stdout: &str) -> Result<Vec<Result<HistoryRow, SourceError>>, SourceError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<serde_json::Value> = serde_json::from_str(trimmed)
        .map_err(|e| SourceError::other(format!("unexpected bq output: {}", e)))?;

    Ok(values
        .into_iter()
        .map(|v| {
            serde_json::from_value::<HistoryRow>(v)
                .map_err(|e| SourceError::other(format!("malformed history row: {}", e)))
        })
        .collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
