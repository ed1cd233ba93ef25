use clap::Parser;
use std::path::PathBuf;

use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::models::ReportWindow;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Audit and usage reporting for a GCP project
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gcp-audit",
    about = "Audit and usage reporting for a GCP project",
    version
)]
pub struct Settings {
    /// Path to the configuration JSON file (defaults to ~/.gcp-audit/config.json)
    #[arg(long, env = "GCP_AUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose (DEBUG level) logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Append log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Where query history is read from
    #[arg(long, default_value = "bq", value_parser = ["bq", "export"])]
    pub source: String,

    /// Directory of JSONL job-history exports (required with --source export)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Path to the bq command-line tool
    #[arg(long, default_value = "bq")]
    pub bq_path: String,

    /// Override the number of days covered by the report (1-3650)
    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(ReportWindow::MAX_DAYS))
    )]
    pub days: Option<u32>,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Reject flag combinations clap cannot express on its own.
    pub fn validate(&self) -> Result<()> {
        if self.source == "export" && self.export_dir.is_none() {
            return Err(AuditError::Config(
                "--export-dir is required with --source export".to_string(),
            ));
        }
        Ok(())
    }

    /// The configuration file to load: `--config` if given, else the default.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(AuditConfig::default_path)
    }

    /// Log level after applying `--verbose`.
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
