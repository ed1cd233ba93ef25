use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use audit_core::settings::Settings;
use audit_data::bq::BqCliSource;
use audit_data::export::JobsExportSource;
use audit_data::source::QuerySource;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.gcp-audit/`, the home of the default `config.json`, exists.
pub fn ensure_directories() -> anyhow::Result<()> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(home.join(".gcp-audit"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `DEBUG`/`INFO`/`WARNING`/`ERROR`/`CRITICAL` name onto a tracing
/// filter directive. Unknown names pass through unchanged.
pub fn normalise_log_level(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr, or is appended to `log_file` when one is given.
/// Falls back to `"info"` if the level string is not a valid directive.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalise_log_level(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer.is_none().then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Query source selection ─────────────────────────────────────────────────────

/// Build the query source selected by `--source`.
pub fn build_source(settings: &Settings) -> anyhow::Result<Box<dyn QuerySource>> {
    match settings.source.as_str() {
        "export" => {
            let dir = settings
                .export_dir
                .clone()
                .context("--export-dir is required with --source export")?;
            tracing::debug!("reading query history from job exports in {}", dir.display());
            Ok(Box::new(JobsExportSource::new(dir)))
        }
        "bq" => {
            tracing::debug!("reading query history through '{}'", settings.bq_path);
            Ok(Box::new(BqCliSource::new(settings.bq_path.clone())))
        }
        other => anyhow::bail!("unknown query source '{}'", other),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
