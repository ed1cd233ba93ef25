mod bootstrap;

use anyhow::Result;
use audit_core::config::AuditConfig;
use audit_core::settings::Settings;
use audit_runtime::reporter::run_reporter;
use clap::Parser;

fn main() -> Result<()> {
    let settings = Settings::parse();
    if let Err(e) = settings.validate() {
        eprintln!("{}", e);
        std::process::exit(2);
    }

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_ref())?;

    tracing::info!("gcp-audit v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = settings.config_path();
    let config = match AuditConfig::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("CRITICAL: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    let project_id = match config.require_project_id() {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("CRITICAL: {} ({}). Exiting.", e, config_path.display());
            std::process::exit(1);
        }
    };

    tracing::info!("Script starting for GCP Project ID: {}", project_id);

    match &config.bigquery_cost_reporter {
        Some(section) => {
            tracing::info!("===== EXECUTING: Query Count Reporter =====");
            let source = bootstrap::build_source(&settings)?;
            run_reporter(project_id, section, settings.days, source.as_ref());
            tracing::info!("===== Query Count Reporter FINISHED =====");
        }
        None => {
            tracing::warn!(
                "Configuration section 'bigquery_cost_reporter' not found in {}. Skipping.",
                config_path.display()
            );
        }
    }

    tracing::info!("===== All selected tasks finished. =====");
    Ok(())
}
