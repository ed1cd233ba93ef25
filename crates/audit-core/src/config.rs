//! JSON configuration file for the audit tools.
//!
//! The file carries the project id plus one section per tool. Sections are
//! deserialized loosely (every key optional) and validated into typed configs
//! once, at the entry of the tool that consumes them.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AuditError, Result};
use crate::models::ReportWindow;

// ── AuditConfig ───────────────────────────────────────────────────────────────

/// Top-level contents of `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    /// Query-history reporter section.
    #[serde(default, alias = "bigquery")]
    pub bigquery_cost_reporter: Option<ReporterSection>,
}

impl AuditConfig {
    /// Default location: `~/.gcp-audit/config.json`.
    pub fn default_path() -> PathBuf {
        Self::default_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn default_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".gcp-audit").join("config.json")
    }

    /// Read and parse the configuration file at `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AuditError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AuditConfig = serde_json::from_str(&content)?;
        tracing::info!("Configuration successfully loaded from '{}'", path.display());
        Ok(config)
    }

    /// The configured project id, rejecting a missing or blank value.
    pub fn require_project_id(&self) -> Result<&str> {
        non_blank(self.project_id.as_deref()).ok_or(AuditError::MissingConfigKey("project_id"))
    }
}

// ── ReporterSection ───────────────────────────────────────────────────────────

/// Raw reporter section as written in the file; see [`ReporterConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReporterSection {
    #[serde(default)]
    pub reporting_region: Option<String>,
    #[serde(default)]
    pub report_days_history: Option<u32>,
    #[serde(default, alias = "information_schema_query_template")]
    pub history_query_template: Option<String>,
    #[serde(default, alias = "information_schema_table_template")]
    pub history_table_template: Option<String>,
}

impl ReporterSection {
    /// Check required keys and build the typed config.
    ///
    /// Keys are checked in the order region, query template, table template;
    /// the first missing one is reported.
    pub fn validate(&self) -> Result<ReporterConfig> {
        let reporting_region = non_blank(self.reporting_region.as_deref())
            .ok_or(AuditError::MissingConfigKey("reporting_region"))?;
        let history_query_template = non_blank(self.history_query_template.as_deref())
            .ok_or(AuditError::MissingConfigKey("history_query_template"))?;
        let history_table_template = non_blank(self.history_table_template.as_deref())
            .ok_or(AuditError::MissingConfigKey("history_table_template"))?;
        let window = ReportWindow::new(
            self.report_days_history
                .unwrap_or(ReportWindow::DEFAULT_DAYS),
        )?;

        Ok(ReporterConfig {
            reporting_region: reporting_region.to_string(),
            window,
            history_query_template: history_query_template.to_string(),
            history_table_template: history_table_template.to_string(),
        })
    }
}

// ── ReporterConfig ────────────────────────────────────────────────────────────

/// Validated settings for the query-history reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Region (job execution location) whose history is read, e.g. `"EU"`.
    pub reporting_region: String,
    /// Number of days covered by the report.
    pub window: ReportWindow,
    /// Query text with an `{info_schema_table_name}` placeholder.
    pub history_query_template: String,
    /// Table identifier with `{project_id}` and `{dataset_region_part}` placeholders.
    pub history_table_template: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn full_section() -> ReporterSection {
        ReporterSection {
            reporting_region: Some("EU".to_string()),
            report_days_history: Some(14),
            history_query_template: Some("SELECT 1 FROM `{info_schema_table_name}`".to_string()),
            history_table_template: Some(
                "{project_id}.{dataset_region_part}.INFORMATION_SCHEMA.JOBS_BY_PROJECT"
                    .to_string(),
            ),
        }
    }

    #[test]
    fn test_validate_full_section() {
        let config = full_section().validate().expect("valid");
        assert_eq!(config.reporting_region, "EU");
        assert_eq!(config.window.num_days(), 14);
    }

    #[test]
    fn test_validate_defaults_to_seven_days() {
        let section = ReporterSection {
            report_days_history: None,
            ..full_section()
        };
        assert_eq!(section.validate().unwrap().window.num_days(), 7);
    }

    #[test]
    fn test_validate_missing_region() {
        let section = ReporterSection {
            reporting_region: None,
            ..full_section()
        };
        assert!(matches!(
            section.validate(),
            Err(AuditError::MissingConfigKey("reporting_region"))
        ));
    }

    #[test]
    fn test_validate_blank_region_counts_as_missing() {
        let section = ReporterSection {
            reporting_region: Some("  ".to_string()),
            ..full_section()
        };
        assert!(matches!(
            section.validate(),
            Err(AuditError::MissingConfigKey("reporting_region"))
        ));
    }

    #[test]
    fn test_validate_missing_templates() {
        let section = ReporterSection {
            history_query_template: None,
            ..full_section()
        };
        assert!(matches!(
            section.validate(),
            Err(AuditError::MissingConfigKey("history_query_template"))
        ));

        let section = ReporterSection {
            history_table_template: None,
            ..full_section()
        };
        assert!(matches!(
            section.validate(),
            Err(AuditError::MissingConfigKey("history_table_template"))
        ));
    }

    #[test]
    fn test_validate_zero_days() {
        let section = ReporterSection {
            report_days_history: Some(0),
            ..full_section()
        };
        assert!(matches!(
            section.validate(),
            Err(AuditError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_validate_days_upper_bound() {
        let section = ReporterSection {
            report_days_history: Some(3650),
            ..full_section()
        };
        assert_eq!(section.validate().unwrap().window.num_days(), 3650);

        let section = ReporterSection {
            report_days_history: Some(3651),
            ..full_section()
        };
        assert!(matches!(
            section.validate(),
            Err(AuditError::InvalidWindow(3651))
        ));
    }

    #[test]
    fn test_load_from_accepts_long_key_names() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "project_id": "demo-project",
                "bigquery_cost_reporter": {
                    "reporting_region": "europe_west1",
                    "information_schema_query_template": "SELECT * FROM `{info_schema_table_name}`",
                    "information_schema_table_template": "{project_id}.{dataset_region_part}.INFORMATION_SCHEMA.JOBS"
                }
            }"#,
        )
        .expect("write");

        let config = AuditConfig::load_from(&path).expect("load");
        assert_eq!(config.require_project_id().unwrap(), "demo-project");
        let reporter = config.bigquery_cost_reporter.unwrap().validate().unwrap();
        assert_eq!(reporter.reporting_region, "europe_west1");
        assert!(reporter.history_query_template.contains("{info_schema_table_name}"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = AuditConfig::load_from(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, AuditError::FileRead { .. }));
    }

    #[test]
    fn test_load_from_invalid_json() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            AuditConfig::load_from(&path),
            Err(AuditError::JsonParse(_))
        ));
    }

    #[test]
    fn test_require_project_id_missing() {
        let config = AuditConfig::default();
        assert!(matches!(
            config.require_project_id(),
            Err(AuditError::MissingConfigKey("project_id"))
        ));
    }

    #[test]
    fn test_default_path_in() {
        let tmp = TempDir::new().expect("tempdir");
        assert_eq!(
            AuditConfig::default_path_in(tmp.path()),
            tmp.path().join(".gcp-audit").join("config.json")
        );
    }
}
