//! Shared building blocks for the GCP audit tools.
//!
//! Holds the error taxonomy, the configuration model, the command-line
//! settings, the daily-usage data model and the formatting helpers used by
//! the report output.

pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
