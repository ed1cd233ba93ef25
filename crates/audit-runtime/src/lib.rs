//! Reporting layer for the audit tools.
//!
//! Folds a fetched daily-usage table into summary statistics, renders the
//! human-readable report, and drives one reporter run from validated
//! configuration through to logged output.

pub mod report;
pub mod reporter;

pub use audit_core as core;
pub use audit_data as data;
