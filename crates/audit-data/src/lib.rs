//! Query-history ingestion for the audit tools.
//!
//! Defines the [`source::QuerySource`] seam behind which the cloud query
//! service sits, two implementations of it (the `bq` command-line tool and
//! offline JSONL job exports), and the daily-usage aggregator that turns the
//! returned rows into a gap-free per-day table.

pub mod bq;
pub mod export;
pub mod history;
pub mod source;

pub use audit_core as core;
