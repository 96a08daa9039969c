//! Storage for crawl results and seen postings.
//!
//! - Results: per-company JSON arrays and a run summary, one folder per day
//!   (`LocalStorage`)
//! - Dedup: SQLite record of every posting seen across runs (`DedupStore`)

pub mod local;
pub mod seen;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{CompanyReport, JobRecord, RunReport};

// Re-export for convenience
pub use local::LocalStorage;
pub use seen::{DedupStore, StoreStats, content_hash};

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// File that was written
    pub path: PathBuf,
    /// Serialized size
    pub bytes: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Trait for result storage backends.
#[async_trait]
pub trait ResultStorage: Send + Sync {
    /// Write one company's matched jobs for `day`.
    async fn write_company(&self, day: NaiveDate, report: &CompanyReport) -> Result<WriteMetadata>;

    /// Write the run summary.
    async fn write_run(&self, run: &RunReport) -> Result<WriteMetadata>;

    /// Load one company's matched jobs for `day`.
    async fn load_company(&self, day: NaiveDate, company: &str) -> Result<Vec<JobRecord>>;
}
