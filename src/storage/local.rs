//! Local filesystem result storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/{profile}/
//! ├── companies.json        # Registry state between runs
//! └── YYYY-MM-DD/
//!     ├── openai.json       # Matched jobs for one company
//!     ├── scale-ai.json
//!     └── run-093012.json   # Run summary
//! ```
//!
//! A new date folder is created per day, so results from earlier days are
//! never overwritten. Every write goes to a temp file and is renamed into place.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CompanyReport, JobRecord, RunReport};
use crate::storage::{ResultStorage, WriteMetadata};
use crate::utils::slugify;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create storage rooted at the profile directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn company_key(day: NaiveDate, company: &str) -> String {
        format!("{}/{}.json", day.format("%Y-%m-%d"), slugify(company))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<WriteMetadata> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await?;
        Ok(WriteMetadata {
            path: self.path(key),
            bytes: bytes.len(),
            timestamp: Utc::now(),
        })
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ResultStorage for LocalStorage {
    async fn write_company(&self, day: NaiveDate, report: &CompanyReport) -> Result<WriteMetadata> {
        let key = Self::company_key(day, &report.company);
        let meta = self.write_json(&key, &report.jobs).await?;
        log::debug!("{} jobs for {} written to {}", report.jobs.len(), report.company, key);
        Ok(meta)
    }

    async fn write_run(&self, run: &RunReport) -> Result<WriteMetadata> {
        let key = format!(
            "{}/run-{}.json",
            run.started_at.format("%Y-%m-%d"),
            run.started_at.format("%H%M%S")
        );
        let meta = self.write_json(&key, run).await?;
        log::info!("Run summary written to {}", meta.path.display());
        Ok(meta)
    }

    async fn load_company(&self, day: NaiveDate, company: &str) -> Result<Vec<JobRecord>> {
        let key = Self::company_key(day, company);
        match self.read_json(&key).await? {
            Some(jobs) => Ok(jobs),
            None => {
                log::warn!("No results found for {} on {}", company, day);
                Ok(Vec::new())
            }
        }
    }
}
