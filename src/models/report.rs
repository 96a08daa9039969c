//! Run and per-company reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AtsType, Detection, Job, Sighting};

/// A matched job with its dedup status and optional score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(flatten)]
    pub job: Job,
    pub status: Sighting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl JobRecord {
    pub fn new(job: Job, status: Sighting) -> Self {
        Self {
            job,
            status,
            score: None,
            reasoning: None,
        }
    }
}

/// Outcome of one company pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompanyStatus {
    Success,
    /// Some or all postings could not be fetched
    Partial { reason: String },
    /// The pipeline produced nothing usable
    Failed { error: String },
}

impl CompanyStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CompanyStatus::Success)
    }
}

/// Everything one company contributed to a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyReport {
    pub company: String,
    pub ats_type: AtsType,
    pub detection: Option<Detection>,
    pub fetch_url: String,
    #[serde(flatten)]
    pub status: CompanyStatus,
    /// The adapter or crawler returned postings, possibly truncated
    #[serde(default)]
    pub crawled: bool,
    /// Postings returned by the adapter or crawler
    pub fetched: usize,
    /// Postings that passed the filter
    pub matched: usize,
    pub new: usize,
    pub updated: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Matched jobs in discovery order
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CompanyReport {
    pub fn new(company: impl Into<String>, ats_type: AtsType, fetch_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            company: company.into(),
            ats_type,
            detection: None,
            fetch_url: fetch_url.into(),
            status: CompanyStatus::Success,
            crawled: false,
            fetched: 0,
            matched: 0,
            new: 0,
            updated: 0,
            warnings: Vec::new(),
            jobs: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Mark the company failed and drop any jobs it collected.
    pub fn fail(mut self, error: impl ToString) -> Self {
        self.status = CompanyStatus::Failed {
            error: error.to_string(),
        };
        self.jobs.clear();
        self.matched = 0;
        self.new = 0;
        self.updated = 0;
        self.finished_at = Utc::now();
        self
    }

    /// Downgrade to partial, keeping the first reason.
    pub fn partial(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.status.is_success() {
            self.status = CompanyStatus::Partial {
                reason: reason.clone(),
            };
        }
        self.warnings.push(reason);
    }

    /// Jobs worth reporting this run.
    pub fn fresh_jobs(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.iter().filter(|r| r.status.is_fresh())
    }
}

/// Summary of a whole run, written as `run-<HHMMSS>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub companies: Vec<CompanyReport>,
    /// New and updated jobs, best score first
    #[serde(default)]
    pub ranked: Vec<JobRecord>,
}

impl RunReport {
    pub fn total_fetched(&self) -> usize {
        self.companies.iter().map(|c| c.fetched).sum()
    }

    pub fn total_matched(&self) -> usize {
        self.companies.iter().map(|c| c.matched).sum()
    }

    pub fn total_new(&self) -> usize {
        self.companies.iter().map(|c| c.new).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.companies.iter().map(|c| c.updated).sum()
    }

    pub fn failed(&self) -> usize {
        self.companies
            .iter()
            .filter(|c| matches!(c.status, CompanyStatus::Failed { .. }))
            .count()
    }

    pub fn partial(&self) -> usize {
        self.companies
            .iter()
            .filter(|c| matches!(c.status, CompanyStatus::Partial { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_keeps_first_reason() {
        let mut report = CompanyReport::new("OpenAI", AtsType::Ashby, "https://jobs.ashbyhq.com/openai");
        report.partial("page ceiling reached");
        report.partial("deadline reached");

        assert_eq!(
            report.status,
            CompanyStatus::Partial {
                reason: "page ceiling reached".into()
            }
        );
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_status_serializes_flat() {
        let report = CompanyReport::new("Uber", AtsType::Uber, "https://www.uber.com/careers").fail("boom");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
    }
}
