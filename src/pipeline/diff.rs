//! Diff calculation against the dedup store.
//!
//! Classifies one company's matched jobs as new, updated or unchanged
//! relative to everything recorded in earlier runs, and records them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Job, JobRecord, Sighting};
use crate::storage::DedupStore;

/// Classified jobs in discovery order.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    pub records: Vec<JobRecord>,
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl DiffResult {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        self.new > 0 || self.updated > 0
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.new + self.updated
    }
}

/// Calculator for classifying jobs against the store.
#[derive(Debug, Clone)]
pub struct DiffCalculator {
    /// Whether sightings are written back to the store
    record: bool,
}

impl Default for DiffCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffCalculator {
    /// Classify and record.
    pub fn new() -> Self {
        Self { record: true }
    }

    /// Classify without writing, for dry runs.
    pub fn preview() -> Self {
        Self { record: false }
    }

    /// Classify `jobs` as seen at `now`.
    ///
    /// Store errors propagate; they are never treated as "all new".
    pub fn calculate(&self, store: &DedupStore, jobs: Vec<Job>, now: DateTime<Utc>) -> Result<DiffResult> {
        let mut result = DiffResult::default();

        for job in jobs {
            let sighting = if self.record {
                store.record(&job, now)?
            } else {
                store.classify(&job)?
            };

            match sighting {
                Sighting::New => result.new += 1,
                Sighting::Updated => result.updated += 1,
                Sighting::Unchanged => result.unchanged += 1,
            }
            result.records.push(JobRecord::new(job, sighting));
        }

        Ok(result)
    }
}

/// Drop repeats of the same `(company, canonical_url)` within one run.
///
/// The first occurrence wins. Returns the kept jobs and the number dropped.
pub fn dedup_in_run(jobs: Vec<Job>) -> (Vec<Job>, usize) {
    let mut seen = HashSet::new();
    let before = jobs.len();
    let kept: Vec<Job> = jobs
        .into_iter()
        .filter(|j| seen.insert((j.company.clone(), j.canonical_url.clone())))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}
