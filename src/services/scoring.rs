// src/services/scoring.rs

//! Optional ranking of fresh jobs against a candidate profile.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{CandidateConfig, Job, JobRecord};

/// Scores requested concurrently.
const SCORING_CONCURRENCY: usize = 4;

/// A 0-100 fit score with the scorer's explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    pub score: u8,
    pub reasoning: String,
}

impl MatchScore {
    pub fn new(score: u8, reasoning: impl Into<String>) -> Self {
        Self {
            score: score.min(100),
            reasoning: reasoning.into(),
        }
    }
}

/// Scoring capability, typically backed by a language model.
#[async_trait]
pub trait JobScorer: Send + Sync {
    /// Score a job for the candidate. `Ok(None)` means no opinion.
    async fn score(
        &self,
        job: &Job,
        candidate: &CandidateConfig,
        preferences: &str,
    ) -> Result<Option<MatchScore>>;
}

/// Scorer that never scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScorer;

#[async_trait]
impl JobScorer for NoScorer {
    async fn score(&self, _: &Job, _: &CandidateConfig, _: &str) -> Result<Option<MatchScore>> {
        Ok(None)
    }
}

/// Score every record and order the scored ones best first.
///
/// Unscored records follow in their original order. A scorer error leaves
/// that record unscored.
pub async fn rank(
    scorer: &dyn JobScorer,
    candidate: &CandidateConfig,
    records: Vec<JobRecord>,
) -> Vec<JobRecord> {
    let preferences = candidate.preferences.as_str();

    let mut scored: Vec<JobRecord> = stream::iter(records)
        .map(|mut record| async move {
            match scorer.score(&record.job, candidate, preferences).await {
                Ok(Some(m)) => {
                    record.score = Some(m.score);
                    record.reasoning = Some(m.reasoning);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Scoring failed for {}: {}", record.job.canonical_url, e),
            }
            record
        })
        .buffered(SCORING_CONCURRENCY)
        .collect()
        .await;

    // Stable sort keeps discovery order among ties and unscored records.
    scored.sort_by_key(|r| std::cmp::Reverse(r.score.map(u16::from).map_or(0, |s| s + 1)));
    scored
}
