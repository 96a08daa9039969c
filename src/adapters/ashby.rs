// src/adapters/ashby.rs

//! Ashby posting API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Adapter, FetchOutcome, parse_career_url, segments};
use crate::error::{AppError, Result};
use crate::models::{AshbyJob, AtsType, RawPosting};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://api.ashbyhq.com";
const EXPECTED: &str = "an Ashby board URL (jobs.ashbyhq.com/<slug>)";

#[derive(Deserialize)]
struct JobBoard {
    #[serde(default)]
    jobs: Vec<AshbyJob>,
}

/// Single-response adapter for the Ashby job board API.
pub struct AshbyAdapter {
    http: HttpClient,
    api_base: String,
}

impl AshbyAdapter {
    pub fn new(http: HttpClient) -> Self {
        Self::with_api_base(http, API_BASE)
    }

    pub fn with_api_base(http: HttpClient, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Board slug from a hosted board or posting API URL.
    pub fn slug(career_url: &str) -> Result<String> {
        let url = parse_career_url(career_url, EXPECTED)?;
        let slug = match segments(&url).as_slice() {
            ["posting-api", "job-board", slug, ..] => Some(slug.to_string()),
            ["posting-api", ..] => None,
            [slug, ..] => Some(slug.to_string()),
            [] => None,
        };
        slug.ok_or_else(|| AppError::bad_career_url(career_url, EXPECTED))
    }
}

#[async_trait]
impl Adapter for AshbyAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Ashby
    }

    async fn fetch(&self, career_url: &str, _budget: Duration) -> Result<FetchOutcome> {
        let slug = Self::slug(career_url)?;
        let url = format!("{}/posting-api/job-board/{}", self.api_base, slug);

        let board: JobBoard = self.http.get_json(&url).await?;
        log::debug!("Ashby {}: {} postings", slug, board.jobs.len());
        Ok(FetchOutcome::single(
            board.jobs.into_iter().map(RawPosting::Ashby).collect(),
        ))
    }

    fn board_url(&self, slug: &str) -> Option<String> {
        Some(format!("https://jobs.ashbyhq.com/{slug}"))
    }
}
