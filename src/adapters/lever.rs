// src/adapters/lever.rs

//! Lever postings API, paginated by offset.

use std::time::Duration;

use async_trait::async_trait;

use super::{Adapter, FetchOutcome, Sweep, parse_career_url, segments};
use crate::error::{AppError, Result};
use crate::models::{AtsType, LeverPosting, RawPosting};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://api.lever.co";
const PAGE_SIZE: usize = 100;
const EXPECTED: &str = "a Lever board URL (jobs.lever.co/<slug>)";

pub struct LeverAdapter {
    http: HttpClient,
    api_base: String,
    max_pages: usize,
    page_size: usize,
}

impl LeverAdapter {
    pub fn new(http: HttpClient, max_pages: usize) -> Self {
        Self::with_api_base(http, API_BASE, max_pages)
    }

    pub fn with_api_base(http: HttpClient, api_base: impl Into<String>, max_pages: usize) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_pages,
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Board slug from a hosted board or postings API URL.
    pub fn slug(career_url: &str) -> Result<String> {
        let url = parse_career_url(career_url, EXPECTED)?;
        let slug = match segments(&url).as_slice() {
            ["v0", "postings", slug, ..] => Some(slug.to_string()),
            ["v0", ..] => None,
            [slug, ..] => Some(slug.to_string()),
            [] => None,
        };
        slug.ok_or_else(|| AppError::bad_career_url(career_url, EXPECTED))
    }
}

#[async_trait]
impl Adapter for LeverAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Lever
    }

    async fn fetch(&self, career_url: &str, budget: Duration) -> Result<FetchOutcome> {
        let slug = Self::slug(career_url)?;
        let mut sweep = Sweep::new(budget, self.max_pages);
        let mut skip = 0;

        loop {
            if let Some(truncation) = sweep.limit() {
                return Ok(sweep.finish(Some(truncation)));
            }

            let url = format!(
                "{}/v0/postings/{}?mode=json&skip={}&limit={}",
                self.api_base, slug, skip, self.page_size
            );
            let page: Vec<LeverPosting> = match self.http.get_json(&url).await {
                Ok(page) => page,
                Err(e) => return sweep.page_failed(e),
            };

            let count = page.len();
            sweep.push_page(page.into_iter().map(RawPosting::Lever));
            log::debug!("Lever {} page {}: {} postings", slug, sweep.pages(), count);

            if count < self.page_size {
                return Ok(sweep.finish(None));
            }
            skip += count;
            self.http.pace().await;
        }
    }

    fn board_url(&self, slug: &str) -> Option<String> {
        Some(format!("https://jobs.lever.co/{slug}"))
    }
}
