// src/adapters/google.rs

//! Google Careers search API, paginated by page number.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Adapter, FetchOutcome, Sweep, forwarded_query, with_query};
use crate::error::Result;
use crate::models::{AtsType, GoogleJob, RawPosting};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://careers.google.com";
const PAGE_SIZE: usize = 20;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    jobs: Vec<GoogleJob>,
}

pub struct GoogleAdapter {
    http: HttpClient,
    api_base: String,
    max_pages: usize,
}

impl GoogleAdapter {
    pub fn new(http: HttpClient, max_pages: usize) -> Self {
        Self::with_api_base(http, API_BASE, max_pages)
    }

    pub fn with_api_base(http: HttpClient, api_base: impl Into<String>, max_pages: usize) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_pages,
        }
    }
}

#[async_trait]
impl Adapter for GoogleAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Google
    }

    async fn fetch(&self, career_url: &str, budget: Duration) -> Result<FetchOutcome> {
        let filters = forwarded_query(career_url, &["page", "page_size"]);
        let base = format!("{}/api/v3/search/", self.api_base);

        let mut sweep = Sweep::new(budget, self.max_pages);
        let mut page_number = 1;
        let mut seen = 0;

        loop {
            if let Some(truncation) = sweep.limit() {
                return Ok(sweep.finish(Some(truncation)));
            }

            let mut query = filters.clone();
            query.push(("page".into(), page_number.to_string()));
            let url = with_query(&base, &query)?;

            let page: SearchResponse = match self.http.get_json(&url).await {
                Ok(page) => page,
                Err(e) => return sweep.page_failed(e),
            };

            let count = page.jobs.len();
            sweep.push_page(page.jobs.into_iter().map(RawPosting::Google));
            seen += count;

            if count < PAGE_SIZE || page.count.is_some_and(|c| seen >= c) {
                return Ok(sweep.finish(None));
            }
            page_number += 1;
            self.http.pace().await;
        }
    }
}
