// src/adapters/amazon.rs

//! amazon.jobs search API, paginated by offset.
//!
//! Search filters on the career URL (`base_query`, `category[]`, ...) are
//! forwarded to `search.json` unchanged.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Adapter, FetchOutcome, Sweep, forwarded_query, with_query};
use crate::error::Result;
use crate::models::{AmazonJob, AtsType, RawPosting};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://www.amazon.jobs";
const PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Option<usize>,
    #[serde(default)]
    jobs: Vec<AmazonJob>,
}

pub struct AmazonAdapter {
    http: HttpClient,
    api_base: String,
    max_pages: usize,
}

impl AmazonAdapter {
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
impl Adapter for AmazonAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Amazon
    }

    async fn fetch(&self, career_url: &str, budget: Duration) -> Result<FetchOutcome> {
        let filters = forwarded_query(career_url, &["offset", "result_limit"]);
        let base = format!("{}/en/search.json", self.api_base);

        let mut sweep = Sweep::new(budget, self.max_pages);
        let mut offset = 0;

        loop {
            if let Some(truncation) = sweep.limit() {
                return Ok(sweep.finish(Some(truncation)));
            }

            let mut query = filters.clone();
            query.push(("offset".into(), offset.to_string()));
            query.push(("result_limit".into(), PAGE_SIZE.to_string()));
            let url = with_query(&base, &query)?;

            let page: SearchResponse = match self.http.get_json(&url).await {
                Ok(page) => page,
                Err(e) => return sweep.page_failed(e),
            };

            let count = page.jobs.len();
            sweep.push_page(page.jobs.into_iter().map(RawPosting::Amazon));
            offset += count;

            if count < PAGE_SIZE || page.hits.is_some_and(|h| offset >= h) {
                return Ok(sweep.finish(None));
            }
            self.http.pace().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlerConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_forwards_search_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en/search.json"))
            .and(query_param("base_query", "machine learning"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hits": 1,
                "jobs": [{
                    "id_icims": "2790001",
                    "title": "Applied Scientist",
                    "job_path": "/en/jobs/2790001/applied-scientist",
                    "normalized_location": "Seattle, Washington, USA"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new(&CrawlerConfig::default()).unwrap();
        let adapter = AmazonAdapter::with_api_base(http, server.uri(), 5);
        let outcome = adapter
            .fetch(
                "https://www.amazon.jobs/en/search?base_query=machine+learning",
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(outcome.postings.len(), 1);
        assert!(outcome.truncation.is_none());
    }
}
