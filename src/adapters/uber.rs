// src/adapters/uber.rs

//! Uber careers search API, paginated by page number.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Adapter, FetchOutcome, Sweep};
use crate::error::Result;
use crate::models::{AtsType, RawPosting, UberJob};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://www.uber.com";
const PAGE_SIZE: usize = 50;

#[derive(Serialize)]
struct SearchRequest {
    params: SearchParams,
    page: usize,
    limit: usize,
}

#[derive(Serialize, Default)]
struct SearchParams {
    query: String,
    location: Vec<String>,
    department: Vec<String>,
    team: Vec<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: SearchData,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    #[serde(default)]
    results: Vec<UberJob>,
    #[serde(default)]
    total_results: Option<TotalResults>,
}

/// Protobuf-style 64-bit count
#[derive(Deserialize)]
struct TotalResults {
    #[serde(default)]
    low: usize,
}

pub struct UberAdapter {
    http: HttpClient,
    api_base: String,
    max_pages: usize,
}

impl UberAdapter {
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
impl Adapter for UberAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Uber
    }

    async fn fetch(&self, _career_url: &str, budget: Duration) -> Result<FetchOutcome> {
        let url = format!("{}/api/loadSearchJobsResults?localeCode=en", self.api_base);
        let headers = [("x-csrf-token", "x")];

        let mut sweep = Sweep::new(budget, self.max_pages);
        let mut page = 0;
        let mut seen = 0;

        loop {
            if let Some(truncation) = sweep.limit() {
                return Ok(sweep.finish(Some(truncation)));
            }

            let request = SearchRequest {
                params: SearchParams::default(),
                page,
                limit: PAGE_SIZE,
            };
            let response: SearchResponse =
                match self.http.post_json_with(&url, &request, &headers).await {
                    Ok(response) => response,
                    Err(e) => return sweep.page_failed(e),
                };

            let total = response.data.total_results.map(|t| t.low);
            let count = response.data.results.len();
            sweep.push_page(response.data.results.into_iter().map(RawPosting::Uber));
            seen += count;

            if count < PAGE_SIZE || total.is_some_and(|t| seen >= t) {
                return Ok(sweep.finish(None));
            }
            page += 1;
            self.http.pace().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlerConfig;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_sends_csrf_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/loadSearchJobsResults"))
            .and(header("x-csrf-token", "x"))
            .and(body_partial_json(serde_json::json!({"page": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {
                    "results": [{
                        "id": 131000,
                        "title": "Senior Software Engineer, Maps",
                        "location": {"city": "Seattle", "region": "Washington", "countryName": "United States"},
                        "department": "Engineering"
                    }],
                    "totalResults": {"low": 1, "high": 0}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new(&CrawlerConfig::default()).unwrap();
        let adapter = UberAdapter::with_api_base(http, server.uri(), 5);
        let outcome = adapter
            .fetch("https://www.uber.com/us/en/careers/list/", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome.postings.len(), 1);
        assert_eq!(outcome.pages, 1);
    }
}
