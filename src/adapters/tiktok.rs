// src/adapters/tiktok.rs

//! Life at TikTok supplier search API, paginated by offset.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Adapter, FetchOutcome, Sweep, forwarded_query};
use crate::error::{AppError, Result};
use crate::models::{AtsType, RawPosting, TiktokJob};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://api.lifeattiktok.com";
const PAGE_SIZE: usize = 50;

#[derive(Serialize)]
struct SearchRequest {
    keyword: String,
    limit: usize,
    offset: usize,
    job_category_id_list: Vec<String>,
    location_code_list: Vec<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<SearchData>,
}

#[derive(Deserialize)]
struct SearchData {
    #[serde(default)]
    job_post_list: Vec<TiktokJob>,
    #[serde(default)]
    count: Option<usize>,
}

pub struct TiktokAdapter {
    http: HttpClient,
    api_base: String,
    max_pages: usize,
}

impl TiktokAdapter {
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
impl Adapter for TiktokAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Tiktok
    }

    async fn fetch(&self, career_url: &str, budget: Duration) -> Result<FetchOutcome> {
        let keyword = forwarded_query(career_url, &[])
            .into_iter()
            .find(|(k, _)| k == "keyword")
            .map(|(_, v)| v)
            .unwrap_or_default();
        let url = format!("{}/api/v1/public/supplier/search/job/posts", self.api_base);
        let headers = [("website-path", "tiktok"), ("accept-language", "en-US")];

        let mut sweep = Sweep::new(budget, self.max_pages);
        let mut offset = 0;

        loop {
            if let Some(truncation) = sweep.limit() {
                return Ok(sweep.finish(Some(truncation)));
            }

            let request = SearchRequest {
                keyword: keyword.clone(),
                limit: PAGE_SIZE,
                offset,
                job_category_id_list: Vec::new(),
                location_code_list: Vec::new(),
            };
            let response: SearchResponse =
                match self.http.post_json_with(&url, &request, &headers).await {
                    Ok(response) => response,
                    Err(e) => return sweep.page_failed(e),
                };

            // The API reports errors in-band with HTTP 200
            if response.code != 0 {
                let message = response.message.unwrap_or_else(|| "unknown error".into());
                let err = AppError::permanent(&url, None, format!("code {}: {}", response.code, message));
                return sweep.page_failed(err);
            }

            let data = response.data.unwrap_or(SearchData {
                job_post_list: Vec::new(),
                count: Some(0),
            });
            let count = data.job_post_list.len();
            sweep.push_page(data.job_post_list.into_iter().map(RawPosting::Tiktok));
            offset += count;

            if count < PAGE_SIZE || data.count.is_some_and(|c| offset >= c) {
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
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_in_band_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/public/supplier/search/job/posts"))
            .and(header("website-path", "tiktok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 1001, "message": "bad portal"})),
            )
            .mount(&server)
            .await;

        let http = HttpClient::new(&CrawlerConfig::default()).unwrap();
        let adapter = TiktokAdapter::with_api_base(http, server.uri(), 5);
        let err = adapter
            .fetch("https://lifeattiktok.com/search", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad portal"));
    }

    #[tokio::test]
    async fn test_fetch_single_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": {
                    "count": 1,
                    "job_post_list": [{
                        "id": "7300000000000000001",
                        "title": "Machine Learning Engineer - Recommendation",
                        "city_info": {"en_name": "San Jose"},
                        "job_category": {"en_name": "R&D"}
                    }]
                }
            })))
            .mount(&server)
            .await;

        let http = HttpClient::new(&CrawlerConfig::default()).unwrap();
        let adapter = TiktokAdapter::with_api_base(http, server.uri(), 5);
        let outcome = adapter
            .fetch("https://lifeattiktok.com/search?keyword=machine", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome.postings.len(), 1);
    }
}
