// src/adapters/greenhouse.rs

//! Greenhouse job board API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Adapter, FetchOutcome, parse_career_url, segments};
use crate::error::{AppError, Result};
use crate::models::{AtsType, GreenhouseJob, RawPosting};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://boards-api.greenhouse.io";
const EXPECTED: &str = "a Greenhouse board URL (boards.greenhouse.io/<token>)";

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

/// Single-response adapter for `boards-api.greenhouse.io`.
pub struct GreenhouseAdapter {
    http: HttpClient,
    api_base: String,
}

impl GreenhouseAdapter {
    pub fn new(http: HttpClient) -> Self {
        Self::with_api_base(http, API_BASE)
    }

    pub fn with_api_base(http: HttpClient, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Board token from any of the Greenhouse URL shapes.
    pub fn board_token(career_url: &str) -> Result<String> {
        let url = parse_career_url(career_url, EXPECTED)?;

        if let Some((_, token)) = url.query_pairs().find(|(k, _)| k == "for") {
            return Ok(token.into_owned());
        }

        let segs = segments(&url);
        let token = match segs.as_slice() {
            ["v1", "boards", token, ..] => Some(*token),
            ["embed", ..] => None,
            [token, ..] => Some(*token),
            [] => None,
        };
        token
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_career_url(career_url, EXPECTED))
    }
}

#[async_trait]
impl Adapter for GreenhouseAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Greenhouse
    }

    async fn fetch(&self, career_url: &str, _budget: Duration) -> Result<FetchOutcome> {
        let token = Self::board_token(career_url)?;
        let url = format!("{}/v1/boards/{}/jobs", self.api_base, token);
        log::debug!("Greenhouse board {} via {}", token, url);

        let response: JobsResponse = self.http.get_json(&url).await?;
        Ok(FetchOutcome::single(
            response.jobs.into_iter().map(RawPosting::Greenhouse).collect(),
        ))
    }

    fn board_url(&self, slug: &str) -> Option<String> {
        Some(format!("https://boards.greenhouse.io/{slug}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlerConfig;
    use crate::utils::http::RetryPolicy;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_board_token_shapes() {
        for url in [
            "https://boards.greenhouse.io/anthropic",
            "https://job-boards.greenhouse.io/anthropic/jobs/123",
            "https://boards-api.greenhouse.io/v1/boards/anthropic/jobs",
            "https://boards.greenhouse.io/embed/job_board?for=anthropic",
        ] {
            assert_eq!(GreenhouseAdapter::board_token(url).unwrap(), "anthropic", "{url}");
        }
        assert!(GreenhouseAdapter::board_token("https://boards.greenhouse.io/").is_err());
    }

    #[tokio::test]
    async fn test_fetch_single_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/boards/anthropic/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobs": [
                    {
                        "id": 1,
                        "title": "Research Engineer",
                        "absolute_url": "https://boards.greenhouse.io/anthropic/jobs/1",
                        "location": {"name": "San Francisco, CA"},
                        "departments": [{"name": "Research"}]
                    },
                    {
                        "id": 2,
                        "title": "Recruiter",
                        "absolute_url": "https://boards.greenhouse.io/anthropic/jobs/2"
                    }
                ],
                "meta": {"total": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new(&CrawlerConfig::default())
            .unwrap()
            .with_policy(RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            });
        let adapter = GreenhouseAdapter::with_api_base(http, server.uri());
        let outcome = adapter
            .fetch("https://boards.greenhouse.io/anthropic", Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(outcome.postings.len(), 2);
        assert!(outcome.truncation.is_none());
        assert!(matches!(&outcome.postings[0], RawPosting::Greenhouse(j) if j.departments[0].name == "Research"));
    }
}
