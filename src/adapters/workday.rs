// src/adapters/workday.rs

//! Workday CXS job search, paginated by offset.
//!
//! Career URLs look like `https://{tenant}.wd5.myworkdayjobs.com/{locale}/{site}`;
//! the listing is `POST https://{host}/wday/cxs/{tenant}/{site}/jobs`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Adapter, FetchOutcome, Sweep, parse_career_url, segments};
use crate::error::{AppError, Result};
use crate::models::{AtsType, RawPosting, WorkdayPosting};
use crate::utils::http::HttpClient;

const PAGE_SIZE: usize = 20;
const EXPECTED: &str = "a Workday URL (<tenant>.wdN.myworkdayjobs.com/<site>)";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    applied_facets: serde_json::Map<String, serde_json::Value>,
    limit: usize,
    offset: usize,
    search_text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    job_postings: Vec<WorkdayPosting>,
}

/// Tenant and site parsed from a Workday career URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkdayBoard {
    /// `https://{host}`
    pub origin: String,
    pub tenant: String,
    pub site: String,
}

impl WorkdayBoard {
    pub fn parse(career_url: &str) -> Result<Self> {
        let url = parse_career_url(career_url, EXPECTED)?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::bad_career_url(career_url, EXPECTED))?;
        let tenant = host
            .split('.')
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::bad_career_url(career_url, EXPECTED))?;

        // Skip an optional locale segment such as `en-US`
        let site = segments(&url)
            .into_iter()
            .find(|s| !is_locale(s) && *s != "wday" && *s != "cxs")
            .ok_or_else(|| AppError::bad_career_url(career_url, EXPECTED))?;

        Ok(Self {
            origin: url.origin().ascii_serialization(),
            tenant: tenant.to_string(),
            site: site.to_string(),
        })
    }

    /// Base URL that posting `externalPath`s are relative to.
    pub fn board_url(&self) -> String {
        format!("{}/{}", self.origin, self.site)
    }
}

fn is_locale(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 5
        && bytes[2] == b'-'
        && bytes[..2].iter().all(u8::is_ascii_lowercase)
        && bytes[3..].iter().all(u8::is_ascii_uppercase)
}

pub struct WorkdayAdapter {
    http: HttpClient,
    /// Overrides `https://{host}` for the API calls
    api_base: Option<String>,
    max_pages: usize,
}

impl WorkdayAdapter {
    pub fn new(http: HttpClient, max_pages: usize) -> Self {
        Self {
            http,
            api_base: None,
            max_pages,
        }
    }

    pub fn with_api_base(http: HttpClient, api_base: impl Into<String>, max_pages: usize) -> Self {
        Self {
            http,
            api_base: Some(api_base.into().trim_end_matches('/').to_string()),
            max_pages,
        }
    }
}

#[async_trait]
impl Adapter for WorkdayAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Workday
    }

    async fn fetch(&self, career_url: &str, budget: Duration) -> Result<FetchOutcome> {
        let board = WorkdayBoard::parse(career_url)?;
        let origin = self.api_base.as_deref().unwrap_or(&board.origin);
        let url = format!("{}/wday/cxs/{}/{}/jobs", origin, board.tenant, board.site);
        let board_url = board.board_url();

        let mut sweep = Sweep::new(budget, self.max_pages);
        let mut offset = 0;
        let mut total = None;

        loop {
            if let Some(truncation) = sweep.limit() {
                return Ok(sweep.finish(Some(truncation)));
            }

            let request = SearchRequest {
                applied_facets: serde_json::Map::new(),
                limit: PAGE_SIZE,
                offset,
                search_text: "",
            };
            let page: SearchResponse = match self.http.post_json(&url, &request).await {
                Ok(page) => page,
                Err(e) => return sweep.page_failed(e),
            };

            // Only the first page reports the total reliably
            if total.is_none() {
                total = page.total;
            }

            let count = page.job_postings.len();
            sweep.push_page(page.job_postings.into_iter().map(|posting| RawPosting::Workday {
                board_url: board_url.clone(),
                posting,
            }));
            offset += count;

            let exhausted = count < PAGE_SIZE || total.is_some_and(|t| offset >= t);
            if exhausted {
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
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_board() {
        let board =
            WorkdayBoard::parse("https://nvidia.wd5.myworkdayjobs.com/en-US/NVIDIAExternalCareerSite")
                .unwrap();
        assert_eq!(board.tenant, "nvidia");
        assert_eq!(board.site, "NVIDIAExternalCareerSite");
        assert_eq!(
            board.board_url(),
            "https://nvidia.wd5.myworkdayjobs.com/NVIDIAExternalCareerSite"
        );

        let board = WorkdayBoard::parse("https://salesforce.wd12.myworkdayjobs.com/External_Career_Site").unwrap();
        assert_eq!(board.site, "External_Career_Site");
        assert!(WorkdayBoard::parse("https://acme.wd1.myworkdayjobs.com/en-US").is_err());
    }

    fn page(start: usize, count: usize) -> serde_json::Value {
        let postings: Vec<_> = (start..start + count)
            .map(|i| {
                serde_json::json!({
                    "title": format!("Engineer {i}"),
                    "externalPath": format!("/job/Santa-Clara/Engineer_R{i}"),
                    "locationsText": "US, CA, Santa Clara"
                })
            })
            .collect();
        serde_json::json!({"total": 25, "jobPostings": postings})
    }

    #[tokio::test]
    async fn test_offset_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wday/cxs/nvidia/External/jobs"))
            .and(body_partial_json(serde_json::json!({"offset": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 20)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/wday/cxs/nvidia/External/jobs"))
            .and(body_partial_json(serde_json::json!({"offset": 20})))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(20, 5)))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new(&CrawlerConfig::default())
            .unwrap()
            .with_request_delay(Duration::ZERO);
        let adapter = WorkdayAdapter::with_api_base(http, server.uri(), 10);
        let outcome = adapter
            .fetch(
                "https://nvidia.wd5.myworkdayjobs.com/en-US/External",
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.postings.len(), 25);
        match &outcome.postings[0] {
            RawPosting::Workday { board_url, .. } => {
                assert_eq!(board_url, "https://nvidia.wd5.myworkdayjobs.com/External")
            }
            other => panic!("unexpected posting {other:?}"),
        }
    }
}
