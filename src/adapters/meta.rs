// src/adapters/meta.rs

//! Meta Careers GraphQL job search.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Adapter, FetchOutcome};
use crate::error::{AppError, Result};
use crate::models::{AtsType, MetaJob, RawPosting};
use crate::utils::http::HttpClient;

const API_BASE: &str = "https://www.metacareers.com";

const JOB_SEARCH_QUERY: &str = "query JobSearchQuery($search: String, $limit: Int) {
  job_search(q: $search, page_size: $limit) {
    results { id title locations teams }
  }
}";

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Variables,
}

#[derive(Serialize)]
struct Variables {
    search: String,
    limit: usize,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct ResponseData {
    job_search: JobSearch,
}

#[derive(Deserialize)]
struct JobSearch {
    #[serde(default)]
    results: Vec<MetaJob>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Single-response adapter; the search returns every match at once.
pub struct MetaAdapter {
    http: HttpClient,
    api_base: String,
}

impl MetaAdapter {
    pub fn new(http: HttpClient) -> Self {
        Self::with_api_base(http, API_BASE)
    }

    pub fn with_api_base(http: HttpClient, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Adapter for MetaAdapter {
    fn ats(&self) -> AtsType {
        AtsType::Meta
    }

    async fn fetch(&self, career_url: &str, _budget: Duration) -> Result<FetchOutcome> {
        let search = super::forwarded_query(career_url, &[])
            .into_iter()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v)
            .unwrap_or_default();
        let url = format!("{}/graphql", self.api_base);
        let request = GraphQlRequest {
            query: JOB_SEARCH_QUERY,
            variables: Variables {
                search,
                limit: 1000,
            },
        };

        let response: GraphQlResponse = self.http.post_json(&url, &request).await?;
        if let Some(err) = response.errors.first() {
            return Err(AppError::permanent(&url, None, &err.message));
        }

        let results = response
            .data
            .map(|d| d.job_search.results)
            .unwrap_or_default();
        Ok(FetchOutcome::single(
            results.into_iter().map(RawPosting::Meta).collect(),
        ))
    }
}
