// src/adapters/mod.rs

//! Per-ATS fetch adapters.
//!
//! Each adapter turns a career URL into one full pagination sweep of raw
//! postings using the ATS's public API. Adapters only extract; filtering and
//! deduplication happen downstream.

mod amazon;
mod ashby;
mod google;
mod greenhouse;
mod lever;
mod meta;
mod tiktok;
mod uber;
mod workday;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{AtsType, RawPosting};
use crate::utils::http::HttpClient;

pub use amazon::AmazonAdapter;
pub use ashby::AshbyAdapter;
pub use google::GoogleAdapter;
pub use greenhouse::GreenhouseAdapter;
pub use lever::LeverAdapter;
pub use meta::MetaAdapter;
pub use tiktok::TiktokAdapter;
pub use uber::UberAdapter;
pub use workday::WorkdayAdapter;

/// Why a sweep stopped before the listing was exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Truncation {
    /// Hit the configured page ceiling
    PageCeiling(usize),
    /// Hit the company's wall-clock budget
    Deadline,
    /// A later page failed after earlier pages succeeded
    PageFailed(String),
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Truncation::PageCeiling(n) => write!(f, "stopped at page ceiling ({n} pages)"),
            Truncation::Deadline => f.write_str("stopped at time budget"),
            Truncation::PageFailed(e) => write!(f, "stopped after page failure: {e}"),
        }
    }
}

/// Result of one pagination sweep.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub postings: Vec<RawPosting>,
    pub pages: usize,
    pub truncation: Option<Truncation>,
}

impl FetchOutcome {
    /// A complete single-response listing.
    pub fn single(postings: Vec<RawPosting>) -> Self {
        Self {
            postings,
            pages: 1,
            truncation: None,
        }
    }
}

/// A direct-API fetcher for one ATS.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn ats(&self) -> AtsType;

    /// Fetch every posting reachable from `career_url` within `budget`.
    async fn fetch(&self, career_url: &str, budget: Duration) -> Result<FetchOutcome>;

    /// Public board URL for a guessed company slug, when the ATS has one.
    fn board_url(&self, _slug: &str) -> Option<String> {
        None
    }
}

/// Adapters keyed by the detector's tag.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<AtsType, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in adapter against the public endpoints.
    pub fn with_defaults(http: &HttpClient, max_pages: usize) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GreenhouseAdapter::new(http.clone())));
        registry.register(Arc::new(LeverAdapter::new(http.clone(), max_pages)));
        registry.register(Arc::new(AshbyAdapter::new(http.clone())));
        registry.register(Arc::new(WorkdayAdapter::new(http.clone(), max_pages)));
        registry.register(Arc::new(AmazonAdapter::new(http.clone(), max_pages)));
        registry.register(Arc::new(GoogleAdapter::new(http.clone(), max_pages)));
        registry.register(Arc::new(TiktokAdapter::new(http.clone(), max_pages)));
        registry.register(Arc::new(UberAdapter::new(http.clone(), max_pages)));
        registry.register(Arc::new(MetaAdapter::new(http.clone())));
        registry
    }

    /// Add or replace the adapter for its ATS.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(adapter.ats(), adapter);
    }

    pub fn get(&self, ats: AtsType) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(&ats).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Page accounting for paginated adapters.
pub(crate) struct Sweep {
    deadline: Instant,
    max_pages: usize,
    pages: usize,
    postings: Vec<RawPosting>,
}

impl Sweep {
    pub(crate) fn new(budget: Duration, max_pages: usize) -> Self {
        Self {
            deadline: Instant::now() + budget,
            max_pages: max_pages.max(1),
            pages: 0,
            postings: Vec::new(),
        }
    }

    /// Reason another page may not be requested, if any.
    pub(crate) fn limit(&self) -> Option<Truncation> {
        if self.pages >= self.max_pages {
            Some(Truncation::PageCeiling(self.pages))
        } else if Instant::now() >= self.deadline {
            Some(Truncation::Deadline)
        } else {
            None
        }
    }

    pub(crate) fn push_page(&mut self, postings: impl IntoIterator<Item = RawPosting>) {
        self.pages += 1;
        self.postings.extend(postings);
    }

    pub(crate) fn pages(&self) -> usize {
        self.pages
    }

    /// Handle a failed page: the first page propagates, later pages truncate.
    pub(crate) fn page_failed(self, err: AppError) -> Result<FetchOutcome> {
        if self.pages == 0 {
            return Err(err);
        }
        log::warn!("Page {} failed, keeping earlier pages: {}", self.pages + 1, err);
        Ok(self.finish(Some(Truncation::PageFailed(err.to_string()))))
    }

    pub(crate) fn finish(self, truncation: Option<Truncation>) -> FetchOutcome {
        FetchOutcome {
            postings: self.postings,
            pages: self.pages,
            truncation,
        }
    }
}

/// Parse a career URL, mapping failures to a permanent fetch error.
pub(crate) fn parse_career_url(career_url: &str, expected: &str) -> Result<Url> {
    Url::parse(career_url).map_err(|_| AppError::bad_career_url(career_url, expected))
}

/// Non-empty path segments of a URL.
pub(crate) fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default()
}

/// Query pairs of the career URL, minus the ones the adapter drives itself.
pub(crate) fn forwarded_query(career_url: &str, reserved: &[&str]) -> Vec<(String, String)> {
    Url::parse(career_url)
        .map(|u| {
            u.query_pairs()
                .filter(|(k, _)| !reserved.contains(&k.as_ref()))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// Append query pairs to a URL string.
pub(crate) fn with_query(base: &str, pairs: &[(String, String)]) -> Result<String> {
    let mut url = Url::parse(base)?;
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_stops_at_page_ceiling() {
        let mut sweep = Sweep::new(Duration::from_secs(60), 2);
        assert!(sweep.limit().is_none());
        sweep.push_page(Vec::new());
        sweep.push_page(Vec::new());
        assert_eq!(sweep.limit(), Some(Truncation::PageCeiling(2)));
    }

    #[test]
    fn test_sweep_stops_at_deadline() {
        let sweep = Sweep::new(Duration::ZERO, 10);
        assert_eq!(sweep.limit(), Some(Truncation::Deadline));
    }

    #[test]
    fn test_first_page_failure_propagates() {
        let sweep = Sweep::new(Duration::from_secs(60), 10);
        assert!(sweep.page_failed(AppError::transient("u", "503")).is_err());

        let mut sweep = Sweep::new(Duration::from_secs(60), 10);
        sweep.push_page(Vec::new());
        let outcome = sweep.page_failed(AppError::transient("u", "503")).unwrap();
        assert!(matches!(outcome.truncation, Some(Truncation::PageFailed(_))));
    }

    #[test]
    fn test_default_registry_covers_adapted_types() {
        let http = HttpClient::new(&crate::models::CrawlerConfig::default()).unwrap();
        let registry = AdapterRegistry::with_defaults(&http, 10);
        for ats in AtsType::ADAPTED {
            assert_eq!(registry.get(ats).unwrap().ats(), ats);
        }
        assert!(registry.get(AtsType::Custom).is_none());
    }
}
