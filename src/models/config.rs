//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{AtsType, CompanyEntry, FilterCriteria};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Headless browser settings for the generic crawler
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Title/location/seniority rules
    #[serde(default)]
    pub filter: FilterCriteria,

    /// Dedup store location and hashing
    #[serde(default)]
    pub store: StoreConfig,

    /// Result file layout
    #[serde(default)]
    pub output: OutputConfig,

    /// Profile handed to the scorer
    #[serde(default)]
    pub candidate: CandidateConfig,

    /// Companies to crawl
    #[serde(default)]
    pub companies: Vec<CompanyConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.company_budget_secs < self.crawler.timeout_secs {
            return Err(AppError::validation(
                "crawler.company_budget_secs must be >= crawler.timeout_secs",
            ));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.filter.min_overlap) || self.filter.min_overlap == 0.0 {
            return Err(AppError::validation(
                "filter.min_overlap must be in (0, 1]",
            ));
        }
        if self.output.profile.trim().is_empty() {
            return Err(AppError::validation("output.profile is empty"));
        }

        let mut names = std::collections::HashSet::new();
        for company in &self.companies {
            if company.name.trim().is_empty() {
                return Err(AppError::validation("company with empty name"));
            }
            if !names.insert(company.name.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate company '{}'",
                    company.name
                )));
            }
            url::Url::parse(&company.career_url).map_err(|e| {
                AppError::validation(format!(
                    "company '{}' has invalid career_url: {}",
                    company.name, e
                ))
            })?;
        }
        Ok(())
    }

    /// Directory holding every file of the active profile.
    pub fn profile_dir(&self) -> PathBuf {
        self.output.dir.join(&self.output.profile)
    }

    /// Where detected ATS types and crawl times persist between runs.
    pub fn registry_path(&self) -> PathBuf {
        self.profile_dir().join("companies.json")
    }

    pub fn company_entries(&self) -> Vec<CompanyEntry> {
        self.companies
            .iter()
            .map(|c| CompanyEntry::new(&c.name, &c.career_url, c.ats_type))
            .collect()
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Wall-clock budget for one company pipeline
    #[serde(default = "defaults::company_budget")]
    pub company_budget_secs: u64,

    /// Companies crawled at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Page ceiling for paginated adapters
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Retries after a transient failure
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay of the exponential backoff
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Wait before the single retry after a 429
    #[serde(default = "defaults::rate_limit_cooldown")]
    pub rate_limit_cooldown_ms: u64,

    /// Delay between pages of one adapter
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            company_budget_secs: defaults::company_budget(),
            max_concurrent: defaults::max_concurrent(),
            max_pages: defaults::max_pages(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
            rate_limit_cooldown_ms: defaults::rate_limit_cooldown(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Crawl custom career sites at all
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::enabled")]
    pub headless: bool,

    /// Bounded wait for dynamic content after navigation
    #[serde(default = "defaults::settle")]
    pub settle_ms: u64,

    /// Chrome binary; auto-detected when unset
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Browser process is killed after this much inactivity
    #[serde(default = "defaults::idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            headless: defaults::enabled(),
            settle_ms: defaults::settle(),
            chrome_path: None,
            idle_timeout_secs: defaults::idle_timeout(),
        }
    }
}

/// Which posting fields feed the dedup content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HashPolicy {
    #[default]
    TitleLocationTeam,
    TitleLocation,
    TitleOnly,
}

impl HashPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashPolicy::TitleLocationTeam => "title_location_team",
            HashPolicy::TitleLocation => "title_location",
            HashPolicy::TitleOnly => "title_only",
        }
    }
}

/// Dedup store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "defaults::store_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub hash_policy: HashPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::store_path(),
            hash_policy: HashPolicy::default(),
        }
    }
}

/// Result file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "defaults::output_dir")]
    pub dir: PathBuf,

    #[serde(default = "defaults::profile")]
    pub profile: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
            profile: defaults::profile(),
        }
    }
}

/// Candidate profile handed to the scorer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CandidateConfig {
    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(default)]
    pub titles: Vec<String>,

    #[serde(default)]
    pub years_experience: Option<u32>,

    #[serde(default)]
    pub summary: String,

    /// Free-text preferences passed along with every job
    #[serde(default)]
    pub preferences: String,
}

/// One `[[companies]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub name: String,
    pub career_url: String,
    #[serde(default)]
    pub ats_type: AtsType,
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; career-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn company_budget() -> u64 {
        180
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn max_pages() -> usize {
        50
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_backoff() -> u64 {
        500
    }
    pub fn rate_limit_cooldown() -> u64 {
        10_000
    }
    pub fn request_delay() -> u64 {
        250
    }

    // Browser defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn settle() -> u64 {
        2_000
    }
    pub fn idle_timeout() -> u64 {
        60
    }

    // Store and output defaults
    pub fn store_path() -> PathBuf {
        PathBuf::from("data/seen_jobs.db")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }
    pub fn profile() -> String {
        "default".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_companies() {
        let config: Config = toml::from_str(
            r#"
            [[companies]]
            name = "OpenAI"
            career_url = "https://jobs.ashbyhq.com/openai"

            [[companies]]
            name = "OpenAI"
            career_url = "https://openai.com/careers"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            max_concurrent = 2

            [filter]
            titles = ["Machine Learning Engineer"]
            locations = ["San Francisco, CA", "Remote"]
            excluded_levels = ["staff"]

            [store]
            hash_policy = "title_only"

            [output]
            profile = "ml"

            [[companies]]
            name = "Anthropic"
            career_url = "https://boards.greenhouse.io/anthropic"
            ats_type = "greenhouse"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.crawler.max_concurrent, 2);
        assert_eq!(config.crawler.max_retries, 3);
        assert_eq!(config.filter.min_overlap, 0.75);
        assert!(config.filter.accepts_remote());
        assert_eq!(config.store.hash_policy, HashPolicy::TitleOnly);
        assert_eq!(config.registry_path(), PathBuf::from("output/ml/companies.json"));
        assert_eq!(config.company_entries()[0].ats_type, AtsType::Greenhouse);
    }
}
