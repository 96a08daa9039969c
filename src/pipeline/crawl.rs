// src/pipeline/crawl.rs

//! Job crawling pipeline.
//!
//! Each company runs detect → fetch → normalize → filter → dedup on its own
//! task; companies run concurrently up to `crawler.max_concurrent`. Only a
//! store failure stops the whole run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::adapters::{AdapterRegistry, FetchOutcome};
use crate::error::{AppError, Result};
use crate::models::{
    AtsType, CompanyEntry, CompanyRegistry, CompanyReport, Config, JobRecord, RunReport,
};
use crate::pipeline::diff::{DiffCalculator, dedup_in_run};
use crate::services::{
    AtsDetector, FilterEngine, GenericCrawler, JobScorer, NoScorer, TitleMatcher, normalize, rank,
};
use crate::storage::{DedupStore, LocalStorage, ResultStorage};
use crate::utils::http::HttpClient;
use crate::utils::log as console;

/// Slack past the company budget before a pipeline is cancelled outright.
const HARD_TIMEOUT_GRACE: Duration = Duration::from_secs(15);

/// Handles shared by every company pipeline in a run.
pub struct CrawlContext {
    pub config: Arc<Config>,
    pub adapters: AdapterRegistry,
    pub detector: AtsDetector,
    pub crawler: Option<GenericCrawler>,
    pub filter: FilterEngine,
    pub scorer: Arc<dyn JobScorer>,
    pub store: Arc<DedupStore>,
    pub storage: Arc<dyn ResultStorage>,
    pub diff: DiffCalculator,
}

impl CrawlContext {
    /// Assemble a context from explicit parts. No generic crawler, no scorer.
    pub fn new(
        config: Config,
        http: HttpClient,
        adapters: AdapterRegistry,
        store: Arc<DedupStore>,
        storage: Arc<dyn ResultStorage>,
    ) -> Self {
        let filter = FilterEngine::new(config.filter.clone());
        Self {
            config: Arc::new(config),
            adapters,
            detector: AtsDetector::new(http),
            crawler: None,
            filter,
            scorer: Arc::new(NoScorer),
            store,
            storage,
            diff: DiffCalculator::new(),
        }
    }

    /// Production context: public endpoints, on-disk store and results.
    pub fn from_config(config: Config) -> Result<Self> {
        let http = HttpClient::new(&config.crawler)?;
        let adapters = AdapterRegistry::with_defaults(&http, config.crawler.max_pages);
        let store = DedupStore::open(&config.store.path, config.store.hash_policy)?;
        let storage = LocalStorage::new(config.profile_dir());

        #[allow(unused_mut)]
        let mut ctx = Self::new(config, http, adapters, Arc::new(store), Arc::new(storage));

        #[cfg(feature = "browser")]
        if ctx.config.browser.enabled {
            let factory = crate::services::ChromeFactory::new(ctx.config.browser.clone());
            ctx.crawler = Some(GenericCrawler::new(Arc::new(factory)));
        }

        Ok(ctx)
    }

    pub fn with_crawler(mut self, crawler: GenericCrawler) -> Self {
        self.crawler = Some(crawler);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn JobScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_title_matcher(mut self, matcher: Arc<dyn TitleMatcher>) -> Self {
        self.filter = FilterEngine::with_matcher(self.config.filter.clone(), matcher);
        self
    }

    /// Classify without recording sightings.
    pub fn dry_run(mut self) -> Self {
        self.diff = DiffCalculator::preview();
        self
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(self.config.crawler.company_budget_secs)
    }
}

/// Run every configured company, persist results and registry state.
pub async fn run_crawler(ctx: &CrawlContext) -> Result<RunReport> {
    let registry_path = ctx.config.registry_path();
    let saved = CompanyRegistry::load(&registry_path).unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable registry {}: {}", registry_path.display(), e);
        CompanyRegistry::default()
    });
    let mut registry = CompanyRegistry::merge_state(ctx.config.company_entries(), &saved);

    let run = run_companies(ctx, &registry.companies).await?;

    // Only a completed fetch confirms the ATS; failed sweeps keep the old state.
    for report in run.companies.iter().filter(|r| r.crawled) {
        registry.record_crawl(&report.company, report.ats_type, report.finished_at);
    }
    registry.save(&registry_path)?;

    Ok(run)
}

/// Crawl `companies`, rank fresh jobs and write the day's result files.
pub async fn run_companies(ctx: &CrawlContext, companies: &[CompanyEntry]) -> Result<RunReport> {
    let started_at = Utc::now();
    console::header(&format!("Crawling {} companies", companies.len()));

    let concurrency = ctx.config.crawler.max_concurrent.max(1);
    let mut company_stream = stream::iter(companies.iter().enumerate())
        .map(|(index, entry)| async move { (index, crawl_company(ctx, entry).await) })
        .buffer_unordered(concurrency);

    let mut reports = Vec::with_capacity(companies.len());
    while let Some((index, result)) = company_stream.next().await {
        let report = result?;
        console::sub_item(&format!(
            "{} [{}]: {} fetched, {} matched, {} new",
            report.company, report.ats_type, report.fetched, report.matched, report.new
        ));
        reports.push((index, report));
    }
    drop(company_stream);
    reports.sort_by_key(|(index, _)| *index);
    let companies: Vec<CompanyReport> = reports.into_iter().map(|(_, r)| r).collect();

    let fresh: Vec<JobRecord> = companies.iter().flat_map(|c| c.fresh_jobs().cloned()).collect();
    let ranked = rank(ctx.scorer.as_ref(), &ctx.config.candidate, fresh).await;

    let day = started_at.date_naive();
    for report in &companies {
        ctx.storage.write_company(day, report).await?;
    }

    let run = RunReport {
        profile: ctx.config.output.profile.clone(),
        started_at,
        finished_at: Utc::now(),
        companies,
        ranked,
    };
    ctx.storage.write_run(&run).await?;

    console::summary(
        "Run complete",
        &[
            ("Fetched", run.total_fetched().to_string()),
            ("Matched", run.total_matched().to_string()),
            ("New", run.total_new().to_string()),
            ("Updated", run.total_updated().to_string()),
            ("Partial", run.partial().to_string()),
            ("Failed", run.failed().to_string()),
        ],
    );

    Ok(run)
}

/// Run one company under its hard timeout.
///
/// Returns `Err` only for run-fatal errors; everything else is reflected in
/// the report's status.
pub async fn crawl_company(ctx: &CrawlContext, entry: &CompanyEntry) -> Result<CompanyReport> {
    let budget = ctx.budget();
    let hard_limit = budget + HARD_TIMEOUT_GRACE;

    match tokio::time::timeout(hard_limit, process_company(ctx, entry, budget)).await {
        Ok(result) => result,
        Err(_) => {
            log::error!("{}: cancelled after {}s", entry.name, hard_limit.as_secs());
            let report = CompanyReport::new(&entry.name, entry.ats_type, &entry.career_url);
            Ok(report.fail(AppError::Timeout {
                company: entry.name.clone(),
                secs: hard_limit.as_secs(),
            }))
        }
    }
}

async fn process_company(ctx: &CrawlContext, entry: &CompanyEntry, budget: Duration) -> Result<CompanyReport> {
    let started = Instant::now();

    let (ats, fetch_url, detection) = if entry.ats_type == AtsType::Unknown {
        let detection = ctx
            .detector
            .detect_for_company(&entry.name, &entry.career_url, &ctx.adapters, budget)
            .await;
        let url = detection.fetch_url(&entry.career_url).to_string();
        log::info!("{}: detected {} via {:?}", entry.name, detection.ats_type, detection.method);
        (detection.ats_type, url, Some(detection))
    } else {
        (entry.ats_type, entry.career_url.clone(), None)
    };

    let mut report = CompanyReport::new(&entry.name, ats, &fetch_url);
    report.detection = detection;

    let remaining = budget.saturating_sub(started.elapsed());
    let outcome = match fetch(ctx, ats, &fetch_url, remaining).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e @ AppError::Browser(_)) => {
            log::error!("{}: {}", entry.name, e);
            return Ok(report.fail(e));
        }
        Err(e) => {
            log::warn!("{}: {}", entry.name, e);
            report.partial(e.to_string());
            report.finished_at = Utc::now();
            return Ok(report);
        }
    };

    report.crawled = true;
    if let Some(truncation) = &outcome.truncation {
        report.partial(truncation.to_string());
    }
    report.fetched = outcome.postings.len();

    let now = Utc::now();
    let mut jobs = Vec::with_capacity(outcome.postings.len());
    for raw in &outcome.postings {
        let job = normalize(&entry.name, raw, now);
        if job.title.is_empty() || job.canonical_url.is_empty() {
            log::debug!("{}: skipping posting without title or URL", entry.name);
            continue;
        }
        jobs.push(job);
    }

    let (jobs, duplicates) = dedup_in_run(jobs);
    if duplicates > 0 {
        log::debug!("{}: {} duplicate postings in this sweep", entry.name, duplicates);
    }

    let matched = ctx.filter.apply(jobs);
    report.matched = matched.len();

    let diff = ctx.diff.calculate(&ctx.store, matched, now)?;
    report.new = diff.new;
    report.updated = diff.updated;
    report.jobs = diff.records;
    report.finished_at = Utc::now();

    Ok(report)
}

async fn fetch(ctx: &CrawlContext, ats: AtsType, url: &str, budget: Duration) -> Result<FetchOutcome> {
    if let Some(adapter) = ctx.adapters.get(ats) {
        return adapter.fetch(url, budget).await;
    }

    match &ctx.crawler {
        Some(crawler) => crawler.crawl(url, ats, budget).await,
        None => Err(AppError::permanent(
            url,
            None,
            format!("no adapter for {} and browser crawling is disabled", ats),
        )),
    }
}
