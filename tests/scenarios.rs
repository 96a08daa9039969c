//! End-to-end runs against mock ATS endpoints.

use std::sync::Arc;
use std::time::Duration;

use career_crawler::adapters::{AdapterRegistry, AshbyAdapter, GreenhouseAdapter};
use career_crawler::models::{
    AtsType, CompanyEntry, CompanyStatus, Config, CrawlerConfig, FilterCriteria, HashPolicy,
    Sighting,
};
use career_crawler::pipeline::{CrawlContext, run_companies};
use career_crawler::storage::{DedupStore, LocalStorage, ResultStorage};
use career_crawler::utils::http::{HttpClient, RetryPolicy};
use career_crawler::utils::log as console;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> HttpClient {
    client(&CrawlerConfig::default())
}

fn client(config: &CrawlerConfig) -> HttpClient {
    HttpClient::new(config)
        .unwrap()
        .with_request_delay(Duration::ZERO)
        .with_policy(RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(1),
            rate_limit_cooldown: Duration::from_millis(1),
        })
}

struct Harness {
    _tmp: TempDir,
    ctx: CrawlContext,
    storage: Arc<LocalStorage>,
}

fn harness(adapters: AdapterRegistry) -> Harness {
    console::set_quiet(true);
    let tmp = TempDir::new().unwrap();

    let mut config = Config::default();
    config.output.dir = tmp.path().join("output");
    config.filter = FilterCriteria::new(
        vec!["Machine Learning Engineer".into()],
        vec![],
        vec!["staff".into()],
    );

    let storage = Arc::new(LocalStorage::new(config.profile_dir()));
    let store = DedupStore::open(tmp.path().join("seen.db"), HashPolicy::default()).unwrap();
    let ctx = CrawlContext::new(config, http(), adapters, Arc::new(store), storage.clone());

    Harness {
        _tmp: tmp,
        ctx,
        storage,
    }
}

fn ashby_jobs(titles: &[&str]) -> serde_json::Value {
    let jobs: Vec<_> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            json!({
                "id": format!("job-{i}"),
                "title": title,
                "location": "San Francisco, CA",
                "department": "Research",
                "isRemote": false,
                "jobUrl": format!("https://jobs.ashbyhq.com/openai/job-{i}?utm_source=careers")
            })
        })
        .collect();
    json!({ "apiVersion": "1", "jobs": jobs })
}

async fn mount_ashby(server: &MockServer, titles: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/posting-api/job-board/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ashby_jobs(titles)))
        .mount(server)
        .await;
}

fn openai() -> CompanyEntry {
    CompanyEntry::new("OpenAI", "https://jobs.ashbyhq.com/openai", AtsType::Unknown)
}

#[tokio::test]
async fn test_detects_ashby_and_filters_titles() {
    let server = MockServer::start().await;
    mount_ashby(
        &server,
        &[
            "Machine Learning Engineer",
            "Staff Machine Learning Engineer",
            "Senior ML Engineer",
        ],
    )
    .await;

    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(AshbyAdapter::with_api_base(http(), server.uri())));
    let h = harness(adapters);

    let run = run_companies(&h.ctx, &[openai()]).await.unwrap();
    let report = &run.companies[0];

    assert_eq!(report.ats_type, AtsType::Ashby);
    assert!(report.status.is_success());
    assert_eq!(report.fetched, 3);

    let titles: Vec<_> = report.jobs.iter().map(|r| r.job.title.as_str()).collect();
    assert_eq!(titles, vec!["Machine Learning Engineer", "Senior ML Engineer"]);
    assert_eq!(report.jobs[0].job.canonical_url, "https://jobs.ashbyhq.com/openai/job-0");

    let written = h
        .storage
        .load_company(run.started_at.date_naive(), "OpenAI")
        .await
        .unwrap();
    assert_eq!(written.len(), 2);
}

#[tokio::test]
async fn test_repeat_runs_report_unchanged_then_updated() {
    let server = MockServer::start().await;
    mount_ashby(&server, &["Machine Learning Engineer"]).await;

    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(AshbyAdapter::with_api_base(http(), server.uri())));
    let h = harness(adapters);

    let first = run_companies(&h.ctx, &[openai()]).await.unwrap();
    assert_eq!(first.total_new(), 1);
    assert_eq!(first.ranked.len(), 1);

    let second = run_companies(&h.ctx, &[openai()]).await.unwrap();
    assert_eq!(second.total_new(), 0);
    assert_eq!(second.companies[0].jobs[0].status, Sighting::Unchanged);
    assert!(second.ranked.is_empty());

    server.reset().await;
    mount_ashby(&server, &["Machine Learning Engineer, Applied"]).await;

    let third = run_companies(&h.ctx, &[openai()]).await.unwrap();
    assert_eq!(third.total_new(), 0);
    assert_eq!(third.total_updated(), 1);
    assert_eq!(third.companies[0].jobs[0].status, Sighting::Updated);
}

#[tokio::test]
async fn test_failing_company_does_not_affect_others() {
    let ashby = MockServer::start().await;
    mount_ashby(&ashby, &["Machine Learning Engineer", "Senior ML Engineer"]).await;

    let greenhouse = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/boards/flaky/jobs"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&greenhouse)
        .await;

    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(AshbyAdapter::with_api_base(http(), ashby.uri())));
    adapters.register(Arc::new(GreenhouseAdapter::with_api_base(http(), greenhouse.uri())));
    let h = harness(adapters);

    let companies = vec![
        CompanyEntry::new("Flaky", "https://boards.greenhouse.io/flaky", AtsType::Unknown),
        openai(),
    ];
    let run = run_companies(&h.ctx, &companies).await.unwrap();

    let flaky = &run.companies[0];
    assert_eq!(flaky.company, "Flaky");
    assert_eq!(flaky.ats_type, AtsType::Greenhouse);
    assert!(matches!(flaky.status, CompanyStatus::Partial { .. }));
    assert!(flaky.jobs.is_empty());

    let openai = &run.companies[1];
    assert!(openai.status.is_success());
    assert_eq!(openai.jobs.len(), 2);

    assert_eq!(run.partial(), 1);
    assert_eq!(run.failed(), 0);
}

#[tokio::test]
async fn test_request_timeouts_retry_then_partial() {
    let ashby = MockServer::start().await;
    mount_ashby(&ashby, &["Machine Learning Engineer"]).await;

    let greenhouse = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/boards/slow/jobs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jobs": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(4)
        .mount(&greenhouse)
        .await;

    let impatient = client(&CrawlerConfig {
        timeout_secs: 1,
        ..CrawlerConfig::default()
    });
    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(AshbyAdapter::with_api_base(http(), ashby.uri())));
    adapters.register(Arc::new(GreenhouseAdapter::with_api_base(impatient, greenhouse.uri())));
    let h = harness(adapters);

    let companies = vec![
        CompanyEntry::new("Slow", "https://boards.greenhouse.io/slow", AtsType::Greenhouse),
        openai(),
    ];
    let run = run_companies(&h.ctx, &companies).await.unwrap();

    let slow = &run.companies[0];
    assert!(matches!(&slow.status, CompanyStatus::Partial { reason } if reason.contains("Transient")));
    assert!(slow.jobs.is_empty());
    assert!(!slow.crawled);

    assert!(run.companies[1].status.is_success());
    assert_eq!(run.companies[1].jobs.len(), 1);
}
