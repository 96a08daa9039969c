// src/services/crawler.rs

//! Generic career-site crawler.
//!
//! Used when no adapter matches. Loads the career page in a browser, waits for
//! it to settle, and extracts job-like links from the rendered HTML. Depth is
//! capped at two: the listing page plus one "next page" or "load more" follow.
//! Detail pages are never opened.
//!
//! Any URL that looks like a login or application flow stops the crawl,
//! whether it is the start URL, a redirect target, or a pagination link.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::adapters::{FetchOutcome, Truncation};
use crate::error::{AppError, Result};
use crate::models::{AtsType, CrawledLink, RawPosting};
use crate::utils::collapse_whitespace;
use crate::utils::url::{canonical_url, is_auth_flow_url, resolve};

/// Listing page plus one follow.
pub const MAX_DEPTH: usize = 2;

static JOB_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/jobs?/",
        r"/careers?/[^/?#]+",
        r"/positions?/",
        r"/openings?/",
        r"/opportunities/",
        r"/job-details/",
        r"/details/",
        r"/requisitions?/",
        r"/postings?/",
        r"[?&](gh_jid|job_?id|req_?id)=",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static EXCLUDED_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/search",
        r"/filter",
        r"/category",
        r"/teams?(/|$)",
        r"/locations?(/|$)",
        r"/departments?(/|$)",
        r"/about",
        r"/blog",
        r"/news",
        r"/benefits",
        r"/life-at",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Link text that is navigation, never a job title.
const NAV_TEXT: &[&str] = &[
    "view all",
    "see all",
    "load more",
    "show more",
    "back",
    "next",
    "previous",
    "apply",
    "apply now",
    "learn more",
    "read more",
    "jobs",
    "careers",
    "open roles",
    "search jobs",
];

const NEXT_TEXT: &[&str] = &["next", "next page", "›", "»", ">"];

/// A page the crawler can drive: a browser tab in production, a fake in tests.
pub trait PageDriver {
    /// Load `url` and wait for dynamic content to settle.
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL after redirects.
    fn current_url(&self) -> Result<String>;

    /// Rendered HTML.
    fn content(&self) -> Result<String>;

    /// Click a "load more" control; false when the page has none.
    fn load_more(&mut self) -> Result<bool>;
}

/// Opens a fresh driver per company.
pub trait DriverFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn PageDriver + Send>>;
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::selector(css, e))
}

fn ensure_safe(url: &str) -> Result<()> {
    if is_auth_flow_url(url) {
        log::warn!("safety: refusing to enter auth/application flow at {}", url);
        return Err(AppError::safety_stop(url, "authentication or application flow"));
    }
    Ok(())
}

/// Stop between browser steps once the owning pipeline has gone away.
fn checkpoint(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(AppError::browser("crawl cancelled"));
    }
    Ok(())
}

fn is_job_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    !EXCLUDED_URL_PATTERNS.iter().any(|p| p.is_match(&lower))
        && JOB_URL_PATTERNS.iter().any(|p| p.is_match(&lower))
}

fn is_nav_text(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    NAV_TEXT.contains(&lower.as_str())
}

/// Title of a job anchor: its own first text line, else a heading inside it.
fn link_title(anchor: &ElementRef, heading: &Selector) -> Option<String> {
    let own = anchor
        .text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(collapse_whitespace);

    let title = match own {
        Some(t) if !is_nav_text(&t) && t.chars().count() >= 4 => Some(t),
        _ => anchor
            .select(heading)
            .next()
            .map(|h| collapse_whitespace(&h.text().collect::<String>())),
    }?;

    let len = title.chars().count();
    ((4..=150).contains(&len) && !is_nav_text(&title)).then_some(title)
}

/// Visible location next to a job anchor, if any.
fn link_location(anchor: &ElementRef, location: &Selector) -> Option<String> {
    let text_of = |el: ElementRef| collapse_whitespace(&el.text().collect::<String>());

    if let Some(el) = anchor.select(location).next() {
        return Some(text_of(el)).filter(|t| !t.is_empty());
    }
    let parent = anchor.parent().and_then(ElementRef::wrap)?;
    parent
        .select(location)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty() && t.len() < 100)
}

/// Extract job-like links from rendered HTML, in document order.
pub fn extract_job_links(html: &str, base: &Url) -> Result<Vec<CrawledLink>> {
    let document = Html::parse_document(html);
    let anchors = selector("a[href]")?;
    let heading = selector(r#"h1, h2, h3, h4, [class*="title"]"#)?;
    let location = selector(r#"[class*="location"], [class*="Location"], [data-location]"#)?;

    let base_canonical = canonical_url(base.as_str(), AtsType::Custom);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }

        let Some(url) = resolve(base, href) else {
            continue;
        };
        if !is_job_url(&url) || is_auth_flow_url(&url) {
            continue;
        }

        let key = canonical_url(&url, AtsType::Custom);
        if key == base_canonical || seen.contains(&key) {
            continue;
        }
        let Some(title) = link_title(&anchor, &heading) else {
            continue;
        };

        seen.insert(key);
        links.push(CrawledLink {
            title,
            url,
            location: link_location(&anchor, &location),
        });
    }

    Ok(links)
}

/// Pagination link to follow for the second level, if any.
pub fn find_next_page(html: &str, base: &Url) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let rel_next = selector(r#"a[rel="next"][href], link[rel="next"][href]"#)?;
    let anchors = selector("a[href]")?;

    if let Some(href) = document
        .select(&rel_next)
        .find_map(|el| el.value().attr("href"))
    {
        return Ok(resolve(base, href));
    }

    let found = document.select(&anchors).find(|a| {
        let text = collapse_whitespace(&a.text().collect::<String>()).to_lowercase();
        let label = a
            .value()
            .attr("aria-label")
            .unwrap_or_default()
            .to_lowercase();
        NEXT_TEXT.contains(&text.as_str()) || label.contains("next page")
    });

    Ok(found
        .and_then(|a| a.value().attr("href"))
        .filter(|h| !h.starts_with('#') && !h.starts_with("javascript:"))
        .and_then(|h| resolve(base, h)))
}

/// Crawl one career site with an open driver.
///
/// `cancelled` is checked around every navigation.
pub fn crawl_with_driver(
    driver: &mut dyn PageDriver,
    start_url: &str,
    ats: AtsType,
    deadline: Instant,
    cancelled: &AtomicBool,
) -> Result<FetchOutcome> {
    ensure_safe(start_url)?;
    checkpoint(cancelled)?;
    driver.navigate(start_url)?;
    checkpoint(cancelled)?;

    let landed = driver.current_url()?;
    ensure_safe(&landed)?;
    let base = Url::parse(&landed)?;

    let html = driver.content()?;
    let mut links = extract_job_links(&html, &base)?;
    let mut pages = 1;
    log::debug!("{}: {} job links on listing page", start_url, links.len());

    let mut truncation = None;
    if pages < MAX_DEPTH {
        checkpoint(cancelled)?;
        if Instant::now() >= deadline {
            truncation = Some(Truncation::Deadline);
        } else if let Some(next) = find_next_page(&html, &base)? {
            ensure_safe(&next)?;
            driver.navigate(&next)?;
            checkpoint(cancelled)?;
            let landed = driver.current_url()?;
            ensure_safe(&landed)?;
            let next_base = Url::parse(&landed)?;
            merge_links(&mut links, extract_job_links(&driver.content()?, &next_base)?);
            pages += 1;
        } else if driver.load_more()? {
            ensure_safe(&driver.current_url()?)?;
            merge_links(&mut links, extract_job_links(&driver.content()?, &base)?);
            pages += 1;
        }
    }

    let postings = links
        .into_iter()
        .map(|link| RawPosting::Crawled { ats, link })
        .collect();
    Ok(FetchOutcome {
        postings,
        pages,
        truncation,
    })
}

/// Append links not already present, keeping discovery order.
fn merge_links(links: &mut Vec<CrawledLink>, more: Vec<CrawledLink>) {
    let mut seen: HashSet<String> = links
        .iter()
        .map(|l| canonical_url(&l.url, AtsType::Custom))
        .collect();
    for link in more {
        if seen.insert(canonical_url(&link.url, AtsType::Custom)) {
            links.push(link);
        }
    }
}

/// Raises the flag when the awaiting future is dropped, e.g. by a timeout.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Browser-backed fallback for career sites without an adapter.
#[derive(Clone)]
pub struct GenericCrawler {
    factory: Arc<dyn DriverFactory>,
}

impl GenericCrawler {
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self { factory }
    }

    /// Crawl on the blocking pool; the driver is dropped on every exit path.
    ///
    /// Dropping the returned future does not abort the blocking task, so it
    /// signals the crawl to stop at its next step instead.
    pub async fn crawl(&self, career_url: &str, ats: AtsType, budget: Duration) -> Result<FetchOutcome> {
        let factory = Arc::clone(&self.factory);
        let url = career_url.to_string();
        let deadline = Instant::now() + budget;
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel = CancelOnDrop(Arc::clone(&cancelled));

        tokio::task::spawn_blocking(move || {
            let mut driver = factory.open()?;
            crawl_with_driver(driver.as_mut(), &url, ats, deadline, &cancelled)
        })
        .await
        .map_err(|e| AppError::browser(format!("crawler task failed: {}", e)))?
    }
}
