// src/services/detector.rs

//! ATS detection.
//!
//! Classification runs in three steps:
//! 1. match the URL against host/path signatures;
//! 2. fetch the page and scan it for embedded boards;
//! 3. fall back to `custom` (page fetched, no marker) or `unknown` (page
//!    unreachable).
//!
//! Detection never fails; every outcome routes somewhere.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::adapters::AdapterRegistry;
use crate::models::{AtsType, Detection, DetectionMethod};
use crate::utils::http::HttpClient;
use crate::utils::tokenize;

/// A host/path pattern identifying one ATS.
#[derive(Debug, Clone)]
pub struct Signature {
    pub ats: AtsType,
    pattern: Regex,
}

impl Signature {
    fn new(ats: AtsType, pattern: &str) -> Option<Self> {
        Regex::new(pattern).ok().map(|pattern| Self { ats, pattern })
    }

    pub fn matches(&self, host_path: &str) -> bool {
        self.pattern.is_match(host_path)
    }
}

/// URL signatures; each matches a distinct host set.
static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    vec![
        Signature::new(AtsType::Greenhouse, r"^([a-z0-9-]+\.)?greenhouse\.io/"),
        Signature::new(AtsType::Lever, r"^(jobs|api)\.lever\.co/"),
        Signature::new(AtsType::Ashby, r"^(jobs|api)\.ashbyhq\.com/"),
        Signature::new(AtsType::Workday, r"^[a-z0-9-]+\.wd\d+\.myworkdayjobs\.com/"),
        Signature::new(AtsType::Amazon, r"^(www\.)?amazon\.jobs/"),
        Signature::new(
            AtsType::Google,
            r"^(careers\.google\.com/|(www\.)?google\.com/about/careers/)",
        ),
        Signature::new(
            AtsType::Tiktok,
            r"^((www\.)?lifeattiktok\.com|careers\.tiktok\.com)/",
        ),
        Signature::new(AtsType::Uber, r"^(www\.)?uber\.com/([a-z]{2}/[a-z]{2}/)?careers"),
        Signature::new(AtsType::Meta, r"^(www\.)?metacareers\.com/"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Embedded-board marker found in page HTML.
struct PageMarker {
    ats: AtsType,
    pattern: Regex,
    /// Direct board URL template; `{}` is replaced by capture group 1
    direct: &'static str,
}

/// Slugs that appear in board URLs but never name a board.
const RESERVED_SLUGS: &[&str] = &["embed", "v1", "js", "api", "jobs", "static", "assets"];

static PAGE_MARKERS: LazyLock<Vec<PageMarker>> = LazyLock::new(|| {
    let marker = |ats, pattern: &str, direct| {
        Regex::new(pattern)
            .ok()
            .map(|pattern| PageMarker { ats, pattern, direct })
    };
    vec![
        // Greenhouse iframe/script embeds carry the token as `for=`
        marker(
            AtsType::Greenhouse,
            r"greenhouse\.io/embed/job_board(?:/js)?\?for=([A-Za-z0-9_-]+)",
            "https://boards.greenhouse.io/{}",
        ),
        marker(
            AtsType::Greenhouse,
            r#"(?i)board_?token["']?\s*[:=]\s*["']([A-Za-z0-9_-]+)["']"#,
            "https://boards.greenhouse.io/{}",
        ),
        marker(
            AtsType::Greenhouse,
            r"(?:job-)?boards(?:-api)?\.greenhouse\.io/(?:v1/boards/)?([A-Za-z0-9_-]+)",
            "https://boards.greenhouse.io/{}",
        ),
        marker(
            AtsType::Lever,
            r"jobs\.lever\.co/([A-Za-z0-9_.-]+)",
            "https://jobs.lever.co/{}",
        ),
        marker(
            AtsType::Ashby,
            r"jobs\.ashbyhq\.com/([A-Za-z0-9_.%-]+)",
            "https://jobs.ashbyhq.com/{}",
        ),
        marker(
            AtsType::Ashby,
            r#"organizationHostedJobsPageName["']?\s*:\s*["']([A-Za-z0-9_.-]+)["']"#,
            "https://jobs.ashbyhq.com/{}",
        ),
        marker(
            AtsType::Workday,
            r"https?://([a-z0-9-]+\.wd\d+\.myworkdayjobs\.com/(?:[a-z]{2}-[A-Z]{2}/)?[A-Za-z0-9_-]+)",
            "https://{}",
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Lowercase `host/path` form the signatures match against.
fn host_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}{}", host, parsed.path()).to_lowercase())
}

/// Signature match against an explicit signature list.
pub fn detect_url_with(signatures: &[Signature], url: &str) -> Option<AtsType> {
    let target = host_path(url)?;
    signatures
        .iter()
        .find(|s| s.matches(&target))
        .map(|s| s.ats)
}

/// Built-in URL signatures.
pub fn signatures() -> &'static [Signature] {
    &SIGNATURES
}

/// Step 1: classify by URL shape alone.
pub fn detect_url(url: &str) -> Option<AtsType> {
    detect_url_with(signatures(), url)
}

/// Step 2: scan fetched HTML for an embedded board.
pub fn scan_markers(html: &str) -> Option<Detection> {
    for marker in PAGE_MARKERS.iter() {
        let found = marker
            .pattern
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|slug| !RESERVED_SLUGS.contains(&slug.to_ascii_lowercase().as_str()));

        if let Some(slug) = found {
            let direct = marker.direct.replace("{}", slug);
            return Some(Detection::new(
                marker.ats,
                Some(direct),
                DetectionMethod::PageMarker,
            ));
        }
    }
    None
}

/// Slug guesses derived from a company name, most specific first.
pub fn slug_candidates(name: &str) -> Vec<String> {
    const SUFFIXES: &[&str] = &["inc", "llc", "ltd", "corp", "co", "company", "the"];

    let words: Vec<String> = tokenize(name)
        .into_iter()
        .filter(|w| !SUFFIXES.contains(&w.as_str()))
        .collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut candidates = vec![words.concat(), words.join("-"), words[0].clone()];
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| !c.is_empty() && seen.insert(c.clone()));
    candidates
}

/// Career URL classifier.
pub struct AtsDetector {
    http: HttpClient,
}

impl AtsDetector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Classify a career URL. Network failures degrade to `unknown`.
    pub async fn detect(&self, career_url: &str) -> Detection {
        if let Some(ats) = detect_url(career_url) {
            return Detection::new(ats, None, DetectionMethod::UrlSignature);
        }

        let html = match self.http.get_text(career_url).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Detection fetch failed for {}: {}", career_url, e);
                return Detection::unknown();
            }
        };

        scan_markers(&html).unwrap_or_else(|| {
            log::debug!("No ATS marker on {}", career_url);
            Detection::new(AtsType::Custom, None, DetectionMethod::Fallback)
        })
    }

    /// Classify, then probe hosted-board APIs with slugs from the company
    /// name when the page itself gave nothing away.
    pub async fn detect_for_company(
        &self,
        name: &str,
        career_url: &str,
        adapters: &AdapterRegistry,
        budget: Duration,
    ) -> Detection {
        let detection = self.detect(career_url).await;
        if !detection.ats_type.is_generic() {
            return detection;
        }

        for slug in slug_candidates(name) {
            for ats in [AtsType::Greenhouse, AtsType::Lever, AtsType::Ashby] {
                let Some(adapter) = adapters.get(ats) else {
                    continue;
                };
                let Some(board_url) = adapter.board_url(&slug) else {
                    continue;
                };

                match adapter.fetch(&board_url, budget).await {
                    Ok(outcome) if !outcome.postings.is_empty() => {
                        log::info!("{}: found {} board '{}'", name, ats, slug);
                        return Detection::new(ats, Some(board_url), DetectionMethod::SlugProbe);
                    }
                    Ok(_) => log::debug!("{}: {} board '{}' is empty", name, ats, slug),
                    Err(e) => log::debug!("{}: {} probe '{}' failed: {}", name, ats, slug, e),
                }
            }
        }

        detection
    }
}
