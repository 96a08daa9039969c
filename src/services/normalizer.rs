// src/services/normalizer.rs

//! Raw posting to [`Job`] normalization.
//!
//! Pure and deterministic: the discovery time is passed in, never read from
//! the clock.

use chrono::{DateTime, Utc};

use crate::models::{AtsType, Job, RawPosting, Seniority};
use crate::utils::collapse_whitespace;
use crate::utils::url::canonical_url;

const US_STATES: &[(&str, &str)] = &[
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("district of columbia", "DC"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
];

const US_NAMES: &[&str] = &["us", "usa", "u.s.", "u.s.a.", "united states", "united states of america"];

/// Two-letter code for a US state name or code.
fn state_code(text: &str) -> Option<&'static str> {
    let lower = text.trim().to_lowercase();
    US_STATES
        .iter()
        .find(|(name, code)| *name == lower || code.eq_ignore_ascii_case(&lower))
        .map(|(_, code)| *code)
}

/// State names that are also countries; without a US marker they stay as written.
const AMBIGUOUS_STATES: &[&str] = &["georgia"];

fn is_us(text: &str) -> bool {
    US_NAMES.contains(&text.trim().to_lowercase().as_str())
}

fn is_remote_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("remote")
        || lower.ends_with("remote")
        || lower.ends_with("(remote)")
        || lower == "anywhere"
}

/// Normalize one location.
fn normalize_single(text: &str) -> String {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        return text;
    }
    if is_remote_text(&text) {
        return "Remote".to_string();
    }

    let parts: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mapped = match parts.as_slice() {
        // "US, CA, Santa Clara"
        [country, state, city] if is_us(country) => {
            state_code(state).map(|code| format!("{}, {}", city, code))
        }
        // "Seattle, Washington, USA" / "Seattle, WA, United States"
        [city, state, country] if is_us(country) => {
            state_code(state).map(|code| format!("{}, {}", city, code))
        }
        // "San Francisco, California" / "New York, NY"
        [city, state] if !AMBIGUOUS_STATES.contains(&state.to_lowercase().as_str()) => {
            state_code(state).map(|code| format!("{}, {}", city, code))
        }
        _ => None,
    };
    mapped.unwrap_or(text)
}

/// Normalize location text to `City, ST` or `Remote` where recognizable.
///
/// Multi-location strings (`;` or `|` separated) are normalized per part.
pub fn normalize_location(text: &str) -> String {
    let parts: Vec<String> = text
        .split([';', '|'])
        .map(normalize_single)
        .filter(|p| !p.is_empty())
        .collect();

    let mut unique: Vec<String> = Vec::with_capacity(parts.len());
    for part in parts {
        if !unique.contains(&part) {
            unique.push(part);
        }
    }
    unique.join("; ")
}

fn join_locations<'a>(locations: impl IntoIterator<Item = &'a str>) -> String {
    locations
        .into_iter()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(collapse_whitespace)
        .filter(|v| !v.is_empty())
}

/// Fields pulled out of a raw posting before cleanup.
struct Extracted {
    title: String,
    location: String,
    team: Option<String>,
    url: String,
    remote_hint: bool,
}

fn extract(raw: &RawPosting) -> Extracted {
    match raw {
        RawPosting::Greenhouse(job) => Extracted {
            title: job.title.clone(),
            location: job
                .location
                .as_ref()
                .map(|l| l.name.clone())
                .unwrap_or_default(),
            team: job.departments.first().map(|d| d.name.clone()),
            url: job.absolute_url.clone(),
            remote_hint: false,
        },
        RawPosting::Lever(posting) => {
            let categories = &posting.categories;
            let location = if categories.all_locations.len() > 1 {
                join_locations(categories.all_locations.iter().map(String::as_str))
            } else {
                categories.location.clone().unwrap_or_default()
            };
            Extracted {
                title: posting.text.clone(),
                location,
                team: categories.team.clone().or_else(|| categories.department.clone()),
                url: posting.hosted_url.clone(),
                remote_hint: posting
                    .workplace_type
                    .as_deref()
                    .is_some_and(|w| w.eq_ignore_ascii_case("remote")),
            }
        }
        RawPosting::Ashby(job) => Extracted {
            title: job.title.clone(),
            location: job.location.clone().unwrap_or_default(),
            team: job.team.clone().or_else(|| job.department.clone()),
            url: job.job_url.clone(),
            remote_hint: job.is_remote.unwrap_or(false),
        },
        RawPosting::Workday { board_url, posting } => Extracted {
            title: posting.title.clone(),
            location: posting.locations_text.clone().unwrap_or_default(),
            team: None,
            url: format!("{}{}", board_url.trim_end_matches('/'), posting.external_path),
            remote_hint: false,
        },
        RawPosting::Amazon(job) => Extracted {
            title: job.title.clone(),
            location: job
                .normalized_location
                .clone()
                .or_else(|| job.location.clone())
                .unwrap_or_default(),
            team: job
                .team
                .as_ref()
                .and_then(|t| t.label.clone())
                .or_else(|| job.job_category.clone()),
            url: format!("https://www.amazon.jobs{}", job.job_path),
            remote_hint: false,
        },
        RawPosting::Google(job) => Extracted {
            title: job.title.clone(),
            location: join_locations(job.locations.iter().map(|l| l.display.as_str())),
            team: job.categories.first().cloned(),
            url: format!(
                "https://careers.google.com/jobs/results/{}",
                job.id.trim_start_matches("jobs/")
            ),
            remote_hint: false,
        },
        RawPosting::Tiktok(job) => Extracted {
            title: job.title.clone(),
            location: job
                .city_info
                .as_ref()
                .and_then(|c| c.en_name.clone())
                .unwrap_or_default(),
            team: job.job_category.as_ref().and_then(|c| c.en_name.clone()),
            url: format!("https://lifeattiktok.com/search/{}", job.id),
            remote_hint: false,
        },
        RawPosting::Uber(job) => {
            let location = job
                .location
                .as_ref()
                .map(|l| {
                    [l.city.as_deref(), l.region.as_deref(), l.country_name.as_deref()]
                        .into_iter()
                        .flatten()
                        .filter(|p| !p.trim().is_empty())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            Extracted {
                title: job.title.clone(),
                location,
                team: job.team.clone().or_else(|| job.department.clone()),
                url: format!("https://www.uber.com/global/en/careers/list/{}/", job.id),
                remote_hint: false,
            }
        }
        RawPosting::Meta(job) => Extracted {
            title: job.title.clone(),
            location: join_locations(job.locations.iter().map(String::as_str)),
            team: job.teams.first().cloned(),
            url: format!("https://www.metacareers.com/jobs/{}/", job.id),
            remote_hint: false,
        },
        RawPosting::Crawled { link, .. } => Extracted {
            title: link.title.clone(),
            location: link.location.clone().unwrap_or_default(),
            team: None,
            url: link.url.clone(),
            remote_hint: false,
        },
    }
}

/// Map a raw posting into the canonical [`Job`].
pub fn normalize(company: &str, raw: &RawPosting, discovered_at: DateTime<Utc>) -> Job {
    let source = raw.source();
    let extracted = extract(raw);

    let title = collapse_whitespace(&extracted.title);
    let location = normalize_location(&extracted.location);
    let remote = extracted.remote_hint || location.split("; ").any(|l| l == "Remote");
    let url_source = if source.is_generic() {
        AtsType::Custom
    } else {
        source
    };

    Job {
        company: company.to_string(),
        seniority: Seniority::infer(&title),
        title,
        location,
        team: non_empty(extracted.team.as_deref()),
        canonical_url: canonical_url(&extracted.url, url_source),
        source,
        discovered_at,
        remote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AshbyJob, CrawledLink, GreenhouseJob, NamedField, WorkdayPosting};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_location_mapping() {
        assert_eq!(normalize_location("US, CA, Santa Clara"), "Santa Clara, CA");
        assert_eq!(normalize_location("Seattle, Washington, USA"), "Seattle, WA");
        assert_eq!(normalize_location("San Francisco, California"), "San Francisco, CA");
        assert_eq!(normalize_location("New York,  NY"), "New York, NY");
        assert_eq!(normalize_location("Remote - US"), "Remote");
        assert_eq!(normalize_location("US Remote"), "Remote");
        assert_eq!(normalize_location("London, United Kingdom"), "London, United Kingdom");
        assert_eq!(normalize_location(""), "");
    }

    #[test]
    fn test_state_named_like_a_country_needs_us_context() {
        assert_eq!(normalize_location("Tbilisi, Georgia"), "Tbilisi, Georgia");
        assert_eq!(normalize_location("Atlanta, Georgia, USA"), "Atlanta, GA");
        assert_eq!(normalize_location("Atlanta, GA"), "Atlanta, GA");
    }

    #[test]
    fn test_multi_location() {
        assert_eq!(
            normalize_location("San Francisco, California; Remote - US | New York, New York"),
            "San Francisco, CA; Remote; New York, NY"
        );
        assert_eq!(normalize_location("Remote; Remote - US"), "Remote");
    }

    #[test]
    fn test_normalize_ashby() {
        let raw = RawPosting::Ashby(AshbyJob {
            id: Some("a1".into()),
            title: "  Senior   ML Engineer ".into(),
            location: Some("San Francisco, California".into()),
            department: Some("Applied AI".into()),
            team: None,
            is_remote: Some(false),
            job_url: "https://jobs.ashbyhq.com/openai/a1?utm_source=x".into(),
            published_at: None,
        });

        let job = normalize("OpenAI", &raw, at());
        assert_eq!(job.title, "Senior ML Engineer");
        assert_eq!(job.location, "San Francisco, CA");
        assert_eq!(job.team.as_deref(), Some("Applied AI"));
        assert_eq!(job.canonical_url, "https://jobs.ashbyhq.com/openai/a1");
        assert_eq!(job.source, AtsType::Ashby);
        assert_eq!(job.seniority, Seniority::Senior);
        assert_eq!(job.discovered_at, at());
        assert!(!job.remote);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = RawPosting::Greenhouse(GreenhouseJob {
            id: 7,
            title: "Research Engineer".into(),
            absolute_url: "https://boards.greenhouse.io/anthropic/jobs/7?gh_jid=7&gh_src=li".into(),
            location: Some(NamedField {
                name: "Remote - US".into(),
            }),
            departments: vec![NamedField { name: " ".into() }],
            updated_at: None,
        });

        let first = normalize("Anthropic", &raw, at());
        let second = normalize("Anthropic", &raw, at());
        assert_eq!(first, second);
        assert_eq!(first.location, "Remote");
        assert!(first.remote);
        assert_eq!(first.team, None);
        assert_eq!(
            first.canonical_url,
            "https://boards.greenhouse.io/anthropic/jobs/7?gh_jid=7"
        );
    }

    #[test]
    fn test_normalize_workday_joins_board_url() {
        let raw = RawPosting::Workday {
            board_url: "https://nvidia.wd5.myworkdayjobs.com/External".into(),
            posting: WorkdayPosting {
                title: "Deep Learning Engineer".into(),
                external_path: "/job/US-CA-Santa-Clara/Deep-Learning-Engineer_JR1".into(),
                locations_text: Some("US, CA, Santa Clara".into()),
                posted_on: None,
                bullet_fields: vec![],
            },
        };

        let job = normalize("NVIDIA", &raw, at());
        assert_eq!(
            job.canonical_url,
            "https://nvidia.wd5.myworkdayjobs.com/External/job/US-CA-Santa-Clara/Deep-Learning-Engineer_JR1"
        );
        assert_eq!(job.location, "Santa Clara, CA");
    }

    #[test]
    fn test_normalize_crawled_keeps_identity_query() {
        let raw = RawPosting::Crawled {
            ats: AtsType::Unknown,
            link: CrawledLink {
                title: "Platform Engineer".into(),
                url: "https://careers.example.com/jobs?id=9&utm_campaign=x#top".into(),
                location: None,
            },
        };

        let job = normalize("Example", &raw, at());
        assert_eq!(job.canonical_url, "https://careers.example.com/jobs?id=9");
        assert_eq!(job.source, AtsType::Unknown);
        assert_eq!(job.location, "");
    }
}
