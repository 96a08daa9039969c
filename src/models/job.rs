//! Normalized job posting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AtsType;
use crate::utils::tokenize;

/// A job posting after normalization.
///
/// `(company, canonical_url)` identifies the posting; title and location text
/// may change between crawls without making it a different posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub company: String,
    pub title: String,
    /// Empty when the source did not say
    pub location: String,
    pub team: Option<String>,
    pub canonical_url: String,
    pub source: AtsType,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub seniority: Seniority,
}

impl Job {
    /// Dedup key.
    pub fn key(&self) -> (&str, &str) {
        (&self.company, &self.canonical_url)
    }
}

/// Experience level inferred from a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Entry,
    Mid,
    Senior,
    #[default]
    Unspecified,
}

/// Level numerals count only right after one of these ("Engineer II", not "Team V").
const ROLE_NOUNS: &[&str] = &[
    "engineer",
    "scientist",
    "developer",
    "analyst",
    "researcher",
    "designer",
    "architect",
    "manager",
    "specialist",
    "programmer",
    "administrator",
    "consultant",
    "technician",
    "sde",
    "swe",
];

impl Seniority {
    pub fn infer(title: &str) -> Self {
        let tokens = tokenize(title);
        let has = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));
        let level = |numerals: &[&str]| {
            tokens
                .windows(2)
                .any(|w| ROLE_NOUNS.contains(&w[0].as_str()) && numerals.contains(&w[1].as_str()))
        };

        if has(&["senior", "sr", "staff", "principal", "lead"]) || level(&["iv", "v"]) {
            Seniority::Senior
        } else if has(&["junior", "jr", "entry", "associate", "intern", "graduate"])
            || title.to_lowercase().contains("new grad")
        {
            Seniority::Entry
        } else if has(&["mid"]) || level(&["ii", "iii"]) {
            Seniority::Mid
        } else {
            Seniority::Unspecified
        }
    }
}

/// How a posting relates to what the dedup store has seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sighting {
    /// Never seen for this company
    New,
    /// Seen before with different content
    Updated,
    /// Seen before with identical content
    Unchanged,
}

impl Sighting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sighting::New => "new",
            Sighting::Updated => "updated",
            Sighting::Unchanged => "unchanged",
        }
    }

    /// Whether this sighting is worth reporting.
    pub fn is_fresh(&self) -> bool {
        !matches!(self, Sighting::Unchanged)
    }
}
