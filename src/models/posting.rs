//! Raw postings as each ATS exposes them.
//!
//! Field names follow the upstream APIs; normalization into [`Job`] happens
//! in `services::normalizer`.
//!
//! [`Job`]: crate::models::Job

use serde::{Deserialize, Serialize};

use crate::models::AtsType;

/// A posting exactly as one adapter extracted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawPosting {
    Greenhouse(GreenhouseJob),
    Lever(LeverPosting),
    Ashby(AshbyJob),
    Workday {
        /// `https://{host}/{site}` the external paths are relative to
        board_url: String,
        posting: WorkdayPosting,
    },
    Amazon(AmazonJob),
    Google(GoogleJob),
    Tiktok(TiktokJob),
    Uber(UberJob),
    Meta(MetaJob),
    /// A link found by the generic crawler
    Crawled {
        ats: AtsType,
        link: CrawledLink,
    },
}

impl RawPosting {
    pub fn source(&self) -> AtsType {
        match self {
            RawPosting::Greenhouse(_) => AtsType::Greenhouse,
            RawPosting::Lever(_) => AtsType::Lever,
            RawPosting::Ashby(_) => AtsType::Ashby,
            RawPosting::Workday { .. } => AtsType::Workday,
            RawPosting::Amazon(_) => AtsType::Amazon,
            RawPosting::Google(_) => AtsType::Google,
            RawPosting::Tiktok(_) => AtsType::Tiktok,
            RawPosting::Uber(_) => AtsType::Uber,
            RawPosting::Meta(_) => AtsType::Meta,
            RawPosting::Crawled { ats, .. } => *ats,
        }
    }
}

// --- Greenhouse ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreenhouseJob {
    pub id: u64,
    pub title: String,
    pub absolute_url: String,
    #[serde(default)]
    pub location: Option<NamedField>,
    #[serde(default)]
    pub departments: Vec<NamedField>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedField {
    #[serde(default)]
    pub name: String,
}

// --- Lever ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverPosting {
    pub id: String,
    pub text: String,
    pub hosted_url: String,
    #[serde(default)]
    pub categories: LeverCategories,
    #[serde(default)]
    pub workplace_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeverCategories {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub commitment: Option<String>,
    #[serde(default)]
    pub all_locations: Vec<String>,
}

// --- Ashby ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AshbyJob {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub is_remote: Option<bool>,
    pub job_url: String,
    #[serde(default)]
    pub published_at: Option<String>,
}

// --- Workday ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkdayPosting {
    pub title: String,
    pub external_path: String,
    #[serde(default)]
    pub locations_text: Option<String>,
    #[serde(default)]
    pub posted_on: Option<String>,
    #[serde(default)]
    pub bullet_fields: Vec<String>,
}

// --- Amazon ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmazonJob {
    #[serde(default)]
    pub id_icims: Option<String>,
    pub title: String,
    pub job_path: String,
    #[serde(default)]
    pub normalized_location: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_category: Option<String>,
    #[serde(default)]
    pub team: Option<AmazonTeam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmazonTeam {
    #[serde(default)]
    pub label: Option<String>,
}

// --- Google ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleJob {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub locations: Vec<GoogleLocation>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleLocation {
    #[serde(default)]
    pub display: String,
}

// --- TikTok ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiktokJob {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub city_info: Option<TiktokName>,
    #[serde(default)]
    pub job_category: Option<TiktokName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiktokName {
    #[serde(default)]
    pub en_name: Option<String>,
}

// --- Uber ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UberJob {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub location: Option<UberLocation>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UberLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
}

// --- Meta ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaJob {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

// --- Generic crawler ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledLink {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawled_posting_keeps_its_ats() {
        let raw = RawPosting::Crawled {
            ats: AtsType::Workday,
            link: CrawledLink {
                title: "Data Engineer".into(),
                url: "https://acme.example/careers/jobs/1".into(),
                location: None,
            },
        };

        let value = serde_json::to_value(&raw).unwrap();
        assert_eq!(value["kind"], "crawled");

        let back: RawPosting = serde_json::from_value(value).unwrap();
        assert_eq!(back.source(), AtsType::Workday);
    }
}
