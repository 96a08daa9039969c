//! Company registry structures.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::slugify;

/// Applicant tracking system behind a career page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AtsType {
    Greenhouse,
    Lever,
    Ashby,
    Workday,
    Amazon,
    Google,
    Tiktok,
    Uber,
    Meta,
    /// A bespoke career site with no recognizable ATS
    Custom,
    #[default]
    Unknown,
}

impl AtsType {
    /// Every variant with a direct API adapter.
    pub const ADAPTED: [AtsType; 9] = [
        AtsType::Greenhouse,
        AtsType::Lever,
        AtsType::Ashby,
        AtsType::Workday,
        AtsType::Amazon,
        AtsType::Google,
        AtsType::Tiktok,
        AtsType::Uber,
        AtsType::Meta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AtsType::Greenhouse => "greenhouse",
            AtsType::Lever => "lever",
            AtsType::Ashby => "ashby",
            AtsType::Workday => "workday",
            AtsType::Amazon => "amazon",
            AtsType::Google => "google",
            AtsType::Tiktok => "tiktok",
            AtsType::Uber => "uber",
            AtsType::Meta => "meta",
            AtsType::Custom => "custom",
            AtsType::Unknown => "unknown",
        }
    }

    /// Whether postings come from the generic browser crawler.
    pub fn is_generic(&self) -> bool {
        matches!(self, AtsType::Custom | AtsType::Unknown)
    }
}

impl fmt::Display for AtsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtsType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let ats = match s.trim().to_lowercase().as_str() {
            "greenhouse" => AtsType::Greenhouse,
            "lever" => AtsType::Lever,
            "ashby" => AtsType::Ashby,
            "workday" => AtsType::Workday,
            "amazon" => AtsType::Amazon,
            "google" => AtsType::Google,
            "tiktok" => AtsType::Tiktok,
            "uber" => AtsType::Uber,
            "meta" => AtsType::Meta,
            "custom" => AtsType::Custom,
            "unknown" | "" => AtsType::Unknown,
            other => return Err(AppError::validation(format!("unknown ATS type '{other}'"))),
        };
        Ok(ats)
    }
}

/// How a detection was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    UrlSignature,
    PageMarker,
    SlugProbe,
    /// No ATS found; routed to the generic crawler
    Fallback,
}

/// Result of classifying a career URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub ats_type: AtsType,
    /// Rewritten board URL when the career page embeds an ATS
    pub direct_url: Option<String>,
    pub method: DetectionMethod,
}

impl Detection {
    pub fn new(ats_type: AtsType, direct_url: Option<String>, method: DetectionMethod) -> Self {
        Self {
            ats_type,
            direct_url,
            method,
        }
    }

    pub fn unknown() -> Self {
        Self::new(AtsType::Unknown, None, DetectionMethod::Fallback)
    }

    /// URL the adapter or crawler should start from.
    pub fn fetch_url<'a>(&'a self, career_url: &'a str) -> &'a str {
        self.direct_url.as_deref().unwrap_or(career_url)
    }
}

/// A company whose career page is crawled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEntry {
    pub name: String,
    pub career_url: String,
    #[serde(default)]
    pub ats_type: AtsType,
    #[serde(default)]
    pub last_crawled: Option<DateTime<Utc>>,
}

impl CompanyEntry {
    pub fn new(name: impl Into<String>, career_url: impl Into<String>, ats_type: AtsType) -> Self {
        Self {
            name: name.into(),
            career_url: career_url.into(),
            ats_type,
            last_crawled: None,
        }
    }

    /// Filesystem-safe identifier used for output file names.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// The set of companies for a profile, with state carried between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRegistry {
    pub companies: Vec<CompanyEntry>,
}

impl CompanyRegistry {
    pub fn new(companies: Vec<CompanyEntry>) -> Self {
        Self { companies }
    }

    /// Load persisted registry state, or an empty registry when none exists.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match std::fs::read(path.as_ref()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Save registry state atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Overlay saved state onto companies freshly loaded from config.
    ///
    /// Config stays authoritative for which companies exist and their URLs;
    /// a saved detection only fills in an `unknown` ATS type for the same URL.
    pub fn merge_state(config: Vec<CompanyEntry>, saved: &CompanyRegistry) -> Self {
        let saved: HashMap<&str, &CompanyEntry> = saved
            .companies
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();

        let companies = config
            .into_iter()
            .map(|mut entry| {
                if let Some(prev) = saved.get(entry.name.as_str()) {
                    entry.last_crawled = prev.last_crawled;
                    if entry.ats_type == AtsType::Unknown && prev.career_url == entry.career_url {
                        entry.ats_type = prev.ats_type;
                    }
                }
                entry
            })
            .collect();

        Self { companies }
    }

    /// Record a successful crawl.
    pub fn record_crawl(&mut self, name: &str, ats_type: AtsType, at: DateTime<Utc>) {
        if let Some(entry) = self.companies.iter_mut().find(|c| c.name == name) {
            if !ats_type.is_generic() || entry.ats_type == AtsType::Unknown {
                entry.ats_type = ats_type;
            }
            entry.last_crawled = Some(at);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CompanyEntry> {
        self.companies.iter().find(|c| c.name == name)
    }
}
