//! Filter criteria.

use serde::{Deserialize, Serialize};

/// What a user wants to see. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Accepted titles, in priority order. Empty accepts every title.
    #[serde(default)]
    pub titles: Vec<String>,

    /// Accepted locations. Empty accepts every location.
    #[serde(default)]
    pub locations: Vec<String>,

    /// Seniority keywords that disqualify a title.
    #[serde(default = "default_excluded_levels")]
    pub excluded_levels: Vec<String>,

    /// Share of an accepted title's tokens a job title must contain.
    #[serde(default = "default_min_overlap")]
    pub min_overlap: f64,
}

impl FilterCriteria {
    pub fn new(titles: Vec<String>, locations: Vec<String>, excluded_levels: Vec<String>) -> Self {
        Self {
            titles,
            locations,
            excluded_levels,
            min_overlap: default_min_overlap(),
        }
    }

    pub fn accepts_remote(&self) -> bool {
        self.locations
            .iter()
            .any(|l| l.trim().eq_ignore_ascii_case("remote"))
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            titles: Vec::new(),
            locations: Vec::new(),
            excluded_levels: default_excluded_levels(),
            min_overlap: default_min_overlap(),
        }
    }
}

fn default_excluded_levels() -> Vec<String> {
    [
        "staff", "principal", "lead", "director", "manager", "head", "vp", "junior", "intern",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_overlap() -> f64 {
    0.75
}
