// src/services/filter.rs

//! Title, location and seniority filtering.
//!
//! A job passes when its title matches an accepted title, its location is
//! acceptable, and no excluded seniority keyword appears in its title as a
//! whole token or token sequence.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{FilterCriteria, Job};
use crate::utils::tokenize;

/// Abbreviations expanded before comparing titles.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("ml", &["machine", "learning"]),
    ("mle", &["machine", "learning", "engineer"]),
    ("ai", &["artificial", "intelligence"]),
    ("swe", &["software", "engineer"]),
    ("sde", &["software", "engineer"]),
    ("nlp", &["natural", "language", "processing"]),
    ("cv", &["computer", "vision"]),
    ("sr", &["senior"]),
    ("jr", &["junior"]),
    ("eng", &["engineer"]),
    ("engineering", &["engineer"]),
    ("mgr", &["manager"]),
];

/// Lowercase tokens with abbreviations expanded.
pub fn canonical_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .flat_map(|token| match SYNONYMS.iter().find(|(short, _)| *short == token) {
            Some((_, expansion)) => expansion.iter().map(|s| s.to_string()).collect(),
            None => vec![token],
        })
        .collect()
}

fn contains_sequence(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Optional title-relevance capability, e.g. an embedding or LLM judge.
pub trait TitleMatcher: Send + Sync {
    /// Whether `title` is relevant to the accepted titles; `None` defers to
    /// token matching.
    fn relevance(&self, title: &str, accepted: &[String]) -> Option<bool>;
}

/// Matcher with no opinion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTitleMatcher;

impl TitleMatcher for NoTitleMatcher {
    fn relevance(&self, _title: &str, _accepted: &[String]) -> Option<bool> {
        None
    }
}

/// Applies one run's [`FilterCriteria`].
#[derive(Clone)]
pub struct FilterEngine {
    criteria: FilterCriteria,
    matcher: Arc<dyn TitleMatcher>,
    accepted: Vec<Vec<String>>,
    excluded: Vec<Vec<String>>,
}

impl FilterEngine {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self::with_matcher(criteria, Arc::new(NoTitleMatcher))
    }

    pub fn with_matcher(criteria: FilterCriteria, matcher: Arc<dyn TitleMatcher>) -> Self {
        let accepted = criteria
            .titles
            .iter()
            .map(|t| canonical_tokens(t))
            .filter(|t| !t.is_empty())
            .collect();
        let excluded = criteria
            .excluded_levels
            .iter()
            .map(|l| canonical_tokens(l))
            .filter(|l| !l.is_empty())
            .collect();

        Self {
            criteria,
            matcher,
            accepted,
            excluded,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Whether the job passes every rule.
    pub fn matches(&self, job: &Job) -> bool {
        self.title_matches(&job.title) && self.location_matches(job) && !self.is_excluded(&job.title)
    }

    /// Keep passing jobs, preserving order.
    pub fn apply(&self, jobs: Vec<Job>) -> Vec<Job> {
        jobs.into_iter().filter(|j| self.matches(j)).collect()
    }

    /// Exact, synonym, then relevance or token-overlap match.
    pub fn title_matches(&self, title: &str) -> bool {
        if self.accepted.is_empty() {
            return true;
        }

        let tokens = canonical_tokens(title);
        if self.accepted.iter().any(|a| *a == tokens) {
            return true;
        }

        if let Some(relevant) = self.matcher.relevance(title, &self.criteria.titles) {
            return relevant;
        }

        let present: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        self.accepted.iter().any(|accepted| {
            let wanted: HashSet<&str> = accepted.iter().map(String::as_str).collect();
            let hits = wanted.iter().filter(|t| present.contains(*t)).count();
            hits as f64 / wanted.len() as f64 >= self.criteria.min_overlap
        })
    }

    /// Empty job locations never exclude.
    pub fn location_matches(&self, job: &Job) -> bool {
        if self.criteria.locations.is_empty() || job.location.trim().is_empty() {
            return true;
        }
        if job.remote && self.criteria.accepts_remote() {
            return true;
        }

        let parts: Vec<String> = job
            .location
            .split(';')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        self.criteria.locations.iter().any(|accepted| {
            let accepted = accepted.trim().to_lowercase();
            !accepted.is_empty() && parts.iter().any(|p| p.contains(&accepted))
        })
    }

    /// Whether an excluded keyword appears as whole tokens in the title.
    pub fn is_excluded(&self, title: &str) -> bool {
        let tokens = canonical_tokens(title);
        self.excluded.iter().any(|e| contains_sequence(&tokens, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AtsType, Seniority};
    use chrono::Utc;

    fn job(title: &str, location: &str) -> Job {
        Job {
            company: "Acme".into(),
            title: title.into(),
            location: location.into(),
            team: None,
            canonical_url: format!("https://acme.com/{}", title.len()),
            source: AtsType::Custom,
            discovered_at: Utc::now(),
            remote: location == "Remote",
            seniority: Seniority::infer(title),
        }
    }

    fn engine(titles: &[&str], locations: &[&str], excluded: &[&str]) -> FilterEngine {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        FilterEngine::new(FilterCriteria::new(owned(titles), owned(locations), owned(excluded)))
    }

    #[test]
    fn test_synonym_equivalence() {
        let engine = engine(&["Machine Learning Engineer"], &[], &[]);
        assert!(engine.title_matches("ML Engineer"));
        assert!(engine.title_matches("MLE"));
        assert!(engine.title_matches("machine learning engineer"));
        assert!(!engine.title_matches("Product Designer"));
    }

    #[test]
    fn test_token_overlap_threshold() {
        let engine = engine(&["Machine Learning Engineer"], &[], &[]);
        assert!(engine.title_matches("Senior ML Engineer"));
        assert!(engine.title_matches("Machine Learning Engineer, Ranking"));
        // 2 of 3 tokens is below 0.75
        assert!(!engine.title_matches("Machine Learning Researcher"));
    }

    #[test]
    fn test_empty_titles_accept_all() {
        let engine = engine(&[], &[], &[]);
        assert!(engine.title_matches("Anything At All"));
    }

    #[test]
    fn test_whole_token_exclusion() {
        let engine = engine(&[], &[], &["lead", "staff", "vice president"]);
        assert!(engine.is_excluded("Lead Software Engineer"));
        assert!(engine.is_excluded("Staff ML Engineer"));
        assert!(engine.is_excluded("Vice President, Engineering"));
        assert!(!engine.is_excluded("Engineering Leadership Coach"));
        assert!(!engine.is_excluded("Staffing Coordinator"));
        assert!(!engine.is_excluded("President's Office Engineer"));
    }

    #[test]
    fn test_exclusion_expands_abbreviations() {
        let engine = engine(&[], &[], &["senior"]);
        assert!(engine.is_excluded("Sr. Data Engineer"));
    }

    #[test]
    fn test_location_rules() {
        let engine = engine(&[], &["San Francisco", "Remote"], &[]);
        assert!(engine.location_matches(&job("X", "San Francisco, CA")));
        assert!(engine.location_matches(&job("X", "Remote")));
        assert!(engine.location_matches(&job("X", "")));
        assert!(engine.location_matches(&job("X", "London, United Kingdom; San Francisco, CA")));
        assert!(!engine.location_matches(&job("X", "Seattle, WA")));

        let onsite_only = self::engine(&[], &["Seattle, WA"], &[]);
        assert!(!onsite_only.location_matches(&job("X", "Remote")));
    }

    #[test]
    fn test_partial_location_does_not_match_longer_accepted() {
        let engine = engine(&[], &["New York, NY"], &[]);
        assert!(engine.location_matches(&job("X", "New York, NY")));
        assert!(engine.location_matches(&job("X", "New York, NY; Boston, MA")));
        assert!(!engine.location_matches(&job("X", "York")));
        assert!(!engine.location_matches(&job("X", "NY")));
    }

    struct Strict;

    impl TitleMatcher for Strict {
        fn relevance(&self, _title: &str, _accepted: &[String]) -> Option<bool> {
            Some(false)
        }
    }

    #[test]
    fn test_matcher_replaces_overlap_but_not_exact() {
        let criteria = FilterCriteria::new(vec!["Machine Learning Engineer".into()], vec![], vec![]);
        let engine = FilterEngine::with_matcher(criteria, Arc::new(Strict));

        assert!(engine.title_matches("ML Engineer"));
        assert!(!engine.title_matches("Senior ML Engineer"));
    }

    #[test]
    fn test_apply_preserves_order() {
        let engine = engine(&["Machine Learning Engineer"], &[], &["staff"]);
        let kept = engine.apply(vec![
            job("Machine Learning Engineer", "Remote"),
            job("Staff Machine Learning Engineer", "Remote"),
            job("Senior ML Engineer", "Remote"),
        ]);
        let titles: Vec<_> = kept.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Machine Learning Engineer", "Senior ML Engineer"]);
    }
}
