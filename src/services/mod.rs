//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - ATS detection (`AtsDetector`)
//! - Generic career-page crawling (`GenericCrawler`)
//! - Posting normalization (`normalize`)
//! - Filtering (`FilterEngine`)
//! - Optional ranking (`JobScorer`)

#[cfg(feature = "browser")]
mod browser;
pub mod crawler;
pub mod detector;
mod filter;
pub mod normalizer;
mod scoring;

#[cfg(feature = "browser")]
pub use browser::{BrowserSession, ChromeFactory};
pub use crawler::{DriverFactory, GenericCrawler, PageDriver};
pub use detector::AtsDetector;
pub use filter::{FilterEngine, NoTitleMatcher, TitleMatcher, canonical_tokens};
pub use normalizer::{normalize, normalize_location};
pub use scoring::{JobScorer, MatchScore, NoScorer, rank};
