// src/models/mod.rs

//! Domain models for the career crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod company;
mod config;
mod criteria;
mod job;
mod posting;
mod report;

// Re-export all public types
pub use company::{AtsType, CompanyEntry, CompanyRegistry, Detection, DetectionMethod};
pub use config::{
    BrowserConfig, CandidateConfig, CompanyConfig, Config, CrawlerConfig, HashPolicy,
    OutputConfig, StoreConfig,
};
pub use criteria::FilterCriteria;
pub use job::{Job, Seniority, Sighting};
pub use posting::{
    AmazonJob, AmazonTeam, AshbyJob, CrawledLink, GoogleJob, GoogleLocation, GreenhouseJob,
    LeverCategories, LeverPosting, MetaJob, NamedField, RawPosting, TiktokJob, TiktokName,
    UberJob, UberLocation, WorkdayPosting,
};
pub use report::{CompanyReport, CompanyStatus, JobRecord, RunReport};
