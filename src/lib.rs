// src/lib.rs

//! Career Crawler Library
//!
//! Detects the applicant tracking system behind a company career page,
//! fetches its postings through a per-ATS adapter or a headless-browser
//! crawler, and reports the jobs that match a profile and are new since
//! the last run.

pub mod adapters;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
