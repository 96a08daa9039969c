//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Crawl every configured company and persist results
//! - `DiffCalculator`: Classify matched jobs against the dedup store

pub mod crawl;
pub mod diff;

pub use crawl::{CrawlContext, crawl_company, run_companies, run_crawler};
pub use diff::{DiffCalculator, DiffResult, dedup_in_run};
