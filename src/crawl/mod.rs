//! Crawl traversal
//!
//! URL normalization, scope tests, response collection, the depth-first
//! engine, and the log it produces.

pub mod collector;
pub mod engine;
pub mod log;
pub mod scope;
pub mod session;
pub mod url;

pub use collector::{ObservedResponse, ResponseCollector};
pub use engine::Crawler;
pub use log::{HeaderMap, LogAggregator, LogRecord, OutputFormat, RequestLog, ResponseLog};
pub use scope::{in_scope, ScopePolicy};
pub use session::{CrawlConfig, CrawlSession, CrawlStats, CrawlSummary};
