//! Crawl configuration and per-run state
//!
//! A [`CrawlSession`] owns everything one run mutates: the collector (visited
//! set and scratch mapping), the log aggregator, and the run statistics.
//! Nothing is process-global, so sessions can run back to back or side by
//! side in one process.

use crate::crawl::collector::ResponseCollector;
use crate::crawl::log::{LogAggregator, LogRecord, OutputFormat};
use crate::crawl::scope::ScopePolicy;
use crate::crawl::url::strip_fragment;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default maximum crawl depth
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Default per-navigation timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default log file name
pub const DEFAULT_OUTPUT: &str = "logs.json";

/// Configuration for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Start URL
    pub target: String,
    /// Deepest frame that is still navigated (default: 3)
    pub max_depth: usize,
    /// Per-navigation timeout (default: 30s)
    pub timeout: Duration,
    /// Host matching policy (default: suffix)
    pub scope: ScopePolicy,
    /// Stop navigating after this many pages (None = unbounded)
    pub max_pages: Option<usize>,
    /// Log file path (default: logs.json)
    pub output: PathBuf,
    /// Log file framing (default: pretty JSON array)
    pub format: OutputFormat,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            scope: ScopePolicy::Suffix,
            max_pages: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::Json,
        }
    }
}

impl CrawlConfig {
    /// Create a new config builder
    pub fn builder<S: Into<String>>(target: S) -> CrawlConfigBuilder {
        CrawlConfigBuilder {
            config: CrawlConfig {
                target: target.into(),
                ..Default::default()
            },
        }
    }
}

/// Builder for CrawlConfig
#[derive(Debug)]
pub struct CrawlConfigBuilder {
    config: CrawlConfig,
}

impl CrawlConfigBuilder {
    /// Set maximum depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set per-navigation timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set scope policy
    pub fn scope(mut self, scope: ScopePolicy) -> Self {
        self.config.scope = scope;
        self
    }

    /// Cap the number of navigated pages
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.config.max_pages = Some(pages);
        self
    }

    /// Set log file path
    pub fn output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.output = path.into();
        self
    }

    /// Set log file framing
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Build the config
    pub fn build(self) -> CrawlConfig {
        self.config
    }
}

/// Counters kept over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Navigations attempted
    pub pages_attempted: usize,
    /// Navigations that reached the load milestone
    pub pages_loaded: usize,
    /// Navigation or load-wait failures
    pub navigation_failures: usize,
    /// Pages whose link extraction failed
    pub extraction_failures: usize,
    /// Responses dropped because their body could not be fetched
    pub bodies_skipped: usize,
    /// Records appended to the log
    pub records: usize,
}

/// What a finished run reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    /// Normalized start URL
    pub start_url: String,
    /// Records written to the log
    pub records_written: usize,
    /// URLs in the visited set when the run ended
    pub visited: usize,
    /// Run counters
    pub stats: CrawlStats,
}

/// State owned by one crawl run
#[derive(Debug)]
pub struct CrawlSession {
    config: CrawlConfig,
    start_url: String,
    collector: ResponseCollector,
    log: LogAggregator,
    stats: CrawlStats,
}

impl CrawlSession {
    /// Validate the target and open the log file.
    pub fn open(config: CrawlConfig) -> Result<Self> {
        Self::validate_target(&config.target)?;
        let log = LogAggregator::create(&config.output, config.format)?;
        Self::with_log(config, log)
    }

    /// Validate the target and aggregate into `log`.
    pub fn with_log(config: CrawlConfig, log: LogAggregator) -> Result<Self> {
        let (start_url, base_host) = Self::validate_target(&config.target)?;
        let collector = ResponseCollector::new(base_host, config.scope);

        Ok(Self {
            config,
            start_url,
            collector,
            log,
            stats: CrawlStats::default(),
        })
    }

    /// Parse the target, returning its normalized form and host.
    pub fn validate_target(target: &str) -> Result<(String, String)> {
        let parsed =
            Url::parse(target).map_err(|e| Error::InvalidTarget(format!("{target}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidTarget(format!(
                "{target}: scheme must be http or https"
            )));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidTarget(format!("{target}: missing host")))?
            .to_ascii_lowercase();

        Ok((strip_fragment(parsed.as_str()), host))
    }

    /// Run configuration
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Normalized start URL
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Collector handle; clone it into the browser's event task
    pub fn collector(&self) -> &ResponseCollector {
        &self.collector
    }

    /// Aggregated log so far
    pub fn log(&self) -> &LogAggregator {
        &self.log
    }

    /// Append one record to the log and count it.
    pub fn append_record(&mut self, record: LogRecord) -> Result<()> {
        self.log.append(record)?;
        self.stats.records += 1;
        Ok(())
    }

    /// Counters so far
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CrawlStats {
        &mut self.stats
    }

    /// Whether the page ceiling has been reached
    pub fn page_budget_exhausted(&self) -> bool {
        self.config
            .max_pages
            .is_some_and(|max| self.stats.pages_attempted >= max)
    }

    /// Write out the log and report the run
    pub fn finish(self) -> Result<CrawlSummary> {
        let visited = self.collector.visited_count();
        let records_written = self.log.finish()?;

        Ok(CrawlSummary {
            start_url: self.start_url,
            records_written,
            visited,
            stats: self.stats,
        })
    }
}
