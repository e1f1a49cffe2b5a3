//! Depth-first traversal
//!
//! One navigation is in flight at a time. For each frame the crawler
//! navigates, waits for the `load` milestone, drains the collector into log
//! records, then follows the page's in-scope references in document order,
//! exploring each child's subtree before moving to the next sibling. A
//! failure anywhere in a frame ends that frame only.

use crate::browser::PageDriver;
use crate::crawl::log::LogRecord;
use crate::crawl::session::{CrawlSession, CrawlSummary};
use crate::crawl::url::{host_of, is_crawlable, resolve, strip_fragment};
use crate::error::Result;
use futures::future::LocalBoxFuture;
use tracing::{error, info, trace, warn};

/// Drives a [`PageDriver`] over one [`CrawlSession`]
pub struct Crawler<D> {
    driver: D,
    session: CrawlSession,
}

impl<D: PageDriver> Crawler<D> {
    /// Pair a driver with the session it reports into
    pub fn new(driver: D, session: CrawlSession) -> Self {
        Self { driver, session }
    }

    /// The session being crawled
    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    /// Crawl from the session's start URL and write out the log
    pub async fn run(mut self) -> Result<CrawlSummary> {
        let start = self.session.start_url().to_string();
        info!(
            "Starting crawl of {} (max depth: {})",
            start,
            self.session.config().max_depth
        );

        self.crawl(start, 0).await;

        let summary = self.session.finish()?;
        info!(
            "Crawl finished: {} pages attempted, {} records, {} URLs visited",
            summary.stats.pages_attempted, summary.records_written, summary.visited
        );
        Ok(summary)
    }

    fn crawl(&mut self, url: String, depth: usize) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {
            if depth > self.session.config().max_depth {
                return;
            }
            if self.session.page_budget_exhausted() {
                trace!("Page budget exhausted, not visiting {}", url);
                return;
            }
            if !self.session.collector().mark_visited(&url) {
                return;
            }

            info!("Crawling: {} (depth: {})", url, depth);
            self.session.stats_mut().pages_attempted += 1;

            let timeout = self.session.config().timeout;
            if let Err(e) = self.driver.goto(&url, timeout).await {
                warn!("Failed to navigate to {}: {}", url, e);
                self.session.stats_mut().navigation_failures += 1;
                return;
            }
            if let Err(e) = self.driver.wait_for_load().await {
                warn!("Failed to wait for load state for {}: {}", url, e);
                self.session.stats_mut().navigation_failures += 1;
                return;
            }
            self.session.stats_mut().pages_loaded += 1;

            self.drain().await;

            let links = match self.driver.extract_links().await {
                Ok(links) => links,
                Err(e) => {
                    warn!("Failed to extract links from {}: {}", url, e);
                    self.session.stats_mut().extraction_failures += 1;
                    return;
                }
            };

            // relative targets follow the document's base, which differs from
            // `url` after a redirect or with a <base> element
            let base = if is_crawlable(&links.base) {
                links.base.as_str()
            } else {
                url.as_str()
            };
            for next in self.follow_targets(base, &links.targets) {
                if self.session.collector().is_visited(&next) {
                    continue;
                }
                self.crawl(next, depth + 1).await;
            }
        })
    }

    /// Move everything the collector holds into the log
    async fn drain(&mut self) {
        self.driver.settle().await;

        for (key, response) in self.session.collector().drain() {
            let body = match self.driver.fetch_body(&response).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to get response body for {}: {}", response.url, e);
                    self.session.stats_mut().bodies_skipped += 1;
                    continue;
                }
            };

            let record = LogRecord::from_exchange(&key, &response, &body);
            if let Err(e) = self.session.append_record(record) {
                error!("Failed to record response for {}: {}", response.url, e);
            }
        }
    }

    /// Normalize raw references into crawlable, in-scope frame URLs
    fn follow_targets(&self, base: &str, references: &[String]) -> Vec<String> {
        let collector = self.session.collector();

        references
            .iter()
            .filter_map(|raw| {
                let absolute = resolve(raw, base)?;
                if !is_crawlable(&absolute) {
                    trace!("Skipping non-http reference: {}", raw);
                    return None;
                }
                let host = host_of(&absolute)?;
                if !collector.in_scope(&host) {
                    trace!("Skipping out-of-scope reference: {}", absolute);
                    return None;
                }
                Some(strip_fragment(&absolute))
            })
            .collect()
    }
}
