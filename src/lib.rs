//! pagetrace - depth-bounded network capture crawler
//!
//! Drives headless Chromium over one site, depth first, and records every
//! in-scope request/response pair the browser sees while each page loads.
//!
//! # Architecture
//!
//! ```text
//!  Crawler ──goto/wait──▶ PageDriver (CDP) ──events──▶ ResponseCollector
//!     │                        │                             │
//!     │◀──── references ───────┘                             │
//!     │◀──────────────────── drain ──────────────────────────┘
//!     ▼
//!  LogAggregator ──▶ logs.json
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pagetrace::browser::BrowserConfig;
//! use pagetrace::crawl::CrawlConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlConfig::builder("https://example.com").max_depth(1).build();
//!     let summary = pagetrace::run(config, BrowserConfig::default()).await?;
//!     println!("Captured {} exchanges", summary.records_written);
//!     Ok(())
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod crawl;
pub mod error;
pub mod extraction;

// Re-exports for convenience
pub use browser::{BrowserController, CdpDriver, PageDriver};
pub use crawl::{CrawlConfig, CrawlSession, CrawlSummary, Crawler};
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Crawl `config.target` with a freshly launched browser.
///
/// The target is validated before the browser starts and the log file is
/// opened once the browser is up; failures at any of those steps abort the
/// run. Everything after that is handled per page.
pub async fn run(config: CrawlConfig, browser: browser::BrowserConfig) -> Result<CrawlSummary> {
    CrawlSession::validate_target(&config.target)?;

    let settle = browser.settle();
    let controller = BrowserController::launch(browser).await?;

    let outcome = async {
        let page = controller.new_page().await?;
        let session = CrawlSession::open(config)?;
        let driver = CdpDriver::attach(page, session.collector().clone(), settle).await?;
        Crawler::new(driver, session).run().await
    }
    .await;

    if let Err(e) = controller.close().await {
        tracing::warn!("Failed to close browser cleanly: {}", e);
    }
    outcome
}
