//! Page driver seam
//!
//! The crawler talks to the browser only through [`PageDriver`]. The
//! Chromium implementation lives here; tests drive the crawler with a
//! scripted in-memory site instead.
//!
//! A driver is constructed already subscribed to network events: every
//! response the page sees while a driver call is in progress must reach the
//! session's [`ResponseCollector`] before [`PageDriver::settle`] returns.

use crate::browser::navigation::{NavigationOptions, PageNavigator};
use crate::browser::network::NetworkCapture;
use crate::browser::PageHandle;
use crate::crawl::collector::{ObservedResponse, ResponseCollector};
use crate::error::Result;
use crate::crawl::url::is_crawlable;
use crate::extraction::{LinkExtractor, PageLinks};
use std::time::Duration;
use tracing::debug;

/// What the crawler needs from a browser page
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// Load `url`, returning once DOMContentLoaded fired. Fails if that takes
    /// longer than `timeout`.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Block until the current document reached its `load` milestone
    async fn wait_for_load(&mut self) -> Result<()>;

    /// Let already-delivered network events reach the collector
    async fn settle(&mut self) {}

    /// Fetch the body bytes of a captured response
    async fn fetch_body(&mut self, response: &ObservedResponse) -> Result<Vec<u8>>;

    /// Raw outbound references of the current document, in document order,
    /// with the base URL they resolve against
    async fn extract_links(&mut self) -> Result<PageLinks>;
}

/// [`PageDriver`] over a chromiumoxide page
pub struct CdpDriver {
    page: PageHandle,
    settle: Duration,
    /// Where the last navigation ended up after redirects
    landed: Option<String>,
    _capture: NetworkCapture,
}

impl CdpDriver {
    /// Subscribe `page` to network events feeding `collector`
    pub async fn attach(
        page: PageHandle,
        collector: ResponseCollector,
        settle: Duration,
    ) -> Result<Self> {
        let capture = NetworkCapture::attach(&page, collector).await?;
        Ok(Self {
            page,
            settle,
            landed: None,
            _capture: capture,
        })
    }
}

impl PageDriver for CdpDriver {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.landed = None;
        let result =
            PageNavigator::goto(&self.page, url, &NavigationOptions::with_timeout(timeout)).await?;
        if result.final_url != url {
            debug!("{} redirected to {}", url, result.final_url);
        }
        debug!("Navigated in {} ms", result.duration_ms);
        self.landed = Some(result.final_url);
        Ok(())
    }

    async fn wait_for_load(&mut self) -> Result<()> {
        PageNavigator::wait_for_load(&self.page).await
    }

    async fn settle(&mut self) {
        tokio::task::yield_now().await;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }

    async fn fetch_body(&mut self, response: &ObservedResponse) -> Result<Vec<u8>> {
        NetworkCapture::fetch_body(&self.page, &response.request_id).await
    }

    async fn extract_links(&mut self) -> Result<PageLinks> {
        let mut links = LinkExtractor::extract_targets(&self.page).await?;
        if !is_crawlable(&links.base) {
            if let Some(landed) = &self.landed {
                links.base = landed.clone();
            }
        }
        Ok(links)
    }
}
