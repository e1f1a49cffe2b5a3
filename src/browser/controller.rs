//! Browser lifecycle
//!
//! Launches one Chromium process per crawl, hands out the single tab the
//! crawl drives, and tears the process down when the run ends.

use crate::error::{BrowserError, Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

const BLANK: &str = "about:blank";

/// How long `close` waits for the CDP handler task to wind down
const HANDLER_SHUTDOWN: Duration = Duration::from_secs(5);

/// Chromium launch settings
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Hide the browser window (default: true)
    pub headless: bool,
    /// Viewport width in CSS pixels (default: 1920)
    pub width: u32,
    /// Viewport height in CSS pixels (default: 1080)
    pub height: u32,
    /// Keep Chromium's sandbox on; containers running as root usually need it off
    pub sandbox: bool,
    /// User agent override (None = Chromium's own)
    pub user_agent: Option<String>,
    /// Explicit executable; auto-detected when unset
    pub chrome_path: Option<String>,
    /// Quiet period before each drain so late network events land (default: 250)
    pub event_settle_ms: u64,
    /// Extra command-line switches passed to Chromium as-is
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1920,
            height: 1080,
            sandbox: true,
            user_agent: None,
            chrome_path: None,
            event_settle_ms: 250,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Start from the defaults
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Pre-drain quiet period as a [`Duration`]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.event_settle_ms)
    }

    /// Translate into chromiumoxide's launch config
    fn to_cdp(&self) -> Result<CdpBrowserConfig> {
        let mut builder = CdpBrowserConfig::builder().viewport(Viewport {
            width: self.width,
            height: self.height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        if !self.headless {
            builder = builder.with_head();
        }
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(ua) = &self.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        builder = builder.args(self.extra_args.iter());

        builder
            .build()
            .map_err(|e| BrowserError::ConfigError(e.to_string()).into())
    }
}

/// Builder for [`BrowserConfig`]
#[derive(Debug, Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Show or hide the browser window
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable or disable Chromium's sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Override the user agent
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    /// Use this Chrome/Chromium executable
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set the pre-drain quiet period in milliseconds
    pub fn event_settle_ms(mut self, ms: u64) -> Self {
        self.config.event_settle_ms = ms;
        self
    }

    /// Append one raw Chromium switch
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Finish building
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// The tab a crawl drives
#[derive(Clone)]
pub struct PageHandle {
    pub(crate) page: Page,
}

/// A running Chromium process and its CDP event pump
pub struct BrowserController {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserController {
    /// Start Chromium and spawn the task that services its CDP connection.
    #[instrument(skip(config), fields(headless = config.headless))]
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let cdp_config = config.to_cdp()?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                // chromiumoxide reports undecodable messages here; the connection survives them
                if let Err(e) = event {
                    debug!("CDP handler error: {}", e);
                }
            }
            debug!("CDP handler finished");
        });

        info!("Browser launched");
        Ok(Self { browser, handler })
    }

    /// Open a blank tab
    pub async fn new_page(&self) -> Result<PageHandle> {
        let page = self
            .browser
            .new_page(BLANK)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        Ok(PageHandle { page })
    }

    /// Shut Chromium down and wait briefly for the handler to exit.
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        if tokio::time::timeout(HANDLER_SHUTDOWN, self.handler)
            .await
            .is_err()
        {
            warn!("CDP handler still running after browser close");
        }
        info!("Browser closed");
        Ok(())
    }
}
