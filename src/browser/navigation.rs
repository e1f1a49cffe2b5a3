//! Page navigation functionality
//!
//! This module handles URL navigation with timeout handling and the load
//! milestones the crawler synchronizes on.

use crate::browser::PageHandle;
use crate::error::{Error, NavigationError, Result};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Options for page navigation
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Wait until condition (default: DOMContentLoaded)
    pub wait_until: WaitUntil,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            wait_until: WaitUntil::DomContentLoaded,
        }
    }
}

impl NavigationOptions {
    /// Options with the given timeout and the default milestone
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            ..Default::default()
        }
    }
}

/// Condition to wait for after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait until load event fires
    Load,
    /// Wait until DOMContentLoaded event fires
    DomContentLoaded,
}

impl WaitUntil {
    /// Name of the milestone as the DOM spells it
    pub fn as_str(self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "DOMContentLoaded",
        }
    }

    fn script(self) -> &'static str {
        match self {
            WaitUntil::Load => {
                r#"
                    new Promise(resolve => {
                        if (document.readyState === 'complete') {
                            resolve(true);
                        } else {
                            window.addEventListener('load', () => resolve(true));
                        }
                    })
                "#
            }
            WaitUntil::DomContentLoaded => {
                r#"
                    new Promise(resolve => {
                        if (document.readyState !== 'loading') {
                            resolve(true);
                        } else {
                            document.addEventListener('DOMContentLoaded', () => resolve(true));
                        }
                    })
                "#
            }
        }
    }
}

/// Result of a navigation operation
#[derive(Debug)]
pub struct NavigationResult {
    /// Final URL after any redirects
    pub final_url: String,
    /// Navigation duration in milliseconds
    pub duration_ms: u64,
}

/// Page navigator
pub struct PageNavigator;

impl PageNavigator {
    /// Navigate to a URL. The timeout covers both the navigation request and
    /// the `wait_until` milestone.
    #[instrument(skip(page))]
    pub async fn goto(
        page: &PageHandle,
        url: &str,
        opts: &NavigationOptions,
    ) -> Result<NavigationResult> {
        let start = std::time::Instant::now();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(NavigationError::InvalidUrl(format!(
                "URL must start with http:// or https://: {}",
                url
            ))
            .into());
        }

        info!("Navigating to: {}", url);

        let timeout = Duration::from_millis(opts.timeout_ms);
        let navigation = async {
            page.page
                .goto(url)
                .await
                .map_err(|e| Error::from(NavigationError::LoadFailed(e.to_string())))?;
            Self::wait_for(page, opts.wait_until).await
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))??;

        let final_url = page
            .page
            .url()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .unwrap_or_else(|| url.to_string());

        debug!("Navigation complete: {} -> {}", url, final_url);

        Ok(NavigationResult {
            final_url,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Wait for the `load` event of the current document. No timeout.
    #[instrument(skip(page))]
    pub async fn wait_for_load(page: &PageHandle) -> Result<()> {
        Self::wait_for(page, WaitUntil::Load).await
    }

    async fn wait_for(page: &PageHandle, milestone: WaitUntil) -> Result<()> {
        page.page
            .evaluate(milestone.script())
            .await
            .map_err(|e| NavigationError::WaitFailed {
                milestone: milestone.as_str(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
