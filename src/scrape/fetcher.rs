//! Headless-browser page fetching.
//!
//! The browser session is scoped to a single fetch: launch, navigate, wait
//! for the body element, settle, capture, tear down. Teardown happens on
//! success and failure alike. Failures never escape this layer; a fetch that
//! goes wrong yields `None` and the caller treats it as nothing to process.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;

use crate::core::config::ScrapeSettings;

/// Raw markup captured from one URL. Immutable once created; a later fetch
/// of the same URL produces a new capture.
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch rendered markup for `url`. `None` means the page could not be
    /// captured; the reason has already been logged.
    async fn fetch(&self, url: &str, use_proxy: bool) -> Option<PageCapture>;
}

/// Fetcher backed by a headless Chromium instance driven over CDP.
pub struct ChromiumFetcher {
    settings: ScrapeSettings,
}

impl ChromiumFetcher {
    pub fn new(settings: ScrapeSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self, use_proxy: bool) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.settings.user_agent));

        if use_proxy {
            if let Some(proxy) = &self.settings.proxy_server {
                builder = builder.arg(format!("--proxy-server={}", proxy));
            } else {
                tracing::warn!("Proxy requested but PROXY_SERVER is not configured");
            }
        }

        builder.build()
    }

    async fn capture(&self, browser: &Browser, url: &str) -> Result<String, String> {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| format!("navigation failed: {e}"))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| format!("page load failed: {e}"))?;

        // Minimal structural element must exist before we trust the DOM.
        page.find_element("body")
            .await
            .map_err(|e| format!("body element not found: {e}"))?;

        // Fixed settle delay for client-side rendering.
        tokio::time::sleep(Duration::from_secs(self.settings.settle_delay_secs)).await;

        page.content()
            .await
            .map_err(|e| format!("content capture failed: {e}"))
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(&self, url: &str, use_proxy: bool) -> Option<PageCapture> {
        tracing::info!("Scraping website: {}", url);

        let config = match self.browser_config(use_proxy) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("Invalid browser configuration: {}", err);
                return None;
            }
        };

        let (mut browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(err) => {
                tracing::error!("Failed to launch browser: {}", err);
                return None;
            }
        };
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let timeout = Duration::from_secs(self.settings.page_load_timeout_secs);
        let result = match tokio::time::timeout(timeout, self.capture(&browser, url)).await {
            Ok(result) => result,
            Err(_) => Err(format!("page load timed out after {:?}", timeout)),
        };

        // Tear the session down regardless of how the capture went.
        if let Err(err) = browser.close().await {
            tracing::warn!("Browser close failed: {}", err);
        }
        let _ = browser.wait().await;
        handler_task.abort();

        match result {
            Ok(html) => Some(PageCapture {
                url: url.to_string(),
                html,
                fetched_at: Utc::now(),
            }),
            Err(err) => {
                tracing::error!("An error occurred while scraping {}: {}", url, err);
                None
            }
        }
    }
}
