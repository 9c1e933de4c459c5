//! Page renderer: fetches a URL in headless Chrome and returns the DOM once client-side
//! rendering has settled.
//!
//! Each `render` call owns one browser process for its whole duration. The browser is closed
//! and its handler task stopped before `render` returns, on failure as well as success.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

const WINDOW_WIDTH: u32 = 1920;
const WINDOW_HEIGHT: u32 = 1080;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: CdpError,
    },

    #[error("rendering {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// Given a URL, returns the final HTML after client-side rendering settles.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, settle_delay: Duration) -> Result<String, RenderError>;
}

/// Accepts absolute http(s) URLs only.
pub fn validate_url(url: &str) -> Result<Url, RenderError> {
    let invalid = |reason: String| RenderError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[derive(Debug, Clone)]
pub struct ChromeRendererConfig {
    pub chrome_executable: Option<PathBuf>,
    /// Wait after the scroll-to-bottom so lazily loaded content can arrive.
    pub scroll_delay: Duration,
    /// Upper bound for launch + navigation + capture.
    pub navigation_timeout: Duration,
}

pub struct ChromeRenderer {
    config: ChromeRendererConfig,
}

impl ChromeRenderer {
    pub fn new(config: ChromeRendererConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .request_timeout(self.config.navigation_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={USER_AGENT}"));
        if let Some(path) = &self.config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(RenderError::Launch)
    }

    async fn capture(
        &self,
        browser: &Browser,
        url: &Url,
        settle_delay: Duration,
    ) -> Result<String, RenderError> {
        let nav_err = |source: CdpError| RenderError::Navigation {
            url: url.to_string(),
            source,
        };

        let page = browser.new_page(url.as_str()).await.map_err(nav_err)?;
        page.wait_for_navigation().await.map_err(nav_err)?;

        tokio::time::sleep(settle_delay).await;
        page.evaluate(SCROLL_TO_BOTTOM).await.map_err(nav_err)?;
        tokio::time::sleep(self.config.scroll_delay).await;

        let html = page.content().await.map_err(nav_err)?;
        debug!("Captured {} bytes from {url}", html.len());
        Ok(html)
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str, settle_delay: Duration) -> Result<String, RenderError> {
        let url = validate_url(url)?;
        let config = self.browser_config()?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task: JoinHandle<()> = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    match e {
                        CdpError::Ws(_)
                        | CdpError::LaunchExit(_, _)
                        | CdpError::LaunchTimeout(_)
                        | CdpError::LaunchIo(_, _) => break,
                        _ => continue,
                    }
                }
            }
        });

        info!("Rendering {url}");
        let timeout = self.config.navigation_timeout + settle_delay + self.config.scroll_delay;
        let result = match tokio::time::timeout(
            timeout,
            self.capture(&browser, &url, settle_delay),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        };

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {e}");
        }
        if let Err(e) = browser.wait().await {
            warn!("Failed to reap browser process: {e}");
        }
        handler_task.abort();

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("https://aijobs.ai/job/senior-engineer").is_ok());
        assert!(validate_url("  http://localhost:8080/jobs/1 ").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        let err = validate_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'file'"));
    }

    #[test]
    fn test_validate_url_rejects_relative() {
        assert!(matches!(
            validate_url("/jobs/1"),
            Err(RenderError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_browser_config_builds() {
        let renderer = ChromeRenderer::new(ChromeRendererConfig {
            chrome_executable: Some(PathBuf::from("/usr/bin/chromium")),
            scroll_delay: Duration::from_secs(3),
            navigation_timeout: Duration::from_secs(60),
        });
        assert!(renderer.browser_config().is_ok());
    }
}
