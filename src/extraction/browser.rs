//! Fallback tier: headless Chromium rendering
//!
//! Each render launches an isolated browser session with its own profile
//! directory. Images, fonts, stylesheets and media are failed at the request
//! stage so only the document and its scripts load.

use crate::config::ExtractionConfig;
use crate::extraction::ExtractionError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, NavigateParams};
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Final document of a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Status of the main document response, when the browser reported one
    pub status: Option<u16>,
    pub html: String,
}

impl RenderedPage {
    pub fn new(status: Option<u16>, html: impl Into<String>) -> Self {
        Self {
            status,
            html: html.into(),
        }
    }
}

/// A tier that renders a URL into its final HTML
#[async_trait]
pub trait RenderTier: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, ExtractionError>;
}

/// Renders pages in a fresh headless Chromium per call
pub struct ChromiumRenderer {
    chromium_path: Option<PathBuf>,
    user_agent: String,
    timeout: Duration,
    network_settle: Duration,
}

impl ChromiumRenderer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            chromium_path: config.chromium_path.as_ref().map(PathBuf::from),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.browser_timeout_secs),
            network_settle: Duration::from_millis(config.network_settle_ms),
        }
    }

    fn build_config(&self, profile_dir: &Path) -> Result<ChromiumConfig, ExtractionError> {
        let mut builder = ChromiumConfig::builder()
            .user_data_dir(profile_dir)
            .no_sandbox()
            .request_timeout(self.timeout);

        if let Some(path) = &self.chromium_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.args(vec![
            format!("--user-agent={}", self.user_agent),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            "--no-first-run".to_string(),
            "--mute-audio".to_string(),
        ]);

        builder.build().map_err(ExtractionError::Launch)
    }
}

#[async_trait]
impl RenderTier for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ExtractionError> {
        let profile_dir = std::env::temp_dir().join(format!(
            "lead-prospector-{}-{}",
            std::process::id(),
            SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let config = self.build_config(&profile_dir)?;
        let session = BrowserSession::launch(config, profile_dir).await?;

        let outcome =
            tokio::time::timeout(self.timeout, session.render(url, self.network_settle)).await;

        session.shutdown().await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::BrowserTimeout(self.timeout)),
        }
    }
}

/// One launched browser and its CDP event loop
struct BrowserSession {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    profile_dir: PathBuf,
}

impl BrowserSession {
    async fn launch(config: ChromiumConfig, profile_dir: PathBuf) -> Result<Self, ExtractionError> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractionError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Chromium handler reported error");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task: Some(handler_task),
            profile_dir,
        })
    }

    async fn render(&self, url: &str, settle: Duration) -> Result<RenderedPage, ExtractionError> {
        let page = self
            .browser
            .new_page(CreateTargetParams::new("about:blank"))
            .await
            .map_err(browser_error)?;

        let interceptor = block_heavy_resources(&page).await?;

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(ExtractionError::Browser)?;

        let navigation = async {
            page.goto(params).await.map_err(browser_error)?;

            let mut lifecycle = page
                .event_listener::<EventLifecycleEvent>()
                .await
                .map_err(browser_error)?;

            let request = page
                .wait_for_navigation_response()
                .await
                .map_err(browser_error)?;
            let status = request
                .as_ref()
                .and_then(|request| request.response.as_ref())
                .and_then(|response| u16::try_from(response.status).ok());

            // Network idle, capped by the settle window
            let idle = async {
                while let Some(event) = lifecycle.next().await {
                    if event.name == "networkIdle" {
                        break;
                    }
                }
            };
            if tokio::time::timeout(settle, idle).await.is_err() {
                debug!(url = %url, "Network still busy after settle window");
            }

            let html = page
                .evaluate("document.documentElement.outerHTML")
                .await
                .map_err(browser_error)?
                .into_value::<String>()
                .map_err(|e| ExtractionError::Browser(format!("unreadable document: {}", e)))?;

            Ok(RenderedPage::new(status, html))
        }
        .await;

        interceptor.abort();
        if let Err(err) = page.close().await {
            debug!(error = %err, "Failed to close page");
        }

        navigation
    }

    async fn shutdown(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "Failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Browser handler join error");
            }
        }
        if let Err(err) = std::fs::remove_dir_all(&self.profile_dir) {
            debug!(path = %self.profile_dir.display(), error = %err, "Profile directory not removed");
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handler_task.take() {
            warn!("Browser session dropped without shutdown");
            handle.abort();
        }
    }
}

/// Enables request interception on `page` and fails heavy resource loads
///
/// Returns the interception task; abort it once the page is done.
async fn block_heavy_resources(page: &Page) -> Result<JoinHandle<()>, ExtractionError> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(browser_error)?;

    page.execute(EnableParams {
        patterns: Some(vec![RequestPattern {
            url_pattern: Some("*".to_string()),
            resource_type: None,
            request_stage: Some(RequestStage::Request),
        }]),
        handle_auth_requests: None,
    })
    .await
    .map_err(browser_error)?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let result = if is_heavy_resource(&event.resource_type) {
                page.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                ))
                .await
                .map(|_| ())
            } else {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };

            if let Err(err) = result {
                debug!(error = %err, "Intercepted request not resolved");
            }
        }
    }))
}

fn is_heavy_resource(resource_type: &ResourceType) -> bool {
    matches!(
        resource_type,
        ResourceType::Image | ResourceType::Font | ResourceType::Stylesheet | ResourceType::Media
    )
}

fn browser_error(err: chromiumoxide::error::CdpError) -> ExtractionError {
    ExtractionError::Browser(err.to_string())
}

impl std::fmt::Debug for ChromiumRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumRenderer")
            .field("chromium_path", &self.chromium_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}
