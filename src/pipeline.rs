//! Declarative pipeline execution.
//!
//! A pipeline is an ordered list of steps executed strictly in order against
//! one session's page. The first failing step terminates the run; earlier
//! results are kept and later steps are never attempted. Errors are captured
//! into per-step results and never propagate past `run_steps`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide_cdp::cdp::browser_protocol::page::CaptureScreenshotFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::session::BrowserSession;
use crate::utils::{self, wait_for_element, INTERACTION_TIMEOUT, NAVIGATION_TIMEOUT};

/// One declarative automation step.
///
/// The wire shape is `{"action": "...", "payload": {...}}`. The enum is
/// closed: adding an action means adding a variant and a driver method, and
/// the compiler finds every dispatch site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "kebab-case")]
pub enum PipelineStep {
    OpenUrl { url: String },
    Click { selector: String },
    Fill { selector: String, value: String },
    Screenshot,
}

const KNOWN_ACTIONS: &[&str] = &["open-url", "click", "fill", "screenshot"];

/// Outcome of one attempted step, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub action: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    fn success(action: impl Into<String>, screenshot: Option<String>) -> Self {
        Self {
            action: action.into(),
            ok: true,
            screenshot,
            error: None,
        }
    }

    fn failure(action: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ok: false,
            screenshot: None,
            error: Some(error.into()),
        }
    }
}

/// A completed pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineRun {
    /// Correlation id generated once per invocation, for traceability only.
    pub run_id: Uuid,
    pub steps: Vec<StepResult>,
}

/// The browser operations a pipeline can perform.
///
/// `BrowserSession` is the production implementation; tests script a fake
/// to exercise the interpreter without a browser.
#[async_trait]
pub trait StepDriver: Send + Sync {
    /// Navigate and wait until the page settles (network idle).
    async fn open_url(&self, url: &str) -> anyhow::Result<()>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> anyhow::Result<()>;

    /// Set the value of the first element matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> anyhow::Result<()>;

    /// Capture a full-page PNG of the current render state.
    async fn screenshot(&self) -> anyhow::Result<Vec<u8>>;
}

#[async_trait]
impl StepDriver for BrowserSession {
    async fn open_url(&self, url: &str) -> anyhow::Result<()> {
        utils::validate_http_url(url)?;

        tokio::time::timeout(NAVIGATION_TIMEOUT, self.page().goto(url))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Navigation timeout after {}ms for URL: {url}",
                    NAVIGATION_TIMEOUT.as_millis()
                )
            })?
            .map_err(|e| anyhow::anyhow!("Navigation failed for URL {url}: {e}"))?;

        // Settle the page before the next step acts on it.
        self.page()
            .wait_for_navigation()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for page load completion: {e}"))?;

        Ok(())
    }

    async fn click(&self, selector: &str) -> anyhow::Result<()> {
        if selector.trim().is_empty() {
            return Err(anyhow::anyhow!("Selector cannot be empty"));
        }

        let element = wait_for_element(self.page(), selector, INTERACTION_TIMEOUT).await?;

        element
            .scroll_into_view()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to scroll '{selector}' into view: {e}"))?;

        // Click by coordinate rather than element.click(); the latter can
        // hang on elements inside IntersectionObserver-driven containers.
        let point = element.clickable_point().await.map_err(|e| {
            anyhow::anyhow!("Element '{selector}' is not clickable (may not be visible): {e}")
        })?;

        self.page()
            .click(point)
            .await
            .map_err(|e| anyhow::anyhow!("Click failed for '{selector}': {e}"))?;

        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> anyhow::Result<()> {
        if selector.trim().is_empty() {
            return Err(anyhow::anyhow!("Selector cannot be empty"));
        }

        let element = wait_for_element(self.page(), selector, INTERACTION_TIMEOUT).await?;

        element
            .scroll_into_view()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to scroll '{selector}' into view: {e}"))?;

        // Focus via click, then replace any existing value.
        let point = element.clickable_point().await.map_err(|e| {
            anyhow::anyhow!("Element '{selector}' is not focusable (may not be visible): {e}")
        })?;
        self.page()
            .click(point)
            .await
            .map_err(|e| anyhow::anyhow!("Click to focus failed for '{selector}': {e}"))?;

        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to clear field '{selector}': {e}"))?;

        element
            .type_str(value)
            .await
            .map_err(|e| anyhow::anyhow!("Fill failed for '{selector}': {e}"))?;

        Ok(())
    }

    async fn screenshot(&self) -> anyhow::Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page()
            .screenshot(params)
            .await
            .map_err(|e| anyhow::anyhow!("Screenshot failed: {e}"))
    }
}

/// Execute a raw pipeline against a driver.
///
/// Steps are parsed one at a time so an unrecognized action mid-pipeline
/// yields an explicit failing result for that step instead of rejecting the
/// whole request. Stop-on-first-failure applies to parse failures and
/// execution failures alike.
pub async fn run_steps<D: StepDriver + ?Sized>(driver: &D, pipeline: &[Value]) -> PipelineRun {
    let run_id = Uuid::new_v4();
    let mut steps = Vec::with_capacity(pipeline.len());

    for raw in pipeline {
        let action = raw
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let step: PipelineStep = match serde_json::from_value(raw.clone()) {
            Ok(step) => step,
            Err(e) => {
                let error = if KNOWN_ACTIONS.contains(&action.as_str()) {
                    format!("Invalid payload for '{action}': {e}")
                } else {
                    format!("Unsupported action '{action}'")
                };
                steps.push(StepResult::failure(action, error));
                break;
            }
        };

        debug!(run = %run_id, action = %action, "Executing pipeline step");
        match execute_step(driver, &step).await {
            Ok(screenshot) => steps.push(StepResult::success(action, screenshot)),
            Err(e) => {
                steps.push(StepResult::failure(action, e.to_string()));
                break;
            }
        }
    }

    PipelineRun { run_id, steps }
}

async fn execute_step<D: StepDriver + ?Sized>(
    driver: &D,
    step: &PipelineStep,
) -> anyhow::Result<Option<String>> {
    match step {
        PipelineStep::OpenUrl { url } => {
            driver.open_url(url).await?;
            Ok(None)
        }
        PipelineStep::Click { selector } => {
            driver.click(selector).await?;
            Ok(None)
        }
        PipelineStep::Fill { selector, value } => {
            driver.fill(selector, value).await?;
            Ok(None)
        }
        PipelineStep::Screenshot => {
            let image = driver.screenshot().await?;
            Ok(Some(BASE64.encode(image)))
        }
    }
}
