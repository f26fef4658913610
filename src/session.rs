//! Disposable browsing sessions.
//!
//! One session = one Chromium process + one page, owned by exactly one
//! request. Sessions are never pooled or reused; `close()` tears the whole
//! process down and removes the profile directory. Callers follow the
//! acquire-then-guaranteed-release discipline: launch, capture the work's
//! result without propagating, close, then surface the result.

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::browser_setup;
use crate::BrowserConfig;

/// An isolated browsing context with a single active page.
pub struct BrowserSession {
    id: Uuid,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserSession {
    /// Launch a fresh browser with its own profile directory and open a
    /// blank page. Nothing is shared with any other session.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let id = Uuid::new_v4();
        let user_data_dir = std::env::temp_dir().join(format!("portal_worker_{id}"));

        debug!(session = %id, "Launching browser session");
        let (browser, handler) = browser_setup::launch_browser(config, user_data_dir.clone()).await?;

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to create blank page")?;

        Ok(Self {
            id,
            browser,
            page,
            handler,
            user_data_dir: Some(user_data_dir),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The session's single active page.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Tear down the browser process and remove the profile directory.
    ///
    /// Both close and wait must run: close sends the shutdown command,
    /// wait reaps the process. Skipping wait leaves a zombie Chrome holding
    /// file handles in the profile dir.
    pub async fn close(mut self) {
        debug!(session = %self.id, "Closing browser session");

        if let Err(e) = self.browser.close().await {
            warn!(session = %self.id, "Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!(session = %self.id, "Failed to wait for browser exit: {}", e);
        }

        if let Some(path) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to remove profile dir {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
        debug!(session = %self.id, "Browser session closed");
        // Drop aborts the handler task.
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
        if self.user_data_dir.is_some() {
            warn!(
                session = %self.id,
                "Session dropped without close(); profile dir will be orphaned"
            );
        }
    }
}

