//! Element polling with exponential backoff.
//!
//! Pages rendered by JavaScript frameworks attach elements well after the
//! load event, so a single `find_element` call races the framework. Polling
//! with backoff gives those pages a bounded window to produce the element.

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::element::Element;
use chromiumoxide::Page;

/// Wait for the first element matching `selector`, polling until `timeout`.
///
/// Polling starts at 100ms, doubles per attempt, and caps at 1s.
pub async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let start = std::time::Instant::now();
    let mut poll_interval = Duration::from_millis(100);
    let max_interval = Duration::from_secs(1);

    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }

        if start.elapsed() >= timeout {
            return Err(anyhow::anyhow!(
                "Element not found (timeout after {}ms): '{}'",
                timeout.as_millis(),
                selector
            ));
        }

        tokio::time::sleep(poll_interval).await;
        poll_interval = (poll_interval * 2).min(max_interval);
    }
}
