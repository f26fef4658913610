//! Shared helpers for browser-driving code.

mod wait_for_element;

pub use wait_for_element::wait_for_element;

use std::time::Duration;

/// Navigation bound for pipeline `open-url` steps.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Navigation bound for precheck page loads. Slightly more generous than
/// the pipeline bound because precheck targets are often slow portals.
pub const PRECHECK_TIMEOUT: Duration = Duration::from_secs(35);

/// Implicit wait for `click`/`fill` element matching.
pub const INTERACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Reject anything that is not plain http(s) before handing it to the
/// browser (file://, chrome://, javascript: and friends).
pub fn validate_http_url(url: &str) -> anyhow::Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!("URL must start with http:// or https://"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_http_url("http://example.gov").is_ok());
        assert!(validate_http_url("https://example.gov/apply").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(validate_http_url("file:///etc/passwd").is_err());
        assert!(validate_http_url("javascript:alert(1)").is_err());
        assert!(validate_http_url("example.gov").is_err());
    }
}
