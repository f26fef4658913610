//! Portal discovery via the Google Custom Search API.
//!
//! Best-effort adapter: when the API key or engine id is not configured the
//! client degrades to an empty result list without touching the network.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// One ranked search hit, projected to the fields callers care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalCandidate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub display_link: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<PortalCandidate>,
}

#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    api_key: Option<String>,
    cx: Option<String>,
}

impl SearchClient {
    pub fn new(api_key: Option<String>, cx: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            cx,
        }
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.api_key.as_deref()?, self.cx.as_deref()?))
    }

    /// Search for candidate portal URLs.
    ///
    /// Returns an empty list when credentials are missing; network and
    /// decoding errors are real errors.
    pub async fn search_portals(&self, query: &str, limit: u32) -> Result<Vec<PortalCandidate>> {
        let Some((key, cx)) = self.credentials() else {
            debug!("Search API not configured, returning empty results");
            return Ok(Vec::new());
        };

        let url = format!(
            "{SEARCH_ENDPOINT}?key={key}&cx={cx}&q={}&num={limit}",
            urlencoding::encode(query)
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Search API request failed")?;

        let data: SearchResponse = response
            .json()
            .await
            .context("Failed to decode search API response")?;

        info!(query, results = data.items.len(), "Portal search completed");
        Ok(data.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_returns_empty_without_network() {
        let client = SearchClient::new(None, None);
        let results = client.search_portals("passport seva portal", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn partially_configured_client_also_degrades() {
        let client = SearchClient::new(Some("key".into()), None);
        let results = client.search_portals("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn candidate_parses_google_item_shape() {
        let json = r#"{
            "title": "Passport Seva",
            "link": "https://portal.example.gov/",
            "snippet": "Apply online for passports",
            "displayLink": "portal.example.gov",
            "kind": "customsearch#result"
        }"#;
        let candidate: PortalCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.display_link, "portal.example.gov");
        assert_eq!(candidate.title, "Passport Seva");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let candidate: PortalCandidate = serde_json::from_str("{}").unwrap();
        assert!(candidate.title.is_empty());
        assert!(candidate.link.is_empty());
    }
}
