//! Precheck: heuristic classification of a portal page's automation
//! feasibility.
//!
//! Loads the page once, scores keyword markers in the visible text, and
//! buckets the page into `automatable` / `hybrid` / `partner_required`.
//! Scoring, bucketing, and link filtering are pure functions over the
//! extracted text and anchors, so they are testable without a browser.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::BrowserSession;
use crate::utils::{self, PRECHECK_TIMEOUT};

/// Feasibility bucket for unattended automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Automatable,
    Hybrid,
    PartnerRequired,
}

/// Classification output for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckResult {
    pub url: String,
    pub category: Category,
    pub auto_score: i32,
    pub pdf_links: Vec<String>,
    pub apply_urls: Vec<String>,
}

/// An anchor element as extracted from the page.
#[derive(Debug, Clone, Deserialize)]
pub struct Anchor {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub text: String,
}

/// Keyword markers and their score weights. Each marker contributes its
/// weight once no matter how often it occurs in the text.
const MARKERS: &[(&str, i32)] = &[
    ("apply online", 1),
    ("captcha", -1),
    ("otp", -1),
    ("upload", 1),
    ("payment", 1),
];

/// Both link lists are capped at the first matches in document order.
const LINK_CAP: usize = 10;

static APPLY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)apply|registration|login|submit|proceed|online").expect("valid apply pattern")
});

const ANCHOR_SNIPPET: &str =
    "Array.from(document.querySelectorAll('a')).map(a => ({ href: a.href, text: a.innerText || '' }))";

/// Compute the feasibility score from page text.
pub fn auto_score(text: &str) -> i32 {
    let lower = text.to_lowercase();
    MARKERS
        .iter()
        .filter(|(marker, _)| lower.contains(marker))
        .map(|(_, weight)| weight)
        .sum()
}

/// Map a score to its category.
///
/// The checks run in order and the later one wins: with the current weights
/// the thresholds cannot both hold, but if future weights ever allow it,
/// `partner_required` overrides `automatable`.
pub fn categorize(score: i32) -> Category {
    let mut category = Category::Hybrid;
    if score >= 2 {
        category = Category::Automatable;
    }
    if score <= -1 {
        category = Category::PartnerRequired;
    }
    category
}

/// Hrefs ending in ".pdf" (case-insensitive), first 10 in document order.
pub fn pdf_links(anchors: &[Anchor]) -> Vec<String> {
    anchors
        .iter()
        .filter(|a| a.href.to_lowercase().ends_with(".pdf"))
        .map(|a| a.href.clone())
        .take(LINK_CAP)
        .collect()
}

/// Hrefs whose combined link text and href look actionable, first 10 in
/// document order. Independent of the PDF list; an anchor may be in both.
pub fn apply_links(anchors: &[Anchor]) -> Vec<String> {
    anchors
        .iter()
        .filter(|a| APPLY_PATTERN.is_match(&format!("{} {}", a.text, a.href)))
        .map(|a| a.href.clone())
        .take(LINK_CAP)
        .collect()
}

/// Load `url` in the session's page and classify it.
///
/// Waits for DOM-ready only, bounded by [`PRECHECK_TIMEOUT`]; a timeout is
/// surfaced as an error, not a category.
pub async fn classify(session: &BrowserSession, url: &str) -> anyhow::Result<PrecheckResult> {
    utils::validate_http_url(url)?;

    tokio::time::timeout(PRECHECK_TIMEOUT, session.page().goto(url))
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "Navigation timeout after {}ms for URL: {url}",
                PRECHECK_TIMEOUT.as_millis()
            )
        })?
        .map_err(|e| anyhow::anyhow!("Navigation failed for URL {url}: {e}"))?;

    let text: String = session
        .page()
        .evaluate("document.body.innerText")
        .await
        .map_err(|e| anyhow::anyhow!("Failed to extract page text: {e}"))?
        .into_value()
        .unwrap_or_default();

    let anchors: Vec<Anchor> = session
        .page()
        .evaluate(ANCHOR_SNIPPET)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to extract anchors: {e}"))?
        .into_value()
        .unwrap_or_default();

    let score = auto_score(&text);
    let category = categorize(score);
    debug!(session = %session.id(), url, score, ?category, "Precheck classified page");

    Ok(PrecheckResult {
        url: url.to_string(),
        category,
        auto_score: score,
        pdf_links: pdf_links(&anchors),
        apply_urls: apply_links(&anchors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(href: &str, text: &str) -> Anchor {
        Anchor {
            href: href.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn score_counts_each_marker_once() {
        assert_eq!(auto_score("Apply online here. Upload your documents."), 2);
        // Repetition does not double-count.
        assert_eq!(auto_score("upload upload upload"), 1);
        assert_eq!(auto_score("Please solve the CAPTCHA"), -1);
        assert_eq!(auto_score("nothing relevant on this page"), 0);
    }

    #[test]
    fn score_is_case_insensitive() {
        assert_eq!(auto_score("APPLY ONLINE"), 1);
        assert_eq!(auto_score("Enter the OTP sent to your phone"), -1);
    }

    #[test]
    fn mixed_markers_sum() {
        // apply online (+1), upload (+1), payment (+1), captcha (-1)
        let text = "Apply online, upload documents, make payment, solve captcha";
        assert_eq!(auto_score(text), 2);
    }

    #[test]
    fn categories_follow_thresholds() {
        assert_eq!(categorize(3), Category::Automatable);
        assert_eq!(categorize(2), Category::Automatable);
        assert_eq!(categorize(1), Category::Hybrid);
        assert_eq!(categorize(0), Category::Hybrid);
        assert_eq!(categorize(-1), Category::PartnerRequired);
        assert_eq!(categorize(-2), Category::PartnerRequired);
    }

    #[test]
    fn spec_examples_classify_as_documented() {
        let automatable = auto_score("apply online and upload");
        assert_eq!(automatable, 2);
        assert_eq!(categorize(automatable), Category::Automatable);

        let partner = auto_score("captcha");
        assert_eq!(partner, -1);
        assert_eq!(categorize(partner), Category::PartnerRequired);

        assert_eq!(categorize(auto_score("plain text")), Category::Hybrid);
    }

    #[test]
    fn pdf_suffix_match_is_case_insensitive_and_ordered() {
        let anchors = vec![
            anchor("https://x.gov/a.PDF", "Form A"),
            anchor("https://x.gov/b.pdf", "Form B"),
            anchor("https://x.gov/c.html", "Page C"),
        ];
        assert_eq!(
            pdf_links(&anchors),
            vec!["https://x.gov/a.PDF", "https://x.gov/b.pdf"]
        );
    }

    #[test]
    fn pdf_links_cap_at_ten() {
        let anchors: Vec<Anchor> = (0..25)
            .map(|i| anchor(&format!("https://x.gov/f{i}.pdf"), "form"))
            .collect();
        let links = pdf_links(&anchors);
        assert_eq!(links.len(), 10);
        assert_eq!(links[0], "https://x.gov/f0.pdf");
        assert_eq!(links[9], "https://x.gov/f9.pdf");
    }

    #[test]
    fn apply_links_match_text_or_href() {
        let anchors = vec![
            anchor("https://x.gov/start", "Apply now"),
            anchor("https://x.gov/registration", "here"),
            anchor("https://x.gov/about", "About us"),
        ];
        assert_eq!(
            apply_links(&anchors),
            vec!["https://x.gov/start", "https://x.gov/registration"]
        );
    }

    #[test]
    fn apply_links_cap_at_ten() {
        let anchors: Vec<Anchor> = (0..30)
            .map(|i| anchor(&format!("https://x.gov/login{i}"), "sign in"))
            .collect();
        assert_eq!(apply_links(&anchors).len(), 10);
    }

    #[test]
    fn an_anchor_can_appear_in_both_lists() {
        let anchors = vec![anchor("https://x.gov/application-form.pdf", "Apply")];
        assert_eq!(pdf_links(&anchors).len(), 1);
        assert_eq!(apply_links(&anchors).len(), 1);
    }

    #[test]
    fn result_serializes_with_wire_field_names() {
        let result = PrecheckResult {
            url: "https://x.gov".into(),
            category: Category::PartnerRequired,
            auto_score: -1,
            pdf_links: vec![],
            apply_urls: vec![],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["category"], "partner_required");
        assert_eq!(value["autoScore"], -1);
        assert!(value["pdfLinks"].is_array());
        assert!(value["applyUrls"].is_array());
    }
}
