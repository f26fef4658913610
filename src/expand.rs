//! LGD service-variant expansion via a text-generation API.
//!
//! The model is asked for a JSON array of expansion objects. Model output is
//! untrusted text, so the parse outcome is typed: `Parsed` when it decodes
//! as an array, `Fallback` wrapping the raw text when it does not. With no
//! API key configured the adapter degrades to a single pass-through
//! expansion.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

const CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";

/// One expansion of a service/variant pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

/// Outcome of an expansion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansions {
    /// The model returned a well-formed JSON array.
    Parsed(Vec<Expansion>),
    /// Degraded output: either the API is unconfigured (pass-through
    /// expansion) or the model text failed to parse (raw text wrapped in a
    /// single expansion).
    Fallback(Expansion),
}

impl Expansions {
    /// Flatten to the wire-level list shape.
    pub fn into_list(self) -> Vec<Expansion> {
        match self {
            Expansions::Parsed(list) => list,
            Expansions::Fallback(one) => vec![one],
        }
    }
}

/// Parse model output into a typed outcome. Pure, so the fallback path is
/// testable without an API call.
pub fn parse_expansions(text: &str, service_name: &str) -> Expansions {
    match serde_json::from_str::<Vec<Expansion>>(text) {
        Ok(list) => Expansions::Parsed(list),
        Err(_) => Expansions::Fallback(Expansion {
            name: service_name.to_string(),
            variant: None,
            desc: text.to_string(),
            keywords: None,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct ExpansionClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl ExpansionClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Expand a service/variant pair into concrete flow variants.
    pub async fn expand(&self, service_name: &str, variant_type: &str) -> Result<Expansions> {
        let Some(key) = self.api_key.as_deref() else {
            debug!("Expansion API not configured, returning base flow");
            return Ok(Expansions::Fallback(Expansion {
                name: service_name.to_string(),
                variant: Some(variant_type.to_string()),
                desc: "Base flow".to_string(),
                keywords: None,
            }));
        };

        let prompt = format!(
            "You are the LGD Expansion Engine.\n\
             Service: {service_name}\n\
             Variant: {variant_type}\n\n\
             Return JSON array of:\n\
             [\n {{ \"name\": \"\", \"desc\": \"\", \"keywords\": [] }}\n]\n\
             Only JSON. No explanation."
        );

        let response = self
            .http
            .post(CHAT_ENDPOINT)
            .bearer_auth(key)
            .json(&json!({
                "model": MODEL,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await
            .context("Expansion API request failed")?;

        let data: ChatResponse = response
            .json()
            .await
            .context("Failed to decode expansion API response")?;

        let text = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "[]".to_string());

        let outcome = parse_expansions(&text, service_name);
        info!(
            service = service_name,
            parsed = matches!(outcome, Expansions::Parsed(_)),
            "Expansion completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_array_parses() {
        let text = r#"[{"name":"New application","desc":"First-time issue","keywords":["new","fresh"]}]"#;
        match parse_expansions(text, "Birth Certificate") {
            Expansions::Parsed(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].name, "New application");
                assert_eq!(list[0].keywords.as_ref().unwrap().len(), 2);
            }
            Expansions::Fallback(_) => panic!("expected parsed outcome"),
        }
    }

    #[test]
    fn non_json_text_wraps_as_fallback() {
        let outcome = parse_expansions("Sure! Here are some ideas...", "Birth Certificate");
        match outcome {
            Expansions::Fallback(one) => {
                assert_eq!(one.name, "Birth Certificate");
                assert_eq!(one.desc, "Sure! Here are some ideas...");
            }
            Expansions::Parsed(_) => panic!("expected fallback outcome"),
        }
    }

    #[tokio::test]
    async fn unconfigured_client_returns_base_flow() {
        let client = ExpansionClient::new(None);
        let outcome = client.expand("Trade License", "renewal").await.unwrap();
        let list = outcome.into_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Trade License");
        assert_eq!(list[0].variant.as_deref(), Some("renewal"));
        assert_eq!(list[0].desc, "Base flow");
    }

    #[test]
    fn fallback_serializes_without_null_fields() {
        let one = Expansion {
            name: "x".into(),
            variant: None,
            desc: "raw".into(),
            keywords: None,
        };
        let value = serde_json::to_value(&one).unwrap();
        assert_eq!(value, serde_json::json!({ "name": "x", "desc": "raw" }));
    }
}
