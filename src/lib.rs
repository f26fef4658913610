//! Portal automation worker
//!
//! Drives a disposable headless Chromium instance per request to discover
//! service portals, classify their automation feasibility, and execute small
//! declarative action pipelines.

pub mod browser_setup;
pub mod error;
pub mod expand;
pub mod pipeline;
pub mod precheck;
pub mod search;
pub mod server;
pub mod session;
mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Worker name reported by the health endpoint.
pub const WORKER_NAME: &str = "ApnaCyber Portal Worker v7.0";

/// Immutable process-wide configuration, built once at startup.
///
/// Secrets and API keys come from the environment; browser launch settings
/// come from an optional `config.yaml` next to the manifest. No component
/// reads the environment after construction.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Shared secret expected in the `x-worker-key` header. `None` disables
    /// auth entirely (dev mode).
    pub secret: Option<String>,

    /// Google Custom Search credentials. Either one missing -> search
    /// degrades to empty results.
    pub google_api_key: Option<String>,
    pub google_cx: Option<String>,

    /// OpenAI key for LGD expansion. Missing -> pass-through expansion.
    pub openai_api_key: Option<String>,

    /// Port the HTTP server binds on.
    pub port: u16,

    pub browser: BrowserConfig,
}

impl WorkerConfig {
    /// Build configuration from the process environment.
    ///
    /// Empty-string variables are treated as unset so that `FOO=` in a unit
    /// file behaves the same as an absent variable.
    pub fn from_env() -> Self {
        let browser = load_yaml_config().unwrap_or_default().browser;

        Self {
            secret: env_opt("WORKER_SECRET"),
            google_api_key: env_opt("GOOGLE_API_KEY"),
            google_cx: env_opt("GOOGLE_CX"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
            browser,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default)]
    pub disable_security: bool,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: false,
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct YamlConfig {
    #[serde(default)]
    browser: BrowserConfig,
}

/// Load browser settings from config.yaml in the package root, if present.
fn load_yaml_config() -> anyhow::Result<YamlConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml");

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(YamlConfig::default())
    }
}

pub use error::WorkerError;
pub use expand::{Expansion, ExpansionClient, Expansions};
pub use pipeline::{PipelineRun, PipelineStep, StepDriver, StepResult};
pub use precheck::{Category, PrecheckResult};
pub use search::{PortalCandidate, SearchClient};
pub use session::BrowserSession;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_config_defaults() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(!config.disable_security);
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
    }

    #[test]
    fn yaml_config_parses_partial_document() {
        let config: YamlConfig = serde_yaml::from_str("browser:\n  headless: false\n").unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.window.width, 1280);
    }
}
