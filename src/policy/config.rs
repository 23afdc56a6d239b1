//! TOML configuration types for dlpgate.
//!
//! The top-level [`AppConfig`] is deserialized from `dlpgate.toml` and contains
//! the proxy settings, the URL deny list and the ordered DLP rules.
//!
//! # Example `dlpgate.toml`
//!
//! ```toml
//! [proxy]
//! listen = "127.0.0.1:8000"
//!
//! [policy]
//! deny_list = ["reddit.com"]
//! undecodable_post = "deny"
//!
//! [[rules]]
//! id = "Sensitivity Marker (Confidential)"
//! pattern = "confidential"
//! ```

use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dlp::patterns::PatternSet;
use crate::error::{DlpGateError, Result};

/// Configuration shipped with the binary; used by `init` and as a fallback.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/default.toml");

/// The action to take for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Forward the request and relay the response.
    Allow,
    /// Block the request and return 403 Forbidden.
    Deny,
}

/// Proxy server configuration (`[proxy]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Address to listen on (e.g., `"127.0.0.1:8000"`).
    pub listen: String,
    /// Largest POST body accepted for inspection.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Largest request head (request line plus headers).
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
    /// Time allowed for the client to send its request.
    #[serde(default = "default_timeout_secs")]
    pub client_timeout_secs: u64,
    /// Time allowed for the upstream fetch, headers and body included.
    #[serde(default = "default_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_max_header_bytes() -> usize {
    16 * 1024
}

fn default_timeout_secs() -> u64 {
    30
}

impl ProxyConfig {
    /// Defaults for everything except the listen address.
    pub fn new(listen: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            max_body_bytes: default_max_body_bytes(),
            max_header_bytes: default_max_header_bytes(),
            client_timeout_secs: default_timeout_secs(),
            upstream_timeout_secs: default_timeout_secs(),
        }
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Request policy (`[policy]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Substrings that block a GET when found anywhere in the target URL.
    #[serde(default)]
    pub deny_list: Vec<String>,
    /// What to do with a POST body that is not `multipart/form-data`.
    #[serde(default = "default_undecodable_post")]
    pub undecodable_post: Action,
}

fn default_undecodable_post() -> Action {
    Action::Deny
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            deny_list: Vec::new(),
            undecodable_post: default_undecodable_post(),
        }
    }
}

/// A single DLP rule as written in `[[rules]]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Unique, human-readable rule id shown in violation reports.
    pub id: String,
    /// Regular expression (Rust `regex` syntax).
    pub pattern: String,
    /// Match case exactly. Defaults to case-insensitive matching.
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Top-level application configuration deserialized from `dlpgate.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Proxy server settings.
    pub proxy: ProxyConfig,
    /// Deny list and body policy.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// DLP rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl AppConfig {
    /// Load and parse the configuration from a TOML file at the given path.
    ///
    /// Before parsing, `${VAR}` placeholders in the TOML text are replaced
    /// with the corresponding environment variable values. An error is
    /// returned if a referenced variable is not set.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration text, with `${VAR}` substitution.
    pub fn from_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The bundled default configuration.
    pub fn bundled() -> Result<Self> {
        Self::from_toml(DEFAULT_TEMPLATE)
    }

    /// Compile `rules` into a [`PatternSet`], failing on the first bad rule.
    pub fn compile_rules(&self) -> Result<PatternSet> {
        PatternSet::compile(&self.rules)
    }
}

/// Replace `${VAR_NAME}` placeholders with environment variable values.
///
/// The bare `$VAR` form is left alone: rule patterns use `$` as an anchor.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| DlpGateError::Proxy(e.to_string()))?;

    let mut result = input.to_string();
    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let value = std::env::var(var_name)
            .map_err(|_| DlpGateError::ConfigEnvVar(var_name.to_string()))?;
        result = result.replace(&cap[0], &value);
    }
    Ok(result)
}
