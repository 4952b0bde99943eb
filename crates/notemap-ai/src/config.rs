//! Oracle backend configuration

use super::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to construct an oracle. Passed in explicitly; nothing here
/// is read from the environment.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Provider name: "openai" or "fixture".
    pub provider: String,
    /// Base URL of an OpenAI-compatible API.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Canned responses for the fixture provider.
    pub fixture: Option<PathBuf>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: None,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            fixture: None,
        }
    }
}
