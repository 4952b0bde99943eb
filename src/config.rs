//! CLI configuration: defaults, then an optional TOML file, then flags

use anyhow::{Context, Result};
use notemap_ai::{OracleConfig, RetryPolicy};
use notemap_indexer::ScanConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub oracle: OracleSection,

    #[serde(default)]
    pub scan: ScanSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleSection {
    /// "openai" or "fixture"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: f32,

    /// Canned responses for the fixture provider
    pub fixture: Option<PathBuf>,

    #[serde(default)]
    pub retry: RetrySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_endpoint() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_key_env() -> String {
    "NOTEMAP_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_workers() -> usize {
    4
}

fn default_exclude() -> Vec<String> {
    vec![notemap_indexer::discovery::DEFAULT_EXCLUDE.to_string()]
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
            fixture: None,
            retry: RetrySection::default(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            exclude: default_exclude(),
        }
    }
}

/// Flag values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub fixture: Option<PathBuf>,
    pub workers: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Defaults when no path is given; a given path must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject values that would make the scan fail at run time.
    pub fn validate(&self) -> Result<()> {
        let retry = &self.oracle.retry;
        if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
            anyhow::bail!("oracle.retry.multiplier must be a finite number >= 1.0, got {}", retry.multiplier);
        }
        if retry.max_attempts < 1 {
            anyhow::bail!("oracle.retry.max_attempts must be at least 1");
        }
        if self.oracle.timeout_secs < 1 {
            anyhow::bail!("oracle.timeout_secs must be at least 1");
        }
        if !self.oracle.temperature.is_finite() {
            anyhow::bail!("oracle.temperature must be a finite number");
        }
        let max_workers = tokio::sync::Semaphore::MAX_PERMITS;
        if self.scan.workers < 1 || self.scan.workers > max_workers {
            anyhow::bail!("scan.workers must be between 1 and {}, got {}", max_workers, self.scan.workers);
        }
        Ok(())
    }

    /// Apply flag values, then validate the result.
    pub fn apply(&mut self, overrides: Overrides) -> Result<()> {
        let oracle = &mut self.oracle;
        if let Some(provider) = overrides.provider {
            oracle.provider = provider;
        }
        if let Some(endpoint) = overrides.endpoint {
            oracle.endpoint = endpoint;
        }
        if let Some(model) = overrides.model {
            oracle.model = model;
        }
        if let Some(api_key_env) = overrides.api_key_env {
            oracle.api_key_env = api_key_env;
        }
        if let Some(fixture) = overrides.fixture {
            oracle.fixture = Some(fixture);
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            oracle.timeout_secs = timeout_secs;
        }
        if let Some(workers) = overrides.workers {
            self.scan.workers = workers;
        }
        self.validate()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = &self.oracle.retry;
        RetryPolicy {
            max_attempts: retry.max_attempts,
            initial_delay: Duration::from_millis(retry.initial_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            multiplier: retry.multiplier,
        }
    }

    /// `api_key` is looked up by the caller from the variable named in `api_key_env`.
    pub fn oracle_config(&self, api_key: Option<String>) -> OracleConfig {
        OracleConfig {
            provider: self.oracle.provider.clone(),
            endpoint: self.oracle.endpoint.clone(),
            model: self.oracle.model.clone(),
            api_key,
            temperature: self.oracle.temperature,
            timeout: Duration::from_secs(self.oracle.timeout_secs),
            retry: self.retry_policy(),
            fixture: self.oracle.fixture.clone(),
        }
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            workers: self.scan.workers,
            oracle_timeout: Duration::from_secs(self.oracle.timeout_secs),
            retry: self.retry_policy(),
            exclude: self.scan.exclude.clone(),
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key_from_env(&self) -> Option<String> {
        std::env::var(&self.oracle.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
