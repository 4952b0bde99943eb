//! Oracle provider implementations

pub mod fixture;
pub mod openai;

use super::bridge::AnalysisOracle;
use super::config::OracleConfig;
use anyhow::{Context, Result};

/// Factory function to create the configured oracle
pub fn create_provider(config: &OracleConfig) -> Result<Box<dyn AnalysisOracle>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(openai::OpenAIProvider::new(config)?)),
        "fixture" => {
            let path = config
                .fixture
                .as_deref()
                .context("fixture provider requires a fixture file")?;
            Ok(Box::new(fixture::FixtureProvider::from_path(path)?))
        }
        _ => anyhow::bail!("Unknown oracle provider: {}", config.provider),
    }
}
