//! OpenAI-compatible chat completions provider
//!
//! Works against any backend speaking the OpenAI chat API with JSON mode
//! (DeepSeek, Moonshot, OpenRouter, OpenAI itself).

use super::super::bridge::{parse_response, AnalysisOracle, AnalysisRequest, AnalysisResult, OracleError};
use super::super::config::OracleConfig;
use super::super::prompt::{lineage_prompt, LINEAGE_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OpenAIProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        if config.endpoint.trim().is_empty() {
            return Err(OracleError::Config("endpoint must not be empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(OracleError::Config("model must not be empty".to_string()));
        }
        if config.api_key.is_none() {
            tracing::warn!("No API key configured for {}; sending unauthenticated requests", config.endpoint);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    fn map_send_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.timeout)
        } else {
            OracleError::Request(e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[async_trait::async_trait]
impl AnalysisOracle for OpenAIProvider {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, OracleError> {
        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(LINEAGE_SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(lineage_prompt(&request.snippets)),
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut builder = self.client.post(self.completions_url()).json(&chat_request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        let chat_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| OracleError::SchemaViolation(format!("chat envelope: {}", e)))?;

        let tokens_used = chat_response.usage.map(|u| u.total_tokens).unwrap_or(0);
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(OracleError::EmptyResponse)?;

        let facts = parse_response(&content)?;
        tracing::debug!(
            "{} reported on {} of {} snippets in {} ({} tokens)",
            self.model,
            facts.len(),
            request.snippets.len(),
            request.notebook.display(),
            tokens_used
        );

        Ok(AnalysisResult { facts, tokens_used })
    }

    fn name(&self) -> &str {
        "OpenAI-compatible"
    }
}
