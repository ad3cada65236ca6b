//! Uniform remote-call client for the content-generation tools: one
//! HTTP POST per call to a fixed per-tool path, bounded timeout,
//! measured latency, and typed failure classification.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use mentor_core::config::ToolsConfig;
use mentor_core::{ToolInput, ToolKind, ToolResponse};

/// Upper bound for one tool call; a timeout is terminal for the stage.
pub const TOOL_CALL_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolCallError {
    #[error("tool call timed out after {0}s")]
    Timeout(u64),
    #[error("tool endpoint returned status {0}")]
    Status(u16),
    #[error("tool transport error: {0}")]
    Transport(String),
}

/// The remote-call seam the workflow engine depends on.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn call(&self, tool: ToolKind, input: &ToolInput)
        -> Result<ToolResponse, ToolCallError>;
}

/// Fixed path each tool is served under.
pub fn endpoint_path(tool: ToolKind) -> &'static str {
    match tool {
        ToolKind::NoteMaker => "/api/note-maker",
        ToolKind::FlashcardGenerator => "/api/flashcard-generator",
        ToolKind::ConceptExplainer => "/api/concept-explainer",
    }
}

pub struct HttpToolClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpToolClient {
    pub fn new(config: &ToolsConfig) -> Result<Self, ToolCallError> {
        let timeout_secs = config.timeout_secs.min(TOOL_CALL_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| ToolCallError::Transport(error.to_string()))?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string(), timeout_secs })
    }

    fn endpoint(&self, tool: ToolKind) -> String {
        format!("{}{}", self.base_url, endpoint_path(tool))
    }
}

#[async_trait]
impl ToolInvoker for HttpToolClient {
    async fn call(
        &self,
        tool: ToolKind,
        input: &ToolInput,
    ) -> Result<ToolResponse, ToolCallError> {
        let endpoint = self.endpoint(tool);
        let started = Instant::now();

        let result = self.http.post(&endpoint).json(&input.to_value()).send().await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let response = result.map_err(|error| {
            if error.is_timeout() {
                ToolCallError::Timeout(self.timeout_secs)
            } else {
                ToolCallError::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                tool = tool.as_str(),
                status = status.as_u16(),
                latency_ms,
                "tool endpoint rejected call"
            );
            return Ok(ToolResponse::failed(
                tool,
                ToolCallError::Status(status.as_u16()).to_string(),
                Some(latency_ms),
            ));
        }

        // The payload is carried unparsed; its shape belongs to the tool.
        let data: Value = response
            .json()
            .await
            .map_err(|error| ToolCallError::Transport(format!("invalid tool payload: {error}")))?;

        tracing::info!(tool = tool.as_str(), latency_ms, "tool call succeeded");
        Ok(ToolResponse::succeeded(tool, data, latency_ms))
    }
}

#[cfg(test)]
mod tests {
    use mentor_core::config::ToolsConfig;
    use mentor_core::ToolKind;

    use super::{endpoint_path, HttpToolClient, ToolCallError, TOOL_CALL_TIMEOUT_SECS};

    #[test]
    fn each_tool_maps_to_a_distinct_path() {
        let paths: Vec<_> = ToolKind::ALL.iter().map(|tool| endpoint_path(*tool)).collect();
        assert_eq!(paths, vec!["/api/note-maker", "/api/flashcard-generator", "/api/concept-explainer"]);
    }

    #[test]
    fn endpoint_joins_base_url_and_path() {
        let client = HttpToolClient::new(&ToolsConfig {
            base_url: "http://localhost:8001/".to_string(),
            timeout_secs: 30,
        })
        .expect("client");

        assert_eq!(
            client.endpoint(ToolKind::FlashcardGenerator),
            "http://localhost:8001/api/flashcard-generator"
        );
    }

    #[test]
    fn configured_timeout_is_capped_at_the_contract_bound() {
        let client = HttpToolClient::new(&ToolsConfig {
            base_url: "http://localhost:8001".to_string(),
            timeout_secs: 600,
        })
        .expect("client");

        assert_eq!(client.timeout_secs, TOOL_CALL_TIMEOUT_SECS);
    }

    #[test]
    fn error_strings_distinguish_failure_classes() {
        assert_eq!(ToolCallError::Timeout(30).to_string(), "tool call timed out after 30s");
        assert_eq!(ToolCallError::Status(502).to_string(), "tool endpoint returned status 502");
        assert!(ToolCallError::Transport("connection refused".to_string())
            .to_string()
            .contains("connection refused"));
    }
}
