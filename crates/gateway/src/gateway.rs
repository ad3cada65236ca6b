use async_trait::async_trait;

use mentor_core::{ChatMessage, LearnerProfile, ParameterBundle, ToolKind};

use crate::client::CompletionClient;
use crate::parse::{keyword_tool_hint, parse_extraction_reply, parse_tool_reply};
use crate::prompt::{classification_prompt, clarification_prompt, extraction_prompt};
use crate::GatewayError;

/// The classify/extract/clarify contract the workflow engine consumes.
/// Injected at engine construction so tests can supply doubles.
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    async fn classify_intent(
        &self,
        message: &str,
        history: &[ChatMessage],
        profile: &LearnerProfile,
    ) -> Result<ToolKind, GatewayError>;

    async fn extract_parameters(
        &self,
        message: &str,
        history: &[ChatMessage],
        profile: &LearnerProfile,
        tool: ToolKind,
    ) -> Result<ParameterBundle, GatewayError>;

    async fn generate_clarification(
        &self,
        missing: &[String],
        tool: ToolKind,
        message: &str,
    ) -> Result<String, GatewayError>;
}

/// Gateway implementation over a completion client: builds the stage
/// prompts, issues one call per operation, and parses the reply.
pub struct CompletionGateway<C> {
    client: C,
    default_tool: ToolKind,
}

impl<C> CompletionGateway<C> {
    pub fn new(client: C, default_tool: ToolKind) -> Self {
        Self { client, default_tool }
    }
}

#[async_trait]
impl<C> LanguageModelGateway for CompletionGateway<C>
where
    C: CompletionClient,
{
    async fn classify_intent(
        &self,
        message: &str,
        history: &[ChatMessage],
        profile: &LearnerProfile,
    ) -> Result<ToolKind, GatewayError> {
        let prompt = classification_prompt(message, history, profile);
        let reply = self.client.complete(&prompt).await?;

        // Unrecognized replies are not faults: fall back to keyword
        // matching on the raw message, then to the configured default.
        let tool = parse_tool_reply(&reply)
            .or_else(|| keyword_tool_hint(message))
            .unwrap_or(self.default_tool);

        tracing::debug!(tool = tool.as_str(), "intent classified");
        Ok(tool)
    }

    async fn extract_parameters(
        &self,
        message: &str,
        history: &[ChatMessage],
        profile: &LearnerProfile,
        tool: ToolKind,
    ) -> Result<ParameterBundle, GatewayError> {
        let prompt = extraction_prompt(tool, message, history, profile);
        let reply = self.client.complete(&prompt).await?;
        let bundle = parse_extraction_reply(tool, &reply)?;

        tracing::debug!(
            tool = tool.as_str(),
            confidence = bundle.confidence,
            field_count = bundle.fields.len(),
            "parameters extracted"
        );
        Ok(bundle)
    }

    async fn generate_clarification(
        &self,
        missing: &[String],
        tool: ToolKind,
        message: &str,
    ) -> Result<String, GatewayError> {
        let prompt = clarification_prompt(missing, tool, message);
        let reply = self.client.complete(&prompt).await?;

        let question = reply.trim();
        if question.is_empty() {
            return Err(GatewayError::UnusableReply("empty clarification reply".to_string()));
        }
        Ok(question.to_string())
    }
}
