use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use mentor_core::config::{AppConfig, LoadOptions, LogFormat};
use mentor_core::{ConversationState, LearnerId, LearnerProfile, TeachingStyle};
use mentor_db::{
    connect_with_settings, migrations, NoopWorkflowPersistence, SqlWorkflowPersistence,
    WorkflowPersistence,
};
use mentor_gateway::{CompletionGateway, HttpCompletionClient};
use mentor_orchestrator::{OrchestrateRequest, Orchestrator, OrchestratorConfig};
use mentor_tools::HttpToolClient;

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(long, help = "The learner message to orchestrate")]
    pub message: String,
    #[arg(long, help = "Conversation id; a fresh one is generated when omitted")]
    pub conversation_id: Option<String>,
    #[arg(long, default_value = "Student", help = "Learner display name")]
    pub learner_name: String,
    #[arg(long, default_value = "8", help = "Learner grade level")]
    pub grade_level: String,
    #[arg(long, default_value = "", help = "Free-text emotional state summary")]
    pub emotional_state: String,
    #[arg(long, default_value = "", help = "Free-text mastery level summary")]
    pub mastery_level: String,
    #[arg(long, help = "Run without writing audit records to the database")]
    pub no_persist: bool,
}

pub fn run(args: ChatArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(run_chat(config, args)) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("chat", "chat_runtime", format!("{error:#}"), 1),
    }
}

async fn run_chat(config: AppConfig, args: ChatArgs) -> anyhow::Result<String> {
    let persistence: Arc<dyn WorkflowPersistence> = if args.no_persist {
        Arc::new(NoopWorkflowPersistence)
    } else {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .context("connecting to the database")?;
        migrations::run_pending(&pool).await.context("applying migrations")?;
        Arc::new(SqlWorkflowPersistence::new(pool))
    };

    let client =
        HttpCompletionClient::new(&config.gateway).context("building the completion client")?;
    let gateway = CompletionGateway::new(client, config.orchestrator.default_tool);
    let tools = HttpToolClient::new(&config.tools).context("building the tool client")?;

    let orchestrator = Orchestrator::new(
        Arc::new(gateway),
        Arc::new(tools),
        persistence,
        OrchestratorConfig {
            default_tool: config.orchestrator.default_tool,
            history_window: config.orchestrator.history_window,
        },
    );

    let conversation_id =
        args.conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let profile = LearnerProfile {
        learner_id: LearnerId(Uuid::new_v4().to_string()),
        name: args.learner_name,
        grade_level: args.grade_level,
        learning_style_summary: String::new(),
        emotional_state_summary: args.emotional_state,
        mastery_level_summary: args.mastery_level,
        teaching_style: TeachingStyle::Direct,
    };

    let state = orchestrator
        .orchestrate(OrchestrateRequest {
            conversation_id,
            message: args.message,
            profile,
            history: Vec::new(),
        })
        .await;

    Ok(render_summary(&state))
}

fn render_summary(state: &ConversationState) -> String {
    let payload = json!({
        "conversation_id": state.conversation_id,
        "outcome": state.outcome(),
        "intent": state.intent.map(|tool| tool.as_str()),
        "validation_passed": state.validation_passed,
        "confidence": state.bundle.as_ref().map(|bundle| bundle.confidence),
        "missing": state.bundle.as_ref().map(|bundle| bundle.missing_required.clone()),
        "clarification_question": state.clarification_question,
        "tool_success": state.tool_response.as_ref().map(|response| response.success),
        "latency_ms": state.tool_response.as_ref().and_then(|response| response.latency_ms),
        "final_message": state.final_message,
        "processing_steps": state.processing_steps,
        "errors": state.errors,
    });

    serde_json::to_string_pretty(&payload)
        .unwrap_or_else(|error| format!("{{\"error\": \"{error}\"}}"))
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let result = match config.logging.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().try_init()
        }
    };
    // A second init in the same process is fine; keep the first one.
    let _ = result;
}

#[cfg(test)]
mod tests {
    use mentor_core::{ConversationState, LearnerId, LearnerProfile, TeachingStyle, ToolKind};

    use super::render_summary;

    #[test]
    fn summary_reports_clarification_runs() {
        let profile = LearnerProfile {
            learner_id: LearnerId("learner-1".to_string()),
            name: "Ada".to_string(),
            grade_level: "9".to_string(),
            learning_style_summary: String::new(),
            emotional_state_summary: String::new(),
            mastery_level_summary: String::new(),
            teaching_style: TeachingStyle::Direct,
        };
        let mut state = ConversationState::new("conv-1", "help", profile, Vec::new());
        state.intent = Some(ToolKind::ConceptExplainer);
        state.needs_clarification = true;
        state.clarification_question = Some("Which concept should I explain?".to_string());
        state.final_message = state.clarification_question.clone();

        let summary = render_summary(&state);

        assert!(summary.contains("\"outcome\": \"clarification_requested\""));
        assert!(summary.contains("Which concept should I explain?"));
        assert!(summary.contains("\"intent\": \"concept_explainer\""));
    }
}
