use serde_json::json;

use mentor_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let payload = json!({
        "database": {
            "url": config.database.url,
            "max_connections": config.database.max_connections,
            "timeout_secs": config.database.timeout_secs,
        },
        "gateway": {
            "base_url": config.gateway.base_url,
            "model": config.gateway.model,
            "api_key": config.gateway.api_key.as_ref().map(|_| "<redacted>"),
            "temperature": config.gateway.temperature,
            "timeout_secs": config.gateway.timeout_secs,
        },
        "tools": {
            "base_url": config.tools.base_url,
            "timeout_secs": config.tools.timeout_secs,
        },
        "orchestrator": {
            "default_tool": config.orchestrator.default_tool.as_str(),
            "history_window": config.orchestrator.history_window,
        },
        "logging": {
            "level": config.logging.level,
            "format": match config.logging.format {
                LogFormat::Compact => "compact",
                LogFormat::Pretty => "pretty",
                LogFormat::Json => "json",
            },
        },
    });

    let output = serde_json::to_string_pretty(&payload)
        .unwrap_or_else(|error| format!("{{\"error\": \"{error}\"}}"));
    CommandResult { exit_code: 0, output }
}
