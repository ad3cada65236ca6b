use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::tool::ToolKind;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub tools: ToolsConfig,
    pub orchestrator: OrchestratorSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Connection settings for the language-model completion endpoint
/// (OpenAI-compatible chat completions).
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Base URL of the content-generation tool service.
#[derive(Clone, Debug)]
pub struct ToolsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    /// Tool used when classification cannot produce an answer.
    pub default_tool: ToolKind,
    /// Number of prior turns forwarded to the gateway.
    pub history_window: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub gateway_base_url: Option<String>,
    pub gateway_model: Option<String>,
    pub gateway_api_key: Option<String>,
    pub tools_base_url: Option<String>,
    pub default_tool: Option<ToolKind>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://mentor.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            gateway: GatewayConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3.1".to_string(),
                api_key: None,
                temperature: 0.7,
                timeout_secs: 30,
            },
            tools: ToolsConfig { base_url: "http://localhost:8001".to_string(), timeout_secs: 30 },
            orchestrator: OrchestratorSettings {
                default_tool: ToolKind::ConceptExplainer,
                history_window: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    gateway: Option<GatewayPatch>,
    tools: Option<ToolsPatch>,
    orchestrator: Option<OrchestratorPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolsPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OrchestratorPatch {
    default_tool: Option<ToolKind>,
    history_window: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("mentor.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(gateway) = patch.gateway {
            if let Some(base_url) = gateway.base_url {
                self.gateway.base_url = base_url;
            }
            if let Some(model) = gateway.model {
                self.gateway.model = model;
            }
            if let Some(api_key) = gateway.api_key {
                self.gateway.api_key = Some(api_key.into());
            }
            if let Some(temperature) = gateway.temperature {
                self.gateway.temperature = temperature;
            }
            if let Some(timeout_secs) = gateway.timeout_secs {
                self.gateway.timeout_secs = timeout_secs;
            }
        }

        if let Some(tools) = patch.tools {
            if let Some(base_url) = tools.base_url {
                self.tools.base_url = base_url;
            }
            if let Some(timeout_secs) = tools.timeout_secs {
                self.tools.timeout_secs = timeout_secs;
            }
        }

        if let Some(orchestrator) = patch.orchestrator {
            if let Some(default_tool) = orchestrator.default_tool {
                self.orchestrator.default_tool = default_tool;
            }
            if let Some(history_window) = orchestrator.history_window {
                self.orchestrator.history_window = history_window;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MENTOR_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MENTOR_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("MENTOR_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MENTOR_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("MENTOR_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MENTOR_GATEWAY_BASE_URL") {
            self.gateway.base_url = value;
        }
        if let Some(value) = read_env("MENTOR_GATEWAY_MODEL") {
            self.gateway.model = value;
        }
        if let Some(value) = read_env("MENTOR_GATEWAY_API_KEY") {
            self.gateway.api_key = Some(value.into());
        }
        if let Some(value) = read_env("MENTOR_GATEWAY_TEMPERATURE") {
            self.gateway.temperature = parse_f32("MENTOR_GATEWAY_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("MENTOR_GATEWAY_TIMEOUT_SECS") {
            self.gateway.timeout_secs = parse_u64("MENTOR_GATEWAY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MENTOR_TOOLS_BASE_URL") {
            self.tools.base_url = value;
        }
        if let Some(value) = read_env("MENTOR_TOOLS_TIMEOUT_SECS") {
            self.tools.timeout_secs = parse_u64("MENTOR_TOOLS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MENTOR_ORCHESTRATOR_DEFAULT_TOOL") {
            self.orchestrator.default_tool = ToolKind::parse(&value).ok_or_else(|| {
                ConfigError::InvalidEnvOverride {
                    key: "MENTOR_ORCHESTRATOR_DEFAULT_TOOL".to_string(),
                    value,
                }
            })?;
        }
        if let Some(value) = read_env("MENTOR_ORCHESTRATOR_HISTORY_WINDOW") {
            self.orchestrator.history_window =
                parse_u64("MENTOR_ORCHESTRATOR_HISTORY_WINDOW", &value)? as usize;
        }

        let log_level = read_env("MENTOR_LOGGING_LEVEL").or_else(|| read_env("MENTOR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MENTOR_LOGGING_FORMAT").or_else(|| read_env("MENTOR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(base_url) = overrides.gateway_base_url {
            self.gateway.base_url = base_url;
        }
        if let Some(model) = overrides.gateway_model {
            self.gateway.model = model;
        }
        if let Some(api_key) = overrides.gateway_api_key {
            self.gateway.api_key = Some(api_key.into());
        }
        if let Some(base_url) = overrides.tools_base_url {
            self.tools.base_url = base_url;
        }
        if let Some(default_tool) = overrides.default_tool {
            self.orchestrator.default_tool = default_tool;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        validate_base_url("gateway.base_url", &self.gateway.base_url)?;
        if self.gateway.model.trim().is_empty() {
            return Err(ConfigError::Validation("gateway.model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.gateway.temperature) {
            return Err(ConfigError::Validation(format!(
                "gateway.temperature must be within [0.0, 2.0], got {}",
                self.gateway.temperature
            )));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "gateway.timeout_secs must be at least 1".to_string(),
            ));
        }
        validate_base_url("tools.base_url", &self.tools.base_url)?;
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tools.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.history_window == 0 {
            return Err(ConfigError::Validation(
                "orchestrator.history_window must be at least 1".to_string(),
            ));
        }
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of trace|debug|info|warn|error, got `{}`",
                self.logging.level
            )));
        }
        Ok(())
    }
}

fn validate_base_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("mentor.toml"), PathBuf::from("config/mentor.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
