mod agent;
mod compaction;
mod observability;
mod server;
mod summarizer;

pub use agent::*;
pub use compaction::*;
pub use observability::*;
pub use server::*;
pub use summarizer::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub compaction: CompactionConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.agent.binary.trim().is_empty() {
            errors.push(ConfigError::error("agent.binary", "binary must not be empty"));
        }
        if self.agent.max_turns == 0 {
            errors.push(ConfigError::error("agent.max_turns", "max_turns must be greater than 0"));
        }
        if self.agent.heartbeat_secs == 0 {
            errors.push(ConfigError::error(
                "agent.heartbeat_secs",
                "heartbeat_secs must be greater than 0",
            ));
        }
        if self.agent.event_buffer == 0 {
            errors.push(ConfigError::error(
                "agent.event_buffer",
                "event_buffer must be greater than 0",
            ));
        }
        if self.agent.allowed_tools.is_empty() {
            errors.push(ConfigError::warning(
                "agent.allowed_tools",
                "no tools registered; the agent can only answer from the conversation",
            ));
        }

        if self.compaction.threshold_tokens == 0 {
            errors.push(ConfigError::error(
                "compaction.threshold_tokens",
                "threshold_tokens must be greater than 0",
            ));
        }
        let bpt = self.compaction.bytes_per_token;
        if bpt.is_nan() || bpt <= 0.0 {
            errors.push(ConfigError::error(
                "compaction.bytes_per_token",
                "bytes_per_token must be a positive number",
            ));
        }
        if self.compaction.recent_messages == 0 {
            errors.push(ConfigError::warning(
                "compaction.recent_messages",
                "recent_messages is 0; summaries will always use the fallback template",
            ));
        }

        if self.summarizer.base_url.is_empty() {
            errors.push(ConfigError::error(
                "summarizer.base_url",
                "base_url must not be empty",
            ));
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_apart_from_tool_warning() {
        let issues = Config::default().validate();
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
        assert!(issues.iter().any(|i| i.field == "agent.allowed_tools"));
    }

    #[test]
    fn zero_threshold_is_an_error() {
        let mut config = Config::default();
        config.compaction.threshold_tokens = 0;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "compaction.threshold_tokens" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn nan_bytes_per_token_is_an_error() {
        let mut config = Config::default();
        config.compaction.bytes_per_token = f64::NAN;
        assert!(config
            .validate()
            .iter()
            .any(|i| i.field == "compaction.bytes_per_token"));
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::error("server.port", "port must be greater than 0");
        assert_eq!(e.to_string(), "[ERROR] server.port: port must be greater than 0");
    }
}
