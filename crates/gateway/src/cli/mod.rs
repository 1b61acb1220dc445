pub mod config;
pub mod history;

use clap::{Parser, Subcommand};

/// agent-relay — streams a conversational agent's runs to HTTP clients.
#[derive(Debug, Parser)]
#[command(name = "agent-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the relay server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print a session's user/assistant history as JSON.
    History {
        /// Provider session id.
        session_id: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `RELAY_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used. A missing file means all defaults.
///
/// [`Config`]: relay_domain::config::Config
pub fn load_config() -> anyhow::Result<(relay_domain::config::Config, String)> {
    let config_path = std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<relay_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(relay_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_all_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = load_config_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 3210);
        assert_eq!(config.agent.binary, "claude");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[agent]\nmax_turns = 8\nallowed_tools = [\"list_orders\"]\n\n[compaction]\nthreshold_tokens = 1000\n",
        )
        .unwrap();
        let config = load_config_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.agent.max_turns, 8);
        assert_eq!(config.agent.allowed_tools, vec!["list_orders"]);
        assert_eq!(config.compaction.threshold_tokens, 1000);
        assert_eq!(config.agent.heartbeat_secs, 15);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent\n").unwrap();
        let err = load_config_from(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("parsing "));
    }
}
