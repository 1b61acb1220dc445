use relay_domain::config::{Config, PermissionMode};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn default_compaction_budget() {
    let config = Config::default();
    assert!(config.compaction.enabled);
    assert_eq!(config.compaction.threshold_tokens, 50_000);
    assert!((config.compaction.bytes_per_token - 1.45).abs() < f64::EPSILON);
}

#[test]
fn default_summarizer_reads_anthropic_key_env() {
    let config = Config::default();
    assert_eq!(config.summarizer.api_key_env, "ANTHROPIC_API_KEY");
    assert!(config.summarizer.api_key.is_none());
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8080

[server.cors]
allowed_origins = ["https://app.example.com"]

[agent]
binary = "/usr/local/bin/claude"
workdir = "/srv/relay"
model = "claude-sonnet-4-5"
max_turns = 10
allowed_tools = ["mcp__backend__list_orders", "mcp__backend__create_order"]
permission_mode = "bypass_permissions"

[compaction]
threshold_tokens = 80000
recent_messages = 12

[summarizer]
model = "claude-haiku-4-5"
max_tokens = 300
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.cors.allowed_origins.len(), 1);
    assert_eq!(config.agent.max_turns, 10);
    assert_eq!(config.agent.allowed_tools.len(), 2);
    assert_eq!(config.agent.permission_mode, PermissionMode::BypassPermissions);
    assert_eq!(config.compaction.threshold_tokens, 80_000);
    assert_eq!(config.compaction.recent_messages, 12);
    // Unspecified fields keep their defaults.
    assert_eq!(config.compaction.message_chars, 1_000);
    assert_eq!(config.summarizer.max_tokens, 300);
    assert!(config.validate().is_empty());
}

#[test]
fn cors_wildcard_port_preserved_in_config() {
    let toml_str = r#"
[server.cors]
allowed_origins = ["http://localhost:*"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.cors.allowed_origins[0], "http://localhost:*");
}
