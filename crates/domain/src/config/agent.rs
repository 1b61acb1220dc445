use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent (upstream provider) configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the relay launches and drives the agent engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Executable of the agent CLI.
    #[serde(default = "d_binary")]
    pub binary: String,
    /// Leading arguments placed before the relay's own flags (e.g.
    /// `binary = "npx"`, `args = ["@anthropic-ai/claude-code"]`).
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory the agent runs in. Also determines where the
    /// engine stores session transcripts. Defaults to the process cwd.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    /// Root of the engine's per-project transcript directories.
    /// Defaults to `~/.claude/projects`.
    #[serde(default)]
    pub projects_dir: Option<PathBuf>,
    /// Default model when the request does not name one.
    #[serde(default)]
    pub model: Option<String>,
    /// Default max-turn budget per run.
    #[serde(default = "d_25")]
    pub max_turns: u32,
    /// Default system prompt appended to the engine's own.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Tools the agent may call. Nothing outside this list is enabled.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// MCP server config exposing the tools above.
    #[serde(default)]
    pub mcp_config: Option<PathBuf>,
    #[serde(default)]
    pub permission_mode: PermissionMode,
    /// Interval of the "still waiting" diagnostic while a run is idle.
    #[serde(default = "d_15")]
    pub heartbeat_secs: u64,
    /// Capacity of the per-run event queue between producer and consumer.
    #[serde(default = "d_32")]
    pub event_buffer: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            binary: d_binary(),
            args: Vec::new(),
            workdir: None,
            projects_dir: None,
            model: None,
            max_turns: 25,
            system_prompt: None,
            allowed_tools: Vec::new(),
            mcp_config: None,
            permission_mode: PermissionMode::default(),
            heartbeat_secs: 15,
            event_buffer: 32,
        }
    }
}

/// Tool-permission policy handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    /// Registered tools run without interactive approval.
    #[default]
    BypassPermissions,
    Plan,
}

impl PermissionMode {
    /// The engine's spelling of this mode.
    pub fn as_flag(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_binary() -> String {
    "claude".into()
}
fn d_25() -> u32 {
    25
}
fn d_15() -> u64 {
    15
}
fn d_32() -> usize {
    32
}
