use serde::Serialize;
use serde_json::Value;

/// The normalized event vocabulary streamed to clients.
///
/// Every run produces at most one `Init`, and ends in exactly one of `Done`
/// or `Error` unless it was cancelled (in which case it ends silently).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AgentEvent {
    /// The provider opened (or resumed) a session.
    Init { session_id: String },

    /// A chunk of assistant text.
    Text { content: String },

    /// The model is invoking a tool.
    ToolUse { tool_name: String, input: Value },

    /// A tool finished. `tool_name` carries the tool-use id the result
    /// answers (or `"unknown"`).
    ToolResult {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },

    /// A batch of tool results was processed; the next model response starts
    /// a new turn.
    Turn { turn: u32 },

    /// The run completed successfully.
    Done { session_id: String, input_tokens: u64 },

    /// The run failed.
    Error { message: String },
}

impl AgentEvent {
    /// The SSE `event:` label for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::Init { .. } => "init",
            AgentEvent::Text { .. } => "text",
            AgentEvent::ToolUse { .. } => "tool_use",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::Turn { .. } => "turn",
            AgentEvent::Done { .. } => "done",
            AgentEvent::Error { .. } => "error",
        }
    }

    /// `Done` and `Error` end a run; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done { .. } | AgentEvent::Error { .. })
    }
}
