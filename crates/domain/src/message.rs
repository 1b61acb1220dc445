//! Provider message model.
//!
//! The agent engine emits newline-delimited JSON objects discriminated by a
//! top-level `type` field. Every kind we act on gets its own variant; kinds
//! we do not recognize are kept as [`ProviderMessage::Unknown`] (and
//! [`ContentBlock::Unknown`] for content blocks) so the translator can log
//! and skip them explicitly instead of failing the whole stream.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One message from the provider's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderMessage {
    System(SystemMessage),
    Assistant(AssistantMessage),
    User(UserMessage),
    Result(ResultMessage),
    StreamEvent(StreamEventMessage),
    /// A top-level `type` we do not handle.
    Unknown { kind: String },
}

impl ProviderMessage {
    /// Parse a single JSON line from the provider.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        Self::from_value(value)
    }

    /// Build a message from an already-parsed JSON object.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let kind = type_tag(&value).to_owned();
        let msg = match kind.as_str() {
            "system" => ProviderMessage::System(serde_json::from_value(value)?),
            "assistant" => ProviderMessage::Assistant(serde_json::from_value(value)?),
            "user" => ProviderMessage::User(serde_json::from_value(value)?),
            "result" => ProviderMessage::Result(serde_json::from_value(value)?),
            "stream_event" => ProviderMessage::StreamEvent(serde_json::from_value(value)?),
            _ => ProviderMessage::Unknown { kind },
        };
        Ok(msg)
    }

    /// The top-level `type` label, for logging.
    pub fn kind(&self) -> &str {
        match self {
            ProviderMessage::System(_) => "system",
            ProviderMessage::Assistant(_) => "assistant",
            ProviderMessage::User(_) => "user",
            ProviderMessage::Result(_) => "result",
            ProviderMessage::StreamEvent(_) => "stream_event",
            ProviderMessage::Unknown { kind } => kind,
        }
    }
}

impl<'de> Deserialize<'de> for ProviderMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ProviderMessage::from_value(value).map_err(D::Error::custom)
    }
}

fn type_tag(value: &Value) -> &str {
    value.get("type").and_then(Value::as_str).unwrap_or_default()
}

/// `type: "system"`. Only the `init` subtype carries meaning for us.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemMessage {
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl SystemMessage {
    pub fn is_init(&self) -> bool {
        self.subtype == "init"
    }
}

/// `type: "assistant"` — a complete (non-incremental) model message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantMessage {
    pub message: AssistantBody,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// `type: "user"` — echoes of user turns, including tool results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserMessage {
    pub message: UserBody,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserBody {
    #[serde(default)]
    pub content: UserContent,
}

/// User content is either a plain string or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for UserContent {
    fn default() -> Self {
        UserContent::Blocks(Vec::new())
    }
}

impl UserContent {
    /// Content blocks, or an empty slice for plain-text content.
    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            UserContent::Text(_) => &[],
            UserContent::Blocks(blocks) => blocks,
        }
    }
}

/// `type: "result"` — the terminal message of a provider run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultMessage {
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub usage: Option<ResultUsage>,
    #[serde(default)]
    pub num_turns: Option<u32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
}

impl ResultMessage {
    pub fn is_success(&self) -> bool {
        self.subtype == "success"
    }
}

/// Token accounting reported with a result. Absent fields count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResultUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl ResultUsage {
    /// Everything that occupied the context window for this run.
    pub fn context_tokens(&self) -> u64 {
        self.input_tokens + self.cache_read_input_tokens + self.cache_creation_input_tokens
    }
}

/// `type: "stream_event"` — an incremental streaming event wrapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamEventMessage {
    pub event: StreamSubEvent,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamSubEvent {
    ContentBlockDelta {
        #[serde(default)]
        index: u32,
        delta: Delta,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Content blocks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A content block inside an assistant or user message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
    Thinking(ThinkingBlock),
    /// A block `type` we do not handle.
    Unknown { kind: String },
}

impl ContentBlock {
    pub fn kind(&self) -> &str {
        match self {
            ContentBlock::Text(_) => "text",
            ContentBlock::ToolUse(_) => "tool_use",
            ContentBlock::ToolResult(_) => "tool_result",
            ContentBlock::Thinking(_) => "thinking",
            ContentBlock::Unknown { kind } => kind,
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let kind = type_tag(&value).to_owned();
        let block = match kind.as_str() {
            "text" => ContentBlock::Text(serde_json::from_value(value).map_err(D::Error::custom)?),
            "tool_use" => {
                ContentBlock::ToolUse(serde_json::from_value(value).map_err(D::Error::custom)?)
            }
            "tool_result" => {
                ContentBlock::ToolResult(serde_json::from_value(value).map_err(D::Error::custom)?)
            }
            "thinking" => {
                ContentBlock::Thinking(serde_json::from_value(value).map_err(D::Error::custom)?)
            }
            _ => ContentBlock::Unknown { kind },
        };
        Ok(block)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolUseBlock {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolResultBlock {
    #[serde(default)]
    pub tool_use_id: Option<String>,
    /// String, array of blocks, or absent.
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResultBlock {
    /// Flatten the result content into text.
    ///
    /// Strings pass through; arrays become each element's `text` field (or
    /// its JSON form when it has none) joined by newlines; absent content
    /// yields `None`.
    pub fn result_text(&self) -> Option<String> {
        match self.content.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item.get("text").and_then(Value::as_str) {
                        Some(text) => text.to_owned(),
                        None => item.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThinkingBlock {
    #[serde(default)]
    pub thinking: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_system_init() {
        let msg = ProviderMessage::from_json_line(
            r#"{"type":"system","subtype":"init","session_id":"s1","model":"m"}"#,
        )
        .unwrap();
        match msg {
            ProviderMessage::System(sys) => {
                assert!(sys.is_init());
                assert_eq!(sys.session_id.as_deref(), Some("s1"));
            }
            other => panic!("expected system, got {other:?}"),
        }
    }

    #[test]
    fn unknown_top_level_type_is_kept() {
        let msg = ProviderMessage::from_json_line(r#"{"type":"rate_limit","x":1}"#).unwrap();
        assert_eq!(
            msg,
            ProviderMessage::Unknown {
                kind: "rate_limit".into()
            }
        );
        assert_eq!(msg.kind(), "rate_limit");
    }

    #[test]
    fn missing_type_is_unknown_with_empty_kind() {
        let msg = ProviderMessage::from_value(json!({"hello": "world"})).unwrap();
        assert_eq!(msg, ProviderMessage::Unknown { kind: String::new() });
    }

    #[test]
    fn assistant_blocks_keep_order_and_unknown_kinds() {
        let msg = ProviderMessage::from_value(json!({
            "type": "assistant",
            "message": {
                "id": "msg_1",
                "content": [
                    {"type": "text", "text": "hi"},
                    {"type": "server_tool_use", "id": "x"},
                    {"type": "tool_use", "id": "tu_1", "name": "list_orders", "input": {"limit": 5}}
                ]
            }
        }))
        .unwrap();
        let ProviderMessage::Assistant(a) = msg else {
            panic!("expected assistant");
        };
        let kinds: Vec<&str> = a.message.content.iter().map(ContentBlock::kind).collect();
        assert_eq!(kinds, vec!["text", "server_tool_use", "tool_use"]);
    }

    #[test]
    fn user_content_may_be_plain_text() {
        let msg = ProviderMessage::from_value(json!({
            "type": "user",
            "message": {"role": "user", "content": "hello"}
        }))
        .unwrap();
        let ProviderMessage::User(u) = msg else {
            panic!("expected user");
        };
        assert!(u.message.content.blocks().is_empty());
    }

    #[test]
    fn usage_missing_fields_default_to_zero() {
        let usage: ResultUsage = serde_json::from_value(json!({"input_tokens": 7})).unwrap();
        assert_eq!(usage.context_tokens(), 7);
    }

    #[test]
    fn stream_event_text_delta() {
        let msg = ProviderMessage::from_value(json!({
            "type": "stream_event",
            "event": {"type": "content_block_delta", "index": 0,
                      "delta": {"type": "text_delta", "text": "He"}}
        }))
        .unwrap();
        let ProviderMessage::StreamEvent(ev) = msg else {
            panic!("expected stream_event");
        };
        assert_eq!(
            ev.event,
            StreamSubEvent::ContentBlockDelta {
                index: 0,
                delta: Delta::TextDelta { text: "He".into() }
            }
        );
    }

    #[test]
    fn stream_event_other_sub_events() {
        let msg = ProviderMessage::from_value(json!({
            "type": "stream_event",
            "event": {"type": "message_start", "message": {}}
        }))
        .unwrap();
        let ProviderMessage::StreamEvent(ev) = msg else {
            panic!("expected stream_event");
        };
        assert_eq!(ev.event, StreamSubEvent::Other);
    }

    #[test]
    fn tool_result_text_variants() {
        let string = ToolResultBlock {
            tool_use_id: None,
            content: Some(json!("ok")),
            is_error: false,
        };
        assert_eq!(string.result_text().as_deref(), Some("ok"));

        let array = ToolResultBlock {
            tool_use_id: None,
            content: Some(json!([{"type": "text", "text": "line1"}, {"type": "image", "n": 1}])),
            is_error: false,
        };
        assert_eq!(
            array.result_text().as_deref(),
            Some("line1\n{\"n\":1,\"type\":\"image\"}")
        );

        let absent = ToolResultBlock {
            tool_use_id: None,
            content: None,
            is_error: false,
        };
        assert_eq!(absent.result_text(), None);
    }
}
