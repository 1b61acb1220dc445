//! Provider message → normalized event translation.
//!
//! [`translate`] is a pure function: the same message and `has_streamed_text`
//! flag always yield the same events. The only side effect is diagnostic
//! logging for message and block kinds that produce nothing.

use relay_domain::event::AgentEvent;
use relay_domain::message::{
    AssistantMessage, ContentBlock, Delta, ProviderMessage, ResultMessage, StreamEventMessage,
    StreamSubEvent, SystemMessage, UserMessage,
};

/// Fallback error text for a failed result carrying no `errors` list.
const GENERIC_RUN_ERROR: &str = "agent run failed";

/// Tool name reported when a tool result carries no `tool_use_id`.
const UNKNOWN_TOOL: &str = "unknown";

/// Translate one provider message into zero or more normalized events.
///
/// `has_streamed_text` suppresses the full-text `text` blocks of assistant
/// messages once incremental deltas have been forwarded, so the same text is
/// never sent twice.
pub fn translate(msg: &ProviderMessage, has_streamed_text: bool) -> Vec<AgentEvent> {
    match msg {
        ProviderMessage::System(sys) => translate_system(sys),
        ProviderMessage::Assistant(asst) => translate_assistant(asst, has_streamed_text),
        ProviderMessage::User(user) => translate_user(user),
        ProviderMessage::Result(result) => vec![translate_result(result)],
        ProviderMessage::StreamEvent(ev) => translate_stream_event(ev),
        ProviderMessage::Unknown { kind } => {
            tracing::debug!(kind = %kind, "ignoring unrecognized provider message");
            Vec::new()
        }
    }
}

/// Number of `tool_result` blocks in a user message.
pub fn tool_result_count(msg: &ProviderMessage) -> usize {
    match msg {
        ProviderMessage::User(user) => user
            .message
            .content
            .blocks()
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolResult(_)))
            .count(),
        _ => 0,
    }
}

fn translate_system(sys: &SystemMessage) -> Vec<AgentEvent> {
    if !sys.is_init() {
        tracing::trace!(subtype = %sys.subtype, "ignoring system message");
        return Vec::new();
    }
    vec![AgentEvent::Init {
        session_id: sys.session_id.clone().unwrap_or_default(),
    }]
}

fn translate_assistant(asst: &AssistantMessage, has_streamed_text: bool) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    for block in &asst.message.content {
        match block {
            ContentBlock::Text(t) => {
                if !has_streamed_text {
                    events.push(AgentEvent::Text {
                        content: t.text.clone(),
                    });
                }
            }
            ContentBlock::ToolUse(tu) => events.push(AgentEvent::ToolUse {
                tool_name: tu.name.clone(),
                input: tu.input.clone(),
            }),
            other => {
                tracing::trace!(kind = %other.kind(), "ignoring assistant content block");
            }
        }
    }
    events
}

fn translate_user(user: &UserMessage) -> Vec<AgentEvent> {
    user.message
        .content
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult(tr) => Some(AgentEvent::ToolResult {
                tool_name: tr
                    .tool_use_id
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_TOOL.to_owned()),
                result: tr.result_text(),
            }),
            _ => None,
        })
        .collect()
}

fn translate_result(result: &ResultMessage) -> AgentEvent {
    if result.is_success() {
        return AgentEvent::Done {
            session_id: result.session_id.clone().unwrap_or_default(),
            input_tokens: result
                .usage
                .as_ref()
                .map(|u| u.context_tokens())
                .unwrap_or(0),
        };
    }

    let message = match result.errors.as_deref() {
        Some(errors) if !errors.is_empty() => errors.join("; "),
        _ if result.subtype.is_empty() => GENERIC_RUN_ERROR.to_owned(),
        _ => format!("{GENERIC_RUN_ERROR} ({})", result.subtype),
    };
    AgentEvent::Error { message }
}

fn translate_stream_event(ev: &StreamEventMessage) -> Vec<AgentEvent> {
    match &ev.event {
        StreamSubEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
            ..
        } => vec![AgentEvent::Text {
            content: text.clone(),
        }],
        _ => Vec::new(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(v: serde_json::Value) -> ProviderMessage {
        ProviderMessage::from_value(v).unwrap()
    }

    #[test]
    fn init_carries_session_id() {
        let events = translate(
            &msg(json!({"type": "system", "subtype": "init", "session_id": "s1"})),
            false,
        );
        assert_eq!(events, vec![AgentEvent::Init { session_id: "s1".into() }]);
    }

    #[test]
    fn other_system_subtypes_are_silent() {
        let events = translate(
            &msg(json!({"type": "system", "subtype": "compact_boundary"})),
            false,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn assistant_text_is_suppressed_after_streaming() {
        let m = msg(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "hello"}]}
        }));
        assert!(translate(&m, true).is_empty());
        assert_eq!(
            translate(&m, false),
            vec![AgentEvent::Text { content: "hello".into() }]
        );
    }

    #[test]
    fn mixed_blocks_keep_block_order() {
        let m = msg(json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "checking"},
                {"type": "thinking", "thinking": "hmm"},
                {"type": "tool_use", "id": "tu_1", "name": "list_orders", "input": {"limit": 2}},
                {"type": "text", "text": "done"}
            ]}
        }));
        let events = translate(&m, false);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], AgentEvent::Text { content: "checking".into() });
        assert_eq!(
            events[1],
            AgentEvent::ToolUse {
                tool_name: "list_orders".into(),
                input: json!({"limit": 2})
            }
        );
        assert_eq!(events[2], AgentEvent::Text { content: "done".into() });

        // tool_use survives text suppression
        let streamed = translate(&m, true);
        assert_eq!(streamed.len(), 1);
        assert_eq!(streamed[0].event_type(), "tool_use");
    }

    #[test]
    fn tool_result_array_joins_text_fields() {
        let m = msg(json!({
            "type": "user",
            "message": {"content": [{
                "type": "tool_result",
                "tool_use_id": "tu_1",
                "content": [{"type": "text", "text": "line1"}, {"type": "text", "text": "line2"}]
            }]}
        }));
        assert_eq!(
            translate(&m, false),
            vec![AgentEvent::ToolResult {
                tool_name: "tu_1".into(),
                result: Some("line1\nline2".into())
            }]
        );
        assert_eq!(tool_result_count(&m), 1);
    }

    #[test]
    fn tool_result_without_id_or_content() {
        let m = msg(json!({
            "type": "user",
            "message": {"content": [{"type": "tool_result"}]}
        }));
        assert_eq!(
            translate(&m, false),
            vec![AgentEvent::ToolResult {
                tool_name: "unknown".into(),
                result: None
            }]
        );
    }

    #[test]
    fn plain_user_text_is_silent() {
        let m = msg(json!({"type": "user", "message": {"content": "hi"}}));
        assert!(translate(&m, false).is_empty());
        assert_eq!(tool_result_count(&m), 0);
    }

    #[test]
    fn done_sums_cache_tokens() {
        let m = msg(json!({
            "type": "result",
            "subtype": "success",
            "session_id": "s1",
            "usage": {"input_tokens": 100, "cache_read_input_tokens": 10, "cache_creation_input_tokens": 5}
        }));
        assert_eq!(
            translate(&m, true),
            vec![AgentEvent::Done {
                session_id: "s1".into(),
                input_tokens: 115
            }]
        );
    }

    #[test]
    fn done_without_usage_is_zero() {
        let m = msg(json!({"type": "result", "subtype": "success", "session_id": "s1"}));
        assert_eq!(
            translate(&m, false),
            vec![AgentEvent::Done {
                session_id: "s1".into(),
                input_tokens: 0
            }]
        );
    }

    #[test]
    fn error_result_joins_errors() {
        let m = msg(json!({
            "type": "result",
            "subtype": "error_during_execution",
            "errors": ["a", "b"]
        }));
        assert_eq!(
            translate(&m, false),
            vec![AgentEvent::Error { message: "a; b".into() }]
        );
    }

    #[test]
    fn error_result_without_errors_uses_fallback() {
        let m = msg(json!({"type": "result", "subtype": "error_max_turns"}));
        match &translate(&m, false)[0] {
            AgentEvent::Error { message } => {
                assert!(message.starts_with(GENERIC_RUN_ERROR));
                assert!(message.contains("error_max_turns"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn empty_errors_list_uses_fallback() {
        let m = msg(json!({
            "type": "result",
            "subtype": "error_during_execution",
            "errors": []
        }));
        assert_eq!(
            translate(&m, false),
            vec![AgentEvent::Error {
                message: "agent run failed (error_during_execution)".into()
            }]
        );
    }

    #[test]
    fn text_delta_becomes_text() {
        let m = msg(json!({
            "type": "stream_event",
            "event": {"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hel"}}
        }));
        assert_eq!(
            translate(&m, true),
            vec![AgentEvent::Text { content: "Hel".into() }]
        );
    }

    #[test]
    fn other_stream_events_are_silent() {
        for event in [
            json!({"type": "message_start", "message": {}}),
            json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "{"}}),
            json!({"type": "message_stop"}),
        ] {
            let m = msg(json!({"type": "stream_event", "event": event}));
            assert!(translate(&m, false).is_empty());
        }
    }

    #[test]
    fn unknown_top_level_type_is_silent() {
        let m = msg(json!({"type": "rate_limit_event"}));
        assert!(translate(&m, false).is_empty());
    }

    #[test]
    fn translation_is_deterministic() {
        let m = msg(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "x"}, {"type": "tool_use", "id": "1", "name": "t", "input": {}}]}
        }));
        assert_eq!(translate(&m, false), translate(&m, false));
        assert_eq!(translate(&m, true), translate(&m, true));
    }
}
