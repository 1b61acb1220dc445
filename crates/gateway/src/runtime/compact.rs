//! Session compaction: decide when a session has grown too large and
//! replace its context with a short summary.
//!
//! The relay never rewrites transcripts. Compacting means starting a fresh
//! provider session whose first prompt carries a summary of the old one.

use relay_domain::config::CompactionConfig;
use relay_domain::error::Result;
use relay_providers::traits::{ChatMessage, ChatRequest};
use relay_providers::LlmProvider;
use relay_sessions::{HistoryMessage, HistoryRole, TokenStore, TranscriptStore};

/// Used when the transcript has neither a user nor an assistant message.
const EMPTY_HISTORY_PLACEHOLDER: &str = "Earlier conversation details are unavailable.";

const SUMMARY_INSTRUCTIONS: &str = "You summarize conversations between a user and an \
    assistant that operates tools on the user's behalf. Summarize the conversation below \
    in 3-5 sentences. Capture the entities and resources involved (names, ids, amounts), \
    the actions taken, the outcome of the most recent request, and any work still in \
    progress. Reply with the summary only.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decision
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether a session has outgrown `threshold` tokens.
///
/// Uses the recorded token count when there is one. Otherwise estimates from
/// the transcript size at `bytes_per_token`; a missing or unreadable
/// transcript never triggers compaction.
pub async fn should_compact(
    session_id: &str,
    tokens: &dyn TokenStore,
    transcripts: &TranscriptStore,
    threshold: u64,
    bytes_per_token: f64,
) -> bool {
    if let Some(recorded) = tokens.get(session_id).await {
        return recorded > threshold;
    }

    match transcripts.transcript_size(session_id).await {
        Ok(Some(size)) => {
            let cutoff = threshold as f64 * bytes_per_token;
            tracing::debug!(
                session_id = session_id,
                size,
                cutoff,
                "no recorded token count, estimating from transcript size"
            );
            size as f64 > cutoff
        }
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(session_id = session_id, error = %e, "transcript stat failed");
            false
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Summarize a session's history.
///
/// Returns an empty string for an empty history. Summarizer failures fall
/// back to a template built from the last request and response; only a
/// transcript read failure is an error.
pub async fn generate_summary(
    session_id: &str,
    transcripts: &TranscriptStore,
    summarizer: Option<&dyn LlmProvider>,
    config: &CompactionConfig,
) -> Result<String> {
    let history = transcripts.read_history_async(session_id).await?;
    if history.is_empty() {
        return Ok(String::new());
    }

    let Some(provider) = summarizer else {
        tracing::debug!(session_id = session_id, "no summarizer configured, using fallback summary");
        return Ok(fallback_summary(&history, config.fallback_chars));
    };

    let start = history.len().saturating_sub(config.recent_messages);
    let conversation = build_conversation_text(&history[start..], config.message_chars);
    if conversation.is_empty() {
        return Ok(fallback_summary(&history, config.fallback_chars));
    }

    let req = ChatRequest {
        messages: vec![ChatMessage::user(format!("CONVERSATION:\n{conversation}"))],
        system: Some(SUMMARY_INSTRUCTIONS.into()),
        temperature: Some(0.1),
        max_tokens: None,
        model: None,
    };

    match provider.chat(req).await {
        Ok(resp) if !resp.content.trim().is_empty() => Ok(resp.content.trim().to_owned()),
        Ok(_) => {
            tracing::warn!(session_id = session_id, "summarizer returned no text, using fallback");
            Ok(fallback_summary(&history, config.fallback_chars))
        }
        Err(e) => {
            tracing::warn!(
                session_id = session_id,
                provider = provider.provider_id(),
                error = %e,
                "summarizer call failed, using fallback"
            );
            Ok(fallback_summary(&history, config.fallback_chars))
        }
    }
}

/// The prompt sent to the fresh session that replaces a compacted one.
pub fn compacted_prompt(summary: &str, message: &str) -> String {
    format!(
        "[System note: This conversation was compacted to save context. \
         Summary of earlier context: {summary}]\n\n{message}"
    )
}

/// Deterministic summary from the last user and assistant messages.
pub fn fallback_summary(history: &[HistoryMessage], max_chars: usize) -> String {
    let last = |role: HistoryRole| history.iter().rev().find(|m| m.role == role);

    let mut parts = Vec::new();
    if let Some(user) = last(HistoryRole::User) {
        parts.push(format!("Last request: {}", truncate_chars(&user.content, max_chars)));
    }
    if let Some(assistant) = last(HistoryRole::Assistant) {
        parts.push(format!(
            "Last response: {}",
            truncate_chars(&assistant.content, max_chars)
        ));
    }

    if parts.is_empty() {
        EMPTY_HISTORY_PLACEHOLDER.to_owned()
    } else {
        parts.join("\n")
    }
}

fn build_conversation_text(history: &[HistoryMessage], max_chars: usize) -> String {
    let mut buf = String::new();
    for msg in history {
        let label = match msg.role {
            HistoryRole::User => "User",
            HistoryRole::Assistant => "Assistant",
        };
        buf.push_str(label);
        buf.push_str(": ");
        buf.push_str(&truncate_chars(&msg.content, max_chars));
        buf.push('\n');
    }
    buf
}

/// Truncate to at most `max_chars` characters, marking the cut.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}
