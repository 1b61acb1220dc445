//! Read-only access to the engine's JSONL transcripts.
//!
//! Each session lives in `<projects_dir>/<project_key>/<session_id>.jsonl`,
//! where `project_key` is the agent's working directory with every
//! non-alphanumeric character replaced by `-`. Every line is one logged
//! entry; only `user` and `assistant` entries become history.
//!
//! Reads go through `spawn_blocking` so the tokio runtime is never blocked
//! on file I/O.

use std::path::{Path, PathBuf};

use relay_domain::error::{Error, Result};
use relay_domain::message::{ContentBlock, UserContent};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// History model
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

/// One conversational message reconstructed from the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub id: String,
    pub role: HistoryRole,
    pub content: String,
    pub timestamp: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Raw transcript lines
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    is_meta: Option<bool>,
    #[serde(default)]
    is_sidechain: Option<bool>,
    #[serde(default)]
    message: Option<RawMessage>,
}

impl RawEntry {
    fn is_meta(&self) -> bool {
        self.is_meta.unwrap_or(false) || self.is_sidechain.unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: UserContent,
}

/// Model name the engine writes on assistant entries it fabricated itself
/// (interruptions, API error notices).
const SYNTHETIC_MODEL: &str = "<synthetic>";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TranscriptStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Locates and parses session transcripts for one agent working directory.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    project_dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(projects_dir: &Path, workdir: &Path) -> Self {
        Self {
            project_dir: projects_dir.join(project_key(workdir)),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Transcript path for a session, or `None` when the id could escape
    /// the project directory.
    pub fn path_for(&self, session_id: &str) -> Option<PathBuf> {
        if !is_valid_session_id(session_id) {
            return None;
        }
        Some(self.project_dir.join(format!("{session_id}.jsonl")))
    }

    /// Read a session's history. A missing transcript is an empty history.
    pub fn read_history(&self, session_id: &str) -> Result<Vec<HistoryMessage>> {
        match self.path_for(session_id) {
            Some(path) => read_history_file(&path, session_id),
            None => {
                tracing::warn!(session_id = session_id, "rejecting malformed session id");
                Ok(Vec::new())
            }
        }
    }

    /// Async variant of [`read_history`](Self::read_history).
    pub async fn read_history_async(&self, session_id: &str) -> Result<Vec<HistoryMessage>> {
        let Some(path) = self.path_for(session_id) else {
            tracing::warn!(session_id = session_id, "rejecting malformed session id");
            return Ok(Vec::new());
        };
        let sid = session_id.to_owned();
        tokio::task::spawn_blocking(move || read_history_file(&path, &sid))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }

    /// Size in bytes of a session's transcript; `None` if it does not exist.
    pub async fn transcript_size(&self, session_id: &str) -> std::io::Result<Option<u64>> {
        let Some(path) = self.path_for(session_id) else {
            return Ok(None);
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// The engine's directory name for a working directory.
pub fn project_key(workdir: &Path) -> String {
    workdir
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A missing or unreadable transcript is an empty history. Invalid UTF-8
/// is replaced per byte so one bad line cannot hide the rest.
fn read_history_file(path: &Path, session_id: &str) -> Result<Vec<HistoryMessage>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            tracing::warn!(
                session_id = session_id,
                path = %path.display(),
                error = %e,
                "transcript unreadable, treating as empty"
            );
            return Ok(Vec::new());
        }
    };
    Ok(parse_history(&String::from_utf8_lossy(&bytes), session_id))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Assistant fragments sharing one message id, not yet emitted.
struct PendingAssistant {
    id: String,
    timestamp: String,
    parts: Vec<String>,
}

impl PendingAssistant {
    fn flush_into(self, out: &mut Vec<HistoryMessage>) {
        let content = self.parts.join("\n");
        if content.trim().is_empty() {
            return;
        }
        out.push(HistoryMessage {
            id: self.id,
            role: HistoryRole::Assistant,
            content,
            timestamp: self.timestamp,
        });
    }
}

/// Project raw JSONL transcript text into conversational history.
///
/// Malformed lines are logged and skipped.
pub fn parse_history(raw: &str, session_id: &str) -> Vec<HistoryMessage> {
    let mut out = Vec::new();
    let mut pending: Option<PendingAssistant> = None;

    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = match serde_json::from_str::<RawEntry>(line) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    session_id = session_id,
                    line = line_no + 1,
                    error = %e,
                    "skipping malformed transcript line"
                );
                continue;
            }
        };

        match entry.kind.as_str() {
            "user" => {
                if let Some(p) = pending.take() {
                    p.flush_into(&mut out);
                }
                if entry.is_meta() {
                    continue;
                }
                let Some(message) = entry.message else {
                    continue;
                };
                let Some(content) = user_text(&message.content) else {
                    continue;
                };
                out.push(HistoryMessage {
                    id: entry.uuid.unwrap_or_else(|| format!("user-{}", line_no + 1)),
                    role: HistoryRole::User,
                    content,
                    timestamp: entry.timestamp.unwrap_or_default(),
                });
            }
            "assistant" => {
                if entry.is_meta() {
                    continue;
                }
                let Some(message) = entry.message else {
                    continue;
                };
                if message.model.as_deref() == Some(SYNTHETIC_MODEL) {
                    continue;
                }
                let id = message
                    .id
                    .or(entry.uuid)
                    .unwrap_or_else(|| format!("assistant-{}", line_no + 1));

                if pending.as_ref().is_some_and(|p| p.id != id) {
                    if let Some(p) = pending.take() {
                        p.flush_into(&mut out);
                    }
                }
                let p = pending.get_or_insert_with(|| PendingAssistant {
                    id,
                    timestamp: entry.timestamp.unwrap_or_default(),
                    parts: Vec::new(),
                });
                p.parts.extend(text_parts(&message.content));
            }
            _ => {}
        }
    }

    if let Some(p) = pending.take() {
        p.flush_into(&mut out);
    }
    out
}

/// Text of a user entry, or `None` for tool-result turns and empty input.
fn user_text(content: &UserContent) -> Option<String> {
    let text = match content {
        UserContent::Text(s) => s.clone(),
        UserContent::Blocks(blocks) => {
            if blocks.iter().any(|b| matches!(b, ContentBlock::ToolResult(_))) {
                return None;
            }
            text_parts(content).join("\n")
        }
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn text_parts(content: &UserContent) -> Vec<String> {
    match content {
        UserContent::Text(s) => vec![s.clone()],
        UserContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) if !t.text.is_empty() => Some(t.text.clone()),
                _ => None,
            })
            .collect(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
