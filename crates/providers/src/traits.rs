use std::path::PathBuf;

use relay_domain::config::PermissionMode;
use relay_domain::error::Result;
use relay_domain::message::ProviderMessage;
use relay_domain::stream::BoxStream;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One request to the agent engine.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// The (possibly compaction-rewritten) user prompt.
    pub prompt: String,
    /// Provider session to resume. `None` starts a fresh session.
    pub resume: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    /// Appended to the engine's own system prompt.
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Tools the engine may call. Empty means no restriction is passed.
    pub allowed_tools: Vec<String>,
    pub permission_mode: Option<PermissionMode>,
    pub mcp_config: Option<PathBuf>,
}

/// An agent engine that turns a prompt into a stream of raw messages.
///
/// Dropping the returned stream must abort the upstream request.
#[async_trait::async_trait]
pub trait AgentProvider: Send + Sync {
    async fn query(
        &self,
        req: QueryRequest,
    ) -> Result<BoxStream<'static, Result<ProviderMessage>>>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Plain chat completion (summaries)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Top-level system instruction.
    pub system: Option<String>,
    /// Sampling temperature. `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_tokens: Option<u32>,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Textual content of the response.
    pub content: String,
    pub usage: Option<ChatUsage>,
    /// The model that actually produced the response.
    pub model: String,
    /// The reason the model stopped generating.
    pub finish_reason: Option<String>,
}

/// Request/response completion against a (typically cheaper) model.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse>;

    fn provider_id(&self) -> &str;
}
