pub mod anthropic;
pub mod claude_cli;
pub mod traits;
pub(crate) mod util;

// Re-exports for convenience.
pub use anthropic::AnthropicProvider;
pub use claude_cli::ClaudeCliProvider;
pub use traits::{
    AgentProvider, ChatMessage, ChatRequest, ChatResponse, ChatRole, ChatUsage, LlmProvider,
    QueryRequest,
};
pub use util::resolve_api_key;
