//! Agent engine adapter that drives the Claude Code CLI.
//!
//! The CLI runs in print mode with `--output-format stream-json`, emitting
//! one JSON message per stdout line. The prompt is written to stdin so it
//! can never be mistaken for a flag. Dropping the returned stream kills the
//! child process.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::traits::{AgentProvider, QueryRequest};
use relay_domain::config::AgentConfig;
use relay_domain::error::{Error, Result};
use relay_domain::message::ProviderMessage;
use relay_domain::stream::BoxStream;

/// Number of stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Env var the CLI reads its output-token cap from.
const MAX_OUTPUT_TOKENS_ENV: &str = "CLAUDE_CODE_MAX_OUTPUT_TOKENS";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stderr tail
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, Default)]
struct StderrTail {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl StderrTail {
    fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == STDERR_TAIL_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    fn render(&self) -> String {
        self.lines
            .lock()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ClaudeCliProvider {
    id: String,
    binary: String,
    leading_args: Vec<String>,
    workdir: Option<PathBuf>,
}

impl ClaudeCliProvider {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            id: "claude-cli".into(),
            binary: cfg.binary.clone(),
            leading_args: cfg.args.clone(),
            workdir: cfg.workdir.clone(),
        }
    }

    /// Full argument list for one query (excluding the prompt, which goes
    /// to stdin).
    pub fn build_args(&self, req: &QueryRequest) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(
            [
                "--print",
                "--output-format",
                "stream-json",
                "--verbose",
                "--include-partial-messages",
            ]
            .map(String::from),
        );

        if let Some(ref resume) = req.resume {
            args.push("--resume".into());
            args.push(resume.clone());
        }
        if let Some(ref model) = req.model {
            args.push("--model".into());
            args.push(model.clone());
        }
        if let Some(max_turns) = req.max_turns {
            args.push("--max-turns".into());
            args.push(max_turns.to_string());
        }
        if let Some(ref system_prompt) = req.system_prompt {
            args.push("--append-system-prompt".into());
            args.push(system_prompt.clone());
        }
        if !req.allowed_tools.is_empty() {
            args.push("--allowedTools".into());
            args.push(req.allowed_tools.join(","));
        }
        if let Some(mode) = req.permission_mode {
            args.push("--permission-mode".into());
            args.push(mode.as_flag().into());
        }
        if let Some(ref mcp) = req.mcp_config {
            args.push("--mcp-config".into());
            args.push(mcp.to_string_lossy().into_owned());
        }
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::Provider {
            provider: self.id.clone(),
            message: format!("failed to spawn '{}': {e}", self.binary),
        }
    }
}

#[async_trait::async_trait]
impl AgentProvider for ClaudeCliProvider {
    async fn query(
        &self,
        req: QueryRequest,
    ) -> Result<BoxStream<'static, Result<ProviderMessage>>> {
        let args = self.build_args(&req);

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir);
        }
        if let Some(max_tokens) = req.max_tokens {
            cmd.env(MAX_OUTPUT_TOKENS_ENV, max_tokens.to_string());
        }
        if let Some(temperature) = req.temperature {
            tracing::debug!(temperature, "agent CLI has no temperature flag; ignoring");
        }

        tracing::debug!(
            provider = %self.id,
            binary = %self.binary,
            resume = ?req.resume,
            "spawning agent CLI"
        );

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        let broken_pipe = |what: &str| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("failed to capture child {what}"),
            ))
        };
        let mut stdin = child.stdin.take().ok_or_else(|| broken_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| broken_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| broken_pipe("stderr"))?;

        // A CLI that exits early closes stdin; the exit status reports why.
        if let Err(e) = stdin.write_all(req.prompt.as_bytes()).await {
            tracing::debug!(error = %e, "failed to write prompt to agent CLI stdin");
        }
        drop(stdin);

        let tail = StderrTail::default();
        let stderr_task = {
            let tail = tail.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tail.push(line);
                }
            })
        };

        let provider = self.id.clone();
        let binary = self.binary.clone();

        let stream = async_stream::stream! {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match ProviderMessage::from_json_line(trimmed) {
                            Ok(msg) => yield Ok(msg),
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    line = %truncate(trimmed, 200),
                                    "skipping malformed line from agent CLI"
                                );
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(Error::Io(e));
                        return;
                    }
                }
            }

            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    let _ = stderr_task.await;
                    let stderr_tail = tail.render();
                    let mut message = format!("'{binary}' exited with {status}");
                    if !stderr_tail.is_empty() {
                        message.push_str(": ");
                        message.push_str(&stderr_tail);
                    }
                    yield Err(Error::Provider { provider, message });
                }
                Err(e) => yield Err(Error::Io(e)),
            }
        };

        Ok(Box::pin(stream))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
