use serde::Serialize;

/// Structured trace events emitted across all relay crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    RunStarted {
        run_id: String,
        resume: Option<String>,
        model: Option<String>,
    },
    FirstToken {
        run_id: String,
        latency_ms: u64,
    },
    ToolFinished {
        run_id: String,
        tool: String,
        duration_ms: u64,
    },
    RunFinished {
        run_id: String,
        outcome: String,
        turns: u32,
        duration_ms: u64,
    },
    CompactionTriggered {
        session_id: String,
        recorded_tokens: Option<u64>,
        summary_chars: usize,
    },
    TokensRecorded {
        session_id: String,
        input_tokens: u64,
    },
    HistoryLoaded {
        session_id: String,
        messages: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "relay_event");
    }
}
