//! Abort signals for active runs, addressable by session id.
//!
//! Each run registers a [`CancellationToken`] under its run id. A run is
//! bound to the session it resumes and, once the provider reports it, to the
//! session the provider assigned. Stopping a session cancels whichever run
//! is currently bound to it.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inner {
    /// run id → token
    runs: HashMap<String, CancellationToken>,
    /// session id → run id (latest run wins)
    sessions: HashMap<String, String>,
}

/// Tracks active runs and their abort tokens.
#[derive(Default)]
pub struct CancelMap {
    inner: Mutex<Inner>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a new token for a run.
    pub fn register(&self, run_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.inner
            .lock()
            .runs
            .insert(run_id.to_owned(), token.clone());
        token
    }

    /// Make `session_id` address the run. Ignored for empty ids and runs
    /// that already finished.
    pub fn bind_session(&self, session_id: &str, run_id: &str) {
        if session_id.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.runs.contains_key(run_id) {
            inner
                .sessions
                .insert(session_id.to_owned(), run_id.to_owned());
        }
    }

    /// Cancel the run bound to a session. Returns true if one was found.
    pub fn cancel_session(&self, session_id: &str) -> bool {
        let inner = self.inner.lock();
        let token = inner
            .sessions
            .get(session_id)
            .and_then(|run_id| inner.runs.get(run_id));
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget a finished run and any session bindings still pointing at it.
    pub fn remove(&self, run_id: &str) {
        let mut inner = self.inner.lock();
        inner.runs.remove(run_id);
        inner.sessions.retain(|_, bound| bound != run_id);
    }

    /// Whether a session has an active run.
    pub fn is_running(&self, session_id: &str) -> bool {
        let inner = self.inner.lock();
        inner
            .sessions
            .get(session_id)
            .is_some_and(|run_id| inner.runs.contains_key(run_id))
    }

    /// Number of active runs.
    pub fn active_runs(&self) -> usize {
        self.inner.lock().runs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_bind_and_cancel() {
        let map = CancelMap::new();
        let token = map.register("r1");
        map.bind_session("s1", "r1");
        assert!(map.is_running("s1"));
        assert_eq!(map.active_runs(), 1);

        assert!(map.cancel_session("s1"));
        assert!(token.is_cancelled());

        map.remove("r1");
        assert!(!map.is_running("s1"));
        assert!(!map.cancel_session("s1"));
        assert_eq!(map.active_runs(), 0);
    }

    #[test]
    fn run_can_be_addressed_by_two_sessions() {
        let map = CancelMap::new();
        let token = map.register("r1");
        map.bind_session("old-session", "r1");
        map.bind_session("new-session", "r1");
        assert!(map.cancel_session("new-session"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn newer_run_takes_over_session() {
        let map = CancelMap::new();
        let old = map.register("r1");
        let new = map.register("r2");
        map.bind_session("s1", "r1");
        map.bind_session("s1", "r2");

        // Finishing the old run must not unbind the new one.
        map.remove("r1");
        assert!(map.is_running("s1"));

        map.cancel_session("s1");
        assert!(new.is_cancelled());
        assert!(!old.is_cancelled());
    }

    #[test]
    fn binding_finished_or_empty_is_ignored() {
        let map = CancelMap::new();
        map.bind_session("s1", "ghost");
        assert!(!map.is_running("s1"));

        map.register("r1");
        map.bind_session("", "r1");
        assert!(!map.cancel_session(""));
    }

    #[test]
    fn cancel_nonexistent_session_returns_false() {
        let map = CancelMap::default();
        assert!(!map.cancel_session("does_not_exist"));
    }

    #[test]
    fn remove_is_idempotent() {
        let map = CancelMap::new();
        map.register("r1");
        map.remove("r1");
        map.remove("r1");
        assert_eq!(map.active_runs(), 0);
    }
}
