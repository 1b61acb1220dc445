//! Periodic "still waiting" logging while a run is blocked on the provider.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

/// A scheduled heartbeat log. Started when the run begins waiting for the
/// next provider message, stopped the moment one arrives. Dropping the
/// handle stops it too, so a heartbeat never outlives its run.
pub struct Heartbeat {
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn start(run_id: &str, turn: u32, period: Duration) -> Self {
        let run_id = run_id.to_owned();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                tracing::debug!(
                    run_id = %run_id,
                    turn,
                    waiting_ms = started.elapsed().as_millis() as u64,
                    "waiting for provider"
                );
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
