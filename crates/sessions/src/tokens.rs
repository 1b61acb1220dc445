//! Last-known input-token counts per session.
//!
//! The relay records the `input_tokens` the engine reports at the end of
//! each run and consults it on the next request to decide whether the
//! session should be compacted. Counts live only for the process lifetime.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use relay_domain::trace::TraceEvent;

/// Storage for per-session token counts.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Option<u64>;
    async fn set(&self, session_id: &str, tokens: u64);
    async fn clear(&self, session_id: &str);
}

/// Process-local [`TokenStore`].
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    counts: RwLock<HashMap<String, u64>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.read().is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, session_id: &str) -> Option<u64> {
        self.counts.read().get(session_id).copied()
    }

    async fn set(&self, session_id: &str, tokens: u64) {
        self.counts.write().insert(session_id.to_owned(), tokens);
        TraceEvent::TokensRecorded {
            session_id: session_id.to_owned(),
            input_tokens: tokens,
        }
        .emit();
    }

    async fn clear(&self, session_id: &str) {
        self.counts.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_overwrites_and_clear_removes() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.get("s1").await, None);

        store.set("s1", 1_200).await;
        store.set("s1", 60_000).await;
        assert_eq!(store.get("s1").await, Some(60_000));
        assert_eq!(store.len(), 1);

        store.clear("s1").await;
        assert_eq!(store.get("s1").await, None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = InMemoryTokenStore::new();
        store.set("a", 1).await;
        store.set("b", 2).await;
        store.clear("a").await;
        assert_eq!(store.get("b").await, Some(2));
    }
}
