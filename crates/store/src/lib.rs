use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Per-conversation session state. Deliberately tiny: the pipeline recomputes
/// every derived fact from the message history on each call, so the only
/// thing worth remembering across calls is whether the report was already
/// submitted for this conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageSession {
    pub conversation_id: String,
    pub report_submitted: bool,
    pub expires_at: DateTime<Utc>,
}

impl TriageSession {
    pub fn fresh(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            report_submitted: false,
            expires_at: Utc::now() + Duration::hours(24),
        }
    }
}

/// The latch only gates the style of reply, not correctness, so there are no
/// ordering requirements among concurrent callers.
pub trait SessionStore: Send + Sync {
    fn load(&self, conversation_id: &str) -> Option<TriageSession>;
    fn upsert(&self, session: TriageSession);
    fn purge_expired(&self, now: DateTime<Utc>) -> u64;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, TriageSession>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, conversation_id: &str) -> Option<TriageSession> {
        self.sessions.read().get(conversation_id).cloned()
    }

    fn upsert(&self, session: TriageSession) {
        self.sessions
            .write()
            .insert(session.conversation_id.clone(), session);
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> u64 {
        let mut removed = 0_u64;
        self.sessions.write().retain(|_, session| {
            let keep = session.expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_round_trips() {
        let store = MemoryStore::new();
        assert!(store.load("c1").is_none());

        let mut session = TriageSession::fresh("c1");
        session.report_submitted = true;
        store.upsert(session);

        assert!(store.load("c1").unwrap().report_submitted);
    }

    #[test]
    fn purge_drops_only_expired_sessions() {
        let store = MemoryStore::new();
        let mut expired = TriageSession::fresh("old");
        expired.expires_at = Utc::now() - Duration::hours(1);
        store.upsert(expired);
        store.upsert(TriageSession::fresh("live"));

        let removed = store.purge_expired(Utc::now());
        assert_eq!(removed, 1);
        assert!(store.load("old").is_none());
        assert!(store.load("live").is_some());
    }
}
