//! Session-scoped clarification state. One pending entry per session,
//! explicit Idle/AwaitingReply lifecycle, TTL-based abandonment. Backed by a
//! plain keyed map so the Arbiter's contract doesn't care what stores it.

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::intent::{PendingClarification, SessionId};

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    AwaitingReply(PendingClarification),
}

pub struct ClarificationLedger {
    ttl: Duration,
    entries: Mutex<HashMap<SessionId, PendingClarification>>,
}

impl ClarificationLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn expired(&self, pending: &PendingClarification) -> bool {
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or_else(|_| ChronoDuration::MAX);
        Utc::now() - pending.asked_at > ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, PendingClarification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes and returns the live entry for a session. Expired entries are
    /// dropped silently: abandonment, not an error.
    pub fn take(&self, session: &SessionId) -> Option<PendingClarification> {
        let pending = self.lock().remove(session)?;
        if self.expired(&pending) {
            return None;
        }
        Some(pending)
    }

    /// Parks a clarification, superseding any previous entry for the session.
    pub fn put(&self, pending: PendingClarification) {
        self.lock()
            .insert(pending.utterance.session.clone(), pending);
    }

    /// Non-consuming view of the open question, if any. Used as advisory
    /// context, never for control flow.
    pub fn peek_question(&self, session: &SessionId) -> Option<String> {
        let entries = self.lock();
        let pending = entries.get(session)?;
        if self.expired(pending) {
            return None;
        }
        Some(pending.question.clone())
    }

    pub fn state(&self, session: &SessionId) -> SessionState {
        let entries = self.lock();
        match entries.get(session) {
            Some(pending) if !self.expired(pending) => {
                SessionState::AwaitingReply(pending.clone())
            }
            _ => SessionState::Idle,
        }
    }
}
