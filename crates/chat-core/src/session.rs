use crate::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One completed exchange: the user's utterance and the answer it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub utterance: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(utterance: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            answer: answer.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered turns of one conversation. Turns can be appended, never edited or
/// removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionHistory {
    turns: Vec<Turn>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Renders the history as alternating user/assistant messages.
    ///
    /// With `window` set only the trailing `window` turns are rendered; the
    /// stored history is left untouched.
    pub fn to_messages(&self, window: Option<usize>) -> Vec<Message> {
        let skip = window
            .map(|w| self.turns.len().saturating_sub(w))
            .unwrap_or(0);

        self.turns
            .iter()
            .skip(skip)
            .flat_map(|turn| {
                [
                    Message::user(turn.utterance.clone()),
                    Message::assistant(turn.answer.clone()),
                ]
            })
            .collect()
    }
}

/// Shared handle to one session's history. Locking it is the per-session
/// exclusion that makes appends atomic.
pub type SessionHandle = Arc<Mutex<SessionHistory>>;

/// Registry of session histories keyed by caller-supplied session id.
///
/// Lookups of unknown ids register an empty history. Nothing is ever evicted;
/// the store lives exactly as long as its owner.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        let mut sessions = lock(&self.sessions);
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionHistory::new())))
            .clone()
    }

    /// Appends under the session's own lock and returns the new length.
    pub fn append(&self, session_id: &str, turn: Turn) -> usize {
        let handle = self.get_or_create(session_id);
        let mut history = lock(&handle);
        history.push(turn);
        history.len()
    }

    /// Point-in-time copy of a session's history.
    pub fn snapshot(&self, session_id: &str) -> SessionHistory {
        let handle = self.get_or_create(session_id);
        let history = lock(&handle);
        history.clone()
    }

    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.snapshot(session_id).turns
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }
}

// A panic while holding a session lock cannot leave a half-written turn
// behind (push is the only mutation), so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
