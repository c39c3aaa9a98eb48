//! Bounded per-session conversation history.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// One session's recent exchanges.
#[derive(Debug)]
pub struct Session {
    exchanges: VecDeque<(String, String)>,
    max_history: usize,
}

impl Session {
    fn new(max_history: usize) -> Self {
        Self {
            exchanges: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    /// Record a completed exchange, evicting the oldest past the cap.
    pub fn add_exchange(&mut self, user: &str, assistant: &str) {
        if self.max_history == 0 {
            return;
        }

        self.exchanges
            .push_back((user.to_string(), assistant.to_string()));
        while self.exchanges.len() > self.max_history {
            self.exchanges.pop_front();
        }
    }

    /// Recent exchanges as `User:`/`Assistant:` lines, oldest first.
    pub fn formatted_history(&self) -> Option<String> {
        if self.exchanges.is_empty() {
            return None;
        }

        Some(
            self.exchanges
                .iter()
                .map(|(user, assistant)| format!("User: {}\nAssistant: {}", user, assistant))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

/// Conversation store keyed by session id.
///
/// Each session sits behind its own async mutex so a caller can hold it for a
/// whole question/answer round while other sessions proceed.
///
/// Sessions live for the whole process unless `max_sessions` is set, in which
/// case the oldest created session is dropped to make room for a new one.
pub struct ConversationStore {
    sessions: RwLock<SessionMap>,
    max_history: usize,
    max_sessions: usize,
}

#[derive(Default)]
struct SessionMap {
    by_id: HashMap<String, Arc<Mutex<Session>>>,
    created: VecDeque<String>,
}

impl SessionMap {
    fn insert(&mut self, id: &str, session: Arc<Mutex<Session>>, max_sessions: usize) {
        if max_sessions > 0 {
            while self.by_id.len() >= max_sessions {
                match self.created.pop_front() {
                    Some(oldest) => {
                        debug!("Evicting session {}", oldest);
                        self.by_id.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
        self.created.push_back(id.to_string());
        self.by_id.insert(id.to_string(), session);
    }
}

impl ConversationStore {
    /// Create a store keeping at most `max_history` exchanges per session.
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(SessionMap::default()),
            max_history,
            max_sessions: 0,
        }
    }

    /// Cap the number of live sessions. Zero means unbounded.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Start a new, empty session and return its id.
    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(Session::new(self.max_history)));
        self.sessions
            .write()
            .await
            .insert(&id, session, self.max_sessions);
        debug!("Created session {}", id);
        id
    }

    /// Handle to a session, created if unknown.
    pub async fn session(&self, id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().await.by_id.get(id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.by_id.get(id) {
            return session.clone();
        }

        debug!("Created session {}", id);
        let session = Arc::new(Mutex::new(Session::new(self.max_history)));
        sessions.insert(id, session.clone(), self.max_sessions);
        session
    }

    /// Record an exchange. Unknown ids get a fresh session.
    pub async fn append(&self, id: &str, user: &str, assistant: &str) {
        self.session(id).await.lock().await.add_exchange(user, assistant);
    }

    /// Formatted history of a session, `None` if unknown or empty.
    pub async fn formatted_history(&self, id: &str) -> Option<String> {
        let session = self.sessions.read().await.by_id.get(id).cloned()?;
        let guard = session.lock().await;
        guard.formatted_history()
    }

    /// Number of known sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.by_id.is_empty()
    }
}
