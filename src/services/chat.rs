use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::ChatBackend;
use crate::models::{Message, Session};

pub const NEW_CHAT_TITLE: &str = "New Chat";
pub const OFFLINE_CHAT_TITLE: &str = "New Chat (Offline)";
pub const CLEAR_ALL_PROMPT: &str =
    "Are you sure you want to delete all chat history? This action cannot be undone.";

/// In-memory view of the signed-in user's sessions.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub user_id: Option<String>,
    pub sessions: Vec<Session>,
    pub active_session_id: Option<String>,
    /// An exchange is in flight; new sends are refused until it settles.
    pub busy: bool,
    pub sidebar_open: bool,
}

impl ChatState {
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    /// Insert at the top of the list and make it active, replacing any entry
    /// with the same id.
    fn push_front_and_select(&mut self, session: Session) {
        let id = session.id.clone();
        self.sessions.retain(|s| s.id != id);
        self.sessions.insert(0, session);
        self.active_session_id = Some(id);
        self.sidebar_open = false;
    }
}

/// Whether a new session came from the backend or is a local stand-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Remote(String),
    Offline(String),
}

impl CreateOutcome {
    pub fn session_id(&self) -> &str {
        match self {
            CreateOutcome::Remote(id) | CreateOutcome::Offline(id) => id,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, CreateOutcome::Offline(_))
    }
}

/// Drives the session list and message exchanges against a `ChatBackend`.
///
/// State sits behind a mutex that is never held across an await, so list
/// edits can interleave with an in-flight exchange. Every mutation after a
/// suspend point looks sessions and messages up by id.
#[derive(Clone)]
pub struct ChatController {
    pub(crate) backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<ChatState>>,
}

impl ChatController {
    pub fn new(backend: Arc<dyn ChatBackend>, user_id: Option<String>) -> Self {
        let state = ChatState {
            user_id,
            ..ChatState::default()
        };
        Self {
            backend,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ChatState {
        self.state().clone()
    }

    /// Run a synchronous edit against the current state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        f(&mut self.state())
    }

    pub fn user_id(&self) -> Option<String> {
        self.state().user_id.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    pub fn toggle_sidebar(&self) {
        let mut state = self.state();
        state.sidebar_open = !state.sidebar_open;
    }

    /// Forget everything loaded for the previous user and load the new
    /// user's sessions.
    pub async fn switch_user(&self, user_id: Option<String>) {
        {
            let mut state = self.state();
            *state = ChatState {
                user_id,
                ..ChatState::default()
            };
        }
        self.load().await;
    }

    /// Fetch the session list, open the newest session, or start a new one
    /// when there is none. A failed fetch leaves the list empty.
    pub async fn load(&self) {
        let sessions = match self.backend.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!("Error loading sessions: {}", e);
                return;
            }
        };

        let first = sessions.first().map(|s| s.id.clone());
        {
            let mut state = self.state();
            state.sessions = sessions;
            state.active_session_id = first.clone();
        }

        match first {
            Some(id) => self.load_messages(&id).await,
            None => {
                self.create_session().await;
            }
        }
    }

    /// Re-read the session list without changing the selection. Returns
    /// false when the backend could not be reached.
    pub async fn reload_sessions(&self) -> bool {
        match self.backend.list_sessions().await {
            Ok(sessions) => {
                let mut state = self.state();
                let active_still_listed = state
                    .active_session_id
                    .as_deref()
                    .is_some_and(|id| sessions.iter().any(|s| s.id == id));
                if !active_still_listed {
                    state.active_session_id = sessions.first().map(|s| s.id.clone());
                }
                state.sessions = sessions;
                true
            }
            Err(e) => {
                tracing::error!("Error reloading sessions: {}", e);
                false
            }
        }
    }

    /// Start a new chat. When the backend refuses, a local session is
    /// created instead so there is always something to type into.
    pub async fn create_session(&self) -> CreateOutcome {
        match self.backend.create_session(NEW_CHAT_TITLE).await {
            Ok(mut session) => {
                session.messages_loaded = true;
                session.synced = true;
                let id = session.id.clone();
                self.state().push_front_and_select(session);
                CreateOutcome::Remote(id)
            }
            Err(e) => {
                tracing::error!("Error creating session: {}", e);
                let mut state = self.state();
                let session = Session::offline(OFFLINE_CHAT_TITLE, state.user_id.clone());
                let id = session.id.clone();
                state.push_front_and_select(session);
                CreateOutcome::Offline(id)
            }
        }
    }

    /// Make `session_id` active and fetch its messages the first time.
    /// Unknown ids are ignored.
    pub async fn select_session(&self, session_id: &str) {
        let needs_messages = {
            let mut state = self.state();
            let needs_messages = match state.session(session_id) {
                Some(session) => !session.messages_loaded && session.synced,
                None => return,
            };
            state.active_session_id = Some(session_id.to_string());
            state.sidebar_open = false;
            needs_messages
        };

        if needs_messages {
            self.load_messages(session_id).await;
        }
    }

    pub(crate) async fn load_messages(&self, session_id: &str) {
        match self.backend.list_messages(session_id).await {
            Ok(fetched) => {
                let mut state = self.state();
                if let Some(session) = state.session_mut(session_id) {
                    session.messages = merge_messages(std::mem::take(&mut session.messages), fetched);
                    session.messages_loaded = true;
                }
            }
            Err(e) => {
                tracing::error!(session_id, "Error loading session messages: {}", e);
            }
        }
    }

    /// Delete a session remotely, then locally. When it was the active one,
    /// the next session is opened, or a new one is created if none remain.
    /// On failure nothing changes locally and false is returned.
    pub async fn delete_session(&self, session_id: &str) -> bool {
        let synced = match self.state().session(session_id) {
            Some(session) => session.synced,
            None => return false,
        };

        if synced {
            if let Err(e) = self.backend.delete_session(session_id).await {
                tracing::error!(session_id, "Error deleting session: {}", e);
                return false;
            }
        }

        let next = {
            let mut state = self.state();
            state.sessions.retain(|s| s.id != session_id);
            if state.active_session_id.as_deref() != Some(session_id) {
                return true;
            }
            state.active_session_id = None;
            state.sessions.first().map(|s| s.id.clone())
        };

        match next {
            Some(id) => self.select_session(&id).await,
            None => {
                self.create_session().await;
            }
        }
        true
    }

    /// Delete every known session one at a time, then start a fresh chat.
    /// `confirm` receives the prompt to show and must return true to go on.
    pub async fn clear_all<F>(&self, confirm: F) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        if !confirm(CLEAR_ALL_PROMPT) {
            return false;
        }

        let targets: Vec<String> = self
            .state()
            .sessions
            .iter()
            .filter(|s| s.synced)
            .map(|s| s.id.clone())
            .collect();

        for id in &targets {
            if let Err(e) = self.backend.delete_session(id).await {
                tracing::error!(session_id = %id, "Error clearing session: {}", e);
            }
        }

        {
            let mut state = self.state();
            state.sessions.clear();
            state.active_session_id = None;
        }
        self.create_session().await;
        true
    }
}

/// Fetched messages first, then anything held locally that the backend does
/// not know about yet (for example an exchange started while loading).
fn merge_messages(local: Vec<Message>, fetched: Vec<Message>) -> Vec<Message> {
    let mut merged = fetched;
    for message in local {
        if !merged.iter().any(|m| m.id == message.id) {
            merged.push(message);
        }
    }
    merged
}
