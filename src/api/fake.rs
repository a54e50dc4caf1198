//! In-process backend double for controller tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use super::traits::ChatBackend;
use super::types::ApiError;
use crate::models::{Message, Session};

#[derive(Default)]
pub struct FakeBackend {
    pub sessions: Mutex<Vec<Session>>,
    pub calls: Mutex<Vec<String>>,
    pub posted: Mutex<Vec<(String, String)>>,
    pub offline: bool,
    pub fail_send: bool,
    pub fail_delete: Mutex<Vec<String>>,
    pub fail_messages: bool,
    pub reply: Option<String>,
    /// When set, `send_message` waits for a notification before answering.
    pub gate: Option<Arc<Notify>>,
    /// When set, renames every session on `list_sessions` (server-side title).
    pub renamed_title: Option<String>,
    pub next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        let backend = Self::default();
        *backend.sessions.lock().unwrap() = sessions;
        backend
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        if self.offline {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

pub fn session(id: &str, title: &str, updated_at: DateTime<Utc>) -> Session {
    Session {
        id: id.to_string(),
        title: title.to_string(),
        messages: Vec::new(),
        created_at: updated_at,
        updated_at,
        user_id: None,
        messages_loaded: false,
        synced: true,
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn create_session(&self, title: &str) -> Result<Session, ApiError> {
        self.record(format!("create {}", title))?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = session(&format!("srv-{}", n), title, Utc::now());
        self.sessions.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.record("list".to_string())?;
        let mut sessions = self.sessions.lock().unwrap().clone();
        for s in &mut sessions {
            s.messages.clear();
            if let Some(title) = &self.renamed_title {
                s.title = title.clone();
            }
        }
        Ok(sessions)
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        self.record(format!("messages {}", session_id))?;
        if self.fail_messages {
            return Err(ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            });
        }
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default())
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<String, ApiError> {
        self.record(format!("send {}", session_id))?;
        self.posted
            .lock()
            .unwrap()
            .push((session_id.to_string(), content.to_string()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_send {
            return Err(ApiError::Status {
                status: 502,
                message: "upstream unavailable".to_string(),
            });
        }
        let reply = self
            .reply
            .clone()
            .unwrap_or_else(|| format!("echo: {}", content));
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(s) = sessions.iter_mut().find(|s| s.id == session_id) {
            s.messages.push(Message::user(content));
            s.messages.push(Message::assistant(reply.clone()));
        }
        Ok(reply)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        self.record(format!("delete {}", session_id))?;
        if self.fail_delete.lock().unwrap().iter().any(|id| id == session_id) {
            return Err(ApiError::Status {
                status: 404,
                message: "Session not found".to_string(),
            });
        }
        self.sessions.lock().unwrap().retain(|s| s.id != session_id);
        Ok(())
    }
}
