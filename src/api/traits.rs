use async_trait::async_trait;

use super::types::{ApiError, AuthResponse};
use crate::models::{Message, Session};

/// Session and message operations of the chat backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn create_session(&self, title: &str) -> Result<Session, ApiError>;

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError>;

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError>;

    /// Post a user message and return the assistant's completion text.
    async fn send_message(&self, session_id: &str, content: &str) -> Result<String, ApiError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError>;

    async fn register(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError>;
}
