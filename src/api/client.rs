use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::traits::{AuthBackend, ChatBackend};
use super::types::*;
use crate::config::DEFAULT_API_URL;
use crate::models::{Message, Role, Session};
use crate::services::credentials::CredentialStore;

/// HTTP client for the chat backend.
///
/// Every request carries `Authorization: Bearer <token>` when the credential
/// store holds a token; guests send no auth header at all.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl ApiClient {
    pub fn new(base_url: Option<&str>, credentials: CredentialStore) -> Self {
        let base_url = base_url
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();
        Self {
            client: Client::new(),
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.credentials.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Extract a readable message from an error body, falling back to a
    /// generic one when the body carries none.
    fn parse_error_message(body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
            if let Some(msg) = parsed["message"].as_str() {
                return msg.to_string();
            }
        }
        "Request failed".to_string()
    }

    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::check_status(response).await
    }

    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.execute(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    ApiError::Status {
        status: status.as_u16(),
        message: ApiClient::parse_error_message(body),
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/login")
            .json(&CredentialsRequest { username, password });
        self.execute_json(builder).await
    }

    async fn register(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/register")
            .json(&CredentialsRequest { username, password });
        self.execute_json(builder).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn create_session(&self, title: &str) -> Result<Session, ApiError> {
        let builder = self
            .request(Method::POST, "/chat/sessions")
            .json(&CreateSessionRequest { title });
        let response: CreateSessionResponse = self.execute_json(builder).await?;
        if response.session.id.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Session response has no id".to_string(),
            ));
        }
        Ok(response.session)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.execute_json(self.request(Method::GET, "/chat/sessions"))
            .await
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        let path = format!("/chat/sessions/{}/messages", session_id);
        self.execute_json(self.request(Method::GET, &path)).await
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<String, ApiError> {
        let path = format!("/chat/sessions/{}/messages", session_id);
        let builder = self
            .request(Method::POST, &path)
            .json(&PostMessageRequest { content });

        // The backend answers with the stored exchange; the completion is the
        // first assistant entry.
        let messages: Vec<Message> = self.execute_json(builder).await?;
        messages
            .into_iter()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content)
            .ok_or_else(|| {
                ApiError::InvalidResponse("No assistant message in response".to_string())
            })
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let path = format!("/chat/sessions/{}", session_id);
        self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}
