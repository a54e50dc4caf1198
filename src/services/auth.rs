use std::sync::Arc;

use crate::api::{ApiError, AuthBackend, AuthResponse};
use crate::models::User;
use crate::services::credentials::CredentialStore;

pub const LOGIN_FAILED_TEXT: &str = "Invalid username or password";
pub const REGISTER_FAILED_TEXT: &str = "Username already exists or invalid input";

pub struct AuthService {
    backend: Arc<dyn AuthBackend>,
    credentials: CredentialStore,
}

impl AuthService {
    pub fn new(backend: Arc<dyn AuthBackend>, credentials: CredentialStore) -> Self {
        Self {
            backend,
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn current_user(&self) -> Option<User> {
        self.credentials.current_user()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let response = self
            .backend
            .login(username, password)
            .await
            .inspect_err(|e| tracing::error!("Login error: {}", e))?;
        Ok(self.store(response).await)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let response = self
            .backend
            .register(username, password)
            .await
            .inspect_err(|e| tracing::error!("Registration error: {}", e))?;
        Ok(self.store(response).await)
    }

    pub async fn logout(&self) {
        if let Err(e) = self.credentials.clear().await {
            tracing::error!("Failed to clear credentials: {:#}", e);
        }
    }

    async fn store(&self, response: AuthResponse) -> User {
        // A failed write still leaves this process signed in.
        if let Err(e) = self.credentials.set(&response.user, &response.token).await {
            tracing::warn!("Signed in but could not persist credentials: {:#}", e);
        }
        response.user
    }
}

/// Header greeting for the chat screen.
pub fn greeting(user: Option<&User>) -> String {
    match user {
        Some(user) => format!("Welcome, {}", user.username),
        None => "Guest Mode".to_string(),
    }
}
