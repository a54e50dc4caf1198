use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};

use crate::models::User;
use crate::services::database::Database;

const CURRENT_USER_KEY: &str = "current_user";
const TOKEN_KEY: &str = "auth_token";

#[derive(Debug, Clone, Default)]
struct Cached {
    user: Option<User>,
    token: Option<String>,
}

/// Signed-in user and bearer token.
///
/// Values are read once at startup and served synchronously from memory;
/// writes go to memory first and are then persisted. The two keys are always
/// written and cleared together.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    db: Option<Database>,
    cache: Arc<RwLock<Cached>>,
}

impl CredentialStore {
    /// Load persisted credentials. They only count as a pair: a stored user
    /// record that no longer parses, or a half-written pair, leaves the store
    /// signed out with a warning instead of failing startup.
    pub async fn init(db: Database) -> Result<Self> {
        let token = db
            .get_setting(TOKEN_KEY)
            .await
            .context("Failed to read stored token")?;

        let user = match db
            .get_setting(CURRENT_USER_KEY)
            .await
            .context("Failed to read stored user")?
        {
            Some(json) => match serde_json::from_str::<User>(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("Ignoring malformed stored user record: {}", e);
                    None
                }
            },
            None => None,
        };

        let cached = match (user, token) {
            (Some(user), Some(token)) => Cached {
                user: Some(user),
                token: Some(token),
            },
            (None, None) => Cached::default(),
            _ => {
                tracing::warn!("Stored credentials are incomplete, starting signed out");
                Cached::default()
            }
        };

        Ok(Self {
            db: Some(db),
            cache: Arc::new(RwLock::new(cached)),
        })
    }

    /// A store that lives only in memory.
    pub fn ephemeral() -> Self {
        Self {
            db: None,
            cache: Arc::new(RwLock::new(Cached::default())),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Replace the signed-in user. The in-memory value is updated even when
    /// persisting fails.
    pub async fn set(&self, user: &User, token: &str) -> Result<()> {
        {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            cache.user = Some(user.clone());
            cache.token = Some(token.to_string());
        }

        if let Some(db) = &self.db {
            let json = serde_json::to_string(user)?;
            db.set_settings(&[(CURRENT_USER_KEY, json.as_str()), (TOKEN_KEY, token)])
                .await
                .context("Failed to persist credentials")?;
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            *cache = Cached::default();
        }

        if let Some(db) = &self.db {
            db.delete_settings(&[CURRENT_USER_KEY, TOKEN_KEY])
                .await
                .context("Failed to clear stored credentials")?;
        }
        Ok(())
    }
}
