use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Prefix for sessions that only exist locally because the backend could not
/// create them. Server identifiers never carry it.
pub const OFFLINE_ID_PREFIX: &str = "offline-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Whether `messages` reflects what the backend holds.
    #[serde(skip)]
    pub messages_loaded: bool,
    /// False for local fallback sessions the backend has never seen.
    #[serde(skip, default = "default_synced")]
    pub synced: bool,
}

fn default_synced() -> bool {
    true
}

impl Session {
    pub fn offline(title: &str, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("{}{}", OFFLINE_ID_PREFIX, Uuid::new_v4()),
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            user_id,
            messages_loaded: true,
            synced: false,
        }
    }

    pub fn is_offline(&self) -> bool {
        !self.synced
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn has_pending_reply(&self) -> bool {
        self.messages.iter().any(|m| m.is_loading)
    }
}
