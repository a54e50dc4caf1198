use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiError, ChatBackend};
use crate::models::{Role, Session};
use crate::services::chat::ChatController;

pub const GUEST_USER_ID: &str = "guest";

/// Document written by "export history".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExport {
    pub export_date: DateTime<Utc>,
    pub user_id: String,
    pub sessions: Vec<Session>,
}

/// The part of a history document that import relies on. Other fields are
/// ignored.
#[derive(Debug, Deserialize)]
struct HistoryImport {
    sessions: Vec<Session>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Malformed history document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Import failed: {0}")]
    Api(#[from] ApiError),
}

/// Fetch every session with its messages.
pub async fn collect_history(
    backend: &dyn ChatBackend,
    user_id: Option<&str>,
) -> Result<HistoryExport, ApiError> {
    let mut sessions = backend.list_sessions().await?;
    for session in &mut sessions {
        session.messages = backend.list_messages(&session.id).await?;
        session.messages_loaded = true;
    }

    Ok(HistoryExport {
        export_date: Utc::now(),
        user_id: user_id.unwrap_or(GUEST_USER_ID).to_string(),
        sessions,
    })
}

pub fn render_history(export: &HistoryExport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(export)
}

/// Validate a history document in full. Nothing is applied here, so a bad
/// document can never be half imported.
pub fn parse_history(json: &str) -> Result<Vec<Session>, ImportError> {
    let document: HistoryImport = serde_json::from_str(json)?;
    Ok(document.sessions)
}

/// Recreate sessions on the backend. Each session is created under its
/// title and its user messages are posted in order; the backend answers each
/// one again, so assistant turns are regenerated rather than copied.
pub async fn replay_history(
    backend: &dyn ChatBackend,
    sessions: &[Session],
) -> Result<usize, ApiError> {
    for session in sessions {
        let created = backend.create_session(&session.title).await?;
        for message in session.messages.iter().filter(|m| m.role == Role::User) {
            backend.send_message(&created.id, &message.content).await?;
        }
    }
    Ok(sessions.len())
}

pub fn export_file_name(date: DateTime<Local>) -> String {
    format!("gemini-chat-history-{}.json", date.format("%Y-%m-%d"))
}

pub fn export_to_markdown(session: &Session) -> String {
    let mut output = format!("# {}\n\n", session.title);
    output.push_str(&format!(
        "> Created: {} | Updated: {}\n\n",
        session.created_at.format("%Y-%m-%d %H:%M"),
        session.updated_at.format("%Y-%m-%d %H:%M")
    ));

    output.push_str("---\n\n");

    for msg in session.messages.iter().filter(|m| !m.is_loading) {
        let role_label = match msg.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        output.push_str(&format!("### {}\n\n{}\n\n", role_label, msg.content));
    }

    output
}

impl ChatController {
    pub async fn export_history(&self) -> Result<String, ApiError> {
        let user_id = self.user_id();
        let export = collect_history(self.backend.as_ref(), user_id.as_deref()).await?;
        render_history(&export).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Import a history document and reload the list. Returns false, with
    /// the list untouched, when the document is malformed; remote failures
    /// part way through are logged and also return false.
    pub async fn import_history(&self, json: &str) -> bool {
        let sessions = match parse_history(json) {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!("Error importing chat history: {}", e);
                return false;
            }
        };

        if let Err(e) = replay_history(self.backend.as_ref(), &sessions).await {
            tracing::error!("Error importing chat history: {}", ImportError::from(e));
            return false;
        }

        tracing::info!("Imported {} sessions", sessions.len());
        self.reload_sessions().await
    }
}
