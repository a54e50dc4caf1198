use chrono::Utc;

use crate::models::Message;
use crate::services::chat::ChatController;

pub const EXCHANGE_ERROR_TEXT: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing is selected; state was not touched.
    NoActiveSession,
    /// Another exchange is still in flight; state was not touched.
    Busy,
    Completed,
    /// The placeholder was replaced with the error message.
    Failed,
}

impl ChatController {
    /// Send `content` to the active session.
    ///
    /// The user message and a loading placeholder are appended together
    /// before the request goes out. When the backend answers, the placeholder
    /// is looked up by id and swapped for the reply (or the error text), so
    /// edits made to the session in the meantime are left alone.
    pub async fn send_message(&self, content: &str) -> SendOutcome {
        let (session_id, placeholder_id) = {
            let mut state = self.state();
            let Some(session_id) = state.active_session_id.clone() else {
                return SendOutcome::NoActiveSession;
            };
            if state.busy {
                return SendOutcome::Busy;
            }
            let Some(session) = state.session_mut(&session_id) else {
                return SendOutcome::NoActiveSession;
            };

            let placeholder = Message::placeholder();
            let placeholder_id = placeholder.id.clone();
            session.messages.push(Message::user(content));
            session.messages.push(placeholder);
            session.updated_at = Utc::now();

            state.busy = true;
            (session_id, placeholder_id)
        };

        let outcome = match self.backend.send_message(&session_id, content).await {
            Ok(reply) => {
                self.resolve_placeholder(&session_id, &placeholder_id, Message::assistant(reply));
                self.refresh_after_exchange(&session_id).await;
                SendOutcome::Completed
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, "Error sending message: {}", e);
                self.resolve_placeholder(
                    &session_id,
                    &placeholder_id,
                    Message::assistant(EXCHANGE_ERROR_TEXT),
                );
                SendOutcome::Failed
            }
        };

        self.state().busy = false;
        outcome
    }

    fn resolve_placeholder(&self, session_id: &str, placeholder_id: &str, reply: Message) {
        let mut state = self.state();
        let Some(session) = state.session_mut(session_id) else {
            tracing::debug!(session_id, "Session gone before its reply arrived");
            return;
        };
        match session.messages.iter_mut().find(|m| m.id == placeholder_id) {
            Some(slot) => *slot = reply,
            None => tracing::debug!(session_id, "Placeholder gone before its reply arrived"),
        }
        session.updated_at = Utc::now();
    }

    /// Pick up server-side changes such as a title generated from the first
    /// message. The session that sent and the session active now keep the
    /// messages held locally; everything else comes from the refreshed list.
    /// An active session the server no longer lists gives way to the first
    /// listed one.
    async fn refresh_after_exchange(&self, session_id: &str) {
        let refreshed = match self.backend.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!("Error refreshing session list: {}", e);
                return;
            }
        };

        let needs_messages = {
            let mut state = self.state();
            let active_id = state.active_session_id.clone();

            let mut keep = vec![session_id.to_string()];
            if let Some(active) = active_id.as_ref().filter(|id| *id != session_id) {
                keep.push(active.clone());
            }
            let mut kept: Vec<(String, Vec<Message>, bool)> = keep
                .into_iter()
                .filter_map(|id| {
                    let session = state.session_mut(&id)?;
                    let messages = std::mem::take(&mut session.messages);
                    let loaded = session.messages_loaded;
                    Some((id, messages, loaded))
                })
                .collect();

            state.sessions = refreshed
                .into_iter()
                .map(|mut session| {
                    if let Some(pos) = kept.iter().position(|(id, ..)| *id == session.id) {
                        let (_, messages, loaded) = kept.swap_remove(pos);
                        session.messages = messages;
                        session.messages_loaded = loaded;
                    }
                    session
                })
                .collect();

            let active_listed = active_id
                .as_deref()
                .is_some_and(|id| state.session(id).is_some());
            if active_listed {
                None
            } else {
                let first = state.sessions.first().map(|s| s.id.clone());
                tracing::debug!(
                    previous = ?active_id,
                    "Active session not listed after refresh, selecting {:?}",
                    first
                );
                state.active_session_id = first;
                state
                    .active_session()
                    .filter(|s| !s.messages_loaded && s.synced)
                    .map(|s| s.id.clone())
            }
        };

        if let Some(id) = needs_messages {
            self.load_messages(&id).await;
        }
    }
}
