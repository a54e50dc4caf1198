use std::fmt::Write;

use chrono::{DateTime, TimeZone};

use crate::services::chat::ChatState;
use crate::services::filter::{
    filter_counts, filter_sessions, group_sessions, message_preview, session_stats, DateFilter,
};

/// Sidebar search state.
#[derive(Debug, Clone, Default)]
pub struct SidebarView {
    pub filter: DateFilter,
    pub query: String,
}

impl SidebarView {
    /// Render the session list the way the sidebar shows it: filter chips,
    /// date groups with numbered rows, then totals. Row numbers index into
    /// the returned id list so `/open 3` can resolve them.
    pub fn render<Tz: TimeZone>(&self, state: &ChatState, now: &DateTime<Tz>) -> (String, Vec<String>)
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut out = String::new();
        let mut ids = Vec::new();

        let chips: Vec<String> = filter_counts(&state.sessions, &self.query, now)
            .into_iter()
            .map(|(filter, count)| {
                let marker = if filter == self.filter { "*" } else { " " };
                format!("{}{} ({})", marker, filter.label(), count)
            })
            .collect();
        let _ = writeln!(out, "{}", chips.join("  "));

        let filtered = filter_sessions(&state.sessions, self.filter, &self.query, now);
        if filtered.is_empty() {
            if self.query.trim().is_empty() {
                let _ = writeln!(out, "  No chat history yet");
            } else {
                let _ = writeln!(out, "  No chats found");
            }
        }

        for group in group_sessions(&filtered, now) {
            let _ = writeln!(out, "\n{} ({})", group.label, group.sessions.len());
            for session in group.sessions {
                ids.push(session.id.clone());
                let active = state.active_session_id.as_deref() == Some(session.id.as_str());
                let _ = writeln!(
                    out,
                    "{} {:>2}. {}  [{} messages, {}]",
                    if active { ">" } else { " " },
                    ids.len(),
                    session.title,
                    session.messages.len(),
                    session
                        .updated_at
                        .with_timezone(&now.timezone())
                        .format("%H:%M"),
                );
                if let Some(preview) = message_preview(session) {
                    let _ = writeln!(out, "       {}", preview);
                }
            }
        }

        let stats = session_stats(&state.sessions);
        let _ = writeln!(
            out,
            "\n{} total conversations, {} messages exchanged",
            stats.sessions, stats.messages
        );
        (out, ids)
    }
}
