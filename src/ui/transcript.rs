use std::fmt::Write;

use crate::models::{Message, Role, Session};
use crate::services::markdown::format_markdown;

/// Starter prompts offered on an empty chat.
pub const SUGGESTION_PROMPTS: [&str; 6] = [
    "Explain quantum computing in simple terms",
    "Write a creative story about space travel",
    "Help me plan a weekend trip",
    "Suggest a healthy meal recipe",
    "What are the latest trends in AI?",
    "How can I improve my productivity?",
];

/// Starter prompt by its 1-based number.
pub fn suggestion(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|i| SUGGESTION_PROMPTS.get(i))
        .copied()
}

/// One message as shown in the terminal.
pub fn render_message(message: &Message) -> String {
    match (message.role, message.is_loading) {
        (_, true) => "assistant> ...".to_string(),
        (Role::User, false) => format!("you> {}", message.content),
        (Role::Assistant, false) => format!("assistant> {}", message.content),
    }
}

pub fn render_session(session: &Session) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", session.title);
    if session.is_offline() {
        let _ = writeln!(out, "(offline session, not saved on the server)");
    }
    if session.messages.is_empty() {
        let _ = writeln!(out, "Start a conversation. Ask me anything!");
        for (i, prompt) in SUGGESTION_PROMPTS.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, prompt);
        }
        let _ = writeln!(out, "Type /try <n> to send one.");
    }
    for message in &session.messages {
        let _ = writeln!(out, "{}", render_message(message));
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Standalone HTML page for a session. Assistant replies go through the
/// markdown formatter; user text is escaped and shown as typed.
pub fn session_to_html(session: &Session) -> String {
    let mut body = String::new();
    for message in session.messages.iter().filter(|m| !m.is_loading) {
        let (class, content) = match message.role {
            Role::User => ("user", escape_html(&message.content).replace('\n', "<br>")),
            Role::Assistant => ("assistant", format_markdown(&message.content)),
        };
        let _ = writeln!(
            body,
            "<div class=\"message {}\"><div class=\"content\">{}</div><time>{}</time></div>",
            class,
            content,
            message.timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(&session.title),
        body = body
    )
}
