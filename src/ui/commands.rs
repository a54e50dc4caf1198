use crate::services::filter::DateFilter;

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    /// Send a starter prompt by number.
    Try(usize),
    NewChat,
    List,
    Filter(DateFilter),
    Search(String),
    Open(String),
    Delete(String),
    ClearAll,
    Export(Option<String>),
    Import(String),
    Html(String),
    Markdown(String),
    Show,
    Logout,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
Type a message to chat, or use a command:
  /new                 start a new chat
  /try <n>             send starter prompt n on an empty chat
  /list                show the session list
  /filter <all|today|week|month>
  /search [text]       search titles and messages (empty clears)
  /open <n|id>         open a session from the list
  /delete [n|id]       delete a session (default: the open one)
  /clear               delete all chat history
  /show                reprint the open session
  /export [file]       export all history as JSON
  /import <file>       import a history JSON file
  /html <file>         save the open session as HTML
  /md <file>           save the open session as markdown
  /logout              sign out
  /quit                exit";

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());

        match (name, arg) {
            ("new", _) => Command::NewChat,
            ("try", Some(arg)) => match arg.parse::<usize>() {
                Ok(n) => Command::Try(n),
                Err(_) => Command::Unknown(line.to_string()),
            },
            ("list" | "ls", _) => Command::List,
            ("filter", Some(arg)) => match DateFilter::from_str(&arg) {
                Some(filter) => Command::Filter(filter),
                None => Command::Unknown(line.to_string()),
            },
            ("search", arg) => Command::Search(arg.unwrap_or_default()),
            ("open", Some(arg)) => Command::Open(arg),
            ("delete" | "rm", arg) => Command::Delete(arg.unwrap_or_default()),
            ("clear", _) => Command::ClearAll,
            ("export", arg) => Command::Export(arg),
            ("import", Some(arg)) => Command::Import(arg),
            ("html", Some(arg)) => Command::Html(arg),
            ("md", Some(arg)) => Command::Markdown(arg),
            ("show", _) => Command::Show,
            ("logout", _) => Command::Logout,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit" | "q", _) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Resolve `/open 2` against the last rendered list, or accept a raw id.
pub fn resolve_session_ref(reference: &str, listed: &[String]) -> String {
    match reference.parse::<usize>() {
        Ok(n) if n >= 1 && n <= listed.len() => listed[n - 1].clone(),
        _ => reference.to_string(),
    }
}
