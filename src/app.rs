use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::config::{AppConfig, APP_NAME};
use crate::models::{Message, Session};
use crate::services::auth::{greeting, LOGIN_FAILED_TEXT, REGISTER_FAILED_TEXT};
use crate::services::export::{export_file_name, export_to_markdown};
use crate::services::filter::DateFilter;
use crate::services::{AuthService, ChatController, CredentialStore, Database, SendOutcome};
use crate::ui::commands::{resolve_session_ref, Command, HELP_TEXT};
use crate::ui::sidebar::SidebarView;
use crate::ui::transcript::{render_message, render_session, session_to_html, suggestion};

/// Wired-up services shared by the interactive loop and one-shot commands.
pub struct App {
    auth: AuthService,
    chat: ChatController,
}

enum Screen {
    Welcome,
    Chat,
    Exit,
}

impl App {
    pub async fn init(config: &AppConfig) -> Result<Self> {
        let db_path = config.database_path()?;
        let db = Database::open(&db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        let credentials = CredentialStore::init(db).await?;

        let client = Arc::new(ApiClient::new(Some(config.api.base_url.as_str()), credentials.clone()));
        tracing::debug!(base_url = client.base_url(), "Using chat backend");

        let user_id = credentials.current_user().map(|u| u.id);
        Ok(Self {
            auth: AuthService::new(client.clone(), credentials),
            chat: ChatController::new(client, user_id),
        })
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Interactive session: welcome screen until signed in (or guest), then
    /// the chat prompt until quit.
    pub async fn run(self) -> Result<()> {
        let mut term = Terminal::new();
        let mut screen = if self.auth.credentials().is_authenticated() {
            Screen::Chat
        } else {
            Screen::Welcome
        };

        loop {
            screen = match screen {
                Screen::Welcome => self.welcome(&mut term).await?,
                Screen::Chat => self.chat_loop(&mut term).await?,
                Screen::Exit => return Ok(()),
            };
        }
    }

    async fn welcome(&self, term: &mut Terminal) -> Result<Screen> {
        println!("{}", APP_NAME);
        println!("Chat with an AI assistant. Sign in to keep your history.");
        println!("  1) Log in   2) Register   3) Continue as guest   q) Quit");

        loop {
            let Some(choice) = term.ask("> ").await? else {
                return Ok(Screen::Exit);
            };
            match choice.trim() {
                "1" | "login" => {
                    if self.credentials_form(term, false).await? {
                        return Ok(Screen::Chat);
                    }
                }
                "2" | "register" => {
                    if self.credentials_form(term, true).await? {
                        return Ok(Screen::Chat);
                    }
                }
                "3" | "guest" => return Ok(Screen::Chat),
                "q" | "quit" => return Ok(Screen::Exit),
                _ => println!("Choose 1, 2, 3 or q."),
            }
        }
    }

    /// Returns true once signed in.
    async fn credentials_form(&self, term: &mut Terminal, register: bool) -> Result<bool> {
        let Some(username) = term.ask("Username: ").await? else {
            return Ok(false);
        };
        let Some(password) = term.ask("Password: ").await? else {
            return Ok(false);
        };
        let (username, password) = (username.trim(), password.trim());
        if username.is_empty() || password.is_empty() {
            println!("Username and password are required.");
            return Ok(false);
        }

        let result = if register {
            self.auth.register(username, password).await
        } else {
            self.auth.login(username, password).await
        };
        match result {
            Ok(_) => Ok(true),
            Err(_) if register => {
                println!("{}", REGISTER_FAILED_TEXT);
                Ok(false)
            }
            Err(_) => {
                println!("{}", LOGIN_FAILED_TEXT);
                Ok(false)
            }
        }
    }

    async fn chat_loop(&self, term: &mut Terminal) -> Result<Screen> {
        let user = self.auth.current_user();
        self.chat.switch_user(user.as_ref().map(|u| u.id.clone())).await;

        println!("{}  ({})  /help for commands", APP_NAME, greeting(user.as_ref()));
        self.print_active();

        let mut sidebar = SidebarView::default();
        let mut listed: Vec<String> = Vec::new();

        loop {
            let Some(line) = term.ask("you> ").await? else {
                return Ok(Screen::Exit);
            };

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Send(content) => self.send(content).await,
                Command::Try(number) => {
                    let empty = self
                        .chat
                        .snapshot()
                        .active_session()
                        .is_some_and(|s| s.messages.is_empty());
                    match suggestion(number) {
                        Some(prompt) if empty => {
                            println!("you> {}", prompt);
                            self.send(prompt.to_string()).await;
                        }
                        Some(_) => println!("Starter prompts are offered on an empty chat."),
                        None => println!("No starter prompt {}.", number),
                    }
                }
                Command::NewChat => {
                    let outcome = self.chat.create_session().await;
                    if outcome.is_offline() {
                        println!("Could not reach the server; this chat is local only.");
                    }
                    self.print_active();
                }
                Command::List => {
                    if !self.chat.snapshot().sidebar_open {
                        self.chat.toggle_sidebar();
                    }
                    listed = self.print_sidebar(&sidebar);
                }
                Command::Filter(filter) => {
                    sidebar.filter = filter;
                    listed = self.print_sidebar(&sidebar);
                }
                Command::Search(query) => {
                    sidebar.query = query;
                    listed = self.print_sidebar(&sidebar);
                }
                Command::Open(reference) => {
                    let id = resolve_session_ref(&reference, &listed);
                    if self.chat.snapshot().session(&id).is_none() {
                        println!("No such chat: {}", reference);
                        continue;
                    }
                    self.chat.select_session(&id).await;
                    self.print_active();
                }
                Command::Delete(reference) => {
                    let id = if reference.is_empty() {
                        match self.chat.snapshot().active_session_id {
                            Some(id) => id,
                            None => continue,
                        }
                    } else {
                        resolve_session_ref(&reference, &listed)
                    };
                    if self.chat.delete_session(&id).await {
                        println!("Chat deleted.");
                        self.print_active();
                    } else {
                        println!("Could not delete that chat.");
                    }
                }
                Command::ClearAll => {
                    let answer = {
                        let prompt = format!("{} [y/N] ", crate::services::chat::CLEAR_ALL_PROMPT);
                        term.ask(&prompt).await?
                    };
                    let confirmed = answer.is_some_and(|a| is_yes(&a));
                    if self.chat.clear_all(|_| confirmed).await {
                        println!("Chat history cleared.");
                        self.print_active();
                    }
                }
                Command::Show => self.print_active(),
                Command::Export(path) => {
                    let path = path
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(export_file_name(Local::now())));
                    match self.export_history(&path).await {
                        Ok(()) => println!("Exported chat history to {}", path.display()),
                        Err(e) => println!("Export failed: {:#}", e),
                    }
                }
                Command::Import(path) => match self.import_history(Path::new(&path)).await {
                    Ok(()) => {
                        println!("Chat history imported.");
                        self.print_active();
                    }
                    Err(e) => println!("{:#}", e),
                },
                Command::Html(path) => {
                    self.save_active(Path::new(&path), session_to_html).await
                }
                Command::Markdown(path) => {
                    self.save_active(Path::new(&path), export_to_markdown).await
                }
                Command::Logout => {
                    self.auth.logout().await;
                    self.chat.switch_user(None).await;
                    println!("Signed out.");
                    return Ok(Screen::Welcome);
                }
                Command::Help => println!("{}", HELP_TEXT),
                Command::Quit => return Ok(Screen::Exit),
                Command::Unknown(line) => println!("Unknown command: {} (try /help)", line),
            }
        }
    }

    async fn send(&self, content: String) {
        let pending = tokio::spawn({
            let chat = self.chat.clone();
            async move { chat.send_message(&content).await }
        });

        if let Some(placeholder) = pending_placeholder(&self.chat, &pending).await {
            println!("{}", render_message(&placeholder));
        }

        match pending.await {
            Ok(SendOutcome::NoActiveSession) => println!("Start a new chat with /new first."),
            Ok(SendOutcome::Busy) => println!("Still waiting for the previous reply."),
            Ok(SendOutcome::Completed | SendOutcome::Failed) => {
                let state = self.chat.snapshot();
                if let Some(last) = state.active_session().and_then(Session::last_message) {
                    println!("{}", render_message(last));
                }
            }
            Err(e) => tracing::error!("Exchange task failed: {}", e),
        }
    }

    fn print_active(&self) {
        match self.chat.snapshot().active_session() {
            Some(session) => print!("{}", render_session(session)),
            None => println!("No chat selected. Use /new to start one."),
        }
    }

    fn print_sidebar(&self, sidebar: &SidebarView) -> Vec<String> {
        let (text, ids) = sidebar.render(&self.chat.snapshot(), &Local::now());
        print!("{}", text);
        ids
    }

    async fn save_active(&self, path: &Path, render: fn(&Session) -> String) {
        let Some(session) = self.chat.snapshot().active_session().cloned() else {
            println!("No chat selected.");
            return;
        };
        match tokio::fs::write(path, render(&session)).await {
            Ok(()) => println!("Saved {}", path.display()),
            Err(e) => println!("Could not write {}: {}", path.display(), e),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let user = self
            .auth
            .login(username, password)
            .await
            .context(LOGIN_FAILED_TEXT)?;
        println!("{}", greeting(Some(&user)));
        Ok(())
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        let user = self
            .auth
            .register(username, password)
            .await
            .context(REGISTER_FAILED_TEXT)?;
        println!("{}", greeting(Some(&user)));
        Ok(())
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
        println!("Signed out.");
    }

    pub async fn print_sessions(&self, filter: DateFilter, query: Option<String>) -> Result<()> {
        if !self.chat.reload_sessions().await {
            bail!("Could not load chat sessions");
        }
        let sidebar = SidebarView {
            filter,
            query: query.unwrap_or_default(),
        };
        self.print_sidebar(&sidebar);
        Ok(())
    }

    pub async fn export_history(&self, path: &Path) -> Result<()> {
        let json = self
            .chat
            .export_history()
            .await
            .context("Failed to export chat history")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub async fn import_history(&self, path: &Path) -> Result<()> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if !self.chat.import_history(&json).await {
            bail!("Failed to import chat history. Please check the file format.");
        }
        Ok(())
    }

    /// Clear all history without prompting when `yes` is set.
    pub async fn clear_history(&self, yes: bool) -> Result<()> {
        if !self.chat.reload_sessions().await {
            bail!("Could not load chat sessions");
        }
        let confirmed = if yes {
            true
        } else {
            let mut term = Terminal::new();
            let prompt = format!("{} [y/N] ", crate::services::chat::CLEAR_ALL_PROMPT);
            term.ask(&prompt).await?.is_some_and(|a| is_yes(&a))
        };
        if self.chat.clear_all(|_| confirmed).await {
            println!("Chat history cleared.");
        }
        Ok(())
    }
}

/// Wait until the exchange behind `pending` has appended its placeholder, or
/// has already finished, and return the placeholder while it is outstanding.
async fn pending_placeholder(
    chat: &ChatController,
    pending: &JoinHandle<SendOutcome>,
) -> Option<Message> {
    while !pending.is_finished() && !chat.is_busy() {
        tokio::task::yield_now().await;
    }
    chat.with_state(|state| {
        state
            .active_session()
            .and_then(Session::last_message)
            .filter(|m| m.is_loading)
            .cloned()
    })
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Line-oriented stdin with a prompt.
struct Terminal {
    lines: Lines<BufReader<Stdin>>,
}

impl Terminal {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` on end of input.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        self.lines.next_line().await.context("Failed to read input")
    }
}
