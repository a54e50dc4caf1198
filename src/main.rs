use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gemini_chat::app::App;
use gemini_chat::config::AppConfig;
use gemini_chat::services::filter::DateFilter;

#[derive(Parser)]
#[command(name = "gemini-chat", about = "Chat with an AI assistant from the terminal", version)]
struct Cli {
    /// Config file to use instead of the global one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL, e.g. http://localhost:5000/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Path of the local database holding the signed-in user
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat (default)
    Chat,
    /// Sign in and remember the account
    Login {
        username: String,
        /// Read from the prompt when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the signed-in account
    Logout,
    /// List chat sessions
    Sessions {
        /// Date filter (all, today, week, month)
        #[arg(short, long, default_value = "all")]
        filter: String,
        /// Only sessions whose title or messages contain this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Export all chat history to JSON
    Export {
        /// Output file path (defaults to gemini-chat-history-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import chat history from an exported JSON file
    Import { path: PathBuf },
    /// Delete all chat history
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(db) = cli.db {
        config.storage.path = Some(db.to_string_lossy().into_owned());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .compact()
        .init();

    let app = App::init(&config).await?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => app.run().await,
        Command::Login { username, password } => {
            let password = password_or_prompt(password)?;
            app.login(&username, &password).await
        }
        Command::Register { username, password } => {
            let password = password_or_prompt(password)?;
            app.register(&username, &password).await
        }
        Command::Logout => {
            app.logout().await;
            Ok(())
        }
        Command::Sessions { filter, search } => {
            let Some(filter) = DateFilter::from_str(&filter) else {
                bail!("Unknown filter '{}'. Use all, today, week or month.", filter);
            };
            app.print_sessions(filter, search).await
        }
        Command::Export { output } => {
            let path = output.unwrap_or_else(|| {
                PathBuf::from(gemini_chat::services::export::export_file_name(chrono::Local::now()))
            });
            app.export_history(&path).await?;
            println!("Exported chat history to {}", path.display());
            Ok(())
        }
        Command::Import { path } => {
            app.import_history(&path).await?;
            println!("Chat history imported.");
            Ok(())
        }
        Command::Clear { yes } => app.clear_history(yes).await,
    }
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim().to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}
