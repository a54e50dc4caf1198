pub mod auth;
pub mod chat;
pub mod credentials;
pub mod database;
pub mod exchange;
pub mod export;
pub mod filter;
pub mod markdown;

pub use auth::AuthService;
pub use chat::{ChatController, ChatState, CreateOutcome};
pub use credentials::CredentialStore;
pub use database::Database;
pub use exchange::SendOutcome;
pub use filter::DateFilter;
