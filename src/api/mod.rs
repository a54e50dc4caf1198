pub mod client;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::ApiClient;
pub use traits::{AuthBackend, ChatBackend};
pub use types::{ApiError, AuthResponse};
