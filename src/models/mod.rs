pub mod message;
pub mod session;
pub mod user;

pub use message::{Message, Role};
pub use session::{Session, OFFLINE_ID_PREFIX};
pub use user::User;
