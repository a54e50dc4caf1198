pub mod commands;
pub mod sidebar;
pub mod transcript;
