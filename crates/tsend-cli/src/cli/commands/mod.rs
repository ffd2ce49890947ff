//! CLI command handlers. Each command is in its own file.

mod config;
mod send;

pub use config::run_config;
pub use send::{run_send, SendArgs};
