//! HTTP request handlers.

mod command;
mod health;
mod init;

pub use command::run_command;
pub use health::{health_check, version};
pub use init::init_session;
