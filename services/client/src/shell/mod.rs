//! services/client/src/shell/mod.rs
//!
//! The interactive terminal front end over the core.

pub mod handler;
pub mod protocol;
pub mod state;

pub use handler::execute;
pub use protocol::{Command, ParseError};
pub use state::{AppState, ShellState};
