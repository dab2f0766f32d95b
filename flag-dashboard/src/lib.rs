pub mod commands;
pub mod logging;
pub mod output;
pub mod tui;

pub mod cmd {
    pub use super::commands::Cli;
}
