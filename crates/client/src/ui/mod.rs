//! Terminal user interface.
//!
//! The TUI is an alternate front end to the command-line subcommands over the
//! same [`FileBrowser`](crate::files::FileBrowser) controller.

pub mod tui;

pub use tui::{render, BrowserView, Command, Mode, PromptKind, Row, TuiApp, TuiState};
