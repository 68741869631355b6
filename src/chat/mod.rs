//! Chat front-end for interactive conversations.
//!
//! A streaming REPL built on top of the client library. It supports:
//!
//! - Streaming responses with real-time token display
//! - Named sessions and parameter profiles persisted between runs
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and API interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use session::{ChatSession, SessionStats};
