// Public modules
pub mod chat;
pub mod client;
pub mod conversation;
pub mod error;
pub mod hooks;
pub mod observability;
pub mod profile;
pub mod render;
pub mod sse;
pub mod store;
pub mod types;

// Re-exports
pub use client::{ExchangeOutcome, OpenAi};
pub use conversation::{Conversation, WindowMode};
pub use error::{Error, Result};
pub use hooks::{ExchangeHooks, HookFns, NullHooks};
pub use profile::{Profile, ProfileOverrides};
pub use render::{PlainTextRenderer, Renderer};
pub use store::{Settings, Store};
pub use types::*;
