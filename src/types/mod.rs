//! Wire-level data types shared by the client and the conversation state.

mod completion_chunk;
mod completion_request;
mod message;

pub use completion_chunk::{Choice, ChunkMessage, CompletionChunk};
pub use completion_request::CompletionRequest;
pub use message::{Message, Role};
