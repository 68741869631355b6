use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Request body for the chat-completions endpoint.
///
/// The engine only speaks the streaming protocol, so `stream` is always
/// true; a request constructed through [`CompletionRequest::new`] cannot
/// ask for a buffered response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to generate the completion with.
    pub model: String,

    /// The ordered prompt window: system instructions, windowed history,
    /// then the new user utterance.
    pub messages: Vec<Message>,

    /// Maximum tokens the completion may produce.
    pub max_tokens: u32,

    /// Sampling temperature in [0, 1].
    pub temperature: f32,

    /// Always true; the engine consumes server-sent events.
    pub stream: bool,
}

impl CompletionRequest {
    /// Create a new streaming completion request.
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature,
            stream: true,
        }
    }
}
