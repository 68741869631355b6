use serde::{Deserialize, Serialize};

/// One streamed unit of an in-progress completion.
///
/// Each `data:` payload on the event stream decodes to one of these. The
/// engine only inspects the first choice; everything else the server sends
/// (ids, timestamps, usage) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// The choices carried by this chunk, usually exactly one.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// A single choice within a completion chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Full message form, present on non-incremental responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChunkMessage>,

    /// Incremental delta form, present on event streams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ChunkMessage>,

    /// Index of this choice within the response.
    #[serde(default)]
    pub index: u32,

    /// Why the stream finished, on the final content chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The message-or-delta object inside a choice. A chunk may announce a
/// role, carry a content fragment, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMessage {
    /// Role announcement, typically on the first chunk of a stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// A content fragment to append to the accumulated reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// The message-or-delta object of the first choice, preferring the
    /// full message form when both are present.
    pub fn first_payload(&self) -> Option<&ChunkMessage> {
        let choice = self.choices.first()?;
        choice.message.as_ref().or(choice.delta.as_ref())
    }
}
