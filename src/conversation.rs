//! Durable conversation state, prompt-window assembly, and the history
//! commit protocol.
//!
//! A [`Conversation`] is the caller-owned record of one named exchange
//! thread. The engine never touches it: [`Conversation::assemble`] is a
//! pure read that builds the prompt window for one exchange, and
//! [`Conversation::commit`] is the sole place history changes, applied
//! only when an exchange completed. Failures are transactional no-ops.

use serde::{Deserialize, Serialize};

use crate::client::ExchangeOutcome;
use crate::observability::HISTORY_COMMITS;
use crate::types::{Message, Role};

/// Default model for new conversations.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default system instructions for new conversations.
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful AI assistant. Answer as concisely as possible.";

/// How the history window selects its starting message.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// The window is exactly the last `history_window` messages. With an
    /// odd window this can open mid-pair, on an assistant reply whose
    /// user prompt fell outside the window. This matches the behavior
    /// conversations have always had and is the default.
    #[default]
    Messages,

    /// The window never opens on an assistant reply: when the last
    /// `history_window` messages would start mid-pair, the start is
    /// advanced by one so every windowed reply keeps its prompt.
    PairAligned,
}

/// The durable state of one named conversation.
///
/// The credential rides along for the duration of a process but is never
/// part of the persisted form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// The conversation's name, used as its persistence key.
    pub name: String,

    /// Chronological message history, oldest first. Append-only; grows
    /// by exactly one user/assistant pair per committed exchange.
    #[serde(default)]
    pub history: Vec<Message>,

    /// The model used for completions.
    pub model: String,

    /// System instructions sent with every exchange.
    pub instructions: String,

    /// Sampling temperature in [0, 1]. Validated by the caller.
    pub temperature: f32,

    /// Maximum tokens per completion. Validated by the caller.
    pub max_tokens: u32,

    /// How many recent history messages are resent as context. Counts
    /// individual messages, not exchange pairs.
    pub history_window: usize,

    /// How the window start is chosen.
    #[serde(default)]
    pub window_mode: WindowMode,

    /// Bearer credential for the endpoint. Never persisted or logged.
    #[serde(skip)]
    pub credential: String,
}

impl Conversation {
    /// Create a new conversation with default parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: 0.5,
            max_tokens: 1024,
            history_window: 5,
            window_mode: WindowMode::default(),
            credential: String::new(),
        }
    }

    /// Build the ordered prompt window for one exchange: system
    /// instructions, the bounded recent history, then the new utterance.
    ///
    /// Pure function of the conversation and the utterance; emits exactly
    /// `1 + min(history_window, history.len()) + 1` messages in
    /// `Messages` mode.
    pub fn assemble(&self, new_utterance: &str) -> Vec<Message> {
        let k = self.history_window.min(self.history.len());
        let mut start = self.history.len() - k;
        if self.window_mode == WindowMode::PairAligned
            && self
                .history
                .get(start)
                .is_some_and(|m| m.role == Role::Assistant)
        {
            start += 1;
        }

        let mut messages = Vec::with_capacity(k + 2);
        messages.push(Message::system(&self.instructions));
        messages.extend(self.history[start..].iter().cloned());
        messages.push(Message::user(new_utterance));
        messages
    }

    /// Apply the outcome of one exchange to history.
    ///
    /// On a completed outcome, appends the user utterance and the
    /// assistant reply, in that order, and returns true. Any failed
    /// outcome leaves history untouched and returns false. This is the
    /// only place history changes.
    pub fn commit(&mut self, user_utterance: &str, outcome: &ExchangeOutcome) -> bool {
        let ExchangeOutcome::Completed(reply) = outcome else {
            return false;
        };
        self.history.push(Message::user(user_utterance));
        self.history.push(reply.clone());
        HISTORY_COMMITS.click();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn with_history(window: usize, pairs: usize) -> Conversation {
        let mut conversation = Conversation::new("test");
        conversation.history_window = window;
        for i in 1..=pairs {
            conversation.history.push(Message::user(format!("u{i}")));
            conversation
                .history
                .push(Message::assistant(format!("a{i}")));
        }
        conversation
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn assemble_counts_system_window_and_utterance() {
        for (window, pairs) in [(0usize, 0usize), (0, 2), (3, 2), (5, 1), (8, 3)] {
            let conversation = with_history(window, pairs);
            let n = conversation.history.len();
            let messages = conversation.assemble("next");
            assert_eq!(messages.len(), 1 + window.min(n) + 1);
            assert_eq!(messages.first().unwrap().role, Role::System);
            assert_eq!(messages.last().unwrap().content, "next");
            assert_eq!(messages.last().unwrap().role, Role::User);
        }
    }

    #[test]
    fn assemble_window_is_contiguous_suffix() {
        // [u1,a1,u2,a2,u3,a3] with w=3 yields [a2,u3,a3]: the odd window
        // opens mid-pair.
        let conversation = with_history(3, 3);
        let messages = conversation.assemble("next");
        assert_eq!(contents(&messages[1..4]), vec!["a2", "u3", "a3"]);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn assemble_pair_aligned_never_opens_on_assistant() {
        let mut conversation = with_history(3, 3);
        conversation.window_mode = WindowMode::PairAligned;
        let messages = conversation.assemble("next");
        assert_eq!(contents(&messages[1..3]), vec!["u3", "a3"]);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn assemble_pair_aligned_matches_even_windows() {
        let mut conversation = with_history(4, 3);
        conversation.window_mode = WindowMode::PairAligned;
        let messages = conversation.assemble("next");
        assert_eq!(contents(&messages[1..5]), vec!["u2", "a2", "u3", "a3"]);
    }

    #[test]
    fn assemble_window_larger_than_history() {
        let conversation = with_history(10, 2);
        let messages = conversation.assemble("next");
        assert_eq!(messages.len(), 1 + 4 + 1);
        assert_eq!(contents(&messages[1..5]), vec!["u1", "a1", "u2", "a2"]);
    }

    #[test]
    fn assemble_is_pure() {
        let conversation = with_history(2, 2);
        let before = conversation.history.clone();
        let _ = conversation.assemble("next");
        assert_eq!(conversation.history, before);
    }

    #[test]
    fn commit_appends_exactly_one_pair() {
        let mut conversation = with_history(2, 1);
        let outcome = ExchangeOutcome::Completed(Message::assistant("reply"));
        assert!(conversation.commit("question", &outcome));

        assert_eq!(conversation.history.len(), 4);
        assert_eq!(conversation.history[2], Message::user("question"));
        assert_eq!(conversation.history[3], Message::assistant("reply"));
    }

    #[test]
    fn commit_is_a_no_op_on_failure() {
        let mut conversation = with_history(2, 1);
        let before = conversation.history.clone();
        let outcome = ExchangeOutcome::Failed(Error::http_status(401, "Unauthorized"));
        assert!(!conversation.commit("question", &outcome));
        assert_eq!(conversation.history, before);
    }

    #[test]
    fn history_stays_even_across_commits() {
        let mut conversation = Conversation::new("even");
        for i in 0..3 {
            let outcome = ExchangeOutcome::Completed(Message::assistant(format!("r{i}")));
            conversation.commit(&format!("q{i}"), &outcome);
            assert_eq!(conversation.history.len() % 2, 0);
        }
        assert_eq!(conversation.history.len(), 6);
    }

    #[test]
    fn serde_round_trip_excludes_credential() {
        let mut conversation = with_history(3, 2);
        conversation.model = "gpt-4o-mini".to_string();
        conversation.instructions = "Be terse.".to_string();
        conversation.temperature = 0.25;
        conversation.max_tokens = 2048;
        conversation.credential = "sk-secret".to_string();

        let json = serde_json::to_string(&conversation).unwrap();
        assert!(!json.contains("sk-secret"));

        let restored: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, conversation.name);
        assert_eq!(restored.history, conversation.history);
        assert_eq!(restored.model, conversation.model);
        assert_eq!(restored.instructions, conversation.instructions);
        assert_eq!(restored.temperature, conversation.temperature);
        assert_eq!(restored.max_tokens, conversation.max_tokens);
        assert_eq!(restored.history_window, conversation.history_window);
        assert!(restored.credential.is_empty());
    }
}
