//! Core chat session management.
//!
//! `ChatSession` owns the conversation and the client, turning each line
//! of user input into one streaming exchange: assemble the prompt window,
//! run the exchange, commit the pair on completion, and persist.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::chat::config::ChatConfig;
use crate::client::OpenAi;
use crate::conversation::{Conversation, WindowMode};
use crate::error::Result;
use crate::hooks::ExchangeHooks;
use crate::render::Renderer;
use crate::store::Store;
use crate::types::CompletionRequest;
use crate::Error;

/// How often the interrupt flag is polled during a streamed exchange.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Hooks that forward stream callbacks to a renderer.
struct RendererHooks<'a> {
    renderer: &'a mut dyn Renderer,
}

impl ExchangeHooks for RendererHooks<'_> {
    fn on_role_changed(&mut self, role: &str) {
        self.renderer.print_role(role);
    }

    fn on_token(&mut self, token: &str) {
        self.renderer.print_text(token);
    }

    fn on_error(&mut self, error: &Error) {
        self.renderer.print_error(&error.to_string());
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The session's name.
    pub session: String,
    /// The model used for the session.
    pub model: String,
    /// The number of messages in the conversation history.
    pub message_count: usize,
    /// The system instructions.
    pub instructions: String,
    /// The sampling temperature.
    pub temperature: f32,
    /// The maximum tokens per response.
    pub max_tokens: u32,
    /// The history window, in messages.
    pub history_window: usize,
    /// Exchanges attempted this process.
    pub exchanges: u64,
    /// Exchanges that did not complete.
    pub failures: u64,
}

/// A chat session binding one conversation to one client and store.
pub struct ChatSession {
    client: OpenAi,
    conversation: Conversation,
    store: Store,
    exchanges: u64,
    failures: u64,
}

impl ChatSession {
    /// Creates a new chat session.
    pub fn new(client: OpenAi, conversation: Conversation, store: Store) -> Self {
        Self {
            client,
            conversation,
            store,
            exchanges: 0,
            failures: 0,
        }
    }

    /// Creates a new chat session, applying the resolved configuration.
    pub fn with_config(
        client: OpenAi,
        mut conversation: Conversation,
        store: Store,
        config: &ChatConfig,
    ) -> Self {
        conversation.window_mode = if config.pair_window {
            WindowMode::PairAligned
        } else {
            WindowMode::Messages
        };
        Self::new(client, conversation, store)
    }

    /// The model currently in use.
    pub fn model(&self) -> &str {
        &self.conversation.model
    }

    /// Sends a user message and streams the response.
    ///
    /// Assembles the prompt window, runs one exchange, and commits the
    /// user/assistant pair to history only if the exchange completed.
    /// Failures are rendered through the error hook and leave history
    /// untouched, as does an interrupt. Returns true if a pair was
    /// committed.
    ///
    /// # Errors
    ///
    /// Returns an error only if persisting the updated conversation
    /// fails; exchange failures are part of normal flow.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        interrupted: Arc<AtomicBool>,
    ) -> Result<bool> {
        let messages = self.conversation.assemble(user_input);
        let request = CompletionRequest::new(
            &self.conversation.model,
            messages,
            self.conversation.max_tokens,
            self.conversation.temperature,
        );

        self.exchanges += 1;
        let outcome = {
            let mut hooks = RendererHooks { renderer };
            let exchange = self.client.execute(request, &mut hooks);
            tokio::pin!(exchange);
            tokio::select! {
                outcome = &mut exchange => Some(outcome),
                _ = wait_for_interrupt(&interrupted) => None,
            }
        };

        let Some(outcome) = outcome else {
            self.failures += 1;
            renderer.print_interrupted();
            return Ok(false);
        };

        if !self.conversation.commit(user_input, &outcome) {
            self.failures += 1;
            return Ok(false);
        }
        renderer.finish_response();
        self.save()?;
        Ok(true)
    }

    /// Clears the conversation history and persists the empty state.
    pub fn clear(&mut self) -> Result<()> {
        self.conversation.history.clear();
        self.save()
    }

    /// Changes the model.
    pub fn set_model(&mut self, model: String) -> Result<()> {
        self.conversation.model = model;
        self.save()
    }

    /// Changes the system instructions.
    pub fn set_instructions(&mut self, instructions: String) -> Result<()> {
        self.conversation.instructions = instructions;
        self.save()
    }

    /// Changes the sampling temperature.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        self.conversation.temperature = temperature;
        self.save()
    }

    /// Changes the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<()> {
        self.conversation.max_tokens = max_tokens;
        self.save()
    }

    /// Changes the history window.
    pub fn set_history_window(&mut self, history_window: usize) -> Result<()> {
        self.conversation.history_window = history_window;
        self.save()
    }

    /// Current session statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session: self.conversation.name.clone(),
            model: self.conversation.model.clone(),
            message_count: self.conversation.history.len(),
            instructions: self.conversation.instructions.clone(),
            temperature: self.conversation.temperature,
            max_tokens: self.conversation.max_tokens,
            history_window: self.conversation.history_window,
            exchanges: self.exchanges,
            failures: self.failures,
        }
    }

    /// The store this session persists through.
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn save(&self) -> Result<()> {
        self.store.save_conversation(&self.conversation)
    }
}

async fn wait_for_interrupt(interrupted: &AtomicBool) {
    while !interrupted.load(Ordering::Relaxed) {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_session() -> (tempfile::TempDir, ChatSession) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let client = OpenAi::new(Some("sk-test".to_string())).unwrap();
        let conversation = Conversation::new("scratch");
        (dir, ChatSession::new(client, conversation, store))
    }

    #[test]
    fn stats_reflect_conversation() {
        let (_dir, session) = scratch_session();
        let stats = session.stats();
        assert_eq!(stats.session, "scratch");
        assert_eq!(stats.message_count, 0);
        assert_eq!(stats.exchanges, 0);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn setters_persist_the_conversation() {
        let (_dir, mut session) = scratch_session();
        session.set_model("gpt-4o-mini".to_string()).unwrap();
        session.set_temperature(0.9).unwrap();
        session.set_history_window(7).unwrap();

        let loaded = session
            .store()
            .load_conversation("scratch")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.model, "gpt-4o-mini");
        assert_eq!(loaded.temperature, 0.9);
        assert_eq!(loaded.history_window, 7);
    }

    #[test]
    fn with_config_sets_window_mode() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let client = OpenAi::new(Some("sk-test".to_string())).unwrap();
        let config = ChatConfig {
            use_color: false,
            pair_window: true,
        };
        let session =
            ChatSession::with_config(client, Conversation::new("pw"), store, &config);
        assert_eq!(session.conversation.window_mode, WindowMode::PairAligned);
    }

    #[test]
    fn clear_empties_history_on_disk() {
        let (_dir, mut session) = scratch_session();
        session
            .conversation
            .history
            .push(crate::types::Message::user("hi"));
        session.clear().unwrap();

        let loaded = session
            .store()
            .load_conversation("scratch")
            .unwrap()
            .unwrap();
        assert!(loaded.history.is_empty());
    }
}
