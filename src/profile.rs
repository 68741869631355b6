//! Named parameter profiles.
//!
//! A profile is a persisted set of completion parameters applied to a
//! conversation at startup, so model, instructions, and sampling settings
//! survive between runs independently of any one conversation.

use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, DEFAULT_INSTRUCTIONS, DEFAULT_MODEL};

/// A named, persisted parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// The profile's name, used as its persistence key.
    pub name: String,

    /// The model used for completions.
    pub model: String,

    /// System instructions sent with every exchange.
    pub instructions: String,

    /// Sampling temperature in [0, 1].
    pub temperature: f32,

    /// Maximum tokens per completion.
    pub max_tokens: u32,

    /// History window, in messages.
    pub history_window: usize,
}

/// Partial overrides for a profile, typically sourced from command-line
/// flags. Absent fields leave the profile untouched; present fields are
/// validated before they apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileOverrides {
    /// Replacement model name.
    pub model: Option<String>,

    /// Replacement system instructions.
    pub instructions: Option<String>,

    /// Replacement temperature; must be in [0, 1].
    pub temperature: Option<f32>,

    /// Replacement max tokens; must be at least 1.
    pub max_tokens: Option<u32>,

    /// Replacement history window.
    pub history_window: Option<usize>,
}

impl Profile {
    /// Create a new profile with default parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: DEFAULT_MODEL.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: 0.5,
            max_tokens: 4096,
            history_window: 5,
        }
    }

    /// Apply validated overrides, returning true if anything changed.
    ///
    /// Out-of-range values are ignored rather than clamped: the profile
    /// keeps its previous setting.
    pub fn update(&mut self, overrides: &ProfileOverrides) -> bool {
        let mut dirty = false;

        if let Some(model) = &overrides.model {
            if !model.is_empty() && *model != self.model {
                self.model = model.clone();
                dirty = true;
            }
        }

        if let Some(instructions) = &overrides.instructions {
            if !instructions.is_empty() && *instructions != self.instructions {
                self.instructions = instructions.clone();
                dirty = true;
            }
        }

        if let Some(temperature) = overrides.temperature {
            if (0.0..=1.0).contains(&temperature) && temperature != self.temperature {
                self.temperature = temperature;
                dirty = true;
            }
        }

        if let Some(max_tokens) = overrides.max_tokens {
            if max_tokens >= 1 && max_tokens != self.max_tokens {
                self.max_tokens = max_tokens;
                dirty = true;
            }
        }

        if let Some(history_window) = overrides.history_window {
            if history_window != self.history_window {
                self.history_window = history_window;
                dirty = true;
            }
        }

        dirty
    }

    /// Copy this profile's parameters onto a conversation.
    pub fn apply_to(&self, conversation: &mut Conversation) {
        conversation.model = self.model.clone();
        conversation.instructions = self.instructions.clone();
        conversation.temperature = self.temperature;
        conversation.max_tokens = self.max_tokens;
        conversation.history_window = self.history_window;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let profile = Profile::new("default");
        assert_eq!(profile.model, DEFAULT_MODEL);
        assert_eq!(profile.temperature, 0.5);
        assert_eq!(profile.max_tokens, 4096);
        assert_eq!(profile.history_window, 5);
    }

    #[test]
    fn update_applies_valid_overrides() {
        let mut profile = Profile::new("p");
        let dirty = profile.update(&ProfileOverrides {
            model: Some("gpt-4o-mini".to_string()),
            temperature: Some(0.9),
            max_tokens: Some(512),
            ..ProfileOverrides::default()
        });

        assert!(dirty);
        assert_eq!(profile.model, "gpt-4o-mini");
        assert_eq!(profile.temperature, 0.9);
        assert_eq!(profile.max_tokens, 512);
    }

    #[test]
    fn update_rejects_out_of_range_values() {
        let mut profile = Profile::new("p");
        let dirty = profile.update(&ProfileOverrides {
            temperature: Some(1.5),
            max_tokens: Some(0),
            ..ProfileOverrides::default()
        });

        assert!(!dirty);
        assert_eq!(profile.temperature, 0.5);
        assert_eq!(profile.max_tokens, 4096);
    }

    #[test]
    fn update_reports_clean_when_nothing_changes() {
        let mut profile = Profile::new("p");
        assert!(!profile.update(&ProfileOverrides::default()));
        assert!(!profile.update(&ProfileOverrides {
            temperature: Some(0.5),
            ..ProfileOverrides::default()
        }));
    }

    #[test]
    fn apply_to_conversation() {
        let mut profile = Profile::new("p");
        profile.model = "gpt-4o-mini".to_string();
        profile.history_window = 8;

        let mut conversation = Conversation::new("c");
        profile.apply_to(&mut conversation);
        assert_eq!(conversation.model, "gpt-4o-mini");
        assert_eq!(conversation.history_window, 8);
    }
}
