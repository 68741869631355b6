//! Configuration types for the chat front-end.
//!
//! CLI argument parsing via `arrrg` plus the resolved configuration the
//! session runs with.

use arrrg_derive::CommandLine;

use crate::profile::ProfileOverrides;
use crate::{Error, Result};

/// Command-line arguments for the parley-chat tool.
///
/// arrrg requires `Eq`, so the temperature flag is carried as a string
/// and parsed in [`ChatArgs::overrides`].
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
pub struct ChatArgs {
    /// Profile to load parameters from.
    #[arrrg(optional, "Parameter profile to use (default: from settings)", "NAME")]
    pub profile: Option<String>,

    /// Session to resume or create.
    #[arrrg(optional, "Session to resume or create (default: from settings)", "NAME")]
    pub session: Option<String>,

    /// API key, saved to settings for later runs.
    #[arrrg(optional, "API key (default: $PARLEY_API_KEY or saved settings)", "KEY")]
    pub key: Option<String>,

    /// Model override.
    #[arrrg(optional, "Model to use (default: gpt-4o)", "MODEL")]
    pub model: Option<String>,

    /// System instructions override.
    #[arrrg(optional, "System instructions for the conversation", "PROMPT")]
    pub instructions: Option<String>,

    /// Sampling temperature override, parsed after argument handling.
    #[arrrg(optional, "Sampling temperature 0.0-1.0 (default: 0.5)", "TEMP")]
    pub temperature: Option<String>,

    /// Max tokens override.
    #[arrrg(optional, "Max tokens per response (default: 4096)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// History window override.
    #[arrrg(optional, "History window in messages (default: 5)", "N")]
    pub history: Option<usize>,

    /// Keep the history window from opening mid-pair.
    #[arrrg(flag, "Align the history window to whole exchange pairs")]
    pub pair_window: bool,

    /// Discard the session's saved history before starting.
    #[arrrg(flag, "Reset the session's history before starting")]
    pub reset: bool,

    /// List saved sessions and profiles, then exit.
    #[arrrg(flag, "List saved sessions and profiles, then exit")]
    pub list: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

impl ChatArgs {
    /// The profile overrides carried by these arguments.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the temperature flag is not a
    /// number.
    pub fn overrides(&self) -> Result<ProfileOverrides> {
        let temperature = match self.temperature.as_deref() {
            Some(raw) => Some(raw.parse::<f32>().map_err(|_| {
                Error::validation(
                    format!("temperature is not a number: {raw}"),
                    Some("temperature".to_string()),
                )
            })?),
            None => None,
        };
        Ok(ProfileOverrides {
            model: self.model.clone(),
            instructions: self.instructions.clone(),
            temperature,
            max_tokens: self.max_tokens,
            history_window: self.history,
        })
    }
}

/// Resolved configuration for a chat session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether the history window should stay pair-aligned.
    pub pair_window: bool,
}

impl From<&ChatArgs> for ChatConfig {
    fn from(args: &ChatArgs) -> Self {
        ChatConfig {
            use_color: !args.no_color,
            pair_window: args.pair_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_args_carry_no_overrides() {
        let args = ChatArgs::default();
        assert_eq!(args.overrides().unwrap(), ProfileOverrides::default());
        let config = ChatConfig::from(&args);
        assert!(config.use_color);
        assert!(!config.pair_window);
    }

    #[test]
    fn args_map_to_overrides() {
        let args = ChatArgs {
            model: Some("gpt-4o-mini".to_string()),
            temperature: Some("0.7".to_string()),
            history: Some(9),
            no_color: true,
            ..ChatArgs::default()
        };

        let overrides = args.overrides().unwrap();
        assert_eq!(overrides.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(overrides.temperature, Some(0.7));
        assert_eq!(overrides.history_window, Some(9));

        let config = ChatConfig::from(&args);
        assert!(!config.use_color);
    }

    #[test]
    fn non_numeric_temperature_is_a_validation_error() {
        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };

        let err = args.overrides().unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("temperature"));
    }
}
