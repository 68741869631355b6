//! Slash command parsing for the chat front-end.
//!
//! Commands start with `/` and control the session locally; they are
//! never sent to the API.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Change the model.
    Model(String),

    /// Set the system instructions.
    Instructions(String),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Set the history window, in messages.
    History(usize),

    /// List saved sessions and profiles.
    List,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a regular message.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "instructions" | "system" => match argument {
            Some(instructions) => ChatCommand::Instructions(instructions.to_string()),
            None => ChatCommand::Invalid("/instructions requires a prompt".to_string()),
        },
        "temperature" => match argument {
            Some(arg) => match parse_f32_in_range(arg, 0.0, 1.0) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "max_tokens" => match argument.map(str::parse::<u32>) {
            Some(Ok(value)) if value >= 1 => ChatCommand::MaxTokens(value),
            Some(_) => ChatCommand::Invalid("/max_tokens expects a positive integer".to_string()),
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "history" => match argument.map(str::parse::<usize>) {
            Some(Ok(value)) => ChatCommand::History(value),
            Some(Err(_)) => ChatCommand::Invalid("/history expects an integer".to_string()),
            None => ChatCommand::Invalid("/history requires a value".to_string()),
        },
        "list" => ChatCommand::List,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /model <name>          Change the model (e.g., /model gpt-4o)
  /instructions <text>   Set the system instructions
  /temperature <v>       Set temperature 0.0-1.0
  /max_tokens <n>        Set maximum response tokens
  /history <n>           Set the history window, in messages
  /list                  List saved sessions and profiles
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
