//! Interactive chat application backed by an OpenAI-compatible endpoint.
//!
//! This binary provides a streaming REPL with named sessions and parameter
//! profiles persisted between runs.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! parley-chat
//!
//! # Resume a named session with a named profile
//! parley-chat --session work --profile writer
//!
//! # Override parameters (also saved to the profile)
//! parley-chat --model gpt-4o-mini --temperature 0.8
//!
//! # Disable colors (useful for piping output)
//! parley-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/model <name>` - Change the model
//! - `/instructions <text>` - Set the system instructions
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use parley::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use parley::{Conversation, OpenAi, Profile, Settings, Store};

const DEFAULT_NAME: &str = "default";

/// Main entry point for the parley-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("parley-chat [OPTIONS]");
    let config = ChatConfig::from(&args);

    let store = Store::new(Store::default_root()?);
    let mut settings = store.load_settings()?;

    // A reset rewrites the default profile and session and makes them
    // active again.
    if args.reset {
        store.save_profile(&Profile::new(DEFAULT_NAME))?;
        store.save_conversation(&Conversation::new(DEFAULT_NAME))?;
        settings.profile = DEFAULT_NAME.to_string();
        settings.session = DEFAULT_NAME.to_string();
        store.save_settings(&settings)?;
    }

    // Resolve the profile, folding in any command-line overrides.
    let profile_name = args
        .profile
        .clone()
        .or_else(|| non_empty(&settings.profile))
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let mut profile = store
        .load_profile(&profile_name)?
        .unwrap_or_else(|| Profile::new(&profile_name));
    if profile.update(&args.overrides()?) {
        store.save_profile(&profile)?;
    }

    // Resolve the session and apply the profile's parameters.
    let session_name = args
        .session
        .clone()
        .or_else(|| non_empty(&settings.session))
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let mut conversation = store
        .load_conversation(&session_name)?
        .unwrap_or_else(|| Conversation::new(&session_name));
    profile.apply_to(&mut conversation);

    if args.list {
        print_listing(&store, &profile_name, &session_name)?;
        return Ok(());
    }

    let mut rl = DefaultEditor::new()?;

    // Resolve the credential: flag, then environment, then settings,
    // then a prompt.
    let credential = args
        .key
        .clone()
        .or_else(|| std::env::var("PARLEY_API_KEY").ok().filter(|k| !k.is_empty()))
        .or_else(|| non_empty(&settings.credential));
    let credential = match credential {
        Some(credential) => credential,
        None => {
            let entered = rl.readline("Please enter your API key: ")?;
            let entered = entered.trim().to_string();
            if entered.is_empty() {
                eprintln!("Invalid key!");
                std::process::exit(1);
            }
            entered
        }
    };
    conversation.credential = credential.clone();
    let client = OpenAi::new(Some(credential.clone()))?;

    // Remember the active names and key for the next run.
    let remembered = Settings {
        profile: profile_name.clone(),
        session: session_name.clone(),
        credential,
    };
    if remembered != settings {
        settings = remembered;
        store.save_settings(&settings)?;
    }

    let use_color = config.use_color;
    let mut session = ChatSession::with_config(client, conversation, store, &config);
    let mut renderer = PlainTextRenderer::with_color(use_color);

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!(
        "Parley (session: {}, profile: {}, model: {})",
        session_name,
        profile_name,
        session.model()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            if let Err(err) = session.clear() {
                                renderer.print_error(&err.to_string());
                            } else {
                                renderer.print_info("Conversation cleared.");
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model) => {
                            match session.set_model(model.clone()) {
                                Ok(()) => renderer
                                    .print_info(&format!("Model changed to: {}", model)),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Instructions(instructions) => {
                            match session.set_instructions(instructions.clone()) {
                                Ok(()) => renderer
                                    .print_info(&format!("Instructions set to: {instructions}")),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Temperature(value) => {
                            match session.set_temperature(value) {
                                Ok(()) => renderer
                                    .print_info(&format!("temperature set to {:.2}", value)),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::MaxTokens(value) => {
                            match session.set_max_tokens(value) {
                                Ok(()) => {
                                    renderer.print_info(&format!("max_tokens set to {value}"))
                                }
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::History(value) => {
                            match session.set_history_window(value) {
                                Ok(()) => renderer
                                    .print_info(&format!("history window set to {value}")),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::List => {
                            if let Err(err) =
                                print_listing(session.store(), &profile_name, &session_name)
                            {
                                renderer.print_error(&err.to_string());
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                if let Err(e) = session
                    .send_streaming(line, &mut renderer, interrupted.clone())
                    .await
                {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn print_listing(store: &Store, active_profile: &str, active_session: &str) -> parley::Result<()> {
    let profiles = store.list_profiles()?;
    let sessions = store.list_conversations()?;
    if profiles.is_empty() {
        println!("    Profiles: (none)");
    } else {
        println!("    Profiles:");
        for name in profiles {
            let marker = if name == active_profile { " (active)" } else { "" };
            println!("      - {}{}", name, marker);
        }
    }
    if sessions.is_empty() {
        println!("    Sessions: (none)");
    } else {
        println!("    Sessions:");
        for name in sessions {
            let marker = if name == active_session { " (active)" } else { "" };
            println!("      - {}{}", name, marker);
        }
    }
    Ok(())
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Session: {}", stats.session);
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!("      Instructions: {}", stats.instructions);
    println!("      Temperature: {:.2}", stats.temperature);
    println!("      Max tokens: {}", stats.max_tokens);
    println!("      History window: {}", stats.history_window);
    println!(
        "      Exchanges: {} ({} failed)",
        stats.exchanges, stats.failures
    );
}
