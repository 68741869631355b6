//! Markdown translator backed by an OpenAI-compatible endpoint.
//!
//! Translates a markdown document line by line, preserving blank lines and
//! leading/trailing indentation so the document structure survives. The
//! output lands beside the input as `<name>-<language>.<ext>`.
//!
//! # Usage
//!
//! ```bash
//! parley-translate README.md french
//! parley-translate --key sk-... notes.md japanese
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use parley::chat::{PlainTextRenderer, Renderer};
use parley::{CompletionRequest, Conversation, Error, ExchangeOutcome, HookFns, OpenAi, Store};

/// Pause between retries of a failed exchange.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Command-line arguments for the parley-translate tool.
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
struct TranslateArgs {
    /// API key, saved to settings for later runs.
    #[arrrg(optional, "API key (default: $PARLEY_API_KEY or saved settings)", "KEY")]
    key: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) =
        TranslateArgs::from_command_line_relaxed("parley-translate [OPTIONS] <file.md> <language>");
    let [file, language] = free.as_slice() else {
        eprintln!("usage: parley-translate [OPTIONS] <file.md> <language>");
        std::process::exit(1);
    };

    let input = PathBuf::from(file);
    let text = std::fs::read_to_string(&input)?;
    let output = output_path(&input, language);

    let store = Store::new(Store::default_root()?);
    let settings = store.load_settings()?;
    let credential = args
        .key
        .clone()
        .or_else(|| std::env::var("PARLEY_API_KEY").ok().filter(|k| !k.is_empty()))
        .or_else(|| {
            if settings.credential.is_empty() {
                None
            } else {
                Some(settings.credential.clone())
            }
        });
    let Some(credential) = credential else {
        eprintln!("No API key: pass --key, set PARLEY_API_KEY, or save one in settings");
        std::process::exit(1);
    };
    let client = OpenAi::new(Some(credential))?;

    // A window-less conversation: each line is translated independently.
    let mut conversation = Conversation::new("markdown translator");
    conversation.instructions = format!(
        "You are a Markdown translation tool. You will be given text formatted \
         for Markdown documents and will translate it directly to {language}. \
         Do not add anything else beside the translated text, and preserve all \
         Markdown formatting characters. Here is the text: "
    );
    conversation.temperature = 0.5;
    conversation.max_tokens = 3500;
    conversation.history_window = 0;

    let mut renderer = PlainTextRenderer::with_color(!args.no_color);
    let mut translated = String::new();

    for line in text.split('\n') {
        if line.trim_matches(['\r', ' ', '\t']).is_empty() {
            translated.push('\n');
            renderer.finish_response();
            continue;
        }

        let prefix = leading_whitespace(line);
        let suffix = trailing_whitespace(line.trim_end_matches('\r'));
        let prompt = line.trim_matches(['\r', ' ', '\t']);

        let reply = translate_line(&client, &conversation, prompt, &mut renderer).await;
        translated.push_str(&format!("{prefix}{reply}{suffix}\n"));
        renderer.finish_response();
    }

    std::fs::write(&output, translated)?;
    renderer.print_info(&format!("Wrote {}", output.display()));
    Ok(())
}

/// Run one exchange for a line, retrying until it completes.
async fn translate_line(
    client: &OpenAi,
    conversation: &Conversation,
    prompt: &str,
    renderer: &mut PlainTextRenderer,
) -> String {
    loop {
        let messages = conversation.assemble(prompt);
        let request = CompletionRequest::new(
            &conversation.model,
            messages,
            conversation.max_tokens,
            conversation.temperature,
        );

        let outcome = {
            let mut errors = Vec::new();
            let mut hooks = HookFns::new(
                |_: &str| {},
                |token: &str| {
                    print!("{token}");
                    let _ = std::io::stdout().flush();
                },
                |error: &Error| errors.push(error.to_string()),
            );
            let outcome = client.execute(request, &mut hooks).await;
            for error in errors {
                renderer.print_error(&error);
            }
            outcome
        };

        match outcome {
            ExchangeOutcome::Completed(message) => return message.content,
            ExchangeOutcome::Failed(_) => {
                tokio::time::sleep(RETRY_PAUSE).await;
            }
        }
    }
}

fn output_path(input: &Path, language: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("translated");
    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}-{language}.{ext}"),
        None => format!("{stem}-{language}"),
    };
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

fn trailing_whitespace(line: &str) -> &str {
    let start = line
        .rfind(|c| c != ' ' && c != '\t')
        .map(|i| i + line[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    &line[start..]
}
