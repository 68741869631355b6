//! Output rendering for the chat front-end.
//!
//! A trait-based rendering abstraction so the session logic does not care
//! whether output goes to a styled terminal or a plain pipe. The default
//! implementation uses ANSI escape codes for role announcements and
//! errors.

use std::io::{self, Stdout, Write};

/// ANSI escape code for dim text (used for role announcements).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for green text (used for informational messages).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Print a role announcement at the start of a streamed reply.
    fn print_role(&mut self, role: &str);

    /// Print a fragment of streamed response text.
    ///
    /// This is called incrementally as tokens arrive from the API.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            use_color: true,
        }
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_role(&mut self, role: &str) {
        if self.use_color {
            print!("{ANSI_DIM}[{role}]{ANSI_RESET} ");
        } else {
            print!("[{role}] ");
        }
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("\n{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("\nError: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_GREEN}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        println!("\n[interrupted]");
        self.flush();
    }
}
