//! Output formatting for CLI commands

use std::io::{self, Write};

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
///
/// Results go to stdout. Progress lines go to stderr and are dropped in
/// JSON mode or when a command runs with `--quiet`/`--idonly`.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            quiet: false,
        }
    }

    /// A copy of this output that suppresses progress lines
    pub fn quiet(self, quiet: bool) -> Self {
        Self {
            quiet: self.quiet || quiet,
            ..self
        }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => print_line(message),
            OutputFormat::Json => print_line(serde_json::json!({
                "success": true,
                "message": message
            })),
        }
    }

    /// Prints an error message without aborting the command
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Error: {}", message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "error": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        if let Ok(json) = rendered {
            print_line(json);
        }
    }

    /// Prints a progress line to stderr
    pub fn status(&self, message: &str) {
        if self.format == OutputFormat::Text && !self.quiet {
            eprintln!("{}", message);
        }
    }

    /// Prints a line of text output (ignored in JSON mode)
    pub fn line(&self, text: &str) {
        if self.format == OutputFormat::Text {
            print_line(text);
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Writes one line to stdout. A closed pipe is not an error for messages.
fn print_line(line: impl std::fmt::Display) {
    let _ = writeln!(io::stdout(), "{}", line);
}
