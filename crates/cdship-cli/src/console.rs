//! Terminal notifier.

use std::io::{self, BufRead, Write};

use cdship_core::Notifier;

/// Prints progress to stdout and problems to stderr; reads answers from stdin.
#[derive(Default)]
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only warnings and errors are printed.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl Notifier for ConsoleNotifier {
    fn announce(&self, message: &str) {
        if !self.quiet {
            println!("\n // {message}");
        }
    }

    fn success(&self, message: &str) {
        if !self.quiet {
            println!(" ✓ {message}");
        }
    }

    fn warn(&self, message: &str) {
        eprintln!(" ! {message}");
    }

    fn fail(&self, message: &str) {
        eprintln!(" ✗ {message}");
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!(" {question} {hint} ");
        let _ = io::stdout().flush();

        read_answer(io::stdin().lock(), default)
    }
}

/// Read one answer line. End of input takes the default; a read error is a no.
fn read_answer(mut reader: impl BufRead, default: bool) -> bool {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => default,
        Ok(_) => parse_answer(&line, default),
        Err(e) => {
            tracing::warn!(error = %e, "could not read answer, treating it as no");
            false
        }
    }
}

/// Interpret a yes/no answer. Empty input takes the default, anything
/// unrecognised is a no.
fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}
