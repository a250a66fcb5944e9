//! Coloured status and error lines for the command line.

use owo_colors::OwoColorize;

pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn status() -> Self {
        Self { color: Some("cyan") }
    }

    pub fn error() -> Self {
        Self { color: Some("red") }
    }

    pub fn warning() -> Self {
        Self { color: Some("yellow") }
    }

    pub fn success() -> Self {
        Self { color: Some("green") }
    }

    /// Status goes to stderr so stdout stays machine readable.
    pub fn eprint(&self, text: &str) {
        eprintln!("{}", self.paint(text));
    }

    pub fn print(&self, text: &str) {
        println!("{}", self.paint(text));
    }

    fn paint(&self, text: &str) -> String {
        match self.color {
            Some("green") => format!("{}", text.green()),
            Some("cyan") => format!("{}", text.cyan()),
            Some("red") => format!("{}", text.red()),
            Some("yellow") => format!("{}", text.yellow()),
            _ => text.to_string(),
        }
    }
}
