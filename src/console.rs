//! Terminal output for the CLI.
//!
//! Labels are colored only when stdout is a terminal and `NO_COLOR` is unset.

use crate::processor::ProcessedDocument;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Duration;

/// ANSI styles used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Dim,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Bold => "1",
            Style::Dim => "2",
            Style::Red => "31",
            Style::Green => "32",
            Style::Yellow => "33",
            Style::Blue => "34",
            Style::Magenta => "35",
            Style::Cyan => "36",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Message kinds, each printed behind its own label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Step,
    Info,
    Ok,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> (&'static str, Style) {
        match self {
            Level::Step => ("STEP", Style::Cyan),
            Level::Info => ("INFO", Style::Blue),
            Level::Ok => ("OK", Style::Green),
            Level::Warn => ("WARN", Style::Yellow),
            Level::Error => ("ERROR", Style::Red),
        }
    }
}

#[derive(Debug)]
pub struct Console {
    colors_enabled: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            colors_enabled: std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal(),
        }
    }

    pub fn with_colors(enabled: bool) -> Self {
        Self {
            colors_enabled: enabled,
        }
    }

    pub fn style(&self, text: &str, styles: &[Style]) -> String {
        if !self.colors_enabled || styles.is_empty() {
            return text.to_string();
        }
        let codes: Vec<&str> = styles.iter().map(|s| s.code()).collect();
        format!("\x1b[{}m{}{}", codes.join(";"), text, RESET)
    }

    fn line(&self, level: Level, message: &str) -> String {
        let (label, color) = level.label();
        format!("[{}] {}", self.style(label, &[color, Style::Bold]), message)
    }

    pub fn step(&self, message: &str) {
        println!("{}", self.line(Level::Step, message));
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.line(Level::Info, message));
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.line(Level::Ok, message));
    }

    pub fn warning(&self, message: &str) {
        println!("{}", self.line(Level::Warn, message));
    }

    /// Errors go to stderr so they survive `> out.log`.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(Level::Error, message));
    }

    pub fn section(&self, title: &str) {
        println!();
        println!("{}", self.style(title, &[Style::Magenta, Style::Bold]));
    }

    pub fn muted(&self, text: &str) -> String {
        self.style(text, &[Style::Dim])
    }

    pub fn count(&self, n: usize) -> String {
        self.style(&n.to_string(), &[Style::Green, Style::Bold])
    }

    pub fn path(&self, path: &Path) -> String {
        self.style(&path.display().to_string(), &[Style::Cyan])
    }

    /// Summary lines for a translated document.
    pub fn report_lines(&self, processed: &ProcessedDocument, elapsed: Duration) -> Vec<String> {
        let mut lines = vec![self.line(
            Level::Ok,
            &format!(
                "Translated {} units in {} requests {}",
                self.count(processed.leaf_count),
                self.count(processed.requests),
                self.muted(&format!("({:.1}s)", elapsed.as_secs_f64()))
            ),
        )];
        if processed.branch_count > 0 {
            lines.push(self.line(
                Level::Info,
                &format!(
                    "Split {} oversized elements",
                    self.count(processed.branch_count)
                ),
            ));
        }
        if processed.placeholder_count > 0 {
            lines.push(self.line(
                Level::Info,
                &format!(
                    "Protected {} untranslatable elements",
                    self.count(processed.placeholder_count)
                ),
            ));
        }
        if !processed.unresolved_placeholders.is_empty() {
            lines.push(self.line(
                Level::Warn,
                &format!(
                    "Output contains unresolved placeholders: {}",
                    processed.unresolved_placeholders.join(", ")
                ),
            ));
        }
        lines
    }

    pub fn report(&self, processed: &ProcessedDocument, elapsed: Duration) {
        for line in self.report_lines(processed, elapsed) {
            println!("{line}");
        }
    }
}
