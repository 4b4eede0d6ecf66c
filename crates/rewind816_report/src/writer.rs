//! The report document builder.

use std::io::{self, Write};
use thiserror::Error;

/// Columns per indentation level
const INDENT_WIDTH: usize = 2;

/// Report writer error
#[derive(Debug, Error)]
pub enum ReportError {
    /// The destination sink failed
    #[error("could not write report: {0}")]
    Sink(#[from] io::Error),
}

/// Accumulates an ordered, indentation-aware report document
#[derive(Debug, Clone, Default)]
pub struct ReportWriter {
    lines: Vec<String>,
    indentation: usize,
}

impl ReportWriter {
    /// Empty report at indentation level 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            indentation: 0,
        }
    }

    /// Current indentation level
    #[must_use]
    pub fn indentation(&self) -> usize {
        self.indentation
    }

    /// Lines accumulated so far
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Append text at the current indentation level
    ///
    /// Embedded line breaks split the text into multiple lines, each
    /// indented on its own.
    pub fn print(&mut self, text: &str) {
        let prefix = " ".repeat(self.indentation * INDENT_WIDTH);
        for line in text.split('\n') {
            if line.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{}", prefix, line));
            }
        }
    }

    /// Increase the indentation level
    pub fn indent(&mut self) {
        self.indentation += 1;
    }

    /// Decrease the indentation level
    ///
    /// Dedenting below zero is a no-op, tolerating unbalanced script
    /// logic.
    pub fn dedent(&mut self) {
        self.indentation = self.indentation.saturating_sub(1);
    }

    /// Append a comment line at column zero, ignoring indentation
    pub fn comment(&mut self, text: &str) {
        for line in text.split('\n') {
            self.lines.push(format!("; {}", line));
        }
    }

    /// Append a section banner at column zero
    pub fn separator(&mut self, title: &str) {
        const RULE: &str = "; =====================================================================================================";
        self.lines.push(String::new());
        self.lines.push(RULE.to_string());
        self.lines.push(format!("; {}", title));
        self.lines.push(RULE.to_string());
    }

    /// Write the accumulated document verbatim to a sink
    ///
    /// # Errors
    ///
    /// Fails when the sink cannot be written
    pub fn flush<W: Write>(&self, sink: &mut W) -> Result<(), ReportError> {
        for line in &self.lines {
            sink.write_all(line.as_bytes())?;
            sink.write_all(b"\n")?;
        }
        sink.flush()?;
        Ok(())
    }
}
