use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// A record map that failed to load, located in its source text.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    /// Byte span of the offending input.
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            message: message.into(),
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_message(&self.message)
            .with_labels(vec![
                Label::primary(self.file_id, self.span.clone())
                    .with_message("record map stops loading here"),
            ])
            .with_notes(self.notes.clone())
    }
}
