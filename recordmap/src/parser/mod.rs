pub mod error;

pub use error::ParseError;

use crate::record_map::RecordMap;

/// Loads a record map from its JSON form.
///
/// This is a structural load: shapes are checked by serde, nothing else is
/// validated. Dangling child ids and unknown block types are left for the
/// renderer to degrade on.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    pub fn parse(&self) -> Result<RecordMap, Vec<ParseError>> {
        serde_json::from_str(&self.source).map_err(|err| {
            let offset = line_column_to_offset(&self.source, err.line(), err.column());
            let end = (offset + 1).min(self.source.len()).max(offset);
            let category = match err.classify() {
                serde_json::error::Category::Io => "I/O failure",
                serde_json::error::Category::Syntax => "the input is not valid JSON",
                serde_json::error::Category::Data => "the JSON does not have the record map shape",
                serde_json::error::Category::Eof => "the input ended early",
            };
            vec![
                ParseError::error(strip_position(&err), offset..end, self.file_id)
                    .with_note(category),
            ]
        })
    }
}

/// serde_json appends " at line L column C"; the span already carries that.
fn strip_position(err: &serde_json::Error) -> String {
    let message = err.to_string();
    match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    }
}

/// Convert serde_json's 1-based line and column into a byte offset.
fn line_column_to_offset(source: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}
