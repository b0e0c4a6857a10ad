use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One text run of a rich-text property.
///
/// On the wire a run is a JSON array: `["text"]` or
/// `["text", [["b"], ["a", "https://example.com"]]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Value>", into = "Vec<Value>")]
pub struct Decoration {
    pub text: String,
    /// Raw format entries; the first element of each is the format code.
    pub formats: Vec<Vec<Value>>,
}

impl Decoration {
    pub fn plain(text: impl Into<String>) -> Self {
        Decoration {
            text: text.into(),
            formats: Vec::new(),
        }
    }

    /// Target of an `a` (link) format, if the run carries one.
    pub fn link(&self) -> Option<&str> {
        self.formats.iter().find_map(|format| match format.as_slice() {
            [Value::String(code), Value::String(href), ..] if code == "a" => Some(href.as_str()),
            _ => None,
        })
    }
}

impl From<Vec<Value>> for Decoration {
    fn from(raw: Vec<Value>) -> Self {
        let mut parts = raw.into_iter();
        let text = match parts.next() {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let formats = match parts.next() {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::Array(format) => Some(format),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Decoration { text, formats }
    }
}

impl From<Decoration> for Vec<Value> {
    fn from(decoration: Decoration) -> Self {
        let mut raw = vec![Value::String(decoration.text)];
        if !decoration.formats.is_empty() {
            raw.push(Value::Array(
                decoration.formats.into_iter().map(Value::Array).collect(),
            ));
        }
        raw
    }
}

/// A rich-text property value: an ordered sequence of text runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Decoration>);

impl RichText {
    /// A single undecorated run.
    pub fn plain(text: impl Into<String>) -> Self {
        RichText(vec![Decoration::plain(text)])
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.0
    }

    /// Concatenated text of every run, formats dropped.
    pub fn plain_text(&self) -> String {
        self.0.iter().map(|d| d.text.as_str()).collect()
    }

    /// True when there are no runs or every run is empty.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|d| d.text.is_empty())
    }
}

impl fmt::Display for RichText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decoration in &self.0 {
            write!(f, "{}", decoration.text)?;
        }
        Ok(())
    }
}
