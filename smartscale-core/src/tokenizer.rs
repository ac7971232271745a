//! Line-oriented tokenizer for the transform block.
//!
//! Turns raw text into `(section, key, value)` entries. Sections are opened by
//! `[name]` and closed by `[/name]`; there is no nesting, and the closing name
//! is not checked against the open one.

use std::fmt;

const COMMENT_MARKER: char = '#';

/// The section an entry was read under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// Outside of any bracketed section.
    Top,
    /// `[order]`: `index=name` pairs.
    Order,
    /// `[definitions]`: `<id>_<param>=value` pairs.
    Definitions,
    /// Any other section name.
    Other(String),
}

impl Section {
    fn from_name(name: &str) -> Self {
        match name {
            "order" => Section::Order,
            "definitions" => Section::Definitions,
            other => Section::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Top => write!(f, "<top>"),
            Section::Order => write!(f, "order"),
            Section::Definitions => write!(f, "definitions"),
            Section::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A single `key=value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub section: Section,
    pub key: String,
    pub value: String,
    /// 1-based line number within the tokenized text.
    pub line: usize,
}

/// Split `text` into entries.
pub fn tokenize(text: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut current = Section::Top;

    for (line_idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            let name = line.trim_matches(|c| c == '[' || c == ']');
            current = if name.starts_with('/') {
                Section::Top
            } else {
                Section::from_name(name)
            };
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        entries.push(Entry {
            section: current.clone(),
            key: key.trim().to_string(),
            value: value.trim().to_string(),
            line: line_idx + 1,
        });
    }

    entries
}
