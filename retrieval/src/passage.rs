//! Passage text stored alongside the vector index.

use serde::{Deserialize, Serialize};

/// A unit of retrievable text and whatever else its record carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,

    /// Remaining fields of the source record.
    pub metadata: Option<serde_json::Value>,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Append-only passage list. A passage's id is its position, matching the
/// id of the vector inserted for it.
#[derive(Debug, Clone, Default)]
pub struct PassageStore {
    passages: Vec<Passage>,
}

impl PassageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append passages, returning the id of the first one.
    pub fn extend(&mut self, passages: impl IntoIterator<Item = Passage>) -> usize {
        let first = self.passages.len();
        self.passages.extend(passages);
        first
    }

    pub fn get(&self, id: usize) -> Option<&Passage> {
        self.passages.get(id)
    }

    /// Text of the passage with the given id.
    pub fn text(&self, id: usize) -> Option<&str> {
        self.get(id).map(|p| p.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter()
    }
}
