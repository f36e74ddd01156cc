//! Multi-format transfer payloads.

use serde::{Deserialize, Serialize};

/// Plain text MIME type. Carries node paths.
pub const TEXT_PLAIN: &str = "text/plain";
/// JSON MIME type. Carries encoded node subtrees.
pub const APPLICATION_JSON: &str = "application/json";

/// A single typed entry in a [`MimeData`] payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeEntry {
    /// The MIME type of `data`.
    pub mime_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl MimeEntry {
    /// Interpret the data as UTF-8 text.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Data carried by the clipboard or a drag operation.
///
/// Unlike a map keyed by type, entries are kept in insertion order and a type
/// may repeat: a multi-node copy stores one `text/plain` path followed by
/// one encoded subtree per node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeData {
    entries: Vec<MimeEntry>,
}

impl MimeData {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the payload holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Appends raw data of the given type.
    pub fn push(&mut self, mime_type: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.push(MimeEntry {
            mime_type: mime_type.into(),
            data: data.into(),
        });
    }

    /// Appends plain text.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.push(TEXT_PLAIN, text.into().into_bytes());
    }

    /// Appends every entry of another payload.
    pub fn extend(&mut self, other: MimeData) {
        self.entries.extend(other.entries);
    }

    /// All entries in order.
    pub fn entries(&self) -> &[MimeEntry] {
        &self.entries
    }

    /// Iterates over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &MimeEntry> {
        self.entries.iter()
    }

    /// Checks if any entry has the given MIME type.
    pub fn has_format(&self, mime_type: &str) -> bool {
        self.entries.iter().any(|e| e.mime_type == mime_type)
    }

    /// All text entries, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.mime_type == TEXT_PLAIN)
            .filter_map(MimeEntry::text)
    }

    /// Returns the payload unchanged if it holds any of `types`, else `None`.
    ///
    /// An empty filter accepts any non-empty payload.
    pub fn matching(self, types: &[&str]) -> Option<Self> {
        if self.is_empty() {
            return None;
        }
        if types.is_empty() || types.iter().any(|t| self.has_format(t)) {
            Some(self)
        } else {
            None
        }
    }
}

impl<'a> IntoIterator for &'a MimeData {
    type Item = &'a MimeEntry;
    type IntoIter = std::slice::Iter<'a, MimeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
