//! # Document Buffer
//!
//! The text buffer is the single source of truth for document structure.
//! The editor reads it, applies one compound edit per action, and re-parses.
//!
//! A Document can be:
//! - **Memory-backed**: temporary, for tests or scratch buffers
//! - **File-backed**: loaded from and saved to disk
//!
//! Every change is announced on a broadcast channel, stamped with the new
//! version and whether the programmatic change signal was raised.

use crate::errors::EditorError;
use crate::programmatic::ProgrammaticChange;
use crate::range_editor::CompoundEdit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification sent after every buffer change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferChange {
    pub version: u64,
    pub programmatic: bool,
}

/// Minimal text-buffer contract the session works against
pub trait TextBuffer {
    fn text(&self) -> &str;

    fn version(&self) -> u64;

    /// Apply a validated compound edit as one change
    fn apply(&mut self, edit: &CompoundEdit) -> Result<u64, EditorError>;

    /// Replace the whole text (a user edit from the text view)
    fn set_text(&mut self, text: String) -> u64;

    fn subscribe(&self) -> broadcast::Receiver<BufferChange>;

    /// Signal shared with change listeners
    fn programmatic(&self) -> &ProgrammaticChange;
}

/// Storage backend for document
#[derive(Debug)]
pub enum DocumentStorage {
    /// In-memory only (for testing, temp docs)
    Memory { source: String },

    /// File-backed (single-user editing)
    File { source: String, dirty: bool },
}

/// Editable markup document
#[derive(Debug)]
pub struct Document {
    /// Path to source file (also seeds node uids)
    pub path: PathBuf,

    /// Current version number (increments on each change)
    pub version: u64,

    storage: DocumentStorage,
    changes: broadcast::Sender<BufferChange>,
    programmatic: ProgrammaticChange,
}

impl Document {
    /// Create document from source text (memory-backed)
    pub fn from_source(path: PathBuf, source: String) -> Self {
        Self::with_storage(path, DocumentStorage::Memory { source })
    }

    /// Load document from file (file-backed)
    pub fn load(path: PathBuf) -> Result<Self, EditorError> {
        let source = std::fs::read_to_string(&path)?;
        Ok(Self::with_storage(path, DocumentStorage::File { source, dirty: false }))
    }

    fn with_storage(path: PathBuf, storage: DocumentStorage) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path,
            version: 0,
            storage,
            changes,
            programmatic: ProgrammaticChange::new(),
        }
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        match &self.storage {
            DocumentStorage::File { dirty, .. } => *dirty,
            DocumentStorage::Memory { .. } => false,
        }
    }

    /// Save document to disk (if file-backed)
    pub fn save(&mut self) -> Result<(), EditorError> {
        match &mut self.storage {
            DocumentStorage::File { source, dirty } => {
                std::fs::write(&self.path, source.as_bytes())?;
                *dirty = false;
                Ok(())
            }
            DocumentStorage::Memory { .. } => Err(EditorError::NotFileBacked),
        }
    }

    fn source_mut(&mut self) -> &mut String {
        match &mut self.storage {
            DocumentStorage::Memory { source } => source,
            DocumentStorage::File { source, dirty } => {
                *dirty = true;
                source
            }
        }
    }

    fn announce(&mut self) -> u64 {
        self.version += 1;
        let change = BufferChange {
            version: self.version,
            programmatic: self.programmatic.is_active(),
        };
        // No receivers is fine
        let _ = self.changes.send(change);
        self.version
    }
}

impl TextBuffer for Document {
    fn text(&self) -> &str {
        match &self.storage {
            DocumentStorage::Memory { source } | DocumentStorage::File { source, .. } => source,
        }
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, edit: &CompoundEdit) -> Result<u64, EditorError> {
        if edit.is_empty() {
            return Ok(self.version);
        }
        let next = edit.apply_to(self.text());
        *self.source_mut() = next;
        Ok(self.announce())
    }

    fn set_text(&mut self, text: String) -> u64 {
        *self.source_mut() = text;
        self.announce()
    }

    fn subscribe(&self) -> broadcast::Receiver<BufferChange> {
        self.changes.subscribe()
    }

    fn programmatic(&self) -> &ProgrammaticChange {
        &self.programmatic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_editor::RangeEdit;
    use trellis_parser::LineIndex;

    #[test]
    fn test_create_memory_document() {
        let doc = Document::from_source(PathBuf::from("index.html"), "<p>x</p>".to_string());
        assert_eq!(doc.version, 0);
        assert_eq!(doc.text(), "<p>x</p>");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_changes_are_announced_with_origin() {
        let mut doc = Document::from_source(PathBuf::from("index.html"), "<p>x</p>".to_string());
        let mut rx = doc.subscribe();

        let source = doc.text().to_string();
        let edit = CompoundEdit::new(
            vec![RangeEdit::replace(LineIndex::new(&source).range(3, 4), "y")],
            &source,
        )
        .unwrap();

        {
            let _guard = doc.programmatic().clone().begin();
            assert_eq!(doc.apply(&edit).unwrap(), 1);
        }
        doc.set_text("<p>z</p>".to_string());

        assert_eq!(rx.try_recv().unwrap(), BufferChange { version: 1, programmatic: true });
        assert_eq!(rx.try_recv().unwrap(), BufferChange { version: 2, programmatic: false });
        assert_eq!(doc.text(), "<p>z</p>");
    }

    #[test]
    fn test_file_backed_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "<div></div>").unwrap();

        let mut doc = Document::load(path.clone()).unwrap();
        doc.set_text("<span></span>".to_string());
        assert!(doc.is_dirty());

        doc.save().unwrap();
        assert!(!doc.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<span></span>");
    }

    #[test]
    fn test_memory_document_cannot_save() {
        let mut doc = Document::from_source(PathBuf::from("a.html"), String::new());
        assert!(matches!(doc.save(), Err(EditorError::NotFileBacked)));
    }
}
