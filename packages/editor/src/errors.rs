//! Error types for the editor

use thiserror::Error;
use trellis_common::ErrorKind;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] trellis_parser::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Cyclic target: {0}")]
    CyclicTarget(String),

    #[error("Overlapping edits: {0}")]
    OverlappingEdit(String),

    #[error("Document is not file-backed")]
    NotFileBacked,
}

impl EditorError {
    /// Taxonomy class of the failure, if it has one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EditorError::InvalidTarget(_) => Some(ErrorKind::InvalidTarget),
            EditorError::CyclicTarget(_) => Some(ErrorKind::CyclicTarget),
            EditorError::OverlappingEdit(_) => Some(ErrorKind::OverlappingEdit),
            EditorError::Parse(_) | EditorError::Io(_) | EditorError::NotFileBacked => None,
        }
    }

    pub(crate) fn invalid_target(message: impl Into<String>) -> Self {
        EditorError::InvalidTarget(message.into())
    }

    pub(crate) fn cyclic_target(message: impl Into<String>) -> Self {
        EditorError::CyclicTarget(message.into())
    }
}
