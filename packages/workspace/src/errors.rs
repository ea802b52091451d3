//! Error types for project storage and reconciliation

use thiserror::Error;
use trellis_common::{ErrorKind, FileUid, TreeError};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No such entry: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Access to {0} was refused")]
    PermissionDenied(String),
}

impl StorageError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StorageError::PermissionDenied(_) => Some(ErrorKind::PermissionDenied),
            StorageError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Some(ErrorKind::PermissionDenied)
            }
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Parse error: {0}")]
    Parse(#[from] trellis_parser::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("A reconciliation is already in flight")]
    ReconciliationInFlight,

    #[error("Unknown file: {0}")]
    UnknownFile(FileUid),

    #[error("Not a file: {0}")]
    NotAFile(FileUid),

    #[error("Scanned tree is malformed: {0}")]
    MalformedTree(#[from] TreeError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

impl WorkspaceError {
    /// Taxonomy class of the failure, if it has one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            WorkspaceError::PermissionDenied(_) => Some(ErrorKind::PermissionDenied),
            WorkspaceError::ReconciliationInFlight => Some(ErrorKind::ReconciliationInFlight),
            WorkspaceError::Storage(e) => e.kind(),
            _ => None,
        }
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
