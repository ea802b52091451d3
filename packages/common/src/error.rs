use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes shared by the edit engine and the file tree reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or invalid source range on an intended edit point
    InvalidTarget,
    /// A move or paste would place a node inside itself
    CyclicTarget,
    /// Two computed ranges overlap (selection merge bug)
    OverlappingEdit,
    /// Storage access refused
    PermissionDenied,
    /// A reconciliation run is already in flight
    ReconciliationInFlight,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidTarget => "invalid target",
            ErrorKind::CyclicTarget => "cyclic target",
            ErrorKind::OverlappingEdit => "overlapping edit",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::ReconciliationInFlight => "reconciliation in flight",
        };
        f.write_str(name)
    }
}

/// Structural problems found by tree integrity checks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Missing root node: {0}")]
    MissingRoot(String),

    #[error("Node {parent} lists unknown child {child}")]
    DanglingChild { parent: String, child: String },

    #[error("Node {0} is not reachable from the root")]
    Orphan(String),

    #[error("Node {child} is listed under {listed} but its parent is {actual:?}")]
    ParentMismatch {
        child: String,
        listed: String,
        actual: Option<String>,
    },

    #[error("Node {0} appears more than once")]
    Duplicate(String),

    #[error("Children of {0} are not in document order")]
    SiblingOrder(String),

    #[error("Range of {child} escapes its parent {parent}")]
    RangeContainment { parent: String, child: String },
}
