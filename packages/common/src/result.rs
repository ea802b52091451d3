use crate::error::TreeError;

/// Result of a tree integrity check
pub type TreeResult<T> = Result<T, TreeError>;
