//! # Trellis Common
//!
//! Shared data model for the structural editor: the document node tree, the
//! project file tree, tree view state and the action concurrency guard.

pub mod error;
pub mod file;
pub mod node;
pub mod result;
pub mod running_actions;
pub mod tree;
pub mod view_state;
pub mod visitor;

pub use error::*;
pub use file::*;
pub use node::*;
pub use result::*;
pub use running_actions::*;
pub use tree::*;
pub use view_state::*;
pub use visitor::*;
