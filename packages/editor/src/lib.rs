//! # Trellis Editor
//!
//! Structural edit engine for markup documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ actions: validate intent against valid tree │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ range_editor: one compound text edit        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: buffer + change notifications     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ parser: text → node tree, view-state repair │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Text is source of truth**: the node tree is always re-derived
//! 2. **One edit per action**: all ranges are computed against one snapshot
//! 3. **Validate before mutating**: a rejected action leaves the buffer alone
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_editor::{Document, EditSession, ActionEngine, NodeAction};
//!
//! let doc = Document::load("index.html".into())?;
//! let mut session = EditSession::new(doc, Box::new(MarkupParser::new("index.html")),
//!     ActionEngine::default(), RunningActions::new())?;
//!
//! session.select(&[uid]);
//! session.run(&NodeAction::Duplicate)?;
//! ```

mod actions;
mod document;
mod errors;
mod programmatic;
mod range_editor;
mod session;

pub use actions::{
    merge_selection, ActionContext, ActionEngine, ActionPlan, NodeAction, Planned, Reveal, DEFAULT_GROUP_CONTAINER,
};
pub use document::{BufferChange, Document, DocumentStorage, TextBuffer};
pub use errors::EditorError;
pub use programmatic::{ProgrammaticChange, ProgrammaticGuard};
pub use range_editor::{CompoundEdit, RangeEdit};
pub use session::{ActionOutcome, EditSession};
