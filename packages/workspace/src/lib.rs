//! # Trellis Workspace
//!
//! Project-level state: the file tree scanned from storage, the open file
//! and its node tree, configuration and file watching.

pub mod config;
pub mod errors;
pub mod reconciler;
pub mod state;
pub mod storage;
pub mod watcher;

pub use config::{ProjectConfig, DEFAULT_CONFIG_NAME};
pub use errors::{StorageError, WorkspaceError, WorkspaceResult};
pub use reconciler::{Reconciler, Reconciliation, RepairStep};
pub use state::{ReloadReport, Workspace, WorkspaceEvent};
pub use storage::{verify_permission, HandlerMap, LocalStorage, MemoryStorage, Permission, ProjectStorage, StorageHandle};
pub use watcher::{ChangeBatch, FileWatcher};
