//! # Project State
//!
//! Owns the installed file tree, the handler map and what the editor is
//! looking at: the current file, its preview target and its node trees.
//!
//! A reload applies the reconciler's result in a fixed order so that no view
//! state ever names a uid that is missing from the installed tree:
//!
//! ```text
//! 1. repair steps for a deleted open file (preview, node tree, current file, fallback)
//! 2. file tree view state: convert, then delete
//! 3. install tree and handler map wholesale
//! 4. open the fallback file, if any
//! ```
//!
//! Every step is published as a [`WorkspaceEvent`].

use crate::config::ProjectConfig;
use crate::errors::{WorkspaceError, WorkspaceResult};
use crate::reconciler::{Reconciler, RepairStep};
use crate::storage::{verify_permission, HandlerMap, ProjectStorage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use trellis_common::{FileTree, FileUid, NodeTree, TreeViewState, ViewStateUpdate};
use trellis_parser::{MarkupParser, ReferenceData, TreeParser};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable state transitions, in the order they happen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WorkspaceEvent {
    PreviewCleared,
    NodeTreeCleared,
    CurrentFileCleared,
    FallbackSelected { uid: Option<FileUid> },
    ViewStateRepaired { deleted: usize, converted: usize },
    TreeInstalled { files: usize },
    FileOpened { uid: FileUid },
}

/// Summary of one reload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadReport {
    pub files: usize,
    pub deleted_uids: Vec<FileUid>,
    pub converted_uids: Vec<(FileUid, FileUid)>,
    /// The open file was deleted and this replaced it
    pub fallback: Option<FileUid>,
}

pub struct Workspace {
    reconciler: Reconciler,
    config: ProjectConfig,
    reference: ReferenceData,
    file_tree: FileTree,
    handlers: HandlerMap,
    file_view_state: TreeViewState,
    current_file: Option<FileUid>,
    preview: Option<FileUid>,
    node_tree: Option<NodeTree>,
    valid_node_tree: Option<NodeTree>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl Workspace {
    /// Workspace with nothing scanned yet
    pub fn new(storage: Arc<dyn ProjectStorage>, config: ProjectConfig, reference: ReferenceData) -> Self {
        let reconciler = Reconciler::new(storage).with_ignore(config.ignore.iter().cloned());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            reconciler,
            config,
            reference,
            file_tree: FileTree::new(),
            handlers: HandlerMap::new(),
            file_view_state: TreeViewState::new(),
            current_file: None,
            preview: None,
            node_tree: None,
            valid_node_tree: None,
            events,
        }
    }

    /// Scan the project and open the initial file if it exists
    pub async fn load(
        storage: Arc<dyn ProjectStorage>,
        config: ProjectConfig,
        reference: ReferenceData,
    ) -> WorkspaceResult<Self> {
        let mut workspace = Self::new(storage, config, reference);
        workspace.reload().await?;

        if let Some(uid) = workspace.config.initial_file_uid() {
            if workspace.file_tree.get(&uid).map(|n| !n.is_directory()).unwrap_or(false) {
                workspace.open_file(&uid).await?;
            } else {
                tracing::warn!(%uid, "initial file not found");
            }
        }
        Ok(workspace)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn storage(&self) -> &Arc<dyn ProjectStorage> {
        self.reconciler.storage()
    }

    pub fn file_tree(&self) -> &FileTree {
        &self.file_tree
    }

    pub fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }

    pub fn file_view_state(&self) -> &TreeViewState {
        &self.file_view_state
    }

    pub fn file_view_state_mut(&mut self) -> &mut TreeViewState {
        &mut self.file_view_state
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn node_tree(&self) -> Option<&NodeTree> {
        self.node_tree.as_ref()
    }

    pub fn valid_node_tree(&self) -> Option<&NodeTree> {
        self.valid_node_tree.as_ref()
    }

    fn publish(&self, event: WorkspaceEvent) {
        tracing::debug!(?event, "workspace event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Rescan storage and install the result
    pub async fn reload(&mut self) -> WorkspaceResult<ReloadReport> {
        let result = self.reconciler.reconcile(&self.file_tree).await?;

        let initial = self.config.initial_file_uid();
        let steps = result.repair_steps(&self.file_tree, self.current_file.as_deref(), initial.as_deref());
        let mut fallback = None;
        for step in steps {
            match step {
                RepairStep::ClearPreview => {
                    self.preview = None;
                    self.publish(WorkspaceEvent::PreviewCleared);
                }
                RepairStep::ClearNodeTree => {
                    self.node_tree = None;
                    self.valid_node_tree = None;
                    self.publish(WorkspaceEvent::NodeTreeCleared);
                }
                RepairStep::ClearCurrentFile => {
                    self.current_file = None;
                    self.publish(WorkspaceEvent::CurrentFileCleared);
                }
                RepairStep::OpenFallback(uid) => {
                    self.publish(WorkspaceEvent::FallbackSelected { uid: uid.clone() });
                    fallback = uid;
                }
            }
        }

        // A renamed open file keeps its content under the new uid
        if let Some(new_uid) = self.current_file.as_deref().and_then(|uid| result.converted(uid)) {
            self.current_file = Some(new_uid.clone());
        }
        if let Some(new_uid) = self.preview.as_deref().and_then(|uid| result.converted(uid)) {
            self.preview = Some(new_uid.clone());
        }
        let update = ViewStateUpdate {
            deleted_uids: result.deleted_uids.clone(),
            converted_uids: result.converted_uids.clone(),
        };
        self.file_view_state.apply(&update);
        self.file_view_state.retain_existing(|uid| result.tree.contains(uid));
        self.publish(WorkspaceEvent::ViewStateRepaired {
            deleted: update.deleted_uids.len(),
            converted: update.converted_uids.len(),
        });

        let previous = std::mem::replace(&mut self.file_tree, result.tree);
        self.handlers = result.handlers;
        // Loaded contents survive a rescan for files that kept their identity
        for node in previous.nodes() {
            let Some(content) = &node.content else {
                continue;
            };
            let uid = result
                .converted_uids
                .iter()
                .find(|(old, _)| old == &node.uid)
                .map(|(_, new)| new.as_str())
                .unwrap_or(node.uid.as_str());
            if let Some(installed) = self.file_tree.get_mut(uid).filter(|n| n.handler == node.handler) {
                installed.content = Some(content.clone());
            }
        }
        self.publish(WorkspaceEvent::TreeInstalled {
            files: self.file_tree.len(),
        });

        if let Some(uid) = &fallback {
            self.open_file(uid).await?;
        }

        tracing::info!(
            files = self.file_tree.len(),
            deleted = update.deleted_uids.len(),
            converted = update.converted_uids.len(),
            "reloaded project"
        );
        Ok(ReloadReport {
            files: self.file_tree.len(),
            deleted_uids: update.deleted_uids,
            converted_uids: update.converted_uids,
            fallback,
        })
    }

    /// Load a file's content through its handle and make it the current file
    pub async fn open_file(&mut self, uid: &str) -> WorkspaceResult<&NodeTree> {
        let node = self
            .file_tree
            .get(uid)
            .ok_or_else(|| WorkspaceError::UnknownFile(uid.to_string()))?;
        if node.is_directory() {
            return Err(WorkspaceError::NotAFile(uid.to_string()));
        }
        let handle = self
            .handlers
            .get(&node.handler)
            .ok_or_else(|| WorkspaceError::UnknownFile(uid.to_string()))?
            .clone();

        let storage = self.reconciler.storage().clone();
        if !verify_permission(storage.as_ref(), &handle).await {
            tracing::warn!(%uid, "open refused");
            return Err(WorkspaceError::PermissionDenied(handle.path));
        }
        let content = storage.read(&handle).await?;

        let parser = MarkupParser::with_reference(&handle.path, &self.reference);
        let tree = parser.parse(&content)?;
        self.valid_node_tree = Some(tree.valid_tree());

        if let Some(node) = self.file_tree.get_mut(uid) {
            node.content = Some(content);
        }
        self.current_file = Some(uid.to_string());
        self.preview = Some(uid.to_string());
        tracing::info!(%uid, nodes = tree.len(), "opened file");
        self.publish(WorkspaceEvent::FileOpened { uid: uid.to_string() });

        Ok(self.node_tree.insert(tree))
    }

    /// Content of the current file, as last loaded
    pub fn current_content(&self) -> Option<&str> {
        self.current_file
            .as_deref()
            .and_then(|uid| self.file_tree.get(uid))
            .and_then(|node| node.content.as_deref())
    }
}
