//! # Edit Session
//!
//! One editor's view of a document: the buffer, the node tree derived from
//! it, the node tree view state and the clipboard.
//!
//! Every structural action runs the same sequence:
//!
//! ```text
//! guard → plan → one compound edit → re-parse → view-state repair
//! ```
//!
//! Uids are renumbered by every parse, so view state is carried across an
//! edit by mapping each referenced node's range through the compound edit
//! and looking up the node with the same range and name in the new tree.

use crate::actions::{ActionContext, ActionEngine, NodeAction, Planned, Reveal};
use crate::document::{BufferChange, Document, TextBuffer};
use crate::errors::EditorError;
use crate::range_editor::CompoundEdit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast::{self, error::TryRecvError};
use trellis_common::{ClipboardEntry, NodeTree, NodeUid, RunningActions, TreeViewState, ViewStateUpdate};
use trellis_parser::TreeParser;

const FOCUS_ACTION: &str = "focus";
const SELECT_ACTION: &str = "select";
const EXPAND_ACTION: &str = "expand";

/// Result of running a node action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionOutcome {
    /// The buffer changed; `revealed` are the nodes the action produced
    Applied { version: u64, revealed: Vec<NodeUid> },
    /// Clipboard captured, buffer untouched
    Captured { uids: Vec<NodeUid> },
    Noop { reason: String },
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied { .. })
    }
}

/// Single editing session over one buffer
pub struct EditSession<B: TextBuffer = Document> {
    buffer: B,
    parser: Box<dyn TreeParser>,
    engine: ActionEngine,
    actions: RunningActions,
    changes: broadcast::Receiver<BufferChange>,
    tree: NodeTree,
    view_state: TreeViewState,
    clipboard: Option<ClipboardEntry>,
}

impl<B: TextBuffer> EditSession<B> {
    /// Create a session and parse the buffer's current text
    pub fn new(
        buffer: B,
        parser: Box<dyn TreeParser>,
        engine: ActionEngine,
        actions: RunningActions,
    ) -> Result<Self, EditorError> {
        let tree = parser.parse(buffer.text())?;
        let changes = buffer.subscribe();
        Ok(Self {
            buffer,
            parser,
            engine,
            actions,
            changes,
            tree,
            view_state: TreeViewState::new(),
            clipboard: None,
        })
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Direct buffer access for user edits; call [`EditSession::sync`]
    /// afterwards
    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    /// Raw node tree of the current buffer
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn valid_tree(&self) -> NodeTree {
        self.tree.valid_tree()
    }

    pub fn view_state(&self) -> &TreeViewState {
        &self.view_state
    }

    pub fn clipboard(&self) -> Option<&ClipboardEntry> {
        self.clipboard.as_ref()
    }

    pub fn set_clipboard(&mut self, entry: Option<ClipboardEntry>) {
        self.clipboard = entry;
    }

    pub fn actions(&self) -> &RunningActions {
        &self.actions
    }

    /// Focus a node. Focusing the focused node is a guarded no-op.
    pub fn focus(&mut self, uid: &str) -> bool {
        let mut scope = self.actions.scope(&[FOCUS_ACTION]);
        if !self.valid_tree().contains(uid) {
            tracing::warn!(uid, "focus on a node that is not an edit target");
            return false;
        }
        let changed = self.view_state.focus(uid);
        if changed {
            scope.applied();
        }
        changed
    }

    /// Replace the selection with the known uids among `uids`
    pub fn select(&mut self, uids: &[NodeUid]) -> bool {
        let mut scope = self.actions.scope(&[SELECT_ACTION]);
        let known: Vec<NodeUid> = uids.iter().filter(|uid| self.tree.contains(uid)).cloned().collect();
        let changed = self.view_state.select(&known);
        if changed {
            scope.applied();
        }
        changed
    }

    pub fn expand(&mut self, uids: &[NodeUid]) {
        let mut scope = self.actions.scope(&[EXPAND_ACTION]);
        let fresh: Vec<NodeUid> = uids
            .iter()
            .filter(|uid| self.tree.contains(uid) && !self.view_state.is_expanded(uid))
            .cloned()
            .collect();
        if !fresh.is_empty() {
            self.view_state.expand(&fresh);
            scope.applied();
        }
    }

    pub fn collapse(&mut self, uids: &[NodeUid]) {
        let mut scope = self.actions.scope(&[EXPAND_ACTION]);
        let open: Vec<NodeUid> = uids
            .iter()
            .filter(|uid| self.view_state.is_expanded(uid))
            .cloned()
            .collect();
        if !open.is_empty() {
            self.view_state.collapse(&open);
            scope.applied();
        }
    }

    /// Absorb buffer changes made outside the session.
    ///
    /// Programmatic changes were already handled by the action that made
    /// them. Any user change triggers a full re-parse and resets the node
    /// view state. Returns true if a re-parse happened.
    pub fn sync(&mut self) -> Result<bool, EditorError> {
        let mut user_edit = false;
        loop {
            match self.changes.try_recv() {
                Ok(change) => user_edit |= !change.programmatic,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "buffer change notifications lagged");
                    user_edit = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if user_edit {
            self.tree = self.parser.parse(self.buffer.text())?;
            self.view_state.clear();
            // Only the text of a clipboard survives an edit we cannot map
            if let Some(entry) = &mut self.clipboard {
                entry.uids.clear();
            }
            tracing::info!(version = self.buffer.version(), "re-parsed after buffer edit");
        }
        Ok(user_edit)
    }

    /// Run one structural action to completion
    pub fn run(&mut self, action: &NodeAction) -> Result<ActionOutcome, EditorError> {
        self.sync()?;

        let name = action.name();
        if self.actions.is_running(name) {
            return Ok(ActionOutcome::Noop {
                reason: format!("{} is already running", name),
            });
        }
        let mut scope = self.actions.scope(&[name]);
        let signal = self.buffer.programmatic().clone();
        let _programmatic = signal.begin();

        let planned = self.engine.plan(
            action,
            &ActionContext {
                source: self.buffer.text(),
                tree: &self.tree,
                view: &self.view_state,
                clipboard: self.clipboard.as_ref(),
            },
        );
        let plan = match planned {
            Ok(Planned::Edit(plan)) => plan,
            Ok(Planned::Capture(entry)) => {
                let uids = entry.uids.clone();
                self.clipboard = Some(entry);
                scope.applied();
                return Ok(ActionOutcome::Captured { uids });
            }
            Ok(Planned::Noop(reason)) => return Ok(ActionOutcome::Noop { reason }),
            Err(e) => {
                tracing::warn!(action = name, error = %e, "action rejected");
                return Err(e);
            }
        };

        let compound = CompoundEdit::new(plan.edits, self.buffer.text())?;
        let version = self.buffer.apply(&compound)?;
        let tree = self.parser.parse(self.buffer.text())?;
        self.discard_own_changes();

        if let Some(entry) = plan.clipboard {
            self.clipboard = Some(entry);
        }
        let revealed = self.repair_view_state(&tree, &compound, &plan.reveal, &plan.renames);
        self.tree = tree;
        scope.applied();

        tracing::info!(action = name, version, revealed = revealed.len(), "applied action");
        Ok(ActionOutcome::Applied { version, revealed })
    }

    fn discard_own_changes(&mut self) {
        while let Ok(change) = self.changes.try_recv() {
            if !change.programmatic {
                tracing::warn!(version = change.version, "user edit arrived during an action");
            }
        }
    }

    /// Carry the view state and clipboard over to `new` and select what the
    /// action produced. Returns the revealed uids.
    fn repair_view_state(
        &mut self,
        new: &NodeTree,
        edit: &CompoundEdit,
        reveal: &[Reveal],
        renames: &[(NodeUid, String)],
    ) -> Vec<NodeUid> {
        let index = new.identity_index();
        let renames: HashMap<&str, &str> = renames.iter().map(|(uid, name)| (uid.as_str(), name.as_str())).collect();
        let old = &self.tree;
        let map_uid = |uid: &str| -> Option<NodeUid> {
            let node = old.get(uid)?;
            let (start, end) = node.source_range?.span();
            let (start, end) = edit.map_range(start, end)?;
            let name = renames.get(uid).copied().unwrap_or(node.name.as_str());
            index.get(&(start, end, name)).map(|uid| uid.to_string())
        };

        if let Some(entry) = &mut self.clipboard {
            let before = entry.uids.len();
            entry.uids = entry.uids.iter().filter_map(|uid| map_uid(uid.as_str())).collect();
            entry.captured_from = new.valid_tree();
            if entry.uids.len() < before {
                tracing::debug!(dropped = before - entry.uids.len(), "clipboard nodes no longer in the document");
            }
        }

        let mut update = ViewStateUpdate::default();
        for uid in self.view_state.referenced_uids() {
            let mapped = map_uid(uid.as_str());
            match mapped {
                Some(new_uid) if new_uid != uid => update.converted_uids.push((uid, new_uid)),
                Some(_) => {}
                None => update.deleted_uids.push(uid),
            }
        }
        tracing::debug!(
            converted = update.converted_uids.len(),
            deleted = update.deleted_uids.len(),
            "repairing node view state"
        );
        self.view_state.apply(&update);
        self.view_state.retain_existing(|uid| new.contains(uid));

        let mut revealed: Vec<NodeUid> = Vec::new();
        for item in reveal {
            let offset = match *item {
                Reveal::Inserted { edit: i, at } => edit.new_offset_of(i).map(|o| o + at),
                Reveal::Existing { start } => edit.map_offset(start),
            };
            let Some(node) = offset.and_then(|o| new.find_by_start(o)) else {
                continue;
            };
            if node.is_entity && !revealed.contains(&node.uid) {
                revealed.push(node.uid.clone());
            }
        }

        if let Some(first) = revealed.first() {
            self.view_state.focus(first);
            self.view_state.select(&revealed);
            let ancestors: Vec<NodeUid> = revealed
                .iter()
                .filter_map(|uid| new.get(uid).and_then(|n| n.parent_uid.clone()))
                .collect();
            self.view_state.expand(&ancestors);
        }
        revealed
    }
}
