//! # Node Actions
//!
//! Structural operations on the document, expressed as text edits.
//!
//! Planning is pure: an action is validated against the current valid tree
//! and turned into a list of [`RangeEdit`]s plus a description of which nodes
//! to reveal once the buffer has been re-parsed. Nothing here touches the
//! buffer; the session applies the plan as a single compound edit.
//!
//! ## Targets
//!
//! - `add`, `rename` and `paste` act on the focused node
//! - `cut`, `copy`, `delete`, `duplicate`, `move`, `group` and `ungroup` act
//!   on the selection
//!
//! Precondition failures are either a [`Planned::Noop`] (nothing to do) or an
//! [`EditorError`] carrying an `ErrorKind` (the request itself is wrong).

use crate::errors::EditorError;
use crate::range_editor::RangeEdit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trellis_common::{ClipboardEntry, ClipboardMode, Node, NodeTree, NodeUid, TreeViewState, ROOT_NODE_NAME, TEXT_NODE_NAME};
use trellis_parser::{LineIndex, ReferenceData, Serializer};

pub const DEFAULT_GROUP_CONTAINER: &str = "div";

/// Structural operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeAction {
    Add {
        node_type: String,
    },
    Cut,
    Copy,
    Paste {
        #[serde(default)]
        span_paste: bool,
    },
    Delete,
    Duplicate,
    Move {
        target_uid: NodeUid,
        #[serde(default)]
        is_between: bool,
        #[serde(default)]
        position: usize,
    },
    Rename {
        node_type: String,
    },
    Group {
        #[serde(default)]
        container: Option<String>,
    },
    Ungroup,
}

impl NodeAction {
    /// Name registered with the action guard while the action runs
    pub fn name(&self) -> &'static str {
        match self {
            NodeAction::Add { .. } => "add",
            NodeAction::Cut => "cut",
            NodeAction::Copy => "copy",
            NodeAction::Paste { .. } => "paste",
            NodeAction::Delete => "delete",
            NodeAction::Duplicate => "duplicate",
            NodeAction::Move { .. } => "move",
            NodeAction::Rename { .. } => "rename",
            NodeAction::Group { .. } => "group",
            NodeAction::Ungroup => "ungroup",
        }
    }
}

/// A node the session should select after re-parse, located by where its
/// text lands in the new buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// Starts `at` bytes into the text inserted by edit `edit`
    Inserted { edit: usize, at: usize },
    /// Existing node starting at this offset of the old buffer
    Existing { start: usize },
}

/// Edits and follow-up for one action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPlan {
    pub edits: Vec<RangeEdit>,
    pub reveal: Vec<Reveal>,
    /// Clipboard captured by the action (cut)
    pub clipboard: Option<ClipboardEntry>,
    /// Nodes whose tag name changes, with the new name
    pub renames: Vec<(NodeUid, String)>,
}

impl ActionPlan {
    fn new(edits: Vec<RangeEdit>) -> Self {
        Self {
            edits,
            reveal: vec![],
            clipboard: None,
            renames: vec![],
        }
    }

    fn revealing(mut self, reveal: Vec<Reveal>) -> Self {
        self.reveal = reveal;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Planned {
    Edit(ActionPlan),
    /// Clipboard capture without a buffer change (copy)
    Capture(ClipboardEntry),
    Noop(String),
}

/// Everything an action is validated against
pub struct ActionContext<'a> {
    pub source: &'a str,
    pub tree: &'a NodeTree,
    pub view: &'a TreeViewState,
    pub clipboard: Option<&'a ClipboardEntry>,
}

/// Plans node actions against reference data
#[derive(Debug, Clone)]
pub struct ActionEngine {
    reference: ReferenceData,
    group_container: String,
}

impl Default for ActionEngine {
    fn default() -> Self {
        Self::new(ReferenceData::html())
    }
}

impl ActionEngine {
    pub fn new(reference: ReferenceData) -> Self {
        Self {
            reference,
            group_container: DEFAULT_GROUP_CONTAINER.to_string(),
        }
    }

    pub fn with_group_container(mut self, container: impl Into<String>) -> Self {
        self.group_container = container.into();
        self
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn plan(&self, action: &NodeAction, ctx: &ActionContext) -> Result<Planned, EditorError> {
        let planner = Planner {
            engine: self,
            ctx,
            lines: LineIndex::new(ctx.source),
            valid: ctx.tree.valid_tree(),
        };

        let planned = match action {
            NodeAction::Add { node_type } => planner.add(node_type),
            NodeAction::Cut => planner.cut(),
            NodeAction::Copy => planner.copy(),
            NodeAction::Paste { span_paste } => planner.paste(*span_paste),
            NodeAction::Delete => planner.delete(),
            NodeAction::Duplicate => planner.duplicate(),
            NodeAction::Move {
                target_uid,
                is_between,
                position,
            } => planner.move_to(target_uid, *is_between, *position),
            NodeAction::Rename { node_type } => planner.rename(node_type),
            NodeAction::Group { container } => planner.group(container.as_deref()),
            NodeAction::Ungroup => planner.ungroup(),
        }?;

        match &planned {
            Planned::Edit(plan) => {
                tracing::debug!(action = action.name(), edits = plan.edits.len(), "planned action")
            }
            Planned::Capture(entry) => {
                tracing::debug!(action = action.name(), nodes = entry.uids.len(), "captured clipboard")
            }
            Planned::Noop(reason) => tracing::debug!(action = action.name(), %reason, "action is a no-op"),
        }
        Ok(planned)
    }
}

/// Drop selected uids that are not valid edit targets or that sit inside
/// another selected node, then order by start offset.
pub fn merge_selection(tree: &NodeTree, uids: &[NodeUid]) -> Vec<NodeUid> {
    let candidates: HashSet<&str> = uids
        .iter()
        .map(String::as_str)
        .filter(|uid| {
            tree.get(uid)
                .map(|n| !n.is_root() && n.source_range.is_some())
                .unwrap_or(false)
        })
        .collect();

    let mut merged: Vec<&Node> = candidates
        .iter()
        .filter(|uid| !candidates.iter().any(|other| tree.is_ancestor(other, uid)))
        .filter_map(|uid| tree.get(uid))
        .collect();
    merged.sort_by_key(|n| n.source_range.map(|r| r.start_offset));
    merged.into_iter().map(|n| n.uid.clone()).collect()
}

struct Planner<'e, 'a> {
    engine: &'e ActionEngine,
    ctx: &'e ActionContext<'a>,
    lines: LineIndex<'a>,
    valid: NodeTree,
}

impl<'e, 'a> Planner<'e, 'a> {
    fn node(&self, uid: &str) -> Option<&Node> {
        self.valid.get(uid)
    }

    /// The focused node, or None if nothing is focused. A focus that does
    /// not resolve in the valid tree is an invalid target.
    fn focused(&self) -> Result<Option<&Node>, EditorError> {
        match self.ctx.view.focused_item.as_deref() {
            None => Ok(None),
            Some(uid) => self
                .node(uid)
                .map(Some)
                .ok_or_else(|| EditorError::invalid_target(format!("focused node {} is not a valid node", uid))),
        }
    }

    fn span(node: &Node) -> Result<(usize, usize), EditorError> {
        node.source_range
            .map(|r| r.span())
            .ok_or_else(|| EditorError::invalid_target(format!("node {} has no source range", node.uid)))
    }

    fn text_of(&self, node: &Node) -> Result<&'a str, EditorError> {
        let (start, end) = Self::span(node)?;
        self.ctx
            .source
            .get(start..end)
            .ok_or_else(|| EditorError::invalid_target(format!("node {} is outside the buffer", node.uid)))
    }

    fn insert_at(&self, offset: usize, text: String) -> RangeEdit {
        RangeEdit::insert(self.lines.point(offset), text)
    }

    fn delete_span(&self, start: usize, end: usize) -> RangeEdit {
        RangeEdit::delete(self.lines.range(start, end))
    }

    fn merged_selection(&self) -> Vec<&Node> {
        merge_selection(&self.valid, &self.ctx.view.selected_items)
            .iter()
            .filter_map(|uid| self.valid.get(uid))
            .collect()
    }

    fn can_hold_children(&self, node: &Node) -> bool {
        node.is_root() || (node.is_element() && !self.engine.reference.is_void(&node.name))
    }

    /// Offset where new last children of `node` go
    fn append_offset(&self, node: &Node) -> Result<usize, EditorError> {
        let (_, end) = Self::span(node)?;
        Ok(node.end_tag.map(|tag| tag.start_offset).unwrap_or(end))
    }

    fn capture(&self, mode: ClipboardMode) -> Result<Option<ClipboardEntry>, EditorError> {
        let nodes = self.merged_selection();
        if nodes.is_empty() {
            return Ok(None);
        }
        let text_fragments = nodes
            .iter()
            .map(|n| self.text_of(n).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(ClipboardEntry {
            uids: nodes.iter().map(|n| n.uid.clone()).collect(),
            mode,
            text_fragments,
            captured_from: self.valid.clone(),
        }))
    }

    fn add(&self, node_type: &str) -> Result<Planned, EditorError> {
        let target = match self.focused()? {
            Some(node) => node,
            None => match self.valid.root() {
                Some(root) => root,
                None => return Ok(Planned::Noop("document has no root".into())),
            },
        };
        Self::span(target)?;

        if !self.can_hold_children(target) {
            return Ok(Planned::Noop(format!("<{}> cannot contain children", target.name)));
        }
        if !self.engine.reference.allows(&target.name, node_type) {
            return Ok(Planned::Noop(format!("<{}> is not allowed in <{}>", node_type, target.name)));
        }

        let offset = match target.start_tag {
            Some(tag) => tag.end_offset,
            None => 0,
        };
        let markup = Serializer::new(&self.engine.reference).element(node_type)?;
        Ok(Planned::Edit(
            ActionPlan::new(vec![self.insert_at(offset, markup)]).revealing(vec![Reveal::Inserted { edit: 0, at: 0 }]),
        ))
    }

    fn cut(&self) -> Result<Planned, EditorError> {
        let Some(entry) = self.capture(ClipboardMode::Cut)? else {
            return Ok(Planned::Noop("nothing selected".into()));
        };
        let mut edits = Vec::with_capacity(entry.uids.len());
        for uid in &entry.uids {
            if let Some(node) = self.node(uid) {
                let (start, end) = Self::span(node)?;
                edits.push(self.delete_span(start, end));
            }
        }
        let mut plan = ActionPlan::new(edits);
        plan.clipboard = Some(entry);
        Ok(Planned::Edit(plan))
    }

    fn copy(&self) -> Result<Planned, EditorError> {
        Ok(match self.capture(ClipboardMode::Copy)? {
            Some(entry) => Planned::Capture(entry),
            None => Planned::Noop("nothing selected".into()),
        })
    }

    fn delete(&self) -> Result<Planned, EditorError> {
        let nodes = self.merged_selection();
        if nodes.is_empty() {
            return Ok(Planned::Noop("nothing selected".into()));
        }
        let edits = nodes
            .iter()
            .map(|n| Self::span(n).map(|(start, end)| self.delete_span(start, end)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Planned::Edit(ActionPlan::new(edits)))
    }

    fn paste(&self, span_paste: bool) -> Result<Planned, EditorError> {
        let Some(clipboard) = self.ctx.clipboard else {
            return Ok(Planned::Noop("clipboard is empty".into()));
        };
        if clipboard.text_fragments.is_empty() {
            return Ok(Planned::Noop("clipboard is empty".into()));
        }
        let Some(target) = self.focused()? else {
            return Ok(Planned::Noop("no paste target".into()));
        };
        let (_, target_end) = Self::span(target)?;

        // Clipboard uids only name live nodes while the tree they were
        // captured from (or last carried over to) is the current one
        if clipboard.is_cut() && clipboard.captured_from == self.valid {
            if let Some(source) = clipboard
                .uids
                .iter()
                .find(|uid| self.valid.is_self_or_descendant(&target.uid, uid))
            {
                return Err(EditorError::cyclic_target(format!(
                    "cannot paste {} into its own subtree at {}",
                    source, target.uid
                )));
            }
        }

        let offset = if span_paste || !self.can_hold_children(target) {
            target_end
        } else {
            self.append_offset(target)?
        };

        let mut reveal = Vec::with_capacity(clipboard.text_fragments.len());
        let mut at = 0;
        for fragment in &clipboard.text_fragments {
            reveal.push(Reveal::Inserted { edit: 0, at });
            at += fragment.len();
        }

        Ok(Planned::Edit(
            ActionPlan::new(vec![self.insert_at(offset, clipboard.text())]).revealing(reveal),
        ))
    }

    fn duplicate(&self) -> Result<Planned, EditorError> {
        let nodes = self.merged_selection();
        if nodes.is_empty() {
            return Ok(Planned::Noop("nothing selected".into()));
        }

        let mut edits = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let (_, end) = Self::span(node)?;
            edits.push(self.insert_at(end, self.text_of(node)?.to_string()));
        }
        let reveal = (0..edits.len()).map(|edit| Reveal::Inserted { edit, at: 0 }).collect();
        Ok(Planned::Edit(ActionPlan::new(edits).revealing(reveal)))
    }

    fn move_to(&self, target_uid: &str, is_between: bool, position: usize) -> Result<Planned, EditorError> {
        let nodes = self.merged_selection();
        if nodes.is_empty() {
            return Ok(Planned::Noop("nothing selected".into()));
        }
        let target = self
            .node(target_uid)
            .ok_or_else(|| EditorError::invalid_target(format!("move target {} is not a valid node", target_uid)))?;
        let (_, target_end) = Self::span(target)?;

        if let Some(moving) = nodes.iter().find(|n| self.valid.is_self_or_descendant(target_uid, &n.uid)) {
            return Err(EditorError::cyclic_target(format!(
                "cannot move {} into its own subtree at {}",
                moving.uid, target_uid
            )));
        }

        let offset = if !self.can_hold_children(target) {
            target_end
        } else if is_between {
            match self.valid.children_of(&target.uid).nth(position) {
                Some(child) => Self::span(child)?.0,
                None => self.append_offset(target)?,
            }
        } else {
            self.append_offset(target)?
        };

        let mut edits = Vec::with_capacity(nodes.len() + 1);
        let mut text = String::new();
        let mut reveal = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let (start, end) = Self::span(node)?;
            edits.push(self.delete_span(start, end));
            reveal.push(Reveal::Inserted {
                edit: nodes.len(),
                at: text.len(),
            });
            text.push_str(self.text_of(node)?);
        }
        edits.push(self.insert_at(offset, text));

        Ok(Planned::Edit(ActionPlan::new(edits).revealing(reveal)))
    }

    fn rename(&self, node_type: &str) -> Result<Planned, EditorError> {
        let Some(node) = self.focused()? else {
            return Ok(Planned::Noop("nothing focused".into()));
        };
        let (start, end) = Self::span(node)?;
        let Some(start_tag) = node.start_tag.filter(|_| node.is_element()) else {
            return Ok(Planned::Noop(format!("{} is not an element", node.uid)));
        };
        if node.name == node_type {
            return Ok(Planned::Noop(format!("already <{}>", node_type)));
        }

        let reference = &self.engine.reference;
        let parent_name = node
            .parent_uid
            .as_deref()
            .and_then(|uid| self.node(uid))
            .map(|p| p.name.as_str())
            .unwrap_or(ROOT_NODE_NAME);
        if !reference.allows(parent_name, node_type) {
            return Ok(Planned::Noop(format!("<{}> is not allowed in <{}>", node_type, parent_name)));
        }
        let children: Vec<&Node> = self.valid.children_of(&node.uid).collect();
        if let Some(child) = children.iter().find(|c| {
            let name = if c.is_text() { TEXT_NODE_NAME } else { c.name.as_str() };
            !reference.allows(node_type, name)
        }) {
            return Ok(Planned::Noop(format!("<{}> cannot contain {}", node_type, child.name)));
        }

        let name_len = node.name.len();
        let start_name = start_tag.start_offset + 1;
        let mut edits = vec![RangeEdit::replace(
            self.lines.range(start_name, start_name + name_len),
            node_type,
        )];

        match (reference.is_void(&node.name), reference.is_void(node_type)) {
            (false, true) => {
                if !children.is_empty() || self.has_inner_text(node) {
                    return Ok(Planned::Noop(format!("<{}> would orphan the children of {}", node_type, node.uid)));
                }
                if let Some(end_tag) = node.end_tag {
                    edits.push(self.delete_span(end_tag.start_offset, end_tag.end_offset));
                }
            }
            (true, false) => {
                edits.push(self.insert_at(end, Serializer::new(reference).close_tag(node_type)));
            }
            _ => {
                if let Some(end_tag) = node.end_tag {
                    let end_name = end_tag.start_offset + 2;
                    edits.push(RangeEdit::replace(
                        self.lines.range(end_name, end_name + name_len),
                        node_type,
                    ));
                }
            }
        }

        let mut plan = ActionPlan::new(edits).revealing(vec![Reveal::Existing { start }]);
        plan.renames.push((node.uid.clone(), node_type.to_string()));
        Ok(Planned::Edit(plan))
    }

    /// True if the raw tree holds any text between the node's tags
    fn has_inner_text(&self, node: &Node) -> bool {
        node.content_span()
            .and_then(|(s, e)| self.ctx.source.get(s..e))
            .map(|inner| !inner.trim().is_empty())
            .unwrap_or(false)
    }

    fn group(&self, container: Option<&str>) -> Result<Planned, EditorError> {
        let selected = &self.ctx.view.selected_items;
        let mut nodes: Vec<&Node> = selected
            .iter()
            .filter_map(|uid| self.node(uid))
            .filter(|n| !n.is_root())
            .collect();
        if nodes.len() < selected.len() {
            let dropped: Vec<&str> = selected
                .iter()
                .map(String::as_str)
                .filter(|uid| !nodes.iter().any(|n| n.uid == *uid))
                .collect();
            tracing::debug!(?dropped, "group ignores selected nodes it cannot wrap");
        }
        if nodes.is_empty() {
            return Ok(Planned::Noop("nothing selected".into()));
        }
        let parent_uid = nodes[0].parent_uid.clone();
        if let Some(stray) = nodes.iter().find(|n| n.parent_uid != parent_uid) {
            return Err(EditorError::invalid_target(format!(
                "{} is not a sibling of {}",
                stray.uid, nodes[0].uid
            )));
        }
        for node in &nodes {
            Self::span(node)?;
        }
        nodes.sort_by_key(|n| n.source_range.map(|r| r.start_offset));

        let container = container.unwrap_or(&self.engine.group_container);
        let reference = &self.engine.reference;
        let parent_name = parent_uid
            .as_deref()
            .and_then(|uid| self.node(uid))
            .map(|p| p.name.as_str())
            .unwrap_or(ROOT_NODE_NAME);
        if reference.is_void(container) {
            return Ok(Planned::Noop(format!("<{}> cannot contain children", container)));
        }
        if !reference.allows(parent_name, container) {
            return Ok(Planned::Noop(format!("<{}> is not allowed in <{}>", container, parent_name)));
        }

        let start = nodes
            .iter()
            .filter_map(|n| n.source_range)
            .map(|r| r.start_offset)
            .min()
            .unwrap_or(0);
        let end = nodes
            .iter()
            .filter_map(|n| n.source_range)
            .map(|r| r.end_offset)
            .max()
            .unwrap_or(start);

        let serializer = Serializer::new(reference);
        let edits = vec![
            self.insert_at(start, serializer.open_tag(container, &[])),
            self.insert_at(end, serializer.close_tag(container)),
        ];
        Ok(Planned::Edit(
            ActionPlan::new(edits).revealing(vec![Reveal::Inserted { edit: 0, at: 0 }]),
        ))
    }

    fn ungroup(&self) -> Result<Planned, EditorError> {
        let selected: Vec<&Node> = self
            .ctx
            .view
            .selected_items
            .iter()
            .filter_map(|uid| self.node(uid))
            .collect();
        let [node] = selected.as_slice() else {
            return Ok(Planned::Noop("ungroup needs exactly one selected node".into()));
        };
        if node.is_text() || node.is_comment() || node.is_root() {
            return Err(EditorError::invalid_target(format!("{} is not an element", node.uid)));
        }
        let Some(start_tag) = node.start_tag else {
            return Err(EditorError::invalid_target(format!("{} has no open tag", node.uid)));
        };

        let children: Vec<&Node> = self.valid.children_of(&node.uid).collect();
        if children.is_empty() {
            return Ok(Planned::Noop(format!("{} has no children", node.uid)));
        }
        if children.iter().any(|c| c.is_comment()) {
            return Ok(Planned::Noop(format!("{} holds a comment", node.uid)));
        }

        let mut edits = vec![self.delete_span(start_tag.start_offset, start_tag.end_offset)];
        if let Some(end_tag) = node.end_tag {
            edits.push(self.delete_span(end_tag.start_offset, end_tag.end_offset));
        }
        let reveal = children
            .iter()
            .filter_map(|c| c.source_range)
            .map(|r| Reveal::Existing { start: r.start_offset })
            .collect();
        Ok(Planned::Edit(ActionPlan::new(edits).revealing(reveal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::{ErrorKind, ROOT_NODE_UID};
    use trellis_parser::parse;

    struct Fixture {
        source: String,
        tree: NodeTree,
        view: TreeViewState,
    }

    impl Fixture {
        fn new(source: &str) -> Self {
            Self {
                source: source.to_string(),
                tree: parse(source).unwrap(),
                view: TreeViewState::new(),
            }
        }

        fn uid(&self, name: &str, nth: usize) -> String {
            let mut matches: Vec<&Node> = self.tree.nodes().filter(|n| n.name == name).collect();
            matches.sort_by_key(|n| n.source_range.map(|r| r.start_offset));
            matches[nth].uid.clone()
        }

        fn plan(&self, action: NodeAction, clipboard: Option<&ClipboardEntry>) -> Result<Planned, EditorError> {
            ActionEngine::default().plan(
                &action,
                &ActionContext {
                    source: &self.source,
                    tree: &self.tree,
                    view: &self.view,
                    clipboard,
                },
            )
        }

        fn apply(&self, action: NodeAction) -> String {
            match self.plan(action, None).unwrap() {
                Planned::Edit(plan) => crate::range_editor::CompoundEdit::new(plan.edits, &self.source)
                    .unwrap()
                    .apply_to(&self.source),
                other => panic!("expected an edit, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_merge_selection_drops_descendants() {
        let fx = Fixture::new("<div><p>a</p></div><span></span>");
        let selection = vec![fx.uid("span", 0), fx.uid("p", 0), fx.uid("div", 0), "missing".to_string()];
        let merged = merge_selection(&fx.tree.valid_tree(), &selection);
        assert_eq!(merged, vec![fx.uid("div", 0), fx.uid("span", 0)]);
    }

    #[test]
    fn test_add_inserts_after_open_tag() {
        let mut fx = Fixture::new("<ul><li>a</li></ul>");
        fx.view.focus(&fx.uid("ul", 0));
        assert_eq!(
            fx.apply(NodeAction::Add { node_type: "li".into() }),
            "<ul><li></li><li>a</li></ul>"
        );
    }

    #[test]
    fn test_add_disallowed_type_is_noop() {
        let mut fx = Fixture::new("<ul><li>a</li></ul>");
        fx.view.focus(&fx.uid("ul", 0));
        let planned = fx.plan(NodeAction::Add { node_type: "div".into() }, None).unwrap();
        assert!(matches!(planned, Planned::Noop(_)));
    }

    #[test]
    fn test_add_without_focus_goes_to_document_start() {
        let fx = Fixture::new("<p>x</p>");
        assert_eq!(fx.apply(NodeAction::Add { node_type: "hr".into() }), "<hr><p>x</p>");
    }

    #[test]
    fn test_add_on_placeholder_focus_is_invalid_target() {
        let mut fx = Fixture::new("<div>\n  <p>x</p>\n</div>");
        let placeholder = fx.uid(TEXT_NODE_NAME, 0);
        assert!(!fx.tree.get(&placeholder).unwrap().is_entity);
        fx.view.focus(&placeholder);

        let err = fx.plan(NodeAction::Add { node_type: "span".into() }, None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidTarget));
    }

    #[test]
    fn test_paste_and_rename_on_missing_focus_are_invalid_target() {
        let mut fx = Fixture::new("<div><p>x</p></div>");
        fx.view.select(&[fx.uid("p", 0)]);
        let entry = match fx.plan(NodeAction::Copy, None).unwrap() {
            Planned::Capture(entry) => entry,
            other => panic!("expected a capture, got {:?}", other),
        };
        fx.view.focus("gone-7");

        let err = fx.plan(NodeAction::Paste { span_paste: false }, Some(&entry)).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidTarget));
        let err = fx.plan(NodeAction::Rename { node_type: "section".into() }, None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidTarget));
    }

    #[test]
    fn test_delete_merges_nested_selection() {
        let mut fx = Fixture::new("<div><p>a</p></div><b>x</b>");
        let selection = vec![fx.uid("p", 0), fx.uid("div", 0)];
        fx.view.select(&selection);
        assert_eq!(fx.apply(NodeAction::Delete), "<b>x</b>");
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let fx = Fixture::new("<p>x</p>");
        for action in [NodeAction::Cut, NodeAction::Copy, NodeAction::Delete, NodeAction::Duplicate] {
            assert!(matches!(fx.plan(action, None).unwrap(), Planned::Noop(_)));
        }
    }

    #[test]
    fn test_cut_captures_fragments() {
        let mut fx = Fixture::new("<a>1</a><b>2</b><c>3</c>");
        let selection = vec![fx.uid("c", 0), fx.uid("a", 0)];
        fx.view.select(&selection);

        let Planned::Edit(plan) = fx.plan(NodeAction::Cut, None).unwrap() else {
            panic!("cut should edit");
        };
        let clipboard = plan.clipboard.unwrap();
        assert_eq!(clipboard.mode, ClipboardMode::Cut);
        assert_eq!(clipboard.text_fragments, vec!["<a>1</a>", "<c>3</c>"]);
        assert_eq!(plan.edits.len(), 2);
    }

    #[test]
    fn test_paste_appends_as_last_child() {
        let mut fx = Fixture::new("<div><p>a</p></div>");
        fx.view.focus(&fx.uid("div", 0));
        let clipboard = ClipboardEntry {
            uids: vec!["x".into()],
            mode: ClipboardMode::Copy,
            text_fragments: vec!["<i>1</i>".into(), "<i>2</i>".into()],
            captured_from: NodeTree::new(),
        };

        let Planned::Edit(plan) = fx.plan(NodeAction::Paste { span_paste: false }, Some(&clipboard)).unwrap() else {
            panic!("paste should edit");
        };
        assert_eq!(plan.edits[0].range.start_offset, 13);
        assert_eq!(
            plan.reveal,
            vec![Reveal::Inserted { edit: 0, at: 0 }, Reveal::Inserted { edit: 0, at: 8 }]
        );

        let Planned::Edit(plan) = fx.plan(NodeAction::Paste { span_paste: true }, Some(&clipboard)).unwrap() else {
            panic!("paste should edit");
        };
        assert_eq!(plan.edits[0].range.start_offset, 19);
    }

    #[test]
    fn test_paste_into_cut_source_is_cyclic() {
        let mut fx = Fixture::new("<div><p>a</p></div>");
        let div = fx.uid("div", 0);
        fx.view.focus(&fx.uid("p", 0));
        let clipboard = ClipboardEntry {
            uids: vec![div],
            mode: ClipboardMode::Cut,
            text_fragments: vec!["<div><p>a</p></div>".into()],
            captured_from: fx.tree.valid_tree(),
        };

        let err = fx.plan(NodeAction::Paste { span_paste: false }, Some(&clipboard)).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::CyclicTarget));
    }

    #[test]
    fn test_duplicate_inserts_after_each_node() {
        let mut fx = Fixture::new("<a>1</a><b>2</b>");
        let selection = vec![fx.uid("a", 0), fx.uid("b", 0)];
        fx.view.select(&selection);
        assert_eq!(fx.apply(NodeAction::Duplicate), "<a>1</a><a>1</a><b>2</b><b>2</b>");
    }

    #[test]
    fn test_move_between_children() {
        let mut fx = Fixture::new("<ul><li>1</li><li>2</li><li>3</li></ul>");
        fx.view.select(&[fx.uid("li", 2)]);
        let target_uid = fx.uid("ul", 0);
        assert_eq!(
            fx.apply(NodeAction::Move { target_uid, is_between: true, position: 0 }),
            "<ul><li>3</li><li>1</li><li>2</li></ul>"
        );
    }

    #[test]
    fn test_move_into_descendant_is_cyclic() {
        let mut fx = Fixture::new("<div><section><p>a</p></section></div>");
        fx.view.select(&[fx.uid("div", 0)]);
        let target_uid = fx.uid("p", 0);
        let err = fx
            .plan(NodeAction::Move { target_uid, is_between: false, position: 0 }, None)
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::CyclicTarget));

        let target_uid = fx.uid("div", 0);
        let err = fx
            .plan(NodeAction::Move { target_uid, is_between: false, position: 0 }, None)
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::CyclicTarget));
    }

    #[test]
    fn test_rename_keeps_attributes_and_children() {
        let mut fx = Fixture::new(r#"<div class="x"><b>t</b></div>"#);
        fx.view.focus(&fx.uid("div", 0));
        assert_eq!(
            fx.apply(NodeAction::Rename { node_type: "section".into() }),
            r#"<section class="x"><b>t</b></section>"#
        );
    }

    #[test]
    fn test_rename_respects_content_model() {
        let mut fx = Fixture::new("<div><div>x</div></div>");
        fx.view.focus(&fx.uid("div", 0));
        let planned = fx.plan(NodeAction::Rename { node_type: "p".into() }, None).unwrap();
        assert!(matches!(planned, Planned::Noop(_)));
    }

    #[test]
    fn test_rename_void_changes() {
        let mut fx = Fixture::new("<span></span><br>");
        fx.view.focus(&fx.uid("span", 0));
        assert_eq!(fx.apply(NodeAction::Rename { node_type: "hr".into() }), "<hr><br>");

        let mut fx = Fixture::new("<br>");
        fx.view.focus(&fx.uid("br", 0));
        assert_eq!(fx.apply(NodeAction::Rename { node_type: "span".into() }), "<span></span>");

        let mut fx = Fixture::new("<span>x</span>");
        fx.view.focus(&fx.uid("span", 0));
        assert!(matches!(
            fx.plan(NodeAction::Rename { node_type: "br".into() }, None).unwrap(),
            Planned::Noop(_)
        ));
    }

    #[test]
    fn test_group_wraps_siblings() {
        let mut fx = Fixture::new("<main><a>1</a> <b>2</b></main>");
        fx.view.select(&[fx.uid("b", 0), fx.uid("a", 0)]);
        assert_eq!(fx.apply(NodeAction::Group { container: None }), "<main><div><a>1</a> <b>2</b></div></main>");
    }

    #[test]
    fn test_group_skips_stale_selection_entries() {
        let mut fx = Fixture::new("<main><a>1</a><b>2</b></main>");
        fx.view.select(&[fx.uid("a", 0), "gone-9".to_string(), fx.uid("b", 0)]);
        assert_eq!(fx.apply(NodeAction::Group { container: None }), "<main><div><a>1</a><b>2</b></div></main>");
    }

    #[test]
    fn test_group_of_non_siblings_is_invalid() {
        let mut fx = Fixture::new("<main><a>1</a><p><b>2</b></p></main>");
        fx.view.select(&[fx.uid("a", 0), fx.uid("b", 0)]);
        let err = fx.plan(NodeAction::Group { container: None }, None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidTarget));
    }

    #[test]
    fn test_group_in_restrictive_parent_is_noop() {
        let mut fx = Fixture::new("<ul><li>1</li></ul>");
        fx.view.select(&[fx.uid("li", 0)]);
        assert!(matches!(
            fx.plan(NodeAction::Group { container: None }, None).unwrap(),
            Planned::Noop(_)
        ));
    }

    #[test]
    fn test_ungroup() {
        let mut fx = Fixture::new("<main><div><a>1</a>x</div></main>");
        fx.view.select(&[fx.uid("div", 0)]);
        assert_eq!(fx.apply(NodeAction::Ungroup), "<main><a>1</a>x</main>");

        let mut fx = Fixture::new("<main><div></div></main>");
        fx.view.select(&[fx.uid("div", 0)]);
        assert!(matches!(fx.plan(NodeAction::Ungroup, None).unwrap(), Planned::Noop(_)));

        let mut fx = Fixture::new("<main>text</main>");
        fx.view.select(&[fx.uid(TEXT_NODE_NAME, 0)]);
        let err = fx.plan(NodeAction::Ungroup, None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidTarget));

        let mut fx = Fixture::new("<main><a></a><b></b></main>");
        fx.view.select(&[fx.uid("a", 0), fx.uid("b", 0)]);
        assert!(matches!(fx.plan(NodeAction::Ungroup, None).unwrap(), Planned::Noop(_)));
    }

    #[test]
    fn test_root_is_never_selected_for_removal() {
        let mut fx = Fixture::new("<p>x</p>");
        fx.view.select(&[ROOT_NODE_UID.to_string()]);
        assert!(matches!(fx.plan(NodeAction::Delete, None).unwrap(), Planned::Noop(_)));
    }

    #[test]
    fn test_actions_read_from_camel_case_json() {
        let action: NodeAction =
            serde_json::from_str(r#"{"type":"move","targetUid":"seed-3","isBetween":true}"#).unwrap();
        assert_eq!(
            action,
            NodeAction::Move { target_uid: "seed-3".into(), is_between: true, position: 0 }
        );
        let action: NodeAction = serde_json::from_str(r#"{"type":"ungroup"}"#).unwrap();
        assert_eq!(action.name(), "ungroup");
    }
}
