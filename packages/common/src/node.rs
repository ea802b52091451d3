//! # Document Tree Model
//!
//! Value types for the structural view of a markup document. A [`NodeTree`]
//! is always derived from the text buffer by a parser; nothing in the editor
//! mutates a tree in place.
//!
//! Offsets are byte offsets into the UTF-8 buffer. Lines and columns are
//! 1-based, columns counted in characters.

use crate::result::TreeResult;
use crate::tree::{check_tree_integrity, TreeItem};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Opaque node identifier
pub type NodeUid = String;

/// Uid of the document root. The root has no parent.
pub const ROOT_NODE_UID: &str = "ROOT";

pub const TEXT_NODE_NAME: &str = "#text";
pub const COMMENT_NODE_NAME: &str = "#comment";
pub const ROOT_NODE_NAME: &str = "#document";

/// Location of a node (or token) in the text buffer.
///
/// Both the offset pair and the line/column pair are carried; the text
/// buffer needs both to round-trip an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl SourceRange {
    /// Zero-width range at a single position
    pub fn point(offset: usize, line: usize, col: usize) -> Self {
        Self {
            start_offset: offset,
            end_offset: offset,
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
        }
    }

    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.end_offset <= self.start_offset
    }

    /// True if `other` lies entirely inside this range
    pub fn contains(&self, other: &SourceRange) -> bool {
        self.start_offset <= other.start_offset && other.end_offset <= self.end_offset
    }

    /// Half-open overlap. Zero-width ranges touching a boundary do not overlap.
    pub fn overlaps(&self, other: &SourceRange) -> bool {
        self.start_offset < other.end_offset && other.start_offset < self.end_offset
    }

    pub fn span(&self) -> (usize, usize) {
        (self.start_offset, self.end_offset)
    }
}

/// What a node represents in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Element,
    Text,
    Comment,
}

/// One element, text run or comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub uid: NodeUid,
    pub parent_uid: Option<NodeUid>,
    pub children: Vec<NodeUid>,
    pub kind: NodeKind,
    /// Tag name for elements, `#text` / `#comment` / `#document` otherwise
    pub name: String,
    pub attributes: HashMap<String, String>,
    /// False for synthetic placeholders (e.g. formatting whitespace)
    pub is_entity: bool,
    pub source_range: Option<SourceRange>,
    /// Opening tag token, elements only
    pub start_tag: Option<SourceRange>,
    /// Closing tag token; absent for void and unclosed elements
    pub end_tag: Option<SourceRange>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.kind == NodeKind::Root
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn is_comment(&self) -> bool {
        self.kind == NodeKind::Comment
    }

    /// Byte span of the node's inner content (between its tags)
    pub fn content_span(&self) -> Option<(usize, usize)> {
        let range = self.source_range?;
        match self.kind {
            NodeKind::Root => Some(range.span()),
            NodeKind::Element => {
                let start_tag = self.start_tag?;
                let end = self
                    .end_tag
                    .map(|tag| tag.start_offset)
                    .unwrap_or(range.end_offset);
                Some((start_tag.end_offset, end))
            }
            NodeKind::Text | NodeKind::Comment => None,
        }
    }
}

impl TreeItem for Node {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn parent_uid(&self) -> Option<&str> {
        self.parent_uid.as_deref()
    }

    fn child_uids(&self) -> &[String] {
        &self.children
    }

    fn span(&self) -> Option<(usize, usize)> {
        self.source_range.map(|r| r.span())
    }
}

/// Uid-keyed document tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTree {
    nodes: HashMap<NodeUid, Node>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.uid.clone(), n)).collect(),
        }
    }

    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.uid.clone(), node);
    }

    pub fn get(&self, uid: &str) -> Option<&Node> {
        self.nodes.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Node> {
        self.nodes.get_mut(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.nodes.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(ROOT_NODE_UID)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn children_of<'a>(&'a self, uid: &str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .get(uid)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |c| self.nodes.get(c))
    }

    /// True if `ancestor` is a strict ancestor of `uid`.
    ///
    /// Walks parent links with a step bound so a malformed tree cannot loop.
    pub fn is_ancestor(&self, ancestor: &str, uid: &str) -> bool {
        let mut current = self.nodes.get(uid).and_then(|n| n.parent_uid.as_deref());
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(parent).and_then(|n| n.parent_uid.as_deref());
        }
        false
    }

    /// True if `uid` is `of` or lies inside its subtree
    pub fn is_self_or_descendant(&self, uid: &str, of: &str) -> bool {
        uid == of || self.is_ancestor(of, uid)
    }

    /// Number of parent links between `uid` and the root
    pub fn depth(&self, uid: &str) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(uid).and_then(|n| n.parent_uid.as_deref());
        while let Some(parent) = current {
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
            current = self.nodes.get(parent).and_then(|n| n.parent_uid.as_deref());
        }
        depth
    }

    /// Pre-order descendants of `uid`, excluding `uid` itself
    pub fn descendants(&self, uid: &str) -> Vec<NodeUid> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self
            .nodes
            .get(uid)
            .map(|n| n.children.iter().rev().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                out.push(node.uid.clone());
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    /// Derive the valid tree: nodes that are real source constructs with a
    /// buffer range, pruned transitively (a valid node's parent is valid).
    pub fn valid_tree(&self) -> NodeTree {
        let mut valid = NodeTree::new();
        let Some(root) = self.root() else {
            return valid;
        };

        let mut queue = VecDeque::from([root.uid.clone()]);
        while let Some(uid) = queue.pop_front() {
            let Some(node) = self.nodes.get(&uid) else {
                continue;
            };
            let mut copy = node.clone();
            copy.children = node
                .children
                .iter()
                .filter(|c| {
                    self.nodes
                        .get(c.as_str())
                        .map(|child| child.is_entity && child.source_range.is_some())
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            queue.extend(copy.children.iter().cloned());
            valid.insert(copy);
        }
        valid
    }

    /// Shallowest non-root node whose range starts at `offset`
    pub fn find_by_start(&self, offset: usize) -> Option<&Node> {
        self.nodes
            .values()
            .filter(|n| !n.is_root())
            .filter(|n| n.source_range.map(|r| r.start_offset) == Some(offset))
            .min_by_key(|n| self.depth(&n.uid))
    }

    /// Index nodes by `(start, end, name)`, the identity that survives a
    /// re-parse when the node's own text was not touched.
    pub fn identity_index(&self) -> HashMap<(usize, usize, &str), &str> {
        self.nodes
            .values()
            .filter_map(|n| {
                let range = n.source_range?;
                Some(((range.start_offset, range.end_offset, n.name.as_str()), n.uid.as_str()))
            })
            .collect()
    }

    pub fn check_integrity(&self) -> TreeResult<()> {
        check_tree_integrity(&self.nodes, ROOT_NODE_UID)
    }
}

/// How a clipboard entry was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardMode {
    Cut,
    Copy,
}

/// Snapshot of nodes captured by cut or copy.
///
/// The entry goes stale as soon as the buffer changes; paste validates its
/// target against the live tree and only reuses the text fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardEntry {
    pub uids: Vec<NodeUid>,
    pub mode: ClipboardMode,
    pub text_fragments: Vec<String>,
    pub captured_from: NodeTree,
}

impl ClipboardEntry {
    pub fn text(&self) -> String {
        self.text_fragments.concat()
    }

    pub fn is_cut(&self) -> bool {
        self.mode == ClipboardMode::Cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: usize, end: usize) -> SourceRange {
        SourceRange {
            start_offset: start,
            end_offset: end,
            start_line: 1,
            start_col: start + 1,
            end_line: 1,
            end_col: end + 1,
        }
    }

    fn node(uid: &str, parent: Option<&str>, children: &[&str], kind: NodeKind, span: Option<(usize, usize)>) -> Node {
        Node {
            uid: uid.to_string(),
            parent_uid: parent.map(str::to_string),
            children: children.iter().map(|c| c.to_string()).collect(),
            kind,
            name: match kind {
                NodeKind::Root => ROOT_NODE_NAME.to_string(),
                NodeKind::Text => TEXT_NODE_NAME.to_string(),
                NodeKind::Comment => COMMENT_NODE_NAME.to_string(),
                NodeKind::Element => "div".to_string(),
            },
            attributes: HashMap::new(),
            is_entity: true,
            source_range: span.map(|(s, e)| range(s, e)),
            start_tag: None,
            end_tag: None,
        }
    }

    // <div><p></p>  </div>
    fn sample_tree() -> NodeTree {
        let mut ws = node("ws", Some("div"), &[], NodeKind::Text, Some((12, 14)));
        ws.is_entity = false;
        NodeTree::from_nodes([
            node(ROOT_NODE_UID, None, &["div"], NodeKind::Root, Some((0, 20))),
            node("div", Some(ROOT_NODE_UID), &["p", "ws"], NodeKind::Element, Some((0, 20))),
            node("p", Some("div"), &[], NodeKind::Element, Some((5, 12))),
            ws,
        ])
    }

    #[test]
    fn test_range_overlap_rules() {
        assert!(range(10, 20).overlaps(&range(15, 25)));
        assert!(!range(10, 20).overlaps(&range(20, 30)));
        assert!(!range(10, 20).overlaps(&range(20, 20)));
        assert!(range(10, 20).overlaps(&range(15, 15)));
        assert!(range(0, 20).contains(&range(5, 12)));
    }

    #[test]
    fn test_ancestry() {
        let tree = sample_tree();
        assert!(tree.is_ancestor("div", "p"));
        assert!(tree.is_ancestor(ROOT_NODE_UID, "p"));
        assert!(!tree.is_ancestor("p", "div"));
        assert!(!tree.is_ancestor("p", "p"));
        assert!(tree.is_self_or_descendant("p", "p"));
        assert_eq!(tree.depth("p"), 2);
    }

    #[test]
    fn test_valid_tree_drops_placeholders() {
        let tree = sample_tree();
        let valid = tree.valid_tree();

        assert!(valid.contains("p"));
        assert!(!valid.contains("ws"));
        assert_eq!(valid.get("div").unwrap().children, vec!["p".to_string()]);
        assert_eq!(valid.check_integrity(), Ok(()));
    }

    #[test]
    fn test_valid_tree_prunes_transitively() {
        let mut tree = sample_tree();
        tree.get_mut("div").unwrap().source_range = None;
        let valid = tree.valid_tree();

        assert!(!valid.contains("div"));
        assert!(!valid.contains("p"));
    }

    #[test]
    fn test_find_by_start_prefers_shallowest() {
        let tree = sample_tree();
        assert_eq!(tree.find_by_start(0).map(|n| n.uid.as_str()), Some("div"));
        assert_eq!(tree.find_by_start(5).map(|n| n.uid.as_str()), Some("p"));
        assert!(tree.find_by_start(6).is_none());
    }

    #[test]
    fn test_descendants_preorder() {
        let tree = sample_tree();
        assert_eq!(tree.descendants(ROOT_NODE_UID), vec!["div", "p", "ws"]);
    }

    #[test]
    fn test_node_serialization() {
        let tree = sample_tree();
        let json = serde_json::to_string(tree.get("p").unwrap()).unwrap();
        assert!(json.contains("\"parentUid\":\"div\""));
        assert!(json.contains("\"startOffset\":5"));
    }
}
