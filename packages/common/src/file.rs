//! File tree value types.
//!
//! File uids are derived from project-relative paths: the project root is
//! [`FILE_ROOT_UID`] and every entry is `<parent uid>/<name>`.

use crate::result::TreeResult;
use crate::tree::{check_tree_integrity, TreeItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type FileUid = String;

pub const FILE_ROOT_UID: &str = "ROOT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// Opaque key into the caller-owned handle collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerKey(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub uid: FileUid,
    pub parent_uid: Option<FileUid>,
    pub children: Vec<FileUid>,
    /// Project-relative path, `/`-separated, empty for the root
    pub path: String,
    pub name: String,
    pub kind: FileKind,
    /// Loaded on demand
    pub content: Option<String>,
    pub handler: HandlerKey,
}

impl FileNode {
    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn extension(&self) -> Option<&str> {
        if self.is_directory() {
            return None;
        }
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }
}

impl TreeItem for FileNode {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn parent_uid(&self) -> Option<&str> {
        self.parent_uid.as_deref()
    }

    fn child_uids(&self) -> &[String] {
        &self.children
    }
}

/// Build the uid of a child entry
pub fn child_file_uid(parent_uid: &str, name: &str) -> FileUid {
    format!("{}/{}", parent_uid, name)
}

/// Uid for a project-relative path
pub fn file_uid_for_path(path: &str) -> FileUid {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(FILE_ROOT_UID.to_string(), |uid, segment| child_file_uid(&uid, segment))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTree {
    nodes: HashMap<FileUid, FileNode>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = FileNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.uid.clone(), n)).collect(),
        }
    }

    pub fn insert(&mut self, node: FileNode) {
        self.nodes.insert(node.uid.clone(), node);
    }

    pub fn get(&self, uid: &str) -> Option<&FileNode> {
        self.nodes.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut FileNode> {
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

    pub fn root(&self) -> Option<&FileNode> {
        self.nodes.get(FILE_ROOT_UID)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }

    pub fn uids(&self) -> impl Iterator<Item = &FileUid> {
        self.nodes.keys()
    }

    pub fn children_of<'a>(&'a self, uid: &str) -> impl Iterator<Item = &'a FileNode> + 'a {
        self.nodes
            .get(uid)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |c| self.nodes.get(c))
    }

    pub fn find_by_path(&self, path: &str) -> Option<&FileNode> {
        self.nodes.get(&file_uid_for_path(path))
    }

    pub fn check_integrity(&self) -> TreeResult<()> {
        check_tree_integrity(&self.nodes, FILE_ROOT_UID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_for_path() {
        assert_eq!(file_uid_for_path(""), "ROOT");
        assert_eq!(file_uid_for_path("index.html"), "ROOT/index.html");
        assert_eq!(file_uid_for_path("src/pages/a.html"), "ROOT/src/pages/a.html");
        assert_eq!(file_uid_for_path("/src//a.html"), "ROOT/src/a.html");
    }

    #[test]
    fn test_extension() {
        let node = FileNode {
            uid: "ROOT/index.html".to_string(),
            parent_uid: Some(FILE_ROOT_UID.to_string()),
            children: vec![],
            path: "index.html".to_string(),
            name: "index.html".to_string(),
            kind: FileKind::File,
            content: None,
            handler: HandlerKey("1".to_string()),
        };
        assert_eq!(node.extension(), Some("html"));
    }
}
