use crate::file::{FileNode, FileTree, FILE_ROOT_UID};
use crate::node::{Node, NodeTree, ROOT_NODE_UID};

/// Visitor pattern for traversing a node tree in document order
///
/// The default implementation walks the whole tree. Override `visit_node` to
/// act on nodes and call [`walk_node`] to keep descending.
pub trait Visitor: Sized {
    fn visit_node(&mut self, tree: &NodeTree, node: &Node, depth: usize) {
        walk_node(self, tree, node, depth);
    }
}

pub fn walk_tree<V: Visitor>(visitor: &mut V, tree: &NodeTree) {
    if let Some(root) = tree.get(ROOT_NODE_UID) {
        visitor.visit_node(tree, root, 0);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, tree: &NodeTree, node: &Node, depth: usize) {
    for child in tree.children_of(&node.uid) {
        visitor.visit_node(tree, child, depth + 1);
    }
}

/// Same walk over a file tree
pub trait FileVisitor: Sized {
    fn visit_file(&mut self, tree: &FileTree, node: &FileNode, depth: usize) {
        walk_file(self, tree, node, depth);
    }
}

pub fn walk_file_tree<V: FileVisitor>(visitor: &mut V, tree: &FileTree) {
    if let Some(root) = tree.get(FILE_ROOT_UID) {
        visitor.visit_file(tree, root, 0);
    }
}

pub fn walk_file<V: FileVisitor>(visitor: &mut V, tree: &FileTree, node: &FileNode, depth: usize) {
    for child in tree.children_of(&node.uid) {
        visitor.visit_file(tree, child, depth + 1);
    }
}
