//! Shape checks shared by node trees and file trees.

use crate::error::TreeError;
use crate::result::TreeResult;
use std::collections::{HashMap, HashSet};

/// Minimal view of a node stored in a uid-keyed tree
pub trait TreeItem {
    fn uid(&self) -> &str;
    fn parent_uid(&self) -> Option<&str>;
    fn child_uids(&self) -> &[String];

    /// Byte span used for ordering and containment checks, if the item has one
    fn span(&self) -> Option<(usize, usize)> {
        None
    }
}

/// Verify that `nodes` forms a single tree rooted at `root_uid`.
///
/// Every non-root uid must be listed exactly once as a child of the node its
/// `parent_uid` names, everything must be reachable from the root, siblings
/// must be in ascending start order and child spans must sit inside their
/// parent's span.
pub fn check_tree_integrity<N: TreeItem>(
    nodes: &HashMap<String, N>,
    root_uid: &str,
) -> TreeResult<()> {
    let root = nodes
        .get(root_uid)
        .ok_or_else(|| TreeError::MissingRoot(root_uid.to_string()))?;

    let mut seen: HashSet<&str> = HashSet::with_capacity(nodes.len());
    seen.insert(root.uid());
    let mut stack = vec![root];

    while let Some(parent) = stack.pop() {
        let mut last_start = None;

        for child_uid in parent.child_uids() {
            let child = nodes
                .get(child_uid.as_str())
                .ok_or_else(|| TreeError::DanglingChild {
                    parent: parent.uid().to_string(),
                    child: child_uid.clone(),
                })?;

            if child.parent_uid() != Some(parent.uid()) {
                return Err(TreeError::ParentMismatch {
                    child: child_uid.clone(),
                    listed: parent.uid().to_string(),
                    actual: child.parent_uid().map(str::to_string),
                });
            }

            if !seen.insert(child.uid()) {
                return Err(TreeError::Duplicate(child_uid.clone()));
            }

            if let Some((start, end)) = child.span() {
                if let Some(prev) = last_start {
                    if start < prev {
                        return Err(TreeError::SiblingOrder(parent.uid().to_string()));
                    }
                }
                last_start = Some(start);

                if let Some((parent_start, parent_end)) = parent.span() {
                    if start < parent_start || end > parent_end {
                        return Err(TreeError::RangeContainment {
                            parent: parent.uid().to_string(),
                            child: child_uid.clone(),
                        });
                    }
                }
            }

            stack.push(child);
        }
    }

    if let Some(orphan) = nodes.keys().find(|uid| !seen.contains(uid.as_str())) {
        return Err(TreeError::Orphan(orphan.clone()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        uid: String,
        parent: Option<String>,
        children: Vec<String>,
        span: Option<(usize, usize)>,
    }

    impl TreeItem for Item {
        fn uid(&self) -> &str {
            &self.uid
        }
        fn parent_uid(&self) -> Option<&str> {
            self.parent.as_deref()
        }
        fn child_uids(&self) -> &[String] {
            &self.children
        }
        fn span(&self) -> Option<(usize, usize)> {
            self.span
        }
    }

    fn item(uid: &str, parent: Option<&str>, children: &[&str], span: (usize, usize)) -> (String, Item) {
        (
            uid.to_string(),
            Item {
                uid: uid.to_string(),
                parent: parent.map(str::to_string),
                children: children.iter().map(|c| c.to_string()).collect(),
                span: Some(span),
            },
        )
    }

    #[test]
    fn test_valid_tree_passes() {
        let nodes: HashMap<_, _> = [
            item("root", None, &["a", "b"], (0, 20)),
            item("a", Some("root"), &[], (0, 5)),
            item("b", Some("root"), &[], (5, 20)),
        ]
        .into_iter()
        .collect();

        assert_eq!(check_tree_integrity(&nodes, "root"), Ok(()));
    }

    #[test]
    fn test_dangling_child_detected() {
        let nodes: HashMap<_, _> = [item("root", None, &["ghost"], (0, 20))].into_iter().collect();

        assert!(matches!(
            check_tree_integrity(&nodes, "root"),
            Err(TreeError::DanglingChild { .. })
        ));
    }

    #[test]
    fn test_orphan_detected() {
        let nodes: HashMap<_, _> = [
            item("root", None, &[], (0, 20)),
            item("lost", Some("root"), &[], (0, 5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            check_tree_integrity(&nodes, "root"),
            Err(TreeError::Orphan("lost".to_string()))
        );
    }

    #[test]
    fn test_sibling_order_detected() {
        let nodes: HashMap<_, _> = [
            item("root", None, &["b", "a"], (0, 20)),
            item("a", Some("root"), &[], (0, 5)),
            item("b", Some("root"), &[], (5, 20)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            check_tree_integrity(&nodes, "root"),
            Err(TreeError::SiblingOrder("root".to_string()))
        );
    }

    #[test]
    fn test_range_escape_detected() {
        let nodes: HashMap<_, _> = [
            item("root", None, &["a"], (0, 10)),
            item("a", Some("root"), &[], (5, 12)),
        ]
        .into_iter()
        .collect();

        assert!(matches!(
            check_tree_integrity(&nodes, "root"),
            Err(TreeError::RangeContainment { .. })
        ));
    }
}
