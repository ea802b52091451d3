//! # File Tree Reconciler
//!
//! Recomputes the file tree from storage and diffs it against the tree the
//! caller currently holds.
//!
//! ```text
//! storage scan → new FileTree + HandlerMap
//!              → deleted uids, converted (old, new) pairs
//!              → repair steps for the open file
//! ```
//!
//! Uids are derived from paths, so an unchanged path keeps its uid. A path
//! that disappeared while its handle identity shows up elsewhere is reported
//! as converted rather than deleted.
//!
//! Storage scans are not atomic snapshots, so runs are exclusive: a call
//! made while another is in flight fails fast with
//! [`WorkspaceError::ReconciliationInFlight`].

use crate::errors::{WorkspaceError, WorkspaceResult};
use crate::storage::{verify_permission, HandlerMap, ProjectStorage, StorageHandle};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use trellis_common::{child_file_uid, FileKind, FileNode, FileTree, FileUid, HandlerKey, FILE_ROOT_UID};

/// Result of one reconciliation run
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub tree: FileTree,
    pub handlers: HandlerMap,
    pub deleted_uids: Vec<FileUid>,
    pub converted_uids: Vec<(FileUid, FileUid)>,
}

/// One step of the deletion repair, applied before the new tree is installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairStep {
    ClearPreview,
    ClearNodeTree,
    ClearCurrentFile,
    OpenFallback(Option<FileUid>),
}

impl Reconciliation {
    pub fn is_deleted(&self, uid: &str) -> bool {
        self.deleted_uids.iter().any(|d| d == uid)
    }

    /// New uid of a converted entry
    pub fn converted(&self, uid: &str) -> Option<&FileUid> {
        self.converted_uids
            .iter()
            .find(|(old, _)| old == uid)
            .map(|(_, new)| new)
    }

    /// Steps the caller must apply, in order, when the open file is gone.
    ///
    /// The fallback prefers a file under the deleted file's former parent,
    /// then the project's initial file.
    pub fn repair_steps(&self, previous: &FileTree, current_file: Option<&str>, initial_file: Option<&str>) -> Vec<RepairStep> {
        let Some(current) = current_file.filter(|uid| self.is_deleted(uid)) else {
            return vec![];
        };

        let sibling = previous
            .get(current)
            .and_then(|node| node.parent_uid.as_deref())
            .and_then(|parent| self.first_file_under(parent));
        let initial = initial_file
            .and_then(|uid| self.tree.get(uid))
            .filter(|node| !node.is_directory())
            .map(|node| node.uid.clone());

        vec![
            RepairStep::ClearPreview,
            RepairStep::ClearNodeTree,
            RepairStep::ClearCurrentFile,
            RepairStep::OpenFallback(sibling.or(initial)),
        ]
    }

    fn first_file_under(&self, parent: &str) -> Option<FileUid> {
        self.tree
            .children_of(parent)
            .find(|node| !node.is_directory())
            .map(|node| node.uid.clone())
    }
}

/// Scans a project storage into file trees
pub struct Reconciler {
    storage: Arc<dyn ProjectStorage>,
    ignore: HashSet<String>,
    in_flight: Mutex<()>,
}

impl Reconciler {
    pub fn new(storage: Arc<dyn ProjectStorage>) -> Self {
        Self {
            storage,
            ignore: HashSet::new(),
            in_flight: Mutex::new(()),
        }
    }

    /// Entry names skipped by the scan (e.g. `.git`)
    pub fn with_ignore(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.ignore = names.into_iter().collect();
        self
    }

    pub fn storage(&self) -> &Arc<dyn ProjectStorage> {
        &self.storage
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Scan storage and diff against `previous`
    pub async fn reconcile(&self, previous: &FileTree) -> WorkspaceResult<Reconciliation> {
        let _slot = self.in_flight.try_lock().map_err(|_| {
            tracing::warn!("reconciliation already in flight");
            WorkspaceError::ReconciliationInFlight
        })?;

        let root = self.storage.root().await?;
        if !verify_permission(self.storage.as_ref(), &root).await {
            return Err(WorkspaceError::PermissionDenied("project root".to_string()));
        }

        let (tree, handlers) = self.scan(root).await?;
        tree.check_integrity()?;

        let (deleted_uids, converted_uids) = diff(previous, &tree);
        tracing::info!(
            files = tree.len(),
            deleted = deleted_uids.len(),
            converted = converted_uids.len(),
            "reconciled file tree"
        );

        Ok(Reconciliation {
            tree,
            handlers,
            deleted_uids,
            converted_uids,
        })
    }

    /// Depth-first scan; directories first, then by name
    async fn scan(&self, root: StorageHandle) -> WorkspaceResult<(FileTree, HandlerMap)> {
        let mut tree = FileTree::new();
        let mut handlers = HandlerMap::new();
        let mut seen: HashSet<HandlerKey> = HashSet::from([root.identity.clone()]);
        let mut stack: Vec<(StorageHandle, FileUid, Option<FileUid>)> = vec![(root, FILE_ROOT_UID.to_string(), None)];

        while let Some((handle, uid, parent_uid)) = stack.pop() {
            let mut children = Vec::new();
            if handle.is_directory() {
                let mut entries = self.entries_of(&handle, parent_uid.is_none()).await?;
                entries.retain(|entry| !self.ignore.contains(entry.name()));
                // Each identity appears once, so a storage that loops back
                // on itself cannot grow the tree
                entries.retain(|entry| {
                    let fresh = seen.insert(entry.identity.clone());
                    if !fresh {
                        tracing::warn!(path = %entry.path, "skipping entry already scanned under another path");
                    }
                    fresh
                });
                entries.sort_by(|a, b| b.is_directory().cmp(&a.is_directory()).then_with(|| a.name().cmp(b.name())));

                children = entries
                    .iter()
                    .map(|entry| child_file_uid(&uid, entry.name()))
                    .collect();
                for (entry, child_uid) in entries.into_iter().zip(children.iter()).rev() {
                    stack.push((entry, child_uid.clone(), Some(uid.clone())));
                }
            }

            tree.insert(FileNode {
                uid,
                parent_uid,
                children,
                name: handle.name().to_string(),
                path: handle.path.clone(),
                kind: handle.kind,
                content: None,
                handler: handle.identity.clone(),
            });
            handlers.insert(handle.identity.clone(), handle);
        }
        Ok((tree, handlers))
    }

    /// Entries of a directory. Unreadable subdirectories scan as empty; the
    /// root has already been verified and its errors propagate.
    async fn entries_of(&self, dir: &StorageHandle, is_root: bool) -> WorkspaceResult<Vec<StorageHandle>> {
        if is_root {
            return Ok(self.storage.list(dir).await?);
        }
        if !verify_permission(self.storage.as_ref(), dir).await {
            tracing::warn!(path = %dir.path, "skipping directory without permission");
            return Ok(vec![]);
        }
        match self.storage.list(dir).await {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(path = %dir.path, error = %e, "skipping unreadable directory");
                Ok(vec![])
            }
        }
    }
}

/// Uids gone from `new`, split into plain deletions and identity-preserving
/// moves
fn diff(previous: &FileTree, new: &FileTree) -> (Vec<FileUid>, Vec<(FileUid, FileUid)>) {
    let by_identity: HashMap<&str, &str> = new
        .nodes()
        .map(|node| (node.handler.0.as_str(), node.uid.as_str()))
        .collect();

    let mut deleted = Vec::new();
    let mut converted = Vec::new();
    for node in previous.nodes() {
        if new.contains(&node.uid) {
            continue;
        }
        match by_identity.get(node.handler.0.as_str()) {
            Some(&new_uid) if !previous.contains(new_uid) && same_kind(previous, new, &node.uid, new_uid) => {
                converted.push((node.uid.clone(), new_uid.to_string()))
            }
            _ => deleted.push(node.uid.clone()),
        }
    }
    deleted.sort();
    converted.sort();
    (deleted, converted)
}

fn same_kind(previous: &FileTree, new: &FileTree, old_uid: &str, new_uid: &str) -> bool {
    let kind = |tree: &FileTree, uid: &str| tree.get(uid).map(|n| n.kind);
    matches!(
        (kind(previous, old_uid), kind(new, new_uid)),
        (Some(FileKind::File), Some(FileKind::File)) | (Some(FileKind::Directory), Some(FileKind::Directory))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Permission};

    fn reconciler(storage: &Arc<MemoryStorage>) -> Reconciler {
        Reconciler::new(storage.clone())
    }

    #[tokio::test]
    async fn test_scan_orders_directories_first() {
        let storage = Arc::new(MemoryStorage::with_files([
            ("b.html", ""),
            ("a.html", ""),
            ("zdir/c.html", ""),
            ("adir/d.html", ""),
        ]));
        let result = reconciler(&storage).reconcile(&FileTree::new()).await.unwrap();

        let root = result.tree.root().unwrap();
        assert_eq!(
            root.children,
            vec!["ROOT/adir", "ROOT/zdir", "ROOT/a.html", "ROOT/b.html"]
        );
        assert_eq!(result.tree.get("ROOT/adir/d.html").unwrap().path, "adir/d.html");
        assert_eq!(result.handlers.len(), result.tree.len());
        assert!(result.deleted_uids.is_empty());
    }

    #[tokio::test]
    async fn test_ignored_names_are_skipped() {
        let storage = Arc::new(MemoryStorage::with_files([(".git/HEAD", ""), ("index.html", "")]));
        let result = reconciler(&storage)
            .with_ignore([".git".to_string()])
            .reconcile(&FileTree::new())
            .await
            .unwrap();

        assert!(!result.tree.contains("ROOT/.git"));
        assert!(result.tree.contains("ROOT/index.html"));
    }

    #[tokio::test]
    async fn test_renamed_directory_is_converted() {
        let storage = Arc::new(MemoryStorage::with_files([("old/page.html", ""), ("keep.html", "")]));
        let reconciler = reconciler(&storage);
        let first = reconciler.reconcile(&FileTree::new()).await.unwrap();

        storage.rename("old", "new").unwrap();
        let second = reconciler.reconcile(&first.tree).await.unwrap();

        assert!(second.deleted_uids.is_empty());
        assert_eq!(
            second.converted_uids,
            vec![
                ("ROOT/old".to_string(), "ROOT/new".to_string()),
                ("ROOT/old/page.html".to_string(), "ROOT/new/page.html".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_denied_root_fails_without_scan() {
        let storage = Arc::new(MemoryStorage::with_files([("index.html", "")]));
        storage.set_permission("", Permission::Denied).unwrap();

        let err = reconciler(&storage).reconcile(&FileTree::new()).await.unwrap_err();
        assert_eq!(err.kind(), Some(trellis_common::ErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn test_denied_subdirectory_scans_empty() {
        let storage = Arc::new(MemoryStorage::with_files([("private/a.html", ""), ("b.html", "")]));
        storage.set_permission("private", Permission::Denied).unwrap();

        let result = reconciler(&storage).reconcile(&FileTree::new()).await.unwrap();
        let private = result.tree.get("ROOT/private").unwrap();
        assert!(private.children.is_empty());
        assert!(result.tree.contains("ROOT/b.html"));
    }

    #[tokio::test]
    async fn test_repair_steps_prefer_sibling() {
        let storage = Arc::new(MemoryStorage::with_files([("pages/a.html", ""), ("pages/b.html", ""), ("index.html", "")]));
        let reconciler = reconciler(&storage);
        let first = reconciler.reconcile(&FileTree::new()).await.unwrap();

        storage.remove("pages/a.html");
        let second = reconciler.reconcile(&first.tree).await.unwrap();

        let steps = second.repair_steps(&first.tree, Some("ROOT/pages/a.html"), Some("ROOT/index.html"));
        assert_eq!(
            steps,
            vec![
                RepairStep::ClearPreview,
                RepairStep::ClearNodeTree,
                RepairStep::ClearCurrentFile,
                RepairStep::OpenFallback(Some("ROOT/pages/b.html".to_string())),
            ]
        );

        // Open file untouched: nothing to repair
        assert!(second.repair_steps(&first.tree, Some("ROOT/index.html"), None).is_empty());
    }

    #[tokio::test]
    async fn test_repair_falls_back_to_initial_file() {
        let storage = Arc::new(MemoryStorage::with_files([("pages/a.html", ""), ("index.html", "")]));
        let reconciler = reconciler(&storage);
        let first = reconciler.reconcile(&FileTree::new()).await.unwrap();

        storage.remove("pages");
        let second = reconciler.reconcile(&first.tree).await.unwrap();
        let steps = second.repair_steps(&first.tree, Some("ROOT/pages/a.html"), Some("ROOT/index.html"));

        assert_eq!(steps.last(), Some(&RepairStep::OpenFallback(Some("ROOT/index.html".to_string()))));
    }
}
