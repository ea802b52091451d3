//! # Project Storage
//!
//! The authoritative source of the file tree. A storage backend hands out
//! [`StorageHandle`]s for the project root and its entries; the reconciler
//! walks them and the workspace reads file contents through them.
//!
//! Two backends ship with the crate:
//! - [`LocalStorage`]: a directory on disk
//! - [`MemoryStorage`]: a virtual project, used for scratch projects and tests

use crate::errors::StorageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use trellis_common::{FileKind, HandlerKey};

/// Access state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; a request may grant it
    Prompt,
}

/// Reference to one storage entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageHandle {
    /// Project-relative path, `/`-separated, empty for the root
    pub path: String,
    pub kind: FileKind,
    /// Opaque key that survives a rename (inode, allocation id)
    pub identity: HandlerKey,
}

impl StorageHandle {
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// Handles of the last scan, keyed by identity
pub type HandlerMap = HashMap<HandlerKey, StorageHandle>;

#[async_trait]
pub trait ProjectStorage: Send + Sync {
    async fn root(&self) -> Result<StorageHandle, StorageError>;

    /// Direct entries of a directory, in no particular order
    async fn list(&self, dir: &StorageHandle) -> Result<Vec<StorageHandle>, StorageError>;

    async fn read(&self, file: &StorageHandle) -> Result<String, StorageError>;

    async fn query_permission(&self, handle: &StorageHandle) -> Result<Permission, StorageError>;

    async fn request_permission(&self, handle: &StorageHandle) -> Result<Permission, StorageError>;
}

/// Query, then request. Anything but a grant (including a storage error)
/// counts as denied.
pub async fn verify_permission(storage: &dyn ProjectStorage, handle: &StorageHandle) -> bool {
    match storage.query_permission(handle).await {
        Ok(Permission::Granted) => return true,
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(path = %handle.path, error = %e, "permission query failed");
            return false;
        }
    }
    match storage.request_permission(handle).await {
        Ok(Permission::Granted) => true,
        Ok(_) => false,
        Err(e) => {
            tracing::warn!(path = %handle.path, error = %e, "permission request failed");
            false
        }
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Project rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, handle: &StorageHandle) -> PathBuf {
        handle
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn handle(path: String, metadata: &std::fs::Metadata) -> StorageHandle {
        let kind = if metadata.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        let identity = HandlerKey(Self::identity(&path, metadata));
        StorageHandle { path, kind, identity }
    }

    #[cfg(unix)]
    fn identity(_path: &str, metadata: &std::fs::Metadata) -> String {
        use std::os::unix::fs::MetadataExt;
        format!("{}:{}", metadata.dev(), metadata.ino())
    }

    #[cfg(not(unix))]
    fn identity(path: &str, _metadata: &std::fs::Metadata) -> String {
        path.to_string()
    }

    async fn permission_of(&self, handle: &StorageHandle) -> Result<Permission, StorageError> {
        let path = self.absolute(handle);
        let opened = if handle.is_directory() {
            tokio::fs::read_dir(&path).await.map(|_| ())
        } else {
            tokio::fs::File::open(&path).await.map(|_| ())
        };
        match opened {
            Ok(()) => Ok(Permission::Granted),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(Permission::Denied),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(handle.path.clone())),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ProjectStorage for LocalStorage {
    async fn root(&self) -> Result<StorageHandle, StorageError> {
        let metadata = tokio::fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(StorageError::NotADirectory(self.root.display().to_string()));
        }
        Ok(Self::handle(String::new(), &metadata))
    }

    async fn list(&self, dir: &StorageHandle) -> Result<Vec<StorageHandle>, StorageError> {
        if !dir.is_directory() {
            return Err(StorageError::NotADirectory(dir.path.clone()));
        }
        let mut entries = tokio::fs::read_dir(self.absolute(dir)).await?;
        let mut handles = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(entry = ?entry.path(), "skipping entry with a non UTF-8 name");
                continue;
            };
            let metadata = match tokio::fs::symlink_metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(entry = ?entry.path(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            // Links would alias entries already reachable under the root
            if metadata.file_type().is_symlink() {
                tracing::debug!(entry = ?entry.path(), "skipping symlink");
                continue;
            }
            handles.push(Self::handle(join_path(&dir.path, &name), &metadata));
        }
        Ok(handles)
    }

    async fn read(&self, file: &StorageHandle) -> Result<String, StorageError> {
        if file.is_directory() {
            return Err(StorageError::NotAFile(file.path.clone()));
        }
        Ok(tokio::fs::read_to_string(self.absolute(file)).await?)
    }

    async fn query_permission(&self, handle: &StorageHandle) -> Result<Permission, StorageError> {
        self.permission_of(handle).await
    }

    /// The OS has no prompt; a request reports the current access
    async fn request_permission(&self, handle: &StorageHandle) -> Result<Permission, StorageError> {
        self.permission_of(handle).await
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    kind: FileKind,
    content: String,
    id: u64,
    permission: Permission,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Keyed by path; the root is the empty path
    entries: BTreeMap<String, MemoryEntry>,
    next_id: u64,
}

impl MemoryState {
    fn allocate(&mut self, kind: FileKind, content: String) -> MemoryEntry {
        self.next_id += 1;
        MemoryEntry {
            kind,
            content,
            id: self.next_id,
            permission: Permission::Granted,
        }
    }

    fn ensure_dirs(&mut self, path: &str) {
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = join_path(&current, segment);
            if !self.entries.contains_key(&current) {
                let dir = self.allocate(FileKind::Directory, String::new());
                self.entries.insert(current.clone(), dir);
            }
        }
    }

    /// Paths of `path` and everything below it
    fn subtree(&self, path: &str) -> Vec<String> {
        let prefix = format!("{}/", path);
        self.entries
            .keys()
            .filter(|key| key.as_str() == path || key.starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn handle(&self, path: &str) -> Result<StorageHandle, StorageError> {
        let entry = self
            .entries
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(StorageHandle {
            path: path.to_string(),
            kind: entry.kind,
            identity: HandlerKey(entry.id.to_string()),
        })
    }
}

/// Virtual project held in memory.
///
/// Mutations keep allocation ids stable across renames, so the reconciler
/// sees a renamed entry as the same logical file.
#[derive(Debug)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        let root = state.allocate(FileKind::Directory, String::new());
        state.entries.insert(String::new(), root);
        Self {
            state: RwLock::new(state),
        }
    }

    /// Build from `(path, content)` pairs, creating parent directories
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let storage = Self::new();
        for (path, content) in files {
            storage.write_file(path, content);
        }
        storage
    }

    /// Create or overwrite a file
    pub fn write_file(&self, path: &str, content: impl Into<String>) {
        let path = path.trim_matches('/');
        let mut state = self.state.write();
        if let Some((parent, _)) = path.rsplit_once('/') {
            state.ensure_dirs(parent);
        }
        let content = content.into();
        match state.entries.get_mut(path) {
            Some(entry) if entry.kind == FileKind::File => entry.content = content,
            _ => {
                let file = state.allocate(FileKind::File, content);
                state.entries.insert(path.to_string(), file);
            }
        }
    }

    pub fn create_dir(&self, path: &str) {
        self.state.write().ensure_dirs(path.trim_matches('/'));
    }

    /// Remove an entry and everything below it
    pub fn remove(&self, path: &str) {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return;
        }
        let mut state = self.state.write();
        for key in state.subtree(path) {
            state.entries.remove(&key);
        }
    }

    /// Move an entry (and its subtree), keeping allocation ids
    pub fn rename(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let (from, to) = (from.trim_matches('/'), to.trim_matches('/'));
        let mut state = self.state.write();
        if !state.entries.contains_key(from) || from.is_empty() {
            return Err(StorageError::NotFound(from.to_string()));
        }
        if let Some((parent, _)) = to.rsplit_once('/') {
            state.ensure_dirs(parent);
        }
        for key in state.subtree(from) {
            if let Some(entry) = state.entries.remove(&key) {
                let moved = format!("{}{}", to, &key[from.len()..]);
                state.entries.insert(moved, entry);
            }
        }
        Ok(())
    }

    pub fn set_permission(&self, path: &str, permission: Permission) -> Result<(), StorageError> {
        let path = path.trim_matches('/');
        let mut state = self.state.write();
        let entry = state
            .entries
            .get_mut(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        entry.permission = permission;
        Ok(())
    }

    fn permission(&self, handle: &StorageHandle) -> Result<Permission, StorageError> {
        self.state
            .read()
            .entries
            .get(&handle.path)
            .map(|entry| entry.permission)
            .ok_or_else(|| StorageError::NotFound(handle.path.clone()))
    }
}

#[async_trait]
impl ProjectStorage for MemoryStorage {
    async fn root(&self) -> Result<StorageHandle, StorageError> {
        self.state.read().handle("")
    }

    async fn list(&self, dir: &StorageHandle) -> Result<Vec<StorageHandle>, StorageError> {
        let state = self.state.read();
        let entry = state
            .entries
            .get(&dir.path)
            .ok_or_else(|| StorageError::NotFound(dir.path.clone()))?;
        if entry.kind != FileKind::Directory {
            return Err(StorageError::NotADirectory(dir.path.clone()));
        }
        if entry.permission == Permission::Denied {
            return Err(StorageError::PermissionDenied(dir.path.clone()));
        }

        let prefix = if dir.path.is_empty() {
            String::new()
        } else {
            format!("{}/", dir.path)
        };
        state
            .entries
            .keys()
            .filter(|key| !key.is_empty())
            .filter_map(|key| key.strip_prefix(&prefix).filter(|rest| !rest.contains('/')).map(|_| key))
            .map(|key| state.handle(key))
            .collect()
    }

    async fn read(&self, file: &StorageHandle) -> Result<String, StorageError> {
        let state = self.state.read();
        let entry = state
            .entries
            .get(&file.path)
            .ok_or_else(|| StorageError::NotFound(file.path.clone()))?;
        match (entry.kind, entry.permission) {
            (FileKind::Directory, _) => Err(StorageError::NotAFile(file.path.clone())),
            (_, Permission::Denied) => Err(StorageError::PermissionDenied(file.path.clone())),
            _ => Ok(entry.content.clone()),
        }
    }

    async fn query_permission(&self, handle: &StorageHandle) -> Result<Permission, StorageError> {
        self.permission(handle)
    }

    /// A pending prompt is granted; a denial sticks
    async fn request_permission(&self, handle: &StorageHandle) -> Result<Permission, StorageError> {
        let permission = match self.permission(handle)? {
            Permission::Prompt => Permission::Granted,
            other => other,
        };
        if permission == Permission::Granted {
            self.set_permission(&handle.path, permission)?;
        }
        Ok(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(handles: &[StorageHandle]) -> Vec<&str> {
        let mut names: Vec<&str> = handles.iter().map(|h| h.path.as_str()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_memory_storage_lists_direct_children() {
        let storage = MemoryStorage::with_files([("a.html", "a"), ("src/b.html", "b"), ("src/deep/c.html", "c")]);
        let root = storage.root().await.unwrap();

        let top = storage.list(&root).await.unwrap();
        assert_eq!(names(&top), vec!["a.html", "src"]);

        let src = top.iter().find(|h| h.path == "src").unwrap();
        let inner = storage.list(src).await.unwrap();
        assert_eq!(names(&inner), vec!["src/b.html", "src/deep"]);
    }

    #[tokio::test]
    async fn test_memory_rename_keeps_identity() {
        let storage = MemoryStorage::with_files([("old/page.html", "<p></p>")]);
        let before = storage.state.read().handle("old/page.html").unwrap();

        storage.rename("old", "new").unwrap();
        let after = storage.state.read().handle("new/page.html").unwrap();

        assert_eq!(before.identity, after.identity);
        assert_eq!(storage.read(&after).await.unwrap(), "<p></p>");
        assert!(storage.state.read().handle("old").is_err());
    }

    #[tokio::test]
    async fn test_verify_permission_requests_after_prompt() {
        let storage = MemoryStorage::with_files([("a.html", ""), ("secret.html", "")]);
        storage.set_permission("a.html", Permission::Prompt).unwrap();
        storage.set_permission("secret.html", Permission::Denied).unwrap();

        let a = storage.state.read().handle("a.html").unwrap();
        let secret = storage.state.read().handle("secret.html").unwrap();

        assert!(verify_permission(&storage, &a).await);
        assert_eq!(storage.query_permission(&a).await.unwrap(), Permission::Granted);
        assert!(!verify_permission(&storage, &secret).await);
    }

    #[tokio::test]
    async fn test_local_storage_scans_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pages")).unwrap();
        std::fs::write(dir.path().join("pages/index.html"), "<p>hi</p>").unwrap();

        let storage = LocalStorage::new(dir.path());
        let root = storage.root().await.unwrap();
        assert_eq!(root.path, "");
        assert!(root.is_directory());

        let pages = storage.list(&root).await.unwrap();
        assert_eq!(names(&pages), vec!["pages"]);

        let files = storage.list(&pages[0]).await.unwrap();
        assert_eq!(files[0].path, "pages/index.html");
        assert_eq!(files[0].name(), "index.html");
        assert_eq!(storage.read(&files[0]).await.unwrap(), "<p>hi</p>");
        assert!(verify_permission(&storage, &files[0]).await);
    }

    #[tokio::test]
    async fn test_local_storage_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("missing"));
        assert!(storage.root().await.is_err());
    }
}
