pub mod edit;
pub mod scan;
pub mod watch;

pub use edit::{edit, EditArgs};
pub use scan::{scan, ScanArgs};
pub use watch::{watch, WatchArgs};

use std::path::{Path, PathBuf};

/// Project root from a CLI argument, relative to the working directory
pub(crate) fn project_root(root: Option<PathBuf>, cwd: &Path) -> PathBuf {
    match root {
        Some(root) if root.is_absolute() => root,
        Some(root) => cwd.join(root),
        None => cwd.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_resolution() {
        let cwd = Path::new("/work");
        assert_eq!(project_root(None, cwd), PathBuf::from("/work"));
        assert_eq!(project_root(Some("site".into()), cwd), PathBuf::from("/work/site"));
        assert_eq!(project_root(Some("/abs".into()), cwd), PathBuf::from("/abs"));
    }
}
