use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

/// One file to (over)write, relative to the checkout root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub content: String,
}

/// Files to write before committing, applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<FileChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.push(path, content);
        self
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.changes.push(FileChange {
            path: path.into(),
            content: content.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileChange> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Resolve `requested` under `root` without leaving it.
///
/// Purely lexical: absolute paths and `..` components are rejected, so the
/// target does not have to exist yet.
pub fn resolve_in_checkout(root: &Path, requested: &Path) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in requested.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::Workspace(format!(
                    "Path escapes checkout: {}",
                    requested.display()
                )));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(AppError::Workspace(format!(
            "Invalid file path: {}",
            requested.display()
        )));
    }

    Ok(root.join(relative))
}

/// Write every change into the checkout, replacing existing contents.
///
/// Stops at the first failure; files already written stay on disk.
pub async fn apply(root: &Path, changes: &ChangeSet) -> Result<()> {
    for change in changes.iter() {
        let full_path = resolve_in_checkout(root, &change.path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Workspace(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        tokio::fs::write(&full_path, &change.content)
            .await
            .map_err(|e| {
                AppError::Workspace(format!(
                    "Failed to write {}: {e}",
                    change.path.display()
                ))
            })?;

        tracing::info!(path = %change.path.display(), "Modified file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = Path::new("/work/checkout");
        assert!(resolve_in_checkout(root, Path::new("../outside.txt")).is_err());
        assert!(resolve_in_checkout(root, Path::new("a/../../b")).is_err());
        assert!(resolve_in_checkout(root, Path::new("/etc/passwd")).is_err());
        assert!(resolve_in_checkout(root, Path::new(".")).is_err());
    }

    #[test]
    fn test_resolve_accepts_nested() {
        let root = Path::new("/work/checkout");
        assert_eq!(
            resolve_in_checkout(root, Path::new("./docs/notes.md")).unwrap(),
            PathBuf::from("/work/checkout/docs/notes.md")
        );
    }

    #[tokio::test]
    async fn test_apply_creates_directories_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("README.md"), "old contents that are longer").unwrap();

        let changes = ChangeSet::new()
            .with("README.md", "new")
            .with("deep/nested/dir/file.txt", "hello");
        apply(tmp.path(), &changes).await.unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("README.md")).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(tmp.path().join("deep/nested/dir/file.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let changes = ChangeSet::new()
            .with("a.txt", "one")
            .with("b/c.txt", "two");

        apply(tmp.path(), &changes).await.unwrap();
        let first = (
            fs::read_to_string(tmp.path().join("a.txt")).unwrap(),
            fs::read_to_string(tmp.path().join("b/c.txt")).unwrap(),
        );

        apply(tmp.path(), &changes).await.unwrap();
        let second = (
            fs::read_to_string(tmp.path().join("a.txt")).unwrap(),
            fs::read_to_string(tmp.path().join("b/c.txt")).unwrap(),
        );

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_later_entry_wins_for_duplicate_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let changes = ChangeSet::new().with("x.txt", "first").with("x.txt", "second");
        apply(tmp.path(), &changes).await.unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("x.txt")).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_no_rollback_on_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let changes = ChangeSet::new()
            .with("written.txt", "kept")
            .with("../escape.txt", "never");

        let err = apply(tmp.path(), &changes).await.unwrap_err();
        assert!(matches!(err, AppError::Workspace(_)));
        assert_eq!(
            fs::read_to_string(tmp.path().join("written.txt")).unwrap(),
            "kept"
        );
    }
}
